//! Declarative material files
//!
//! Material files are RON documents keyed by material *names*. Loading
//! resolves every name to an id and validates the result before a registry is
//! returned, so a running world never sees a dangling reference.

use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::custom::CustomBehaviorTable;
use crate::materials::{
    BehaviorCategory, ChargeGate, Flammability, Lifetime, MaterialDef, MaterialId, Materials,
    PhaseTransition,
};
use crate::particle::SCRATCH_SLOTS;
use crate::reactions::{Outcome, ReactionHook, ReactionRegistry, ReactionRule};
use crate::RegistryError;

/// Top-level material file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialFile {
    pub materials: Vec<MaterialSpec>,
    pub reactions: Vec<ReactionSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorSpec {
    Solid,
    Powder,
    Liquid,
    Gas,
    /// Name of a registered custom motion function
    Custom(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub temperature: f32,
    pub becomes: String,
    #[serde(default)]
    pub remember_origin: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlammabilitySpec {
    pub ignition_temp: f32,
    #[serde(default = "default_probability")]
    pub ignition_probability: f32,
    pub burn_duration: u16,
    #[serde(default)]
    pub burns_to: Option<String>,
    #[serde(default)]
    pub burn_heat: f32,
    #[serde(default)]
    pub emits: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LifetimeSpec {
    pub ticks: u16,
    #[serde(default)]
    pub decays_to: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OutcomeSpec {
    Unchanged,
    Destroy,
    Become(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HookSpec {
    SpawnAbove(String),
    Explode { radius: f32, strength: f32 },
    Heat(f32),
}

/// One material entry
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialSpec {
    pub name: String,
    /// Explicit id; assigned after the highest used id when absent
    pub id: Option<u16>,
    pub behavior: BehaviorSpec,
    pub color: [u8; 4],
    pub density: f32,
    pub viscosity: f32,
    pub heat_capacity: Option<f32>,
    pub heat_conductivity: Option<f32>,
    pub emissivity: f32,
    pub radiative_threshold: Option<f32>,
    pub default_temperature: Option<f32>,
    pub heat_transition: Option<TransitionSpec>,
    pub cool_transition: Option<TransitionSpec>,
    pub flammability: Option<FlammabilitySpec>,
    pub flame: bool,
    pub lifetime: Option<LifetimeSpec>,
    pub conductive: bool,
    pub charge_lifetime: Option<u8>,
    pub charge_cooldown: u8,
    pub emits_charge: bool,
    pub switch: bool,
    pub on_charge_heat: f32,
    pub air_drag: f32,
    pub gravitates: bool,
    pub on_transform: Option<HookSpec>,
    /// Documented meaning of scratch slots, by slot index
    pub scratch_labels: Vec<(usize, String)>,
}

impl Default for MaterialSpec {
    fn default() -> Self {
        let def = MaterialDef::default();
        Self {
            name: String::new(),
            id: None,
            behavior: BehaviorSpec::Solid,
            color: def.color,
            density: def.density,
            viscosity: def.viscosity,
            heat_capacity: None,
            heat_conductivity: None,
            emissivity: def.emissivity,
            radiative_threshold: None,
            default_temperature: None,
            heat_transition: None,
            cool_transition: None,
            flammability: None,
            flame: false,
            lifetime: None,
            conductive: false,
            charge_lifetime: None,
            charge_cooldown: 0,
            emits_charge: false,
            switch: false,
            on_charge_heat: 0.0,
            air_drag: 0.0,
            gravitates: false,
            on_transform: None,
            scratch_labels: Vec::new(),
        }
    }
}

/// One reaction entry
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionSpec {
    pub name: String,
    /// Material of the initiating particle
    pub initiator: String,
    pub neighbor: String,
    pub self_becomes: OutcomeSpec,
    pub neighbor_becomes: OutcomeSpec,
    pub probability: f32,
    pub min_temp: Option<f32>,
    pub max_temp: Option<f32>,
    pub requires_charge: bool,
    pub bidirectional: bool,
    pub one_way: bool,
    pub hook: Option<HookSpec>,
}

impl Default for ReactionSpec {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            initiator: String::new(),
            neighbor: String::new(),
            self_becomes: OutcomeSpec::Unchanged,
            neighbor_becomes: OutcomeSpec::Unchanged,
            probability: default_probability(),
            min_temp: None,
            max_temp: None,
            requires_charge: false,
            bidirectional: false,
            one_way: false,
            hook: None,
        }
    }
}

fn default_probability() -> f32 {
    1.0
}

struct Resolver<'a> {
    ids: &'a AHashMap<String, MaterialId>,
}

impl Resolver<'_> {
    fn id(&self, name: &str, context: impl FnOnce() -> String) -> Result<MaterialId, RegistryError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownMaterial {
                name: name.to_string(),
                context: context(),
            })
    }

    fn transition(
        &self,
        spec: &Option<TransitionSpec>,
        context: impl FnOnce() -> String,
    ) -> Result<Option<PhaseTransition>, RegistryError> {
        spec.as_ref()
            .map(|t| {
                Ok(PhaseTransition {
                    temperature: t.temperature,
                    becomes: self.id(&t.becomes, context)?,
                    remember_origin: t.remember_origin,
                })
            })
            .transpose()
    }

    fn outcome(
        &self,
        spec: &OutcomeSpec,
        context: impl FnOnce() -> String,
    ) -> Result<Outcome, RegistryError> {
        Ok(match spec {
            OutcomeSpec::Unchanged => Outcome::Unchanged,
            OutcomeSpec::Destroy => Outcome::Destroy,
            OutcomeSpec::Become(name) => Outcome::Become(self.id(name, context)?),
        })
    }

    fn hook(
        &self,
        spec: &Option<HookSpec>,
        context: impl FnOnce() -> String,
    ) -> Result<Option<ReactionHook>, RegistryError> {
        Ok(match spec {
            None => None,
            Some(HookSpec::SpawnAbove(name)) => Some(ReactionHook::SpawnAbove(self.id(name, context)?)),
            Some(HookSpec::Explode { radius, strength }) => Some(ReactionHook::Explode {
                radius: *radius,
                strength: *strength,
            }),
            Some(HookSpec::Heat(amount)) => Some(ReactionHook::Heat(*amount)),
        })
    }
}

impl MaterialFile {
    pub fn from_ron_str(source: &str) -> Result<Self, RegistryError> {
        Ok(ron::from_str(source)?)
    }

    /// Build a validated registry from this file
    pub fn into_materials(self, custom: &CustomBehaviorTable) -> Result<Materials, RegistryError> {
        let ids = self.assign_ids()?;
        let resolver = Resolver { ids: &ids };

        let mut materials = Materials::empty();
        for spec in &self.materials {
            let def = build_material(spec, ids[&spec.name], &resolver, custom)?;
            if def.id == MaterialId::UNKNOWN {
                materials.replace_fallback(def);
            } else {
                materials.register(def)?;
            }
        }

        let mut reactions = ReactionRegistry::new();
        for spec in &self.reactions {
            let context = || format!("reaction `{}`", spec.name);
            let initiator = resolver.id(&spec.initiator, context)?;
            let neighbor = resolver.id(&spec.neighbor, context)?;
            reactions.register(
                initiator,
                neighbor,
                ReactionRule {
                    name: spec.name.clone(),
                    self_becomes: resolver.outcome(&spec.self_becomes, context)?,
                    neighbor_becomes: resolver.outcome(&spec.neighbor_becomes, context)?,
                    probability: spec.probability,
                    min_temp: spec.min_temp,
                    max_temp: spec.max_temp,
                    requires_charge: spec.requires_charge,
                    bidirectional: spec.bidirectional,
                    one_way: spec.one_way,
                    hook: resolver.hook(&spec.hook, context)?,
                },
            );
        }
        materials.set_reactions(reactions);

        materials.validate()?;
        log::info!(
            "Loaded {} materials and {} reactions",
            materials.len(),
            materials.reactions().len()
        );
        Ok(materials)
    }

    /// Map names to ids, honoring explicit ids and filling in the rest
    fn assign_ids(&self) -> Result<AHashMap<String, MaterialId>, RegistryError> {
        let mut ids = AHashMap::new();
        let mut used = AHashMap::new();

        for spec in &self.materials {
            if ids.contains_key(&spec.name) {
                return Err(RegistryError::DuplicateMaterial(spec.name.clone()));
            }
            let explicit = match (spec.id, spec.name.as_str()) {
                (Some(id), _) => Some(MaterialId(id)),
                (None, "unknown") => Some(MaterialId::UNKNOWN),
                (None, _) => None,
            };
            if let Some(id) = explicit
                && used.insert(id, spec.name.clone()).is_some()
            {
                return Err(RegistryError::DuplicateId(id));
            }
            ids.insert(spec.name.clone(), explicit.unwrap_or(MaterialId::UNKNOWN));
        }

        let mut next = used.keys().map(|id: &MaterialId| id.0).max().unwrap_or(0);
        for spec in &self.materials {
            if spec.id.is_none() && spec.name != "unknown" {
                next += 1;
                ids.insert(spec.name.clone(), MaterialId(next));
            }
        }

        if !ids.contains_key("unknown") {
            ids.insert("unknown".to_string(), MaterialId::UNKNOWN);
        }
        Ok(ids)
    }
}

fn build_material(
    spec: &MaterialSpec,
    id: MaterialId,
    resolver: &Resolver<'_>,
    custom: &CustomBehaviorTable,
) -> Result<MaterialDef, RegistryError> {
    let name = &spec.name;
    let behavior = match &spec.behavior {
        BehaviorSpec::Solid => BehaviorCategory::Solid,
        BehaviorSpec::Powder => BehaviorCategory::Powder,
        BehaviorSpec::Liquid => BehaviorCategory::Liquid,
        BehaviorSpec::Gas => BehaviorCategory::Gas,
        BehaviorSpec::Custom(behavior) => BehaviorCategory::Custom(custom.get(behavior).ok_or_else(
            || RegistryError::UnknownCustomBehavior {
                name: behavior.clone(),
                material: name.clone(),
            },
        )?),
    };

    let flammability = match &spec.flammability {
        Some(f) => Some(Flammability {
            ignition_temp: f.ignition_temp,
            ignition_probability: f.ignition_probability,
            burn_duration: f.burn_duration,
            burns_to: f
                .burns_to
                .as_deref()
                .map(|target| resolver.id(target, || format!("burn product of `{name}`")))
                .transpose()?,
            burn_heat: f.burn_heat,
            emits: f
                .emits
                .as_deref()
                .map(|flame| resolver.id(flame, || format!("flame of `{name}`")))
                .transpose()?,
        }),
        None => None,
    };

    let lifetime = match &spec.lifetime {
        Some(l) => Some(Lifetime {
            ticks: l.ticks,
            decays_to: l
                .decays_to
                .as_deref()
                .map(|target| resolver.id(target, || format!("decay product of `{name}`")))
                .transpose()?,
        }),
        None => None,
    };

    let mut scratch_labels: [Option<String>; SCRATCH_SLOTS] = Default::default();
    for (slot, label) in &spec.scratch_labels {
        if let Some(entry) = scratch_labels.get_mut(*slot) {
            *entry = Some(label.clone());
        } else {
            log::warn!("Ignoring scratch label for slot {slot} of `{name}`");
        }
    }

    Ok(MaterialDef {
        id,
        name: name.clone(),
        behavior,
        color: spec.color,
        density: spec.density,
        viscosity: spec.viscosity,
        heat_capacity: spec.heat_capacity,
        heat_conductivity: spec.heat_conductivity,
        emissivity: spec.emissivity,
        radiative_threshold: spec.radiative_threshold,
        default_temperature: spec.default_temperature,
        heat_transition: resolver.transition(&spec.heat_transition, || {
            format!("heat transition of `{name}`")
        })?,
        cool_transition: resolver.transition(&spec.cool_transition, || {
            format!("cool transition of `{name}`")
        })?,
        flammability,
        flame: spec.flame,
        lifetime,
        conductive: spec.conductive,
        charge_lifetime: spec.charge_lifetime,
        charge_cooldown: spec.charge_cooldown,
        emits_charge: spec.emits_charge,
        gate: if spec.switch {
            ChargeGate::Switch
        } else {
            ChargeGate::Always
        },
        on_charge_heat: spec.on_charge_heat,
        air_drag: spec.air_drag,
        gravitates: spec.gravitates,
        on_transform: resolver.hook(&spec.on_transform, || format!("transform hook of `{name}`"))?,
        scratch_labels,
    })
}

impl Materials {
    /// Load a registry from RON source using the built-in custom behaviors
    pub fn from_ron_str(source: &str) -> Result<Self, RegistryError> {
        Self::from_ron_str_with(source, &CustomBehaviorTable::builtin())
    }

    pub fn from_ron_str_with(
        source: &str,
        custom: &CustomBehaviorTable,
    ) -> Result<Self, RegistryError> {
        MaterialFile::from_ron_str(source)?.into_materials(custom)
    }

    /// Load a registry from a RON file
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
#![enable(implicit_some)]
MaterialFile(
    materials: [
        (name: "rock", behavior: Solid, density: 2.5,
         heat_transition: (temperature: 1000.0, becomes: "magma", remember_origin: true)),
        (name: "magma", behavior: Liquid, density: 3.0, viscosity: 0.5,
         cool_transition: (temperature: 600.0, becomes: "rock")),
        (name: "mist", id: 40, behavior: Custom("drift"), density: 0.001,
         lifetime: (ticks: 10)),
    ],
    reactions: [
        (name: "hiss", initiator: "mist", neighbor: "magma",
         self_becomes: Destroy, probability: 0.5, bidirectional: true),
    ],
)
"#;

    #[test]
    fn test_load_small_file() {
        let materials = Materials::from_ron_str(SMALL).unwrap();

        let rock = materials.id_of("rock").unwrap();
        let magma = materials.id_of("magma").unwrap();
        let mist = materials.id_of("mist").unwrap();
        assert_eq!(mist, MaterialId(40));
        assert_ne!(rock, magma);
        assert!(rock.0 > 40 && magma.0 > 40);

        let rock_def = materials.get(rock);
        assert_eq!(rock_def.heat_transition.unwrap().becomes, magma);
        assert!(rock_def.heat_transition.unwrap().remember_origin);

        let rule = materials.reactions().rule_for(magma, mist).unwrap();
        assert_eq!(rule.neighbor_becomes, Outcome::Destroy);
        assert_eq!(materials.get(MaterialId::UNKNOWN).name, "unknown");
    }

    #[test]
    fn test_unknown_reference_is_fatal() {
        let source = r#"
#![enable(implicit_some)]
MaterialFile(materials: [
    (name: "rock", heat_transition: (temperature: 1000.0, becomes: "magma")),
])
"#;
        let err = Materials::from_ron_str(source).unwrap_err();
        assert!(
            matches!(err, RegistryError::UnknownMaterial { ref name, .. } if name == "magma"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_unknown_custom_behavior_is_fatal() {
        let source = r#"MaterialFile(materials: [(name: "ghost", behavior: Custom("phase"))])"#;
        assert!(matches!(
            Materials::from_ron_str(source),
            Err(RegistryError::UnknownCustomBehavior { .. })
        ));
    }

    #[test]
    fn test_duplicate_names_and_ids() {
        let names = r#"MaterialFile(materials: [(name: "a"), (name: "a")])"#;
        assert!(matches!(
            Materials::from_ron_str(names),
            Err(RegistryError::DuplicateMaterial(_))
        ));

        let ids = r#"
#![enable(implicit_some)]
MaterialFile(materials: [(name: "a", id: 3), (name: "b", id: 3)])
"#;
        assert!(matches!(
            Materials::from_ron_str(ids),
            Err(RegistryError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_invalid_window_is_fatal() {
        let source = r#"
#![enable(implicit_some)]
MaterialFile(
    materials: [(name: "a"), (name: "b")],
    reactions: [(initiator: "a", neighbor: "b", min_temp: 50.0, max_temp: 10.0)],
)
"#;
        assert!(matches!(
            Materials::from_ron_str(source),
            Err(RegistryError::InvalidTemperatureWindow { .. })
        ));
    }

    #[test]
    fn test_one_way_bidirectional_rule_is_fatal() {
        let source = r#"
MaterialFile(
    materials: [(name: "a"), (name: "b")],
    reactions: [(name: "clash", initiator: "a", neighbor: "b", self_becomes: Destroy,
                 bidirectional: true, one_way: true)],
)
"#;
        assert!(matches!(
            Materials::from_ron_str(source),
            Err(RegistryError::ConflictingDirection(_))
        ));
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(
            Materials::from_ron_str("MaterialFile(materials: [("),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn test_reaction_probability_defaults_to_certain() {
        let source = r#"
MaterialFile(
    materials: [(name: "a"), (name: "b")],
    reactions: [(initiator: "a", neighbor: "b", neighbor_becomes: Become("a"))],
)
"#;
        let materials = Materials::from_ron_str(source).unwrap();
        let a = materials.id_of("a").unwrap();
        let b = materials.id_of("b").unwrap();
        assert_eq!(materials.reactions().rule_for(a, b).unwrap().probability, 1.0);
    }
}
