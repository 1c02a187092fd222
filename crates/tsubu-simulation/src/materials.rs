//! Material definitions and registry

use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::custom::{CustomBehavior, CustomBehaviorTable};
use crate::particle::{SCRATCH_SLOTS, Scratch, scratch_slot};
use crate::reactions::{ReactionHook, ReactionRegistry, ReactionRule};
use crate::RegistryError;

/// Heat capacity used by materials that do not declare one
pub const DEFAULT_HEAT_CAPACITY: f32 = 1.0;

/// Thermal conductivity used by materials that do not declare one
pub const DEFAULT_HEAT_CONDUCTIVITY: f32 = 0.1;

/// Material type id (index into the registry)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MaterialId(pub u16);

impl MaterialId {
    /// Fallback for ids the registry does not know
    pub const UNKNOWN: MaterialId = MaterialId(0);
    pub const STONE: MaterialId = MaterialId(1);
    pub const SAND: MaterialId = MaterialId(2);
    pub const WATER: MaterialId = MaterialId(3);
    pub const WOOD: MaterialId = MaterialId(4);
    pub const FIRE: MaterialId = MaterialId(5);
    pub const SMOKE: MaterialId = MaterialId(6);
    pub const STEAM: MaterialId = MaterialId(7);
    pub const LAVA: MaterialId = MaterialId(8);
    pub const OIL: MaterialId = MaterialId(9);
    pub const ACID: MaterialId = MaterialId(10);
    pub const ICE: MaterialId = MaterialId(11);
    pub const GLASS: MaterialId = MaterialId(12);
    pub const METAL: MaterialId = MaterialId(13);
    pub const WALL: MaterialId = MaterialId(14);
    pub const ASH: MaterialId = MaterialId(15);
    pub const GUNPOWDER: MaterialId = MaterialId(16);

    // Electrical components
    pub const WIRE: MaterialId = MaterialId(17);
    pub const SWITCH: MaterialId = MaterialId(18);
    pub const BATTERY: MaterialId = MaterialId(19);
    pub const HEATER: MaterialId = MaterialId(20);

    pub const BLAST: MaterialId = MaterialId(21);
    pub const PLANT: MaterialId = MaterialId(22);
    pub const SALT: MaterialId = MaterialId(23);
    pub const BRINE: MaterialId = MaterialId(24);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u16> for MaterialId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// How a material moves each tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BehaviorCategory {
    /// Doesn't move (stone, wood, metal)
    Solid,
    /// Falls, piles up (sand, ash, salt)
    Powder,
    /// Flows, seeks level (water, oil, lava)
    Liquid,
    /// Rises, disperses (steam, smoke)
    Gas,
    /// Material-specific motion function
    Custom(CustomBehavior),
}

impl BehaviorCategory {
    /// Liquids and gases can be displaced by denser movers
    pub fn is_fluid(&self) -> bool {
        matches!(self, BehaviorCategory::Liquid | BehaviorCategory::Gas)
    }

    pub fn is_solid(&self) -> bool {
        matches!(self, BehaviorCategory::Solid)
    }
}

/// Temperature-driven type change
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseTransition {
    /// Threshold (Celsius); crossing is strict
    pub temperature: f32,
    /// Material after crossing
    pub becomes: MaterialId,
    /// Record the current material in the particle's origin field
    pub remember_origin: bool,
}

/// Combustion parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Flammability {
    /// Temperature above which the material may catch fire
    pub ignition_temp: f32,
    /// Chance per tick of igniting when hot enough or touching a flame
    pub ignition_probability: f32,
    /// Ticks a burning particle lasts
    pub burn_duration: u16,
    /// Residue after burning out (None = vanishes)
    pub burns_to: Option<MaterialId>,
    /// Heat released into the particle each burning tick
    pub burn_heat: f32,
    /// Flame spawned into an empty neighbor while burning
    pub emits: Option<MaterialId>,
}

/// Finite existence (fire, smoke)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lifetime {
    pub ticks: u16,
    /// Material left behind when the lifetime runs out (None = vanishes)
    pub decays_to: Option<MaterialId>,
}

/// Gating applied to charge entering a particle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChargeGate {
    #[default]
    Always,
    /// Conducts only while the particle's switch state is closed
    Switch,
}

/// Definition of a material's properties
#[derive(Clone, Debug)]
pub struct MaterialDef {
    pub id: MaterialId,
    pub name: String,
    pub behavior: BehaviorCategory,

    /// Base color (RGBA)
    pub color: [u8; 4],

    /// Density (g/cm³) - affects sinking/floating and collision mass
    pub density: f32,
    /// Flow resistance (liquids, 0.0 - 1.0)
    pub viscosity: f32,

    // Thermal properties
    /// Energy per degree (None = default)
    pub heat_capacity: Option<f32>,
    /// Heat conductivity (None = default)
    pub heat_conductivity: Option<f32>,
    /// Radiative loss scale
    pub emissivity: f32,
    /// Radiates only above this temperature (None = never radiates)
    pub radiative_threshold: Option<f32>,
    /// Temperature of freshly placed particles (None = ambient)
    pub default_temperature: Option<f32>,

    // State transitions
    pub heat_transition: Option<PhaseTransition>,
    pub cool_transition: Option<PhaseTransition>,

    pub flammability: Option<Flammability>,
    /// Ignites flammable neighbors on contact
    pub flame: bool,
    pub lifetime: Option<Lifetime>,

    // Electrical properties
    pub conductive: bool,
    /// Ticks a charge marker lives (None = engine default)
    pub charge_lifetime: Option<u8>,
    /// Refractory ticks after a charge expires
    pub charge_cooldown: u8,
    /// Permanent charge source (battery)
    pub emits_charge: bool,
    pub gate: ChargeGate,
    /// Temperature bump applied every tick the particle holds a charge
    pub on_charge_heat: f32,

    // Advanced physics
    /// Coupling with the air velocity field (0.0 = ignores air)
    pub air_drag: f32,
    /// Affected by the mass-attraction field
    pub gravitates: bool,

    /// Runs once whenever a particle becomes this material in place
    pub on_transform: Option<ReactionHook>,
    /// Meaning of scratch slots used by material-specific logic
    pub scratch_labels: [Option<String>; SCRATCH_SLOTS],
}

impl Default for MaterialDef {
    fn default() -> Self {
        Self {
            id: MaterialId::UNKNOWN,
            name: "unknown".to_string(),
            behavior: BehaviorCategory::Solid,
            color: [255, 0, 255, 255], // Magenta for missing materials
            density: 1.0,
            viscosity: 0.0,
            heat_capacity: None,
            heat_conductivity: None,
            emissivity: 0.0,
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
            gate: ChargeGate::Always,
            on_charge_heat: 0.0,
            air_drag: 0.0,
            gravitates: false,
            on_transform: None,
            scratch_labels: Default::default(),
        }
    }
}

impl MaterialDef {
    /// Heat capacity, substituting `default` when absent or degenerate
    pub fn effective_heat_capacity(&self, default: f32) -> f32 {
        self.heat_capacity
            .filter(|c| c.is_finite() && *c > 0.0)
            .unwrap_or(default)
    }

    /// Conductivity, substituting `default` when absent or degenerate
    pub fn effective_conductivity(&self, default: f32) -> f32 {
        self.heat_conductivity
            .filter(|k| k.is_finite() && *k >= 0.0)
            .unwrap_or(default)
    }

    pub fn is_flammable(&self) -> bool {
        self.flammability.is_some()
    }

    /// Scratch contents of a freshly created particle of this material
    pub fn initial_scratch(&self) -> Scratch {
        let mut scratch = Scratch::default();
        if let Some(lifetime) = self.lifetime {
            scratch.set(scratch_slot::LIFETIME, i32::from(lifetime.ticks));
        }
        scratch
    }

    /// Documented meaning of a scratch slot for this material
    pub fn scratch_label(&self, slot: usize) -> Option<&str> {
        if let Some(Some(label)) = self.scratch_labels.get(slot) {
            return Some(label);
        }
        match slot {
            scratch_slot::LIFETIME if self.lifetime.is_some() => Some("lifetime remaining"),
            scratch_slot::STATE if self.gate == ChargeGate::Switch => Some("switch closed"),
            scratch_slot::BURN if self.is_flammable() => Some("burn countdown"),
            _ => None,
        }
    }
}

/// Registry of all materials plus the reaction table
///
/// Immutable once handed to a world; hot reload replaces it wholesale.
#[derive(Clone, Debug)]
pub struct Materials {
    materials: Vec<MaterialDef>,
    by_name: AHashMap<String, MaterialId>,
    reactions: ReactionRegistry,
}

impl Materials {
    /// Registry holding only the fallback material
    pub fn empty() -> Self {
        let mut materials = Self {
            materials: Vec::new(),
            by_name: AHashMap::new(),
            reactions: ReactionRegistry::new(),
        };
        materials.insert(MaterialDef::default());
        materials
    }

    /// Registry with the built-in material set and reactions
    pub fn builtin() -> Self {
        let mut materials = Self::empty();
        materials.register_defaults(&CustomBehaviorTable::builtin());
        materials.reactions = ReactionRegistry::builtin();
        materials
    }

    fn register_defaults(&mut self, custom: &CustomBehaviorTable) {
        let flicker = custom
            .get("flicker")
            .map_or(BehaviorCategory::Gas, BehaviorCategory::Custom);
        let drift = custom
            .get("drift")
            .map_or(BehaviorCategory::Gas, BehaviorCategory::Custom);

        // Stone
        self.insert(MaterialDef {
            id: MaterialId::STONE,
            name: "stone".to_string(),
            color: [128, 128, 128, 255],
            density: 2.5,
            heat_capacity: Some(0.8),
            heat_conductivity: Some(0.3),
            heat_transition: Some(PhaseTransition {
                temperature: 1200.0,
                becomes: MaterialId::LAVA,
                remember_origin: true,
            }),
            ..Default::default()
        });

        // Sand
        self.insert(MaterialDef {
            id: MaterialId::SAND,
            name: "sand".to_string(),
            behavior: BehaviorCategory::Powder,
            color: [194, 178, 128, 255],
            density: 1.5,
            heat_capacity: Some(0.8),
            heat_conductivity: Some(0.2),
            heat_transition: Some(PhaseTransition {
                temperature: 1700.0,
                becomes: MaterialId::GLASS,
                remember_origin: false,
            }),
            air_drag: 0.05,
            gravitates: true,
            ..Default::default()
        });

        // Water
        self.insert(MaterialDef {
            id: MaterialId::WATER,
            name: "water".to_string(),
            behavior: BehaviorCategory::Liquid,
            color: [64, 164, 223, 200],
            density: 1.0,
            viscosity: 0.1,
            heat_capacity: Some(4.0),
            heat_conductivity: Some(0.6),
            heat_transition: Some(PhaseTransition {
                temperature: 100.0,
                becomes: MaterialId::STEAM,
                remember_origin: false,
            }),
            cool_transition: Some(PhaseTransition {
                temperature: 0.0,
                becomes: MaterialId::ICE,
                remember_origin: false,
            }),
            air_drag: 0.1,
            gravitates: true,
            ..Default::default()
        });

        // Wood
        self.insert(MaterialDef {
            id: MaterialId::WOOD,
            name: "wood".to_string(),
            color: [139, 90, 43, 255],
            density: 0.6,
            heat_capacity: Some(1.7),
            heat_conductivity: Some(0.1),
            flammability: Some(Flammability {
                ignition_temp: 300.0,
                ignition_probability: 0.05,
                burn_duration: 120,
                burns_to: Some(MaterialId::ASH),
                burn_heat: 2.0,
                emits: Some(MaterialId::FIRE),
            }),
            ..Default::default()
        });

        // Fire
        self.insert(MaterialDef {
            id: MaterialId::FIRE,
            name: "fire".to_string(),
            behavior: flicker,
            color: [255, 100, 0, 255],
            density: 0.0003,
            heat_conductivity: Some(0.5),
            emissivity: 0.5,
            radiative_threshold: Some(600.0),
            default_temperature: Some(800.0),
            flame: true,
            lifetime: Some(Lifetime {
                ticks: 40,
                decays_to: Some(MaterialId::SMOKE),
            }),
            air_drag: 0.6,
            ..Default::default()
        });

        // Smoke
        self.insert(MaterialDef {
            id: MaterialId::SMOKE,
            name: "smoke".to_string(),
            behavior: BehaviorCategory::Gas,
            color: [60, 60, 60, 150],
            density: 0.001,
            heat_conductivity: Some(0.05),
            lifetime: Some(Lifetime {
                ticks: 200,
                decays_to: None,
            }),
            air_drag: 0.8,
            ..Default::default()
        });

        // Steam
        self.insert(MaterialDef {
            id: MaterialId::STEAM,
            name: "steam".to_string(),
            behavior: BehaviorCategory::Gas,
            color: [200, 200, 200, 100],
            density: 0.0006,
            heat_capacity: Some(2.0),
            heat_conductivity: Some(0.05),
            default_temperature: Some(110.0),
            cool_transition: Some(PhaseTransition {
                temperature: 95.0, // Condenses a little below boiling
                becomes: MaterialId::WATER,
                remember_origin: false,
            }),
            air_drag: 0.8,
            ..Default::default()
        });

        // Lava
        self.insert(MaterialDef {
            id: MaterialId::LAVA,
            name: "lava".to_string(),
            behavior: BehaviorCategory::Liquid,
            color: [255, 80, 0, 255],
            density: 3.0,
            viscosity: 0.8, // Very viscous
            heat_capacity: Some(1.0),
            heat_conductivity: Some(0.8),
            emissivity: 0.9,
            radiative_threshold: Some(500.0),
            default_temperature: Some(1300.0),
            cool_transition: Some(PhaseTransition {
                temperature: 700.0,
                becomes: MaterialId::STONE,
                remember_origin: false,
            }),
            flame: true,
            gravitates: true,
            ..Default::default()
        });

        // Oil
        self.insert(MaterialDef {
            id: MaterialId::OIL,
            name: "oil".to_string(),
            behavior: BehaviorCategory::Liquid,
            color: [50, 40, 30, 255],
            density: 0.8, // Floats on water
            viscosity: 0.3,
            heat_capacity: Some(2.0),
            heat_conductivity: Some(0.15),
            flammability: Some(Flammability {
                ignition_temp: 200.0,
                ignition_probability: 0.2,
                burn_duration: 60,
                burns_to: Some(MaterialId::SMOKE),
                burn_heat: 3.0,
                emits: Some(MaterialId::FIRE),
            }),
            air_drag: 0.1,
            ..Default::default()
        });

        // Acid
        self.insert(MaterialDef {
            id: MaterialId::ACID,
            name: "acid".to_string(),
            behavior: BehaviorCategory::Liquid,
            color: [0, 255, 0, 200],
            density: 1.1,
            viscosity: 0.2,
            heat_capacity: Some(3.0),
            heat_conductivity: Some(0.5),
            air_drag: 0.1,
            ..Default::default()
        });

        // Ice
        self.insert(MaterialDef {
            id: MaterialId::ICE,
            name: "ice".to_string(),
            color: [200, 230, 255, 200],
            density: 0.9,
            heat_capacity: Some(2.0),
            heat_conductivity: Some(0.5),
            default_temperature: Some(-10.0),
            heat_transition: Some(PhaseTransition {
                temperature: 0.0,
                becomes: MaterialId::WATER,
                remember_origin: false,
            }),
            ..Default::default()
        });

        // Glass
        self.insert(MaterialDef {
            id: MaterialId::GLASS,
            name: "glass".to_string(),
            color: [200, 220, 255, 150],
            density: 2.5,
            heat_capacity: Some(0.8),
            heat_conductivity: Some(0.2),
            heat_transition: Some(PhaseTransition {
                temperature: 1400.0,
                becomes: MaterialId::LAVA, // Molten glass
                remember_origin: true,
            }),
            ..Default::default()
        });

        // Metal
        self.insert(MaterialDef {
            id: MaterialId::METAL,
            name: "metal".to_string(),
            color: [180, 180, 190, 255],
            density: 7.8,
            heat_capacity: Some(0.5),
            heat_conductivity: Some(0.9),
            heat_transition: Some(PhaseTransition {
                temperature: 1500.0,
                becomes: MaterialId::LAVA, // Molten metal
                remember_origin: true,
            }),
            conductive: true,
            charge_lifetime: Some(4),
            charge_cooldown: 2,
            ..Default::default()
        });

        // Wall - inert, insulating boundary
        self.insert(MaterialDef {
            id: MaterialId::WALL,
            name: "wall".to_string(),
            color: [40, 40, 40, 255],
            density: 10.0,
            heat_conductivity: Some(0.0),
            ..Default::default()
        });

        // Ash
        self.insert(MaterialDef {
            id: MaterialId::ASH,
            name: "ash".to_string(),
            behavior: BehaviorCategory::Powder,
            color: [90, 90, 90, 255],
            density: 0.7,
            heat_conductivity: Some(0.05),
            air_drag: 0.3,
            ..Default::default()
        });

        // Gunpowder
        self.insert(MaterialDef {
            id: MaterialId::GUNPOWDER,
            name: "gunpowder".to_string(),
            behavior: BehaviorCategory::Powder,
            color: [50, 50, 50, 255],
            density: 1.2,
            heat_conductivity: Some(0.1),
            flammability: Some(Flammability {
                ignition_temp: 150.0,
                ignition_probability: 0.9,
                burn_duration: 1,
                burns_to: Some(MaterialId::BLAST),
                burn_heat: 0.0,
                emits: None,
            }),
            air_drag: 0.05,
            ..Default::default()
        });

        // Wire
        self.insert(MaterialDef {
            id: MaterialId::WIRE,
            name: "wire".to_string(),
            color: [184, 115, 51, 255],
            density: 8.9,
            heat_capacity: Some(0.4),
            heat_conductivity: Some(0.95),
            heat_transition: Some(PhaseTransition {
                temperature: 1084.0,
                becomes: MaterialId::LAVA,
                remember_origin: true,
            }),
            conductive: true,
            charge_cooldown: 2,
            ..Default::default()
        });

        // Switch
        self.insert(MaterialDef {
            id: MaterialId::SWITCH,
            name: "switch".to_string(),
            color: [200, 60, 60, 255],
            density: 7.0,
            heat_conductivity: Some(0.5),
            conductive: true,
            charge_cooldown: 2,
            gate: ChargeGate::Switch,
            ..Default::default()
        });

        // Battery
        self.insert(MaterialDef {
            id: MaterialId::BATTERY,
            name: "battery".to_string(),
            color: [230, 200, 40, 255],
            density: 5.0,
            heat_conductivity: Some(0.3),
            emits_charge: true,
            ..Default::default()
        });

        // Heater
        self.insert(MaterialDef {
            id: MaterialId::HEATER,
            name: "heater".to_string(),
            color: [255, 140, 120, 255],
            density: 7.0,
            heat_capacity: Some(0.5),
            heat_conductivity: Some(0.9),
            conductive: true,
            charge_cooldown: 1,
            on_charge_heat: 15.0,
            ..Default::default()
        });

        // Blast - short-lived explosion cloud
        self.insert(MaterialDef {
            id: MaterialId::BLAST,
            name: "blast".to_string(),
            behavior: drift,
            color: [255, 220, 120, 255],
            density: 0.0005,
            heat_conductivity: Some(0.9),
            default_temperature: Some(1500.0),
            flame: true,
            lifetime: Some(Lifetime {
                ticks: 6,
                decays_to: Some(MaterialId::FIRE),
            }),
            air_drag: 1.0,
            on_transform: Some(ReactionHook::Explode {
                radius: 6.0,
                strength: 40.0,
            }),
            ..Default::default()
        });

        // Plant
        self.insert(MaterialDef {
            id: MaterialId::PLANT,
            name: "plant".to_string(),
            color: [40, 170, 60, 255],
            density: 0.8,
            heat_capacity: Some(3.0),
            heat_conductivity: Some(0.2),
            flammability: Some(Flammability {
                ignition_temp: 250.0,
                ignition_probability: 0.1,
                burn_duration: 40,
                burns_to: Some(MaterialId::ASH),
                burn_heat: 1.0,
                emits: Some(MaterialId::FIRE),
            }),
            ..Default::default()
        });

        // Salt
        self.insert(MaterialDef {
            id: MaterialId::SALT,
            name: "salt".to_string(),
            behavior: BehaviorCategory::Powder,
            color: [240, 240, 240, 255],
            density: 2.1,
            heat_capacity: Some(0.9),
            heat_conductivity: Some(0.3),
            air_drag: 0.05,
            ..Default::default()
        });

        // Brine
        self.insert(MaterialDef {
            id: MaterialId::BRINE,
            name: "brine".to_string(),
            behavior: BehaviorCategory::Liquid,
            color: [90, 150, 200, 210],
            density: 1.2,
            viscosity: 0.15,
            heat_capacity: Some(3.5),
            heat_conductivity: Some(0.6),
            heat_transition: Some(PhaseTransition {
                temperature: 102.0,
                becomes: MaterialId::STEAM,
                remember_origin: false,
            }),
            cool_transition: Some(PhaseTransition {
                temperature: -5.0,
                becomes: MaterialId::ICE,
                remember_origin: false,
            }),
            conductive: true,
            charge_cooldown: 2,
            air_drag: 0.1,
            ..Default::default()
        });
    }

    fn insert(&mut self, material: MaterialDef) {
        let id = material.id.index();

        // Ensure vec is large enough
        if self.materials.len() <= id {
            self.materials.resize(id + 1, MaterialDef::default());
        }

        self.by_name.insert(material.name.clone(), material.id);
        self.materials[id] = material;
    }

    /// Add a material, rejecting duplicate names and ids
    pub fn register(&mut self, material: MaterialDef) -> Result<(), RegistryError> {
        if self.by_name.contains_key(&material.name) {
            return Err(RegistryError::DuplicateMaterial(material.name));
        }
        if self.contains(material.id) {
            return Err(RegistryError::DuplicateId(material.id));
        }
        self.insert(material);
        Ok(())
    }

    /// Add a reaction rule for `(initiator, neighbor)`
    pub fn register_reaction(
        &mut self,
        initiator: MaterialId,
        neighbor: MaterialId,
        rule: ReactionRule,
    ) {
        self.reactions.register(initiator, neighbor, rule);
    }

    /// Get material definition by ID, falling back to the unknown material
    pub fn get(&self, id: MaterialId) -> &MaterialDef {
        match self.materials.get(id.index()) {
            Some(def) if def.id == id => def,
            _ => &self.materials[0],
        }
    }

    /// Whether `id` names a registered material (holes do not count)
    pub fn contains(&self, id: MaterialId) -> bool {
        self.materials
            .get(id.index())
            .is_some_and(|def| def.id == id)
    }

    /// `id` if registered, otherwise the fallback id
    pub fn resolve(&self, id: MaterialId) -> MaterialId {
        if self.contains(id) {
            id
        } else {
            MaterialId::UNKNOWN
        }
    }

    /// Look up a material id by name
    pub fn id_of(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    /// Get color for a material
    pub fn get_color(&self, id: MaterialId) -> [u8; 4] {
        self.get(id).color
    }

    pub fn reactions(&self) -> &ReactionRegistry {
        &self.reactions
    }

    /// Registered materials in id order
    pub fn iter(&self) -> impl Iterator<Item = &MaterialDef> {
        self.materials
            .iter()
            .enumerate()
            .filter(|(index, def)| def.id.index() == *index)
            .map(|(_, def)| def)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every id referenced by materials and reactions is registered
    pub fn validate(&self) -> Result<(), RegistryError> {
        if !self
            .materials
            .first()
            .is_some_and(|def| def.id == MaterialId::UNKNOWN)
        {
            return Err(RegistryError::NoFallback);
        }

        for def in self.iter() {
            let transitions = [
                ("heat transition", def.heat_transition.map(|t| t.becomes)),
                ("cool transition", def.cool_transition.map(|t| t.becomes)),
                ("burn product", def.flammability.and_then(|f| f.burns_to)),
                ("flame", def.flammability.and_then(|f| f.emits)),
                ("decay product", def.lifetime.and_then(|l| l.decays_to)),
                ("transform hook", def.on_transform.and_then(hook_target)),
            ];
            for (what, target) in transitions {
                if let Some(id) = target
                    && !self.contains(id)
                {
                    return Err(RegistryError::DanglingId {
                        id,
                        context: format!("{what} of `{}`", def.name),
                    });
                }
            }

            if let Some(flammability) = def.flammability {
                check_probability(
                    flammability.ignition_probability,
                    || format!("ignition of `{}`", def.name),
                )?;
            }
        }

        for ((initiator, neighbor), rule) in self.reactions.iter() {
            let context = || format!("reaction `{}`", rule.name);
            let referenced = [
                Some(*initiator),
                Some(*neighbor),
                rule.self_becomes.target(),
                rule.neighbor_becomes.target(),
                rule.hook.and_then(hook_target),
            ];
            for id in referenced.into_iter().flatten() {
                if !self.contains(id) {
                    return Err(RegistryError::DanglingId {
                        id,
                        context: context(),
                    });
                }
            }
            check_probability(rule.probability, context)?;
            if rule.bidirectional && rule.one_way {
                return Err(RegistryError::ConflictingDirection(context()));
            }
            if let (Some(min), Some(max)) = (rule.min_temp, rule.max_temp)
                && min > max
            {
                return Err(RegistryError::InvalidTemperatureWindow {
                    min,
                    max,
                    context: context(),
                });
            }
        }

        Ok(())
    }

    /// Swap in a custom fallback definition at id 0
    pub(crate) fn replace_fallback(&mut self, mut fallback: MaterialDef) {
        fallback.id = MaterialId::UNKNOWN;
        self.insert(fallback);
    }

    /// Replace the reaction table wholesale
    pub(crate) fn set_reactions(&mut self, reactions: ReactionRegistry) {
        self.reactions = reactions;
    }
}

impl Default for Materials {
    fn default() -> Self {
        Self::builtin()
    }
}

fn hook_target(hook: ReactionHook) -> Option<MaterialId> {
    match hook {
        ReactionHook::SpawnAbove(id) => Some(id),
        _ => None,
    }
}

fn check_probability(value: f32, context: impl FnOnce() -> String) -> Result<(), RegistryError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RegistryError::InvalidProbability {
            value,
            context: context(),
        })
    }
}
