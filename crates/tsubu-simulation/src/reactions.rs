//! Neighbor reaction rules
//!
//! Handles interactions between different materials when they come into contact.
//! Rules are keyed by `(self, neighbor)` and are directional: the rule for
//! `(ACID, METAL)` is only evaluated when an acid particle looks at a metal
//! neighbor. Bidirectional rules are mirrored at registration time.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::MaterialId;

/// What a participant turns into when a reaction fires
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Keep the current material
    #[default]
    Unchanged,
    /// Remove the particle entirely
    Destroy,
    /// Transform in place to another material
    Become(MaterialId),
}

impl Outcome {
    /// Material id this outcome refers to, if any
    pub fn target(&self) -> Option<MaterialId> {
        match self {
            Outcome::Become(id) => Some(*id),
            _ => None,
        }
    }
}

/// Procedural effects that plain type substitution cannot express
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ReactionHook {
    /// Create a particle in the empty cell above the reaction site
    SpawnAbove(MaterialId),
    /// Inject a pressure impulse and heat around the reaction site
    Explode { radius: f32, strength: f32 },
    /// Add heat (degrees) to the reaction site and its orthogonal neighbors
    Heat(f32),
}

/// Definition of a reaction between an initiating particle and its neighbor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionRule {
    /// Human-readable name
    pub name: String,

    /// What the initiating particle becomes
    pub self_becomes: Outcome,
    /// What the neighbor becomes
    pub neighbor_becomes: Outcome,

    /// Probability per tick when conditions are met (0.0 - 1.0)
    pub probability: f32,

    // Conditions, tested against the initiating particle
    pub min_temp: Option<f32>,
    pub max_temp: Option<f32>,
    /// Initiator must currently hold an electrical charge
    pub requires_charge: bool,

    /// Also register the mirrored rule for `(neighbor, self)`
    pub bidirectional: bool,
    /// Only the self side may initiate; the neighbor's reverse rule is skipped
    pub one_way: bool,

    pub hook: Option<ReactionHook>,
}

impl Default for ReactionRule {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            self_becomes: Outcome::Unchanged,
            neighbor_becomes: Outcome::Unchanged,
            probability: 1.0,
            min_temp: None,
            max_temp: None,
            requires_charge: false,
            bidirectional: false,
            one_way: false,
            hook: None,
        }
    }
}

impl ReactionRule {
    /// Check the temperature window (absent bounds are unconstrained)
    pub fn temperature_allows(&self, temperature: f32) -> bool {
        if let Some(min_t) = self.min_temp
            && temperature < min_t
        {
            return false;
        }
        if let Some(max_t) = self.max_temp
            && temperature > max_t
        {
            return false;
        }
        true
    }

    /// Check every non-random gate of the rule
    pub fn conditions_met(&self, temperature: f32, charged: bool) -> bool {
        self.temperature_allows(temperature) && (!self.requires_charge || charged)
    }

    /// Whether firing would change nothing at all
    pub fn is_noop(&self) -> bool {
        self.self_becomes == Outcome::Unchanged
            && self.neighbor_becomes == Outcome::Unchanged
            && self.hook.is_none()
    }

    fn mirrored(&self) -> Self {
        Self {
            name: format!("{}_mirrored", self.name),
            self_becomes: self.neighbor_becomes,
            neighbor_becomes: self.self_becomes,
            bidirectional: false,
            ..self.clone()
        }
    }
}

/// Registry of all reactions with O(1) lookup
///
/// Key: (initiator, neighbor)
#[derive(Clone, Debug, Default)]
pub struct ReactionRegistry {
    rules: AHashMap<(MaterialId, MaterialId), ReactionRule>,
    /// Pairs whose initiator side is blocked by a one-way rule from the other side
    suppressed: AHashSet<(MaterialId, MaterialId)>,
}

impl ReactionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in reactions
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_default_reactions();
        registry
    }

    fn register_default_reactions(&mut self) {
        // Water + Lava → Steam + Stone
        self.register(
            MaterialId::WATER,
            MaterialId::LAVA,
            ReactionRule {
                name: "water_lava_quench".to_string(),
                self_becomes: Outcome::Become(MaterialId::STEAM),
                neighbor_becomes: Outcome::Become(MaterialId::STONE),
                probability: 0.3,
                bidirectional: true,
                ..Default::default()
            },
        );

        // Ice + Lava → Water + Stone
        self.register(
            MaterialId::ICE,
            MaterialId::LAVA,
            ReactionRule {
                name: "ice_lava_quench".to_string(),
                self_becomes: Outcome::Become(MaterialId::WATER),
                neighbor_becomes: Outcome::Become(MaterialId::STONE),
                probability: 0.4,
                bidirectional: true,
                ..Default::default()
            },
        );

        // Acid + Metal → nothing, with fumes
        self.register(
            MaterialId::ACID,
            MaterialId::METAL,
            ReactionRule {
                name: "acid_metal_corrode".to_string(),
                self_becomes: Outcome::Destroy,
                neighbor_becomes: Outcome::Destroy,
                probability: 0.05,
                hook: Some(ReactionHook::SpawnAbove(MaterialId::SMOKE)),
                ..Default::default()
            },
        );

        // Acid eats stone and wood but survives
        self.register(
            MaterialId::ACID,
            MaterialId::STONE,
            ReactionRule {
                name: "acid_stone_corrode".to_string(),
                neighbor_becomes: Outcome::Destroy,
                probability: 0.01,
                ..Default::default()
            },
        );
        self.register(
            MaterialId::ACID,
            MaterialId::WOOD,
            ReactionRule {
                name: "acid_wood_corrode".to_string(),
                neighbor_becomes: Outcome::Destroy,
                probability: 0.03,
                ..Default::default()
            },
        );

        // Salt dissolves into brine
        self.register(
            MaterialId::SALT,
            MaterialId::WATER,
            ReactionRule {
                name: "salt_dissolve".to_string(),
                self_becomes: Outcome::Destroy,
                neighbor_becomes: Outcome::Become(MaterialId::BRINE),
                probability: 0.1,
                bidirectional: true,
                ..Default::default()
            },
        );

        // Plants drink water and spread, but not in hot water
        self.register(
            MaterialId::PLANT,
            MaterialId::WATER,
            ReactionRule {
                name: "plant_grow".to_string(),
                neighbor_becomes: Outcome::Become(MaterialId::PLANT),
                probability: 0.02,
                max_temp: Some(60.0),
                ..Default::default()
            },
        );

        // Charged wire sets off gunpowder
        for conductor in [MaterialId::WIRE, MaterialId::METAL] {
            self.register(
                conductor,
                MaterialId::GUNPOWDER,
                ReactionRule {
                    name: "detonate".to_string(),
                    neighbor_becomes: Outcome::Become(MaterialId::FIRE),
                    requires_charge: true,
                    ..Default::default()
                },
            );
        }

        // Water douses fire; any rule fire holds for water is suppressed
        self.register(
            MaterialId::WATER,
            MaterialId::FIRE,
            ReactionRule {
                name: "douse".to_string(),
                self_becomes: Outcome::Become(MaterialId::STEAM),
                neighbor_becomes: Outcome::Destroy,
                probability: 0.5,
                one_way: true,
                ..Default::default()
            },
        );
    }

    /// Register a rule for `(initiator, neighbor)`
    ///
    /// Bidirectional rules also register the mirrored `(neighbor, initiator)` rule
    /// with outputs swapped. A one-way rule reserves the pair for its initiator,
    /// so it is never mirrored. A later registration for the same key replaces
    /// the earlier one.
    pub fn register(&mut self, initiator: MaterialId, neighbor: MaterialId, rule: ReactionRule) {
        if rule.one_way {
            self.suppressed.insert((neighbor, initiator));
            if rule.bidirectional {
                log::warn!("Reaction `{}` is one-way; not mirroring it", rule.name);
            }
        }
        if rule.bidirectional && !rule.one_way && initiator != neighbor {
            let mirrored = rule.mirrored();
            if self.rules.insert((neighbor, initiator), mirrored).is_some() {
                log::warn!(
                    "Reaction for ({}, {}) replaced by mirror of `{}`",
                    neighbor,
                    initiator,
                    rule.name
                );
            }
        }
        if let Some(previous) = self.rules.insert((initiator, neighbor), rule) {
            log::warn!(
                "Reaction `{}` for ({}, {}) was replaced",
                previous.name,
                initiator,
                neighbor
            );
        }
    }

    /// Rule an initiator may evaluate against this neighbor
    ///
    /// Returns None when no rule exists or when a one-way rule held by the
    /// neighbor reserves the pair for the neighbor's side.
    pub fn rule_for(&self, initiator: MaterialId, neighbor: MaterialId) -> Option<&ReactionRule> {
        if self.suppressed.contains(&(initiator, neighbor)) {
            return None;
        }
        self.rules.get(&(initiator, neighbor))
    }

    /// Find a rule whose deterministic gates pass for the given initiator state
    pub fn find_reaction(
        &self,
        initiator: MaterialId,
        neighbor: MaterialId,
        temperature: f32,
        charged: bool,
    ) -> Option<&ReactionRule> {
        self.rule_for(initiator, neighbor)
            .filter(|rule| rule.conditions_met(temperature, charged))
    }

    /// Iterate over all registered rules with their keys
    pub fn iter(&self) -> impl Iterator<Item = (&(MaterialId, MaterialId), &ReactionRule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
