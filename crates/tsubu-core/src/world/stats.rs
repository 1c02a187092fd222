//! Simulation statistics collection trait

use serde::{Deserialize, Serialize};

/// Trait for collecting simulation statistics
///
/// Subsystems report events here without knowing how (or whether) they are
/// aggregated.
pub trait SimStats {
    /// Record that a particle was moved by the behavior engine
    fn record_particle_moved(&mut self);

    /// Record that a state change occurred (e.g., melting, freezing, ignition)
    fn record_state_change(&mut self);

    /// Record that a neighbor reaction fired
    fn record_reaction(&mut self);

    /// Record that a charge marker reached a new particle
    fn record_charge_propagated(&mut self);

    /// Record a kinetic collision between two moving particles
    fn record_collision(&mut self);
}

/// A no-op implementation for when stats collection is not needed
#[derive(Default)]
pub struct NoopStats;

impl SimStats for NoopStats {
    fn record_particle_moved(&mut self) {}
    fn record_state_change(&mut self) {}
    fn record_reaction(&mut self) {}
    fn record_charge_propagated(&mut self) {}
    fn record_collision(&mut self) {}
}

/// Plain event counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickCounters {
    pub particles_moved: u64,
    pub state_changes: u64,
    pub reactions: u64,
    pub charges_propagated: u64,
    pub collisions: u64,
}

impl TickCounters {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl SimStats for TickCounters {
    fn record_particle_moved(&mut self) {
        self.particles_moved += 1;
    }

    fn record_state_change(&mut self) {
        self.state_changes += 1;
    }

    fn record_reaction(&mut self) {
        self.reactions += 1;
    }

    fn record_charge_propagated(&mut self) {
        self.charges_propagated += 1;
    }

    fn record_collision(&mut self) {
        self.collisions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_stats_all_methods() {
        let mut stats = NoopStats;

        // No-op implementation should not track any state, just pass through
        for _ in 0..100 {
            stats.record_particle_moved();
            stats.record_state_change();
            stats.record_reaction();
            stats.record_charge_propagated();
            stats.record_collision();
        }
    }

    #[test]
    fn test_tick_counters() {
        let mut stats = TickCounters::default();

        stats.record_particle_moved();
        stats.record_particle_moved();
        stats.record_state_change();
        stats.record_reaction();
        stats.record_reaction();
        stats.record_reaction();

        assert_eq!(stats.particles_moved, 2);
        assert_eq!(stats.state_changes, 1);
        assert_eq!(stats.reactions, 3);

        stats.reset();
        assert_eq!(stats, TickCounters::default());
    }
}
