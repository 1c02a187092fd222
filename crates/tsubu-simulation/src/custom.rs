//! Custom motion functions for materials outside the standard categories

use std::fmt;

use ahash::AHashMap;
use glam::IVec2;

use crate::particle::{Scratch, scratch_slot};

/// View of the world handed to a custom motion function
///
/// Offsets are relative to the moving particle. `try_move` performs at most
/// one successful move per call sequence; later calls after a success return
/// false.
pub trait MotionContext {
    /// Current grid position of the particle
    fn position(&self) -> IVec2;

    /// Whether the cell at the offset is inside the grid and empty
    fn is_empty(&self, dx: i32, dy: i32) -> bool;

    /// Attempt to move by the offset; true when the particle moved
    fn try_move(&mut self, dx: i32, dy: i32) -> bool;

    /// Scratch slots of the moving particle
    fn scratch(&mut self) -> &mut Scratch;

    fn random_bool(&mut self) -> bool;

    /// Uniform value in [0, 1)
    fn random_f32(&mut self) -> f32;
}

/// Motion function signature
pub type CustomMotionFn = fn(&mut dyn MotionContext);

/// Named motion function
#[derive(Clone, Copy)]
pub struct CustomBehavior {
    name: &'static str,
    motion: CustomMotionFn,
}

impl CustomBehavior {
    pub const fn new(name: &'static str, motion: CustomMotionFn) -> Self {
        Self { name, motion }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the motion function once
    pub fn run(&self, ctx: &mut dyn MotionContext) {
        (self.motion)(ctx);
    }
}

impl PartialEq for CustomBehavior {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for CustomBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomBehavior").field(&self.name).finish()
    }
}

/// Lookup table used to resolve behavior names in material files
#[derive(Clone, Debug, Default)]
pub struct CustomBehaviorTable {
    behaviors: AHashMap<&'static str, CustomBehavior>,
}

impl CustomBehaviorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with `flicker` and `drift`
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.register(CustomBehavior::new("flicker", flicker));
        table.register(CustomBehavior::new("drift", drift));
        table
    }

    pub fn register(&mut self, behavior: CustomBehavior) {
        self.behaviors.insert(behavior.name, behavior);
    }

    pub fn get(&self, name: &str) -> Option<CustomBehavior> {
        self.behaviors.get(name).copied()
    }
}

/// Flames lick upward and sideways, often staying put
fn flicker(ctx: &mut dyn MotionContext) {
    if ctx.random_f32() < 0.3 {
        return;
    }
    let dx = if ctx.random_f32() < 0.5 {
        0
    } else if ctx.random_bool() {
        1
    } else {
        -1
    };
    if !ctx.try_move(dx, 1) {
        ctx.try_move(dx, 0);
    }
}

/// Clouds wander along a heading kept in the state slot
fn drift(ctx: &mut dyn MotionContext) {
    let mut heading = ctx.scratch().get(scratch_slot::STATE).signum();
    if heading == 0 || ctx.random_f32() < 0.25 {
        heading = if ctx.random_bool() { 1 } else { -1 };
    }
    let dy = i32::from(ctx.random_bool());
    if !ctx.try_move(heading, dy) && !ctx.try_move(heading, 0) {
        heading = -heading;
    }
    ctx.scratch().set(scratch_slot::STATE, heading);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OpenSky {
        position: IVec2,
        scratch: Scratch,
        moved: bool,
        floor_only: bool,
        value: f32,
    }

    impl MotionContext for OpenSky {
        fn position(&self) -> IVec2 {
            self.position
        }

        fn is_empty(&self, _dx: i32, dy: i32) -> bool {
            !(self.floor_only && dy != 0)
        }

        fn try_move(&mut self, dx: i32, dy: i32) -> bool {
            if self.moved || !self.is_empty(dx, dy) {
                return false;
            }
            self.position += IVec2::new(dx, dy);
            self.moved = true;
            true
        }

        fn scratch(&mut self) -> &mut Scratch {
            &mut self.scratch
        }

        fn random_bool(&mut self) -> bool {
            true
        }

        fn random_f32(&mut self) -> f32 {
            self.value
        }
    }

    fn sky(value: f32) -> OpenSky {
        OpenSky {
            position: IVec2::new(5, 5),
            scratch: Scratch::default(),
            moved: false,
            floor_only: false,
            value,
        }
    }

    #[test]
    fn test_flicker_rises() {
        let mut ctx = sky(0.4);
        CustomBehaviorTable::builtin()
            .get("flicker")
            .unwrap()
            .run(&mut ctx);
        assert_eq!(ctx.position, IVec2::new(5, 6));
    }

    #[test]
    fn test_flicker_can_rest() {
        let mut ctx = sky(0.1);
        CustomBehavior::new("flicker", flicker).run(&mut ctx);
        assert_eq!(ctx.position, IVec2::new(5, 5));
    }

    #[test]
    fn test_drift_keeps_heading() {
        let mut ctx = sky(0.9);
        ctx.floor_only = true;
        ctx.scratch.set(scratch_slot::STATE, -1);

        CustomBehavior::new("drift", drift).run(&mut ctx);
        assert_eq!(ctx.position, IVec2::new(4, 5));
        assert_eq!(ctx.scratch.get(scratch_slot::STATE), -1);
    }

    #[test]
    fn test_unknown_behavior_is_absent() {
        assert!(CustomBehaviorTable::builtin().get("teleport").is_none());
    }
}
