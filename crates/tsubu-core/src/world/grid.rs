//! Fixed-size particle grid

use glam::IVec2;

use crate::error::{SimError, SimResult};
use crate::simulation::{Particle, particle_flags};

/// 2D array of optional particle slots
///
/// Invariant: a particle stored in a slot always carries that slot's
/// coordinates. Every mutation here keeps `Particle::position` in sync.
#[derive(Clone, Debug)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Option<Particle>>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.min(i32::MAX as u32) as i32;
        let height = height.min(i32::MAX as u32) as i32;
        Self {
            width,
            height,
            cells: vec![None; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: IVec2) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Flat index of an in-bounds position
    #[inline]
    pub fn index(&self, pos: IVec2) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }

    /// Position of a flat index
    #[inline]
    pub fn position(&self, index: usize) -> IVec2 {
        let width = self.width as usize;
        IVec2::new((index % width) as i32, (index / width) as i32)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, pos: IVec2) -> Option<&Particle> {
        self.index(pos).and_then(|i| self.cells[i].as_ref())
    }

    pub fn get_mut(&mut self, pos: IVec2) -> Option<&mut Particle> {
        self.index(pos).and_then(|i| self.cells[i].as_mut())
    }

    /// In bounds and unoccupied
    pub fn is_vacant(&self, pos: IVec2) -> bool {
        self.index(pos).is_some_and(|i| self.cells[i].is_none())
    }

    /// Write a particle into a slot, replacing any occupant
    pub fn set(&mut self, pos: IVec2, mut particle: Particle) -> SimResult<()> {
        let index = self.checked_index(pos)?;
        particle.position = pos;
        self.cells[index] = Some(particle);
        Ok(())
    }

    /// Write a particle into an empty slot
    pub fn insert(&mut self, pos: IVec2, particle: Particle) -> SimResult<()> {
        let index = self.checked_index(pos)?;
        if self.cells[index].is_some() {
            return Err(SimError::SlotOccupied { x: pos.x, y: pos.y });
        }
        self.set(pos, particle)
    }

    /// Remove and return the occupant of a slot
    pub fn clear(&mut self, pos: IVec2) -> Option<Particle> {
        self.index(pos).and_then(|i| self.cells[i].take())
    }

    /// Move a particle into an empty slot
    ///
    /// Fails without touching either slot when the source is empty or the
    /// destination is occupied or out of bounds.
    pub fn move_particle(&mut self, from: IVec2, to: IVec2) -> SimResult<()> {
        let src = self.checked_index(from)?;
        let dst = self.checked_index(to)?;
        if self.cells[src].is_none() {
            return Err(SimError::EmptySlot {
                x: from.x,
                y: from.y,
            });
        }
        if self.cells[dst].is_some() {
            return Err(SimError::SlotOccupied { x: to.x, y: to.y });
        }
        let mut particle = self.cells[src].take();
        if let Some(p) = particle.as_mut() {
            p.position = to;
        }
        self.cells[dst] = particle;
        Ok(())
    }

    /// Exchange the contents of two slots (either may be empty)
    pub fn swap(&mut self, a: IVec2, b: IVec2) -> SimResult<()> {
        let ia = self.checked_index(a)?;
        let ib = self.checked_index(b)?;
        self.cells.swap(ia, ib);
        if let Some(p) = self.cells[ia].as_mut() {
            p.position = a;
        }
        if let Some(p) = self.cells[ib].as_mut() {
            p.position = b;
        }
        Ok(())
    }

    /// Drop the flags that only live for one tick
    pub fn clear_tick_flags(&mut self) {
        for particle in self.cells.iter_mut().flatten() {
            particle.clear_flag(particle_flags::PER_TICK);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.cells.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.cells.iter_mut().flatten()
    }

    /// Positions of all occupied slots in index order
    pub fn occupied_positions(&self) -> Vec<IVec2> {
        self.iter().map(|p| p.position).collect()
    }

    pub fn particle_count(&self) -> usize {
        self.iter().count()
    }

    /// Verify that every particle's stored position matches its slot
    pub fn check_consistency(&self) -> SimResult<()> {
        for (index, slot) in self.cells.iter().enumerate() {
            if let Some(particle) = slot {
                let pos = self.position(index);
                if particle.position != pos {
                    return Err(SimError::Inconsistent {
                        x: pos.x,
                        y: pos.y,
                        stored_x: particle.position.x,
                        stored_y: particle.position.y,
                    });
                }
            }
        }
        Ok(())
    }

    fn checked_index(&self, pos: IVec2) -> SimResult<usize> {
        self.index(pos)
            .ok_or(SimError::OutOfBounds { x: pos.x, y: pos.y })
    }
}
