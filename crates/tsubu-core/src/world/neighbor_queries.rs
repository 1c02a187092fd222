//! Neighbor and visitation-order utilities

use glam::IVec2;

use super::{Grid, WorldRng};

/// Orthogonal offsets: up, right, down, left
pub const ORTHOGONAL: [IVec2; 4] = [
    IVec2::new(0, 1),
    IVec2::new(1, 0),
    IVec2::new(0, -1),
    IVec2::new(-1, 0),
];

/// Neighbor query utilities - stateless methods over the grid
pub struct NeighborQueries;

impl NeighborQueries {
    /// Orthogonal offsets in a random order (Fisher-Yates)
    pub fn shuffled_orthogonal<R: WorldRng + ?Sized>(rng: &mut R) -> [IVec2; 4] {
        let mut order = ORTHOGONAL;
        for i in (1..order.len()).rev() {
            let j = rng.gen_range_usize(i + 1);
            order.swap(i, j);
        }
        order
    }

    /// Occupied cells within `radius` (Chebyshev) of `center`, center excluded
    pub fn count_occupied(grid: &Grid, center: IVec2, radius: i32) -> usize {
        let mut count = 0;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if grid.get(center + IVec2::new(dx, dy)).is_some() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Whether any orthogonal neighbor satisfies `predicate`
    pub fn any_orthogonal<F>(grid: &Grid, center: IVec2, mut predicate: F) -> bool
    where
        F: FnMut(&crate::simulation::Particle) -> bool,
    {
        ORTHOGONAL
            .iter()
            .filter_map(|offset| grid.get(center + *offset))
            .any(|p| predicate(p))
    }

    /// Visit order for one tick: rows bottom to top, row direction
    /// alternating per row and flipping every tick
    pub fn visit_order(width: i32, height: i32, tick: u64) -> impl Iterator<Item = IVec2> {
        (0..height).flat_map(move |y| {
            let reverse = (y as u64 + tick) % 2 == 1;
            (0..width).map(move |i| {
                let x = if reverse { width - 1 - i } else { i };
                IVec2::new(x, y)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{MaterialId, Particle};

    struct CountingRng(usize);

    impl WorldRng for CountingRng {
        fn gen_bool(&mut self) -> bool {
            true
        }

        fn gen_f32(&mut self) -> f32 {
            0.0
        }

        fn gen_range_usize(&mut self, _upper: usize) -> usize {
            self.0 += 1;
            0
        }
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = CountingRng(0);
        let order = NeighborQueries::shuffled_orthogonal(&mut rng);

        assert_eq!(rng.0, 3);
        for offset in ORTHOGONAL {
            assert!(order.contains(&offset));
        }
    }

    #[test]
    fn test_visit_order_alternates() {
        let tick0: Vec<IVec2> = NeighborQueries::visit_order(3, 2, 0).collect();
        assert_eq!(tick0.len(), 6);
        assert_eq!(tick0[0], IVec2::new(0, 0));
        assert_eq!(tick0[3], IVec2::new(2, 1));

        let tick1: Vec<IVec2> = NeighborQueries::visit_order(3, 2, 1).collect();
        assert_eq!(tick1[0], IVec2::new(2, 0));
        assert_eq!(tick1[3], IVec2::new(0, 1));
    }

    #[test]
    fn test_count_occupied() {
        let mut grid = Grid::new(5, 5);
        for pos in [IVec2::new(1, 1), IVec2::new(2, 1), IVec2::new(4, 4)] {
            grid.set(pos, Particle::new(pos, MaterialId::SAND, 20.0))
                .unwrap();
        }

        assert_eq!(NeighborQueries::count_occupied(&grid, IVec2::new(2, 2), 1), 2);
        assert_eq!(NeighborQueries::count_occupied(&grid, IVec2::new(2, 2), 2), 3);
    }
}
