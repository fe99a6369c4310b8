//! Static arena geometry and the per-tick world view handed to agents.

use cgmath::Vector3;
use ironclad_ai::grid::GridCell;
use ironclad_ai::world::{GridWorldQuery, ProjectileHandle, TargetSnapshot, WorldBounds};
use ironclad_core::AgentId;
use ironclad_core::math::planar_distance;
use rand::Rng;
use std::collections::HashSet;

/// Spacing of the samples taken along a raycast, in cells.
const RAY_STEP: f32 = 0.25;

/// Square occupancy grid centred on the origin.
#[derive(Debug, Clone)]
pub struct ArenaMap {
    cell_size: f32,
    /// Cells from the centre to the edge.
    half_extent: i32,
    walls: HashSet<GridCell>,
}

impl ArenaMap {
    pub fn new(cell_size: f32, half_extent: i32) -> Self {
        Self {
            cell_size,
            half_extent,
            walls: HashSet::new(),
        }
    }

    /// Scatters short wall segments, keeping a clear area around the centre.
    pub fn with_random_walls<R: Rng>(mut self, segments: usize, rng: &mut R) -> Self {
        let reach = self.half_extent - 2;
        if reach <= 3 {
            return self;
        }
        for _ in 0..segments {
            let x = rng.random_range(-reach..=reach);
            let z = rng.random_range(-reach..=reach);
            let length = rng.random_range(2..=5);
            let horizontal = rng.random_bool(0.5);
            for i in 0..length {
                let cell = if horizontal {
                    GridCell::new(x + i, z)
                } else {
                    GridCell::new(x, z + i)
                };
                if cell.chebyshev_distance(GridCell::new(0, 0)) > 2 {
                    self.add_wall(cell);
                }
            }
        }
        self
    }

    pub fn add_wall(&mut self, cell: GridCell) {
        if self.in_bounds(cell) {
            self.walls.insert(cell);
        }
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn bounds(&self) -> WorldBounds {
        let edge = self.half_extent as f32 * self.cell_size;
        WorldBounds::new(-edge, edge, -edge, edge)
    }

    fn in_bounds(&self, cell: GridCell) -> bool {
        cell.x.abs() <= self.half_extent && cell.z.abs() <= self.half_extent
    }

    pub fn is_open(&self, cell: GridCell) -> bool {
        self.in_bounds(cell) && !self.walls.contains(&cell)
    }

    /// Whether any wall lies on the ground-plane segment `from -> to`.
    pub fn segment_blocked(&self, from: Vector3<f32>, to: Vector3<f32>) -> bool {
        let length = planar_distance(from, to);
        let steps = (length / (RAY_STEP * self.cell_size)).ceil().max(1.0) as usize;
        (1..=steps).any(|i| {
            let point = from + (to - from) * (i as f32 / steps as f32);
            !self.is_open(GridCell::from_world(point, self.cell_size))
        })
    }

    /// Open cell closest to `preferred`, searched ring by ring.
    pub fn nearest_open(&self, preferred: GridCell) -> Option<GridCell> {
        if self.is_open(preferred) {
            return Some(preferred);
        }
        (1..=self.half_extent * 2).find_map(|r| {
            preferred
                .ring(r)
                .into_iter()
                .find(|&cell| self.is_open(cell))
        })
    }
}

/// Read-only view of one tick: the static map plus where everything is.
#[derive(Debug)]
pub struct WorldView<'a> {
    pub map: &'a ArenaMap,
    pub tanks: Vec<TargetSnapshot>,
    pub projectiles: Vec<ProjectileHandle>,
}

impl GridWorldQuery for WorldView<'_> {
    fn cell_size(&self) -> f32 {
        self.map.cell_size()
    }

    fn bounds(&self) -> WorldBounds {
        self.map.bounds()
    }

    fn is_walkable(&self, cell: GridCell) -> bool {
        self.map.is_open(cell)
    }

    fn raycast_blocked(&self, from: Vector3<f32>, to: Vector3<f32>, _excluding: AgentId) -> bool {
        self.map.segment_blocked(from, to)
    }

    fn query_projectiles_in_radius(&self, point: Vector3<f32>, radius: f32) -> Vec<ProjectileHandle> {
        self.projectiles
            .iter()
            .filter(|p| planar_distance(p.position, point) <= radius)
            .copied()
            .collect()
    }

    fn locate(&self, target: AgentId) -> Option<TargetSnapshot> {
        self.tanks.iter().find(|t| t.id == target).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_edges_are_closed() {
        let map = ArenaMap::new(1.0, 5);
        assert!(map.is_open(GridCell::new(5, -5)));
        assert!(!map.is_open(GridCell::new(6, 0)));
    }

    #[test]
    fn test_segment_through_wall_is_blocked() {
        let mut map = ArenaMap::new(1.0, 10);
        map.add_wall(GridCell::new(2, 0));
        let from = Vector3::new(0.0, 1.0, 0.0);
        assert!(map.segment_blocked(from, Vector3::new(5.0, 1.0, 0.0)));
        assert!(!map.segment_blocked(from, Vector3::new(0.0, 1.0, 5.0)));
    }

    #[test]
    fn test_random_walls_spare_the_centre() {
        let mut rng = StdRng::seed_from_u64(4);
        let map = ArenaMap::new(1.0, 20).with_random_walls(30, &mut rng);
        assert!(map.wall_count() > 0);
        for x in -2..=2 {
            for z in -2..=2 {
                assert!(map.is_open(GridCell::new(x, z)));
            }
        }
    }

    #[test]
    fn test_nearest_open_skips_walls() {
        let mut map = ArenaMap::new(1.0, 10);
        map.add_wall(GridCell::new(3, 3));
        let cell = map.nearest_open(GridCell::new(3, 3)).expect("open neighbour");
        assert_eq!(cell.chebyshev_distance(GridCell::new(3, 3)), 1);
    }

    #[test]
    fn test_view_locates_tanks() {
        let map = ArenaMap::new(1.0, 10);
        let view = WorldView {
            map: &map,
            tanks: vec![TargetSnapshot {
                id: AgentId(0),
                position: Vector3::new(1.0, 0.0, 1.0),
                velocity: Vector3::new(0.0, 0.0, 0.0),
                alive: true,
            }],
            projectiles: Vec::new(),
        };
        assert!(view.locate(AgentId(0)).is_some());
        assert!(view.locate(AgentId(9)).is_none());
    }
}
