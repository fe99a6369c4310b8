//! # A* Pathfinding over the ground grid
//!
//! Classic A* over an 8-connected grid of [`GridCell`]s with a pluggable
//! walkability predicate and per-cell cost weight.
//!
//! ## Features
//!
//! - **8-connected search**: orthogonal steps cost `1`, diagonal steps `√2`,
//!   both multiplied by the destination cell's weight.
//! - **No corner cutting**: a diagonal step is rejected when either flanking
//!   orthogonal cell is blocked.
//! - **Arena nodes**: search nodes live in a `Vec` and link to their parent by
//!   index, so path extraction is a plain walk back through the arena.
//! - **Deterministic ordering**: equal `f` costs prefer the lower `h` cost,
//!   then insertion order.
//!
//! The default heuristic is Manhattan distance. With diagonal moves it is not
//! admissible, so returned paths are not guaranteed shortest; that behaviour is
//! intentional.
//!
//! ## Example Usage
//!
//! ```rust
//! use ironclad_ai::grid::GridCell;
//! use ironclad_ai::pathfinding::{PathPlanner, uniform_cost};
//!
//! let planner = PathPlanner::default();
//! let path = planner.find_path(
//!     GridCell::new(0, 0),
//!     GridCell::new(4, 2),
//!     |c| c.x >= 0 && c.z >= 0 && c.x < 10 && c.z < 10,
//!     uniform_cost,
//! );
//! assert_eq!(path.waypoints().first(), Some(&GridCell::new(0, 0)));
//! assert_eq!(path.waypoints().last(), Some(&GridCell::new(4, 2)));
//! ```

use crate::grid::{GridCell, NEIGHBOUR_OFFSETS};
use crate::world::GridWorldQuery;
use log::debug;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::f32::consts::SQRT_2;

/// Distance estimate used as the A* heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceHeuristic {
    /// Sum of axis distances. Inadmissible with diagonal moves.
    #[default]
    Manhattan,
    /// Largest axis distance.
    Chebyshev,
    /// Exact 8-connected distance on a uniform grid.
    Octile,
}

impl DistanceHeuristic {
    fn estimate(self, from: GridCell, to: GridCell) -> f32 {
        let dx = (from.x - to.x).abs() as f32;
        let dz = (from.z - to.z).abs() as f32;
        match self {
            DistanceHeuristic::Manhattan => dx + dz,
            DistanceHeuristic::Chebyshev => dx.max(dz),
            DistanceHeuristic::Octile => dx.max(dz) + (SQRT_2 - 1.0) * dx.min(dz),
        }
    }
}

/// Node of one A* search, stored in the search arena.
#[derive(Debug, Clone)]
pub struct PathNode {
    pub cell: GridCell,
    /// Cost from the start.
    pub g_cost: f32,
    /// Heuristic cost to the goal.
    pub h_cost: f32,
    /// Arena index of the node this one was reached from.
    pub parent: Option<usize>,
    closed: bool,
}

impl PathNode {
    pub fn f_cost(&self) -> f32 {
        self.g_cost + self.h_cost
    }
}

/// Open-set entry; the heap may hold stale entries for re-opened nodes.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f_cost: f32,
    h_cost: f32,
    g_cost: f32,
    seq: u64,
    index: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                other
                    .h_cost
                    .partial_cmp(&self.h_cost)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Ordered waypoints produced by one search.
///
/// A path is never edited in place; a recompute replaces it wholesale. Only the
/// follow cursor moves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    waypoints: Vec<GridCell>,
    current: usize,
    cost: f32,
}

impl Path {
    pub fn new(waypoints: Vec<GridCell>, cost: f32) -> Self {
        Self {
            waypoints,
            current: 0,
            cost,
        }
    }

    /// The "no path" value.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[GridCell] {
        &self.waypoints
    }

    /// Number of moves between consecutive waypoints.
    pub fn step_count(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }

    /// Accumulated weighted cost of the path.
    pub fn cost(&self) -> f32 {
        self.cost
    }

    pub fn goal(&self) -> Option<GridCell> {
        self.waypoints.last().copied()
    }

    /// Get the current waypoint, if any.
    pub fn current_waypoint(&self) -> Option<GridCell> {
        self.waypoints.get(self.current).copied()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Move to the next waypoint.
    ///
    /// # Returns
    ///
    /// `false` once the last waypoint is already current.
    pub fn advance(&mut self) -> bool {
        if self.current + 1 < self.waypoints.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Whether the cursor sits on the final waypoint (or the path is empty).
    pub fn is_on_last(&self) -> bool {
        self.current + 1 >= self.waypoints.len()
    }
}

/// A* search over an 8-connected grid.
///
/// Each call to [`PathPlanner::find_path`] allocates its own open set and
/// arena; the planner itself holds only settings and can be shared freely.
#[derive(Debug, Clone, Copy)]
pub struct PathPlanner {
    heuristic: DistanceHeuristic,
    /// Upper bound on expanded nodes before the search gives up.
    max_nodes: usize,
}

impl Default for PathPlanner {
    fn default() -> Self {
        Self::new(DistanceHeuristic::Manhattan)
    }
}

impl PathPlanner {
    pub fn new(heuristic: DistanceHeuristic) -> Self {
        Self {
            heuristic,
            max_nodes: 4096,
        }
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes.max(1);
        self
    }

    pub fn heuristic(&self) -> DistanceHeuristic {
        self.heuristic
    }

    /// Find a path from `start` to `goal`.
    ///
    /// # Arguments
    ///
    /// * `start` - Cell the search starts from. It is expanded even if it is
    ///   not itself walkable, so a tank pressed against a wall can still leave.
    /// * `goal` - Target cell; must be walkable.
    /// * `is_walkable` - Walkability predicate.
    /// * `cost` - Per-cell weight applied to steps entering a cell.
    ///
    /// # Returns
    ///
    /// The path including both endpoints, or an empty path when the goal is
    /// unreachable or the node budget ran out.
    pub fn find_path<W, C>(&self, start: GridCell, goal: GridCell, is_walkable: W, cost: C) -> Path
    where
        W: Fn(GridCell) -> bool,
        C: Fn(GridCell) -> f32,
    {
        if !is_walkable(goal) {
            return Path::empty();
        }
        if start == goal {
            return Path::new(vec![start], 0.0);
        }

        let mut nodes: Vec<PathNode> = Vec::new();
        let mut index: HashMap<GridCell, usize> = HashMap::new();
        let mut open = BinaryHeap::new();
        let mut seq = 0_u64;

        let h_start = self.heuristic.estimate(start, goal);
        nodes.push(PathNode {
            cell: start,
            g_cost: 0.0,
            h_cost: h_start,
            parent: None,
            closed: false,
        });
        index.insert(start, 0);
        open.push(OpenEntry {
            f_cost: h_start,
            h_cost: h_start,
            g_cost: 0.0,
            seq,
            index: 0,
        });

        let mut expanded = 0_usize;

        while let Some(entry) = open.pop() {
            let current_index = entry.index;
            let current = &nodes[current_index];
            if current.closed || entry.g_cost > current.g_cost {
                continue;
            }

            let current_cell = current.cell;
            let current_g = current.g_cost;

            // Check if we've reached the goal
            if current_cell == goal {
                return Self::reconstruct_path(&nodes, current_index);
            }

            nodes[current_index].closed = true;
            expanded += 1;
            if expanded > self.max_nodes {
                debug!(
                    "A* gave up after {} nodes ({:?} -> {:?})",
                    self.max_nodes, start, goal
                );
                return Path::empty();
            }

            for (dx, dz) in NEIGHBOUR_OFFSETS {
                let neighbour = current_cell.offset(dx, dz);
                if !is_walkable(neighbour) {
                    continue;
                }

                let diagonal = dx != 0 && dz != 0;
                if diagonal
                    && (!is_walkable(current_cell.offset(dx, 0))
                        || !is_walkable(current_cell.offset(0, dz)))
                {
                    continue;
                }

                let step = if diagonal { SQRT_2 } else { 1.0 };
                let tentative_g = current_g + step * cost(neighbour).max(0.0);

                let neighbour_index = match index.get(&neighbour) {
                    Some(&i) => {
                        let known = &mut nodes[i];
                        if known.closed || tentative_g >= known.g_cost {
                            continue;
                        }
                        known.g_cost = tentative_g;
                        known.parent = Some(current_index);
                        i
                    }
                    None => {
                        let h_cost = self.heuristic.estimate(neighbour, goal);
                        nodes.push(PathNode {
                            cell: neighbour,
                            g_cost: tentative_g,
                            h_cost,
                            parent: Some(current_index),
                            closed: false,
                        });
                        let i = nodes.len() - 1;
                        index.insert(neighbour, i);
                        i
                    }
                };

                seq += 1;
                let node = &nodes[neighbour_index];
                open.push(OpenEntry {
                    f_cost: node.f_cost(),
                    h_cost: node.h_cost,
                    g_cost: node.g_cost,
                    seq,
                    index: neighbour_index,
                });
            }
        }

        Path::empty() // No path found
    }

    /// Walk parent links back from the goal node.
    fn reconstruct_path(nodes: &[PathNode], goal_index: usize) -> Path {
        let mut waypoints = Vec::new();
        let mut cursor = Some(goal_index);
        while let Some(i) = cursor {
            waypoints.push(nodes[i].cell);
            cursor = nodes[i].parent;
        }
        waypoints.reverse();
        Path::new(waypoints, nodes[goal_index].g_cost)
    }
}

/// Constant cell weight of `1.0`.
pub fn uniform_cost(_cell: GridCell) -> f32 {
    1.0
}

/// Cell weight that grows next to obstacles, biasing paths away from walls.
///
/// # Arguments
///
/// * `world` - World to test neighbouring cells against.
/// * `penalty` - Added weight for each cell with at least one blocked neighbour.
pub fn wall_proximity_cost(
    world: &dyn GridWorldQuery,
    penalty: f32,
) -> impl Fn(GridCell) -> f32 + '_ {
    move |cell| {
        if cell.neighbours().any(|n| !world.is_walkable(n)) {
            1.0 + penalty
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    fn open_grid(size: i32) -> impl Fn(GridCell) -> bool {
        move |c| c.x >= 0 && c.z >= 0 && c.x < size && c.z < size
    }

    fn grid_with_walls(size: i32, walls: &[(i32, i32)]) -> impl Fn(GridCell) -> bool {
        let walls: HashSet<GridCell> = walls.iter().map(|&(x, z)| GridCell::new(x, z)).collect();
        move |c| c.x >= 0 && c.z >= 0 && c.x < size && c.z < size && !walls.contains(&c)
    }

    fn assert_no_corner_cutting(path: &Path, walkable: &impl Fn(GridCell) -> bool) {
        for pair in path.waypoints().windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (dx, dz) = (b.x - a.x, b.z - a.z);
            assert!(dx.abs() <= 1 && dz.abs() <= 1, "non-adjacent step {a:?} -> {b:?}");
            if dx != 0 && dz != 0 {
                assert!(
                    walkable(a.offset(dx, 0)) && walkable(a.offset(0, dz)),
                    "diagonal {a:?} -> {b:?} cuts a corner"
                );
            }
        }
    }

    #[test]
    fn test_open_grid_diagonal_is_optimal() {
        let planner = PathPlanner::default();
        let path = planner.find_path(
            GridCell::new(0, 0),
            GridCell::new(9, 9),
            open_grid(10),
            uniform_cost,
        );

        assert_eq!(path.step_count(), 9);
        for pair in path.waypoints().windows(2) {
            assert_eq!(pair[1].x - pair[0].x, 1);
            assert_eq!(pair[1].z - pair[0].z, 1);
        }
        assert_relative_eq!(path.cost(), 9.0 * SQRT_2, epsilon = 1e-4);
    }

    #[test]
    fn test_path_endpoints() {
        let planner = PathPlanner::default();
        let path = planner.find_path(
            GridCell::new(1, 2),
            GridCell::new(7, 3),
            open_grid(10),
            uniform_cost,
        );
        assert_eq!(path.waypoints().first(), Some(&GridCell::new(1, 2)));
        assert_eq!(path.goal(), Some(GridCell::new(7, 3)));
    }

    #[test]
    fn test_start_equals_goal() {
        let planner = PathPlanner::default();
        let path = planner.find_path(
            GridCell::new(3, 3),
            GridCell::new(3, 3),
            open_grid(10),
            uniform_cost,
        );
        assert_eq!(path.waypoints(), &[GridCell::new(3, 3)]);
        assert_eq!(path.step_count(), 0);
    }

    #[test]
    fn test_goal_surrounded_is_unreachable() {
        let walls = [
            (4, 4),
            (5, 4),
            (6, 4),
            (4, 5),
            (6, 5),
            (4, 6),
            (5, 6),
            (6, 6),
        ];
        let walkable = grid_with_walls(10, &walls);
        let planner = PathPlanner::default();
        let path = planner.find_path(GridCell::new(0, 0), GridCell::new(5, 5), walkable, uniform_cost);
        assert!(path.is_empty());
    }

    #[test]
    fn test_blocked_goal_returns_empty() {
        let walkable = grid_with_walls(10, &[(5, 5)]);
        let planner = PathPlanner::default();
        let path = planner.find_path(GridCell::new(0, 0), GridCell::new(5, 5), walkable, uniform_cost);
        assert!(path.is_empty());
    }

    #[test]
    fn test_detours_around_wall_without_cutting_corners() {
        // Vertical wall at x = 4 with a gap at z = 8.
        let walls: Vec<(i32, i32)> = (0..8).map(|z| (4, z)).collect();
        let walkable = grid_with_walls(10, &walls);
        let planner = PathPlanner::default();
        let path = planner.find_path(GridCell::new(1, 1), GridCell::new(8, 1), &walkable, uniform_cost);

        assert!(!path.is_empty());
        assert!(path.waypoints().contains(&GridCell::new(4, 8)));
        assert_no_corner_cutting(&path, &walkable);
    }

    #[test]
    fn test_diagonal_between_two_walls_is_rejected() {
        // Only a diagonal squeeze connects (0,0) to (1,1); both flanks are walls.
        let walkable = |c: GridCell| {
            let inside = c.x >= 0 && c.z >= 0 && c.x < 2 && c.z < 2;
            inside && c != GridCell::new(1, 0) && c != GridCell::new(0, 1)
        };
        let planner = PathPlanner::default();
        let path = planner.find_path(GridCell::new(0, 0), GridCell::new(1, 1), walkable, uniform_cost);
        assert!(path.is_empty());
    }

    #[test]
    fn test_weighted_cells_bias_the_route() {
        // Expensive band through the middle row except at the edges.
        let cost = |c: GridCell| if c.z == 2 && c.x > 0 && c.x < 8 { 10.0 } else { 1.0 };
        let planner = PathPlanner::new(DistanceHeuristic::Octile);
        let path = planner.find_path(GridCell::new(4, 0), GridCell::new(4, 4), open_grid(9), cost);

        assert!(!path.is_empty());
        let crossing = path
            .waypoints()
            .iter()
            .find(|c| c.z == 2)
            .copied()
            .expect("path crosses row 2");
        assert!(crossing.x == 0 || crossing.x == 8);
    }

    #[test]
    fn test_node_budget_exhaustion_returns_empty() {
        let planner = PathPlanner::default().with_max_nodes(3);
        let path = planner.find_path(
            GridCell::new(0, 0),
            GridCell::new(40, 0),
            |_| true,
            uniform_cost,
        );
        assert!(path.is_empty());
    }

    #[test]
    fn test_repeated_searches_are_independent() {
        let planner = PathPlanner::default();
        let first = planner.find_path(GridCell::new(0, 0), GridCell::new(6, 3), open_grid(10), uniform_cost);
        let second = planner.find_path(GridCell::new(0, 0), GridCell::new(6, 3), open_grid(10), uniform_cost);
        assert_eq!(first, second);
    }

    #[test]
    fn test_open_entry_tie_break_prefers_lower_h() {
        let low_h = OpenEntry {
            f_cost: 5.0,
            h_cost: 1.0,
            g_cost: 4.0,
            seq: 2,
            index: 0,
        };
        let high_h = OpenEntry {
            f_cost: 5.0,
            h_cost: 3.0,
            g_cost: 2.0,
            seq: 1,
            index: 1,
        };
        let mut heap = BinaryHeap::new();
        heap.push(high_h);
        heap.push(low_h);
        assert_eq!(heap.pop().map(|e| e.index), Some(0));
    }

    #[test]
    fn test_path_cursor() {
        let mut path = Path::new(
            vec![GridCell::new(0, 0), GridCell::new(1, 0), GridCell::new(2, 0)],
            2.0,
        );
        assert_eq!(path.current_waypoint(), Some(GridCell::new(0, 0)));
        assert!(path.advance());
        assert!(path.advance());
        assert!(path.is_on_last());
        assert!(!path.advance());
        assert_eq!(path.current_waypoint(), Some(GridCell::new(2, 0)));
    }

    #[test]
    fn test_heuristics() {
        let a = GridCell::new(0, 0);
        let b = GridCell::new(3, 1);
        assert_eq!(DistanceHeuristic::Manhattan.estimate(a, b), 4.0);
        assert_eq!(DistanceHeuristic::Chebyshev.estimate(a, b), 3.0);
        assert_relative_eq!(DistanceHeuristic::Octile.estimate(a, b), 2.0 + SQRT_2);
    }
}
