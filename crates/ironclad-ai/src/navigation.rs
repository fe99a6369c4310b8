//! Path following and the no-path fallback chain.
//!
//! A [`Navigator`] owns one agent's current [`Path`] and decides when to plan
//! again. Planning never fails outright: when the exact goal is unreachable it
//! tries the cells around it, then the nearest walkable cell, and finally
//! settles for straight-line movement until the next scheduled recompute.

use crate::grid::GridCell;
use crate::pathfinding::{DistanceHeuristic, Path, PathPlanner, uniform_cost, wall_proximity_cost};
use crate::world::GridWorldQuery;
use cgmath::Vector3;
use ironclad_core::AgentConfig;
use ironclad_core::math::{flatten, normalize_or_zero, planar_distance};
use log::debug;

/// Result of one planning attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// Path to the requested goal cell.
    Exact(Path),
    /// Path to a cell on the ring directly around the goal.
    Alternate(Path),
    /// Path to the nearest walkable cell found by a wider ring search.
    NearestWalkable(Path),
    /// Nothing reachable; move in a straight line.
    Direct,
}

impl PlanOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            PlanOutcome::Exact(path)
            | PlanOutcome::Alternate(path)
            | PlanOutcome::NearestWalkable(path) => Some(path),
            PlanOutcome::Direct => None,
        }
    }

    pub fn into_path(self) -> Option<Path> {
        match self {
            PlanOutcome::Exact(path)
            | PlanOutcome::Alternate(path)
            | PlanOutcome::NearestWalkable(path) => Some(path),
            PlanOutcome::Direct => None,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, PlanOutcome::Direct)
    }
}

/// Flags an agent whose net displacement over a check interval stays tiny.
#[derive(Debug, Clone, Copy, Default)]
pub struct StuckDetector {
    anchor: Option<Vector3<f32>>,
    elapsed: f32,
}

impl StuckDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the current position.
    ///
    /// # Returns
    ///
    /// `true` once per check interval when the agent moved less than the
    /// configured epsilon since the previous check.
    pub fn sample(&mut self, position: Vector3<f32>, dt: f32, config: &AgentConfig) -> bool {
        let Some(anchor) = self.anchor else {
            self.reset(position);
            return false;
        };

        self.elapsed += dt;
        if self.elapsed < config.stuck_check_interval {
            return false;
        }

        let moved = planar_distance(anchor, position);
        self.reset(position);
        moved < config.stuck_epsilon
    }

    /// Restarts the check window at `position`.
    pub fn reset(&mut self, position: Vector3<f32>) {
        self.anchor = Some(position);
        self.elapsed = 0.0;
    }
}

/// Per-agent path following with rate-limited recomputation.
#[derive(Debug, Clone)]
pub struct Navigator {
    heuristic: DistanceHeuristic,
    /// Current path; replaced wholesale on every recompute.
    path: Path,
    /// Goal the current path (or direct mode) was planned for.
    goal: Option<Vector3<f32>>,
    /// Straight-line mode after every planning fallback failed.
    direct: bool,
    /// Time since the last planning attempt.
    time_since_plan: f32,
    /// Whether the planner is used at all; direct steering otherwise.
    use_planner: bool,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Navigator {
    pub fn new(use_planner: bool) -> Self {
        Self {
            heuristic: DistanceHeuristic::default(),
            path: Path::empty(),
            goal: None,
            direct: !use_planner,
            time_since_plan: 0.0,
            use_planner,
        }
    }

    pub fn with_heuristic(mut self, heuristic: DistanceHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn goal(&self) -> Option<Vector3<f32>> {
        self.goal
    }

    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// Drops the current path and goal.
    pub fn discard_path(&mut self) {
        self.path = Path::empty();
        self.goal = None;
        self.direct = !self.use_planner;
    }

    /// Makes the next [`Navigator::steer`] call plan again.
    pub fn force_recompute(&mut self) {
        self.discard_path();
        self.time_since_plan = f32::MAX;
    }

    /// Stops path following without scheduling a recompute.
    pub fn halt(&mut self) {
        self.path = Path::empty();
        self.direct = !self.use_planner;
    }

    /// Plans a path from `from` towards `goal`, walking the fallback chain.
    pub fn plan(
        &self,
        world: &dyn GridWorldQuery,
        from: Vector3<f32>,
        goal: Vector3<f32>,
        config: &AgentConfig,
    ) -> PlanOutcome {
        let cell_size = world.cell_size();
        let start = GridCell::from_world(from, cell_size);
        let goal_cell = GridCell::from_world(goal, cell_size);
        let planner = PathPlanner::new(self.heuristic).with_max_nodes(config.max_search_nodes);

        let penalty = config.wall_proximity_penalty;
        let wall_cost = wall_proximity_cost(world, penalty);
        let cost = |cell: GridCell| {
            if penalty > 0.0 {
                wall_cost(cell)
            } else {
                uniform_cost(cell)
            }
        };
        let walkable = |cell: GridCell| world.is_walkable(cell);
        let search = |target: GridCell| planner.find_path(start, target, walkable, cost);

        let exact = search(goal_cell);
        if !exact.is_empty() {
            return PlanOutcome::Exact(exact);
        }

        for candidate in goal_cell.ring(1) {
            if !world.is_walkable(candidate) {
                continue;
            }
            let path = search(candidate);
            if !path.is_empty() {
                debug!("No path to {goal_cell:?}, using alternate {candidate:?}");
                return PlanOutcome::Alternate(path);
            }
        }

        if let Some(nearest) = nearest_walkable(world, goal_cell, config.fallback_search_radius) {
            let path = search(nearest);
            if !path.is_empty() {
                debug!("No path to {goal_cell:?}, using nearest walkable {nearest:?}");
                return PlanOutcome::NearestWalkable(path);
            }
        }

        debug!("No path to {goal_cell:?} from {start:?}, moving directly");
        PlanOutcome::Direct
    }

    /// Advances path following towards `goal`.
    ///
    /// Plans immediately after [`Navigator::force_recompute`] or when the path
    /// runs out, otherwise at most once per `path_recompute_interval`.
    ///
    /// # Returns
    ///
    /// The unit ground-plane direction to move in, or `None` once within the
    /// arrival radius of the goal.
    pub fn steer(
        &mut self,
        world: &dyn GridWorldQuery,
        position: Vector3<f32>,
        goal: Vector3<f32>,
        config: &AgentConfig,
        dt: f32,
    ) -> Option<Vector3<f32>> {
        if planar_distance(position, goal) <= config.arrival_radius {
            return None;
        }

        self.time_since_plan += dt;

        if self.use_planner {
            // A moving goal is picked up at the next scheduled recompute.
            let exhausted = !self.direct && self.path.is_empty();
            let due = self.time_since_plan >= config.path_recompute_interval;

            if self.goal.is_none() || exhausted || due {
                let outcome = self.plan(world, position, goal, config);
                self.direct = outcome.is_direct();
                self.path = outcome.into_path().unwrap_or_default();
                // First waypoint is the cell we stand in.
                self.path.advance();
                self.time_since_plan = 0.0;
            }
        }
        self.goal = Some(goal);

        if self.direct {
            return Some(normalize_or_zero(flatten(goal - position)));
        }

        let cell_size = world.cell_size();
        while let Some(waypoint) = self.path.current_waypoint() {
            let reached = planar_distance(position, waypoint.to_world(cell_size)) <= config.waypoint_radius;
            if !reached || !self.path.advance() {
                break;
            }
        }

        let aim = match self.path.current_waypoint() {
            // The last waypoint is a cell centre; finish on the real goal.
            Some(_) if self.path.is_on_last() => goal,
            Some(waypoint) => waypoint.to_world(cell_size),
            None => goal,
        };
        Some(normalize_or_zero(flatten(aim - position)))
    }
}

/// Closest walkable cell to `goal` within `radius` rings, skipping ring 1.
fn nearest_walkable(world: &dyn GridWorldQuery, goal: GridCell, radius: i32) -> Option<GridCell> {
    (2..=radius).find_map(|r| {
        goal.ring(r)
            .into_iter()
            .filter(|&cell| world.is_walkable(cell))
            .min_by_key(|cell| {
                let (dx, dz) = (cell.x - goal.x, cell.z - goal.z);
                (dx * dx + dz * dz, *cell)
            })
    })
}
