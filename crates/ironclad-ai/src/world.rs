//! Query and command interfaces the agent core consumes from the host game.
//!
//! The core never owns world geometry, projectiles or weapons. Everything it
//! needs is read through [`GridWorldQuery`] and every side effect leaves
//! through [`CombatSink`].

use crate::grid::GridCell;
use cgmath::{InnerSpace, Vector3};
use ironclad_core::{AgentId, ProjectileId};

/// Axis-aligned playable area on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl WorldBounds {
    pub fn new(min_x: f32, max_x: f32, min_z: f32, max_z: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    /// Whether a position lies inside the bounds, ignoring height.
    pub fn contains(&self, pos: Vector3<f32>) -> bool {
        pos.x >= self.min_x && pos.x <= self.max_x && pos.z >= self.min_z && pos.z <= self.max_z
    }

    /// Clamps a position into the bounds, keeping its height.
    pub fn clamp(&self, pos: Vector3<f32>) -> Vector3<f32> {
        Vector3::new(
            pos.x.clamp(self.min_x, self.max_x),
            pos.y,
            pos.z.clamp(self.min_z, self.max_z),
        )
    }
}

/// A live projectile as reported by the host's spatial query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileHandle {
    pub id: ProjectileId,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub owner: AgentId,
}

/// Resolved state of a target reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSnapshot {
    pub id: AgentId,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub alive: bool,
}

/// Read-only geometry, collision and spatial queries over the host world.
///
/// Implementations must be cheap (O(1) to O(log n) lookups, no I/O) and
/// stable for the duration of one simulation tick.
pub trait GridWorldQuery: Send + Sync {
    /// Edge length of one grid cell in world units.
    fn cell_size(&self) -> f32;

    /// Playable area; agents never move outside it.
    fn bounds(&self) -> WorldBounds;

    /// Whether a tank may occupy `cell`.
    fn is_walkable(&self, cell: GridCell) -> bool;

    /// Whether static geometry or another tank blocks the segment `from -> to`.
    /// Colliders belonging to `excluding` are ignored.
    fn raycast_blocked(&self, from: Vector3<f32>, to: Vector3<f32>, excluding: AgentId) -> bool;

    /// Open distance along `direction` from `origin`, up to `max_distance`.
    ///
    /// The default implementation bisects [`Self::raycast_blocked`]; hosts
    /// with a real physics engine should override it with a single ray query.
    fn probe_distance(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        excluding: AgentId,
    ) -> f32 {
        let dir = if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            return 0.0;
        };
        if !self.raycast_blocked(origin, origin + dir * max_distance, excluding) {
            return max_distance;
        }
        let (mut open, mut blocked) = (0.0_f32, max_distance);
        for _ in 0..8 {
            let mid = (open + blocked) * 0.5;
            if self.raycast_blocked(origin, origin + dir * mid, excluding) {
                blocked = mid;
            } else {
                open = mid;
            }
        }
        open
    }

    /// Live projectiles within `radius` of `point`.
    fn query_projectiles_in_radius(&self, point: Vector3<f32>, radius: f32)
    -> Vec<ProjectileHandle>;

    /// Resolves a target reference; `None` once the target has despawned.
    fn locate(&self, target: AgentId) -> Option<TargetSnapshot>;
}

/// Outgoing commands and notifications to the host's weapon and scoring systems.
pub trait CombatSink: Send + Sync {
    /// Hands a shot to the external projectile system.
    fn fire_weapon(&self, origin: Vector3<f32>, direction: Vector3<f32>, speed: f32, owner: AgentId);

    /// The agent died; it will issue no further commands.
    fn report_death(&self, agent: AgentId);

    /// The agent took damage.
    fn report_damage(&self, agent: AgentId, amount: f32);
}
