use crate::avoidance::EvasionSide;
use crate::states::AgentState;
use cgmath::Vector3;
use ironclad_core::{AgentId, Dt, ProjectileId};

/// Read-only copy of an agent's internals, taken by [`Agent::snapshot`](crate::agent::Agent::snapshot).
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub state: AgentState,
    pub previous_state: Option<AgentState>,
    pub time_in_state: Dt,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub body_yaw: f32,
    pub turret_yaw: f32,
    pub health: f32,
    pub max_health: f32,
    pub target: Option<AgentId>,
    pub target_distance: Option<f32>,
    pub has_line_of_sight: bool,
    /// Projectile the agent is currently reacting to.
    pub threat: Option<ProjectileId>,
    pub evasion_side: Option<EvasionSide>,
    pub path_len: usize,
    pub path_index: usize,
    /// Straight-line movement after every path fallback failed.
    pub direct_navigation: bool,
    pub patrol_target: Option<Vector3<f32>>,
    /// Seconds until the weapon is ready.
    pub fire_ready_in: f32,
}

impl std::fmt::Display for AgentSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] hp {:.0}/{:.0} at ({:.1}, {:.1})",
            self.id, self.state, self.health, self.max_health, self.position.x, self.position.z
        )?;
        if let Some(target) = self.target {
            write!(f, " -> {target}")?;
            if let Some(distance) = self.target_distance {
                write!(f, " {distance:.1}m")?;
            }
            if self.has_line_of_sight {
                write!(f, " (los)")?;
            }
        }
        if let Some(threat) = self.threat {
            write!(f, " evading {threat}")?;
        }
        if self.path_len > 0 {
            write!(f, " path {}/{}", self.path_index + 1, self.path_len)?;
        } else if self.direct_navigation {
            write!(f, " direct")?;
        }
        Ok(())
    }
}
