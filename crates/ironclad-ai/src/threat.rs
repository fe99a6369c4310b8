//! Incoming projectile prediction and ranking.
//!
//! Prediction treats the agent as stationary and works on the ground plane.
//! A projectile qualifies as a threat when any of three tests passes:
//!
//! - its predicted closest approach falls inside the safety margin,
//! - it is close and flying almost straight at the agent,
//! - it will arrive very soon and is at least roughly aimed at the agent.
//!
//! The last two overlap with the first on purpose; they trigger a reaction
//! before the closest-approach prediction settles.

use crate::world::ProjectileHandle;
use cgmath::{InnerSpace, Vector3};
use ironclad_core::math::flatten;
use ironclad_core::{AgentConfig, AgentId, EPSILON, ProjectileId};

/// Projectiles slower than this cannot be predicted and are ignored.
pub const DEGENERATE_SPEED: f32 = 0.01;

/// Alignment below which a projectile is considered to be moving away.
pub const RECEDING_ALIGNMENT: f32 = -0.1;

const SCORE_EPSILON: f32 = 1e-3;

/// A projectile assessed as dangerous during one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreatRecord {
    pub projectile: ProjectileId,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    /// Cosine between the flight direction and the direction to the agent.
    pub alignment: f32,
    /// Predicted minimum distance between projectile and agent.
    pub closest_approach: f32,
    /// Current ground-plane distance.
    pub distance: f32,
    /// Distance divided by speed.
    pub time_to_impact: f32,
    /// Ranking score; smaller is more dangerous.
    pub score: f32,
}

/// Scans nearby projectiles and keeps the throttle timer for scanning.
#[derive(Debug, Clone, Copy)]
pub struct ThreatAssessor {
    since_scan: f32,
}

impl Default for ThreatAssessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreatAssessor {
    /// The first call to [`ThreatAssessor::should_scan`] always scans.
    pub fn new() -> Self {
        Self {
            since_scan: f32::MAX,
        }
    }

    /// Advances the throttle timer.
    ///
    /// # Arguments
    ///
    /// * `dt` - Seconds since the last tick.
    /// * `surviving` - Escalated polling: scan every tick.
    /// * `interval` - Normal scan interval in seconds.
    ///
    /// # Returns
    ///
    /// Whether a scan should run this tick.
    pub fn should_scan(&mut self, dt: f32, surviving: bool, interval: f32) -> bool {
        self.since_scan += dt;
        if surviving || self.since_scan >= interval {
            self.since_scan = 0.0;
            true
        } else {
            false
        }
    }

    /// Returns the most dangerous qualifying threat, if any.
    pub fn scan(
        &self,
        self_id: AgentId,
        self_position: Vector3<f32>,
        projectiles: &[ProjectileHandle],
        config: &AgentConfig,
    ) -> Option<ThreatRecord> {
        projectiles
            .iter()
            .filter(|p| p.owner != self_id)
            .filter_map(|p| assess(p, self_position, config))
            .min_by(|a, b| a.score.total_cmp(&b.score))
    }
}

fn assess(
    projectile: &ProjectileHandle,
    self_position: Vector3<f32>,
    config: &AgentConfig,
) -> Option<ThreatRecord> {
    let velocity = flatten(projectile.velocity);
    let speed2 = velocity.magnitude2();
    if speed2 < DEGENERATE_SPEED * DEGENERATE_SPEED {
        return None;
    }
    let speed = speed2.sqrt();
    let direction = velocity / speed;

    let to_self = flatten(self_position - projectile.position);
    let distance = to_self.magnitude();
    let alignment = if distance < EPSILON {
        1.0
    } else {
        direction.dot(to_self / distance)
    };
    if alignment < RECEDING_ALIGNMENT {
        return None;
    }

    let t = (to_self.dot(velocity) / speed2).max(0.0);
    let closest_approach = (to_self - velocity * t).magnitude();
    let time_to_impact = distance / speed;

    let on_course = closest_approach < config.safety_margin();
    let near_and_aimed =
        distance < config.near_threat_distance && alignment > config.near_threat_alignment;
    let imminent =
        time_to_impact < config.imminent_time_to_impact && alignment > config.imminent_alignment;
    if !(on_course || near_and_aimed || imminent) {
        return None;
    }

    Some(ThreatRecord {
        projectile: projectile.id,
        position: projectile.position,
        velocity: projectile.velocity,
        alignment,
        closest_approach,
        distance,
        time_to_impact,
        score: distance / (alignment.max(0.0) + SCORE_EPSILON),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ME: AgentId = AgentId(1);

    fn shell(id: u64, position: Vector3<f32>, velocity: Vector3<f32>, owner: AgentId) -> ProjectileHandle {
        ProjectileHandle {
            id: ProjectileId(id),
            position,
            velocity,
            owner,
        }
    }

    #[test]
    fn test_head_on_projectile_is_threat() {
        let assessor = ThreatAssessor::new();
        let incoming = shell(1, Vector3::new(5.0, 0.5, 0.0), Vector3::new(-20.0, 0.0, 0.0), AgentId(2));
        let threat = assessor
            .scan(ME, Vector3::new(0.0, 0.0, 0.0), &[incoming], &AgentConfig::default())
            .expect("head-on shell is a threat");

        assert_eq!(threat.projectile, ProjectileId(1));
        assert_relative_eq!(threat.alignment, 1.0, epsilon = 1e-5);
        assert_relative_eq!(threat.closest_approach, 0.0, epsilon = 1e-4);
        assert_relative_eq!(threat.distance, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_receding_projectile_is_not_threat() {
        let assessor = ThreatAssessor::new();
        let outgoing = shell(1, Vector3::new(5.0, 0.5, 0.0), Vector3::new(20.0, 0.0, 0.0), AgentId(2));
        assert!(
            assessor
                .scan(ME, Vector3::new(0.0, 0.0, 0.0), &[outgoing], &AgentConfig::default())
                .is_none()
        );
    }

    #[test]
    fn test_own_projectile_is_ignored() {
        let assessor = ThreatAssessor::new();
        let own = shell(1, Vector3::new(2.0, 0.5, 0.0), Vector3::new(-20.0, 0.0, 0.0), ME);
        assert!(
            assessor
                .scan(ME, Vector3::new(0.0, 0.0, 0.0), &[own], &AgentConfig::default())
                .is_none()
        );
    }

    #[test]
    fn test_degenerate_velocity_is_ignored() {
        let assessor = ThreatAssessor::new();
        let resting = shell(1, Vector3::new(1.0, 0.5, 0.0), Vector3::new(0.0, 0.0, 0.001), AgentId(2));
        assert!(
            assessor
                .scan(ME, Vector3::new(0.0, 0.0, 0.0), &[resting], &AgentConfig::default())
                .is_none()
        );
    }

    #[test]
    fn test_wide_miss_is_not_threat() {
        let assessor = ThreatAssessor::new();
        // Passes 6 units to the side, far outside every threshold.
        let passing = shell(1, Vector3::new(10.0, 0.5, 6.0), Vector3::new(-20.0, 0.0, 0.0), AgentId(2));
        assert!(
            assessor
                .scan(ME, Vector3::new(0.0, 0.0, 0.0), &[passing], &AgentConfig::default())
                .is_none()
        );
    }

    #[test]
    fn test_ranking_prefers_closer_aligned_shell() {
        let assessor = ThreatAssessor::new();
        let far = shell(1, Vector3::new(0.0, 0.5, 10.0), Vector3::new(0.0, 0.0, -20.0), AgentId(2));
        let near = shell(2, Vector3::new(-4.0, 0.5, 0.0), Vector3::new(20.0, 0.0, 0.0), AgentId(3));
        let threat = assessor
            .scan(ME, Vector3::new(0.0, 0.0, 0.0), &[far, near], &AgentConfig::default())
            .expect("both are threats");
        assert_eq!(threat.projectile, ProjectileId(2));
    }

    #[test]
    fn test_scan_throttle() {
        let mut assessor = ThreatAssessor::new();
        assert!(assessor.should_scan(0.06, false, 0.2));
        assert!(!assessor.should_scan(0.06, false, 0.2));
        assert!(!assessor.should_scan(0.06, false, 0.2));
        assert!(!assessor.should_scan(0.06, false, 0.2));
        assert!(assessor.should_scan(0.06, false, 0.2));
        // Surviving ignores the interval.
        assert!(assessor.should_scan(0.01, true, 0.2));
        assert!(assessor.should_scan(0.01, true, 0.2));
    }
}
