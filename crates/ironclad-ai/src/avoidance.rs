//! Evasive steering away from the top threat.
//!
//! The controller dodges sideways, perpendicular to the incoming shot. Once
//! a side is chosen it is locked for a short window so frame-to-frame noise in
//! the open-space probes cannot make the tank oscillate between left and
//! right.

use crate::threat::ThreatRecord;
use crate::world::GridWorldQuery;
use cgmath::Vector3;
use ironclad_core::math::{flatten, normalize_or_zero, perpendicular_left, perpendicular_right};
use ironclad_core::{AgentConfig, AgentId, ProjectileId};
use log::debug;

/// Probe ray heights above the tank's origin.
pub const PROBE_HEIGHTS: [f32; 3] = [0.2, 0.6, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvasionSide {
    Left,
    Right,
    /// Straight along the shot's flight direction, away from the shooter.
    Back,
}

/// Movement decision for one tick of evasion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evasion {
    Move {
        direction: Vector3<f32>,
        side: EvasionSide,
        /// Within `[1, evasion_boost_max]`.
        speed_multiplier: f32,
    },
    /// Every escape is blocked; stay put this tick.
    Hold,
}

impl Evasion {
    pub fn direction(&self) -> Option<Vector3<f32>> {
        match self {
            Evasion::Move { direction, .. } => Some(*direction),
            Evasion::Hold => None,
        }
    }

    pub fn speed_multiplier(&self) -> f32 {
        match self {
            Evasion::Move {
                speed_multiplier, ..
            } => *speed_multiplier,
            Evasion::Hold => 1.0,
        }
    }
}

/// Hysteresis state carried between evasion decisions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AvoidanceMemory {
    pub last_direction: Option<Vector3<f32>>,
    pub last_side: Option<EvasionSide>,
    pub bound_to: Option<ProjectileId>,
    /// Clock time at which the lock stops holding.
    pub lock_expiry: f32,
}

impl AvoidanceMemory {
    /// Whether the remembered direction may be reused for `threat` at `now`.
    pub fn is_locked_to(&self, threat: ProjectileId, now: f32) -> bool {
        self.bound_to == Some(threat) && self.lock_expiry > now && self.last_direction.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Picks and stabilizes evasive directions.
#[derive(Debug, Clone, Copy)]
pub struct AvoidanceController {
    lock_duration: f32,
    min_clearance: f32,
    boost_max: f32,
    /// Threat distance at which the speed boost starts to build.
    boost_range: f32,
}

impl AvoidanceController {
    pub fn new(lock_duration: f32, min_clearance: f32, boost_max: f32, boost_range: f32) -> Self {
        Self {
            lock_duration,
            min_clearance,
            boost_max: boost_max.max(1.0),
            boost_range: boost_range.max(f32::EPSILON),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.evasion_lock_duration,
            config.min_clearance,
            config.evasion_boost_max,
            config.threat_scan_radius,
        )
    }

    /// Chooses an evasive direction for `threat`.
    ///
    /// # Arguments
    ///
    /// * `threat` - The top threat of the current scan.
    /// * `memory` - Hysteresis state from the previous decision.
    /// * `probe` - Open distance available along a ground-plane direction.
    /// * `now` - Agent clock in seconds.
    ///
    /// # Returns
    ///
    /// The decision and the memory to carry into the next tick.
    pub fn choose_evasion<P>(
        &self,
        threat: &ThreatRecord,
        memory: AvoidanceMemory,
        probe: P,
        now: f32,
    ) -> (Evasion, AvoidanceMemory)
    where
        P: Fn(Vector3<f32>) -> f32,
    {
        let speed_multiplier = self.speed_multiplier(threat.distance);

        if memory.is_locked_to(threat.projectile, now)
            && let (Some(direction), Some(side)) = (memory.last_direction, memory.last_side)
        {
            if probe(direction) >= self.min_clearance {
                return (
                    Evasion::Move {
                        direction,
                        side,
                        speed_multiplier,
                    },
                    memory,
                );
            }
            debug!(
                "Locked {side:?} evasion from {} became blocked, choosing again",
                threat.projectile
            );
        }

        let incoming = normalize_or_zero(flatten(threat.velocity));
        let left = perpendicular_left(incoming);
        let right = perpendicular_right(incoming);
        let left_space = probe(left);
        let right_space = probe(right);
        let left_open = left_space >= self.min_clearance;
        let right_open = right_space >= self.min_clearance;

        let choice = match (left_open, right_open) {
            (true, true) if left_space > right_space => Some((left, EvasionSide::Left)),
            (true, true) => Some((right, EvasionSide::Right)),
            (true, false) => Some((left, EvasionSide::Left)),
            (false, true) => Some((right, EvasionSide::Right)),
            (false, false) if probe(incoming) >= self.min_clearance => {
                Some((incoming, EvasionSide::Back))
            }
            (false, false) => None,
        };

        match choice {
            Some((direction, side)) => {
                let memory = AvoidanceMemory {
                    last_direction: Some(direction),
                    last_side: Some(side),
                    bound_to: Some(threat.projectile),
                    lock_expiry: now + self.lock_duration,
                };
                (
                    Evasion::Move {
                        direction,
                        side,
                        speed_multiplier,
                    },
                    memory,
                )
            }
            None => {
                debug!("Boxed in while evading {}, holding", threat.projectile);
                let memory = AvoidanceMemory {
                    bound_to: Some(threat.projectile),
                    lock_expiry: now,
                    ..AvoidanceMemory::default()
                };
                (Evasion::Hold, memory)
            }
        }
    }

    /// Grows linearly from `1` at the edge of the boost range to the cap at
    /// zero distance.
    pub fn speed_multiplier(&self, distance: f32) -> f32 {
        let closeness = (1.0 - distance / self.boost_range).clamp(0.0, 1.0);
        1.0 + (self.boost_max - 1.0) * closeness
    }
}

/// Open space along `direction`, the minimum over rays at several heights.
pub fn probe_open_space(
    world: &dyn GridWorldQuery,
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    self_id: AgentId,
    config: &AgentConfig,
) -> f32 {
    PROBE_HEIGHTS
        .iter()
        .map(|&height| {
            let start = Vector3::new(origin.x, origin.y + height, origin.z);
            world.probe_distance(start, direction, config.probe_length, self_id)
        })
        .fold(config.probe_length, f32::min)
}
