//! Turret aiming and weapon cooldown.

use crate::world::TargetSnapshot;
use cgmath::{InnerSpace, Vector3};
use ironclad_core::math::{flatten, yaw_of};
use ironclad_core::{EPSILON, FireCooldown};
use rand::Rng;

/// Computes the yaw the turret should turn towards.
#[derive(Debug, Clone, Copy)]
pub struct AimController {
    /// Aim ahead of a moving target.
    pub lead_target: bool,
}

impl AimController {
    pub fn new(lead_target: bool) -> Self {
        Self { lead_target }
    }

    /// Target yaw for the turret.
    ///
    /// The turret tracks the target even when it may not fire. Lead and jitter
    /// are applied only with line of sight; without it the clean yaw is used so
    /// the turret settles on a steady heading.
    ///
    /// # Arguments
    ///
    /// * `turret_position` - World position of the muzzle pivot.
    /// * `target` - Resolved target, if any.
    /// * `projectile_speed` - Muzzle speed used for lead prediction.
    /// * `has_line_of_sight` - Whether the agent is eligible to fire.
    /// * `aim_offset_range` - Half-width of the uniform yaw jitter in radians.
    /// * `rng` - Per-agent random source.
    ///
    /// # Returns
    ///
    /// `None` without a target or when the target sits on the pivot.
    pub fn compute_aim_yaw<R: Rng>(
        &self,
        turret_position: Vector3<f32>,
        target: Option<&TargetSnapshot>,
        projectile_speed: f32,
        has_line_of_sight: bool,
        aim_offset_range: f32,
        rng: &mut R,
    ) -> Option<f32> {
        let target = target?;
        let to_target = flatten(target.position - turret_position);
        let distance = to_target.magnitude();
        if distance < EPSILON {
            return None;
        }

        let aim_point = if has_line_of_sight && self.lead_target && projectile_speed > EPSILON {
            target.position + target.velocity * (distance / projectile_speed)
        } else {
            target.position
        };
        let mut yaw = yaw_of(flatten(aim_point - turret_position));

        if has_line_of_sight && aim_offset_range > 0.0 {
            yaw += rng.random_range(-aim_offset_range..=aim_offset_range);
        }
        Some(yaw)
    }
}

/// Weapon cooldown timer. A new weapon is ready immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct FireControl {
    /// Seconds until the weapon is ready.
    remaining: f32,
}

impl FireControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Firing gate.
    ///
    /// # Arguments
    ///
    /// * `has_line_of_sight` - Clear line to the target.
    /// * `suppressed` - The agent is in forced evasive movement that
    ///   forbids shooting.
    pub fn can_fire(&self, has_line_of_sight: bool, suppressed: bool) -> bool {
        has_line_of_sight && self.is_ready() && !suppressed
    }

    /// Re-arms the cooldown after a shot.
    ///
    /// # Arguments
    ///
    /// * `policy` - Fixed-rate or randomized re-arm interval.
    /// * `rng` - Per-agent random source.
    ///
    /// # Returns
    ///
    /// The interval chosen.
    pub fn fire<R: Rng>(&mut self, policy: FireCooldown, rng: &mut R) -> f32 {
        let interval = match policy {
            FireCooldown::Fixed { rate } => 1.0 / rate,
            FireCooldown::Random { min, max } if max > min => rng.random_range(min..=max),
            FireCooldown::Random { min, .. } => min,
        };
        self.remaining = interval;
        interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ironclad_core::AgentId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f32::consts::FRAC_PI_2;

    fn target_at(position: Vector3<f32>, velocity: Vector3<f32>) -> TargetSnapshot {
        TargetSnapshot {
            id: AgentId(9),
            position,
            velocity,
            alive: true,
        }
    }

    #[test]
    fn test_no_target_no_yaw() {
        let mut rng = StdRng::seed_from_u64(1);
        let aim = AimController::new(true);
        assert!(aim.compute_aim_yaw(Vector3::new(0.0, 1.0, 0.0), None, 20.0, true, 0.05, &mut rng).is_none());
    }

    #[test]
    fn test_clean_yaw_without_line_of_sight() {
        let mut rng = StdRng::seed_from_u64(1);
        let aim = AimController::new(true);
        let target = target_at(Vector3::new(10.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 5.0));
        let yaw = aim
            .compute_aim_yaw(Vector3::new(0.0, 1.0, 0.0), Some(&target), 20.0, false, 0.3, &mut rng)
            .expect("target present");
        // No lead, no jitter.
        assert_relative_eq!(yaw, FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn test_lead_prediction_with_line_of_sight() {
        let mut rng = StdRng::seed_from_u64(1);
        let aim = AimController::new(true);
        let target = target_at(Vector3::new(10.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 5.0));
        let yaw = aim
            .compute_aim_yaw(Vector3::new(0.0, 1.0, 0.0), Some(&target), 20.0, true, 0.0, &mut rng)
            .expect("target present");
        // Aim point (10, 0, 2.5).
        assert_relative_eq!(yaw, 10.0_f32.atan2(2.5), epsilon = 1e-6);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let aim = AimController::new(false);
        let target = target_at(Vector3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, 0.0));
        for _ in 0..100 {
            let yaw = aim
                .compute_aim_yaw(Vector3::new(0.0, 0.0, 0.0), Some(&target), 20.0, true, 0.1, &mut rng)
                .expect("target present");
            assert!(yaw.abs() <= 0.1 + 1e-6);
        }
    }

    #[test]
    fn test_fixed_cooldown() {
        let mut rng = StdRng::seed_from_u64(3);
        let policy = FireCooldown::Fixed { rate: 2.0 };
        let mut weapon = FireControl::new();
        assert!(weapon.can_fire(true, false));
        assert!(!weapon.can_fire(false, false));
        assert!(!weapon.can_fire(true, true));

        assert_relative_eq!(weapon.fire(policy, &mut rng), 0.5);
        assert!(!weapon.can_fire(true, false));
        weapon.tick(0.3);
        assert!(!weapon.is_ready());
        weapon.tick(0.3);
        assert!(weapon.can_fire(true, false));
    }

    #[test]
    fn test_random_cooldown_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let policy = FireCooldown::Random { min: 0.8, max: 1.6 };
        let mut weapon = FireControl::new();
        for _ in 0..50 {
            let interval = weapon.fire(policy, &mut rng);
            assert!((0.8..=1.6).contains(&interval));
            assert_relative_eq!(weapon.remaining(), interval);
        }
    }
}
