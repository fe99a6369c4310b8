use crate::errors::{ConfigError, ConfigResult};
use cgmath::Vector3;

/// How the weapon cooldown is re-armed after a shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FireCooldown {
    /// Fixed interval of `1 / rate` seconds.
    Fixed { rate: f32 },
    /// Interval drawn uniformly from `[min, max]` seconds.
    Random { min: f32, max: f32 },
}

impl Default for FireCooldown {
    fn default() -> Self {
        FireCooldown::Fixed { rate: 1.0 }
    }
}

/// Immutable tuning block for one agent.
///
/// Angles are radians, angular speeds radians per second, distances world
/// units, durations seconds. The multipliers and thresholds are empirically
/// tuned defaults, not derived values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentConfig {
    /// Edge length of one pathfinding grid cell.
    pub cell_size: f32,

    // Locomotion
    pub move_speed: f32,
    pub rotation_speed: f32,
    pub turret_rotation_speed: f32,

    // Perception and state hysteresis
    pub detection_range: f32,
    pub shooting_range: f32,
    /// Chase gives up once the lost target is beyond `detection_range` times this.
    pub lose_target_multiplier: f32,
    /// Attack breaks off once the target is beyond `shooting_range` times this.
    pub break_attack_multiplier: f32,

    // Weapon
    pub fire_cooldown: FireCooldown,
    pub projectile_speed: f32,
    /// Half-width of the uniform aim jitter.
    pub aim_offset_range: f32,
    /// Largest turret yaw error, in radians, at which a shot is released.
    pub fire_alignment_tolerance: f32,
    pub lead_target: bool,
    pub cant_shoot_while_fleeing: bool,

    // Patrol
    /// Centre of the patrol area; the spawn position when `None`.
    pub patrol_center: Option<Vector3<f32>>,
    pub patrol_radius: f32,
    /// Expected number of heading perturbations per second while patrolling.
    pub patrol_wobble_chance: f32,
    pub patrol_wobble_angle: f32,

    // Navigation
    pub path_recompute_interval: f32,
    pub waypoint_radius: f32,
    pub arrival_radius: f32,
    pub max_search_nodes: usize,
    /// Ring radius, in cells, searched for a walkable stand-in goal.
    pub fallback_search_radius: i32,
    /// Extra cost for cells next to an obstacle; `0.0` disables wall bias.
    pub wall_proximity_penalty: f32,
    pub stuck_check_interval: f32,
    pub stuck_epsilon: f32,

    // Threat assessment
    pub threat_scan_interval: f32,
    pub threat_scan_radius: f32,
    pub tank_radius: f32,
    pub safety_buffer: f32,
    pub near_threat_distance: f32,
    pub near_threat_alignment: f32,
    pub imminent_time_to_impact: f32,
    pub imminent_alignment: f32,

    // Evasion
    pub evasion_lock_duration: f32,
    pub min_clearance: f32,
    pub probe_length: f32,
    pub evasion_boost_max: f32,

    /// Length of the spawn-in pre-state.
    pub spawn_duration: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cell_size: 1.0,

            move_speed: 3.5,
            rotation_speed: 2.5,
            turret_rotation_speed: 3.0,

            detection_range: 15.0,
            shooting_range: 10.0,
            lose_target_multiplier: 1.5,
            break_attack_multiplier: 1.2,

            fire_cooldown: FireCooldown::default(),
            projectile_speed: 20.0,
            aim_offset_range: 0.05,
            fire_alignment_tolerance: 0.15,
            lead_target: true,
            cant_shoot_while_fleeing: true,

            patrol_center: None,
            patrol_radius: 10.0,
            patrol_wobble_chance: 0.5,
            patrol_wobble_angle: 0.35,

            path_recompute_interval: 0.5,
            waypoint_radius: 0.4,
            arrival_radius: 0.75,
            max_search_nodes: 4096,
            fallback_search_radius: 4,
            wall_proximity_penalty: 1.5,
            stuck_check_interval: 2.0,
            stuck_epsilon: 0.1,

            threat_scan_interval: 0.2,
            threat_scan_radius: 12.0,
            tank_radius: 1.0,
            safety_buffer: 0.5,
            near_threat_distance: 4.0,
            near_threat_alignment: 0.9,
            imminent_time_to_impact: 0.5,
            imminent_alignment: 0.6,

            evasion_lock_duration: 0.3,
            min_clearance: 1.5,
            probe_length: 4.0,
            evasion_boost_max: 1.5,

            spawn_duration: 1.0,
        }
    }
}

impl AgentConfig {
    /// Radius under which a predicted closest approach counts as a hit.
    pub fn safety_margin(&self) -> f32 {
        self.tank_radius + self.safety_buffer
    }

    /// Distance past which a chased target that is out of sight is dropped.
    pub fn lose_target_distance(&self) -> f32 {
        self.detection_range * self.lose_target_multiplier
    }

    /// Distance past which an attack breaks off into a chase.
    pub fn break_attack_distance(&self) -> f32 {
        self.shooting_range * self.break_attack_multiplier
    }

    /// Checks the block for values the agent cannot run with.
    ///
    /// # Returns
    ///
    /// `Ok(())` when every constraint holds, otherwise the first violation.
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("cell_size", self.cell_size),
            ("move_speed", self.move_speed),
            ("rotation_speed", self.rotation_speed),
            ("turret_rotation_speed", self.turret_rotation_speed),
            ("detection_range", self.detection_range),
            ("shooting_range", self.shooting_range),
            ("projectile_speed", self.projectile_speed),
            ("path_recompute_interval", self.path_recompute_interval),
            ("waypoint_radius", self.waypoint_radius),
            ("arrival_radius", self.arrival_radius),
            ("stuck_check_interval", self.stuck_check_interval),
            ("threat_scan_interval", self.threat_scan_interval),
            ("threat_scan_radius", self.threat_scan_radius),
            ("tank_radius", self.tank_radius),
            ("probe_length", self.probe_length),
        ];
        for (field, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        let non_negative = [
            ("aim_offset_range", self.aim_offset_range),
            ("patrol_radius", self.patrol_radius),
            ("patrol_wobble_chance", self.patrol_wobble_chance),
            ("patrol_wobble_angle", self.patrol_wobble_angle),
            ("fire_alignment_tolerance", self.fire_alignment_tolerance),
            ("safety_buffer", self.safety_buffer),
            ("evasion_lock_duration", self.evasion_lock_duration),
            ("min_clearance", self.min_clearance),
            ("wall_proximity_penalty", self.wall_proximity_penalty),
            ("stuck_epsilon", self.stuck_epsilon),
            ("spawn_duration", self.spawn_duration),
        ];
        for (field, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }

        for (field, value) in [
            ("lose_target_multiplier", self.lose_target_multiplier),
            ("break_attack_multiplier", self.break_attack_multiplier),
            ("evasion_boost_max", self.evasion_boost_max),
        ] {
            if value.is_nan() || value < 1.0 {
                return Err(ConfigError::HysteresisBelowOne { field, value });
            }
        }

        match self.fire_cooldown {
            FireCooldown::Fixed { rate } if rate.is_nan() || rate <= 0.0 => {
                return Err(ConfigError::NonPositive {
                    field: "fire_cooldown.rate",
                    value: rate,
                });
            }
            FireCooldown::Random { min, max } => {
                if min.is_nan() || min < 0.0 {
                    return Err(ConfigError::Negative {
                        field: "fire_cooldown.min",
                        value: min,
                    });
                }
                if max.is_nan() || min > max {
                    return Err(ConfigError::InvalidFireInterval { min, max });
                }
            }
            FireCooldown::Fixed { .. } => {}
        }

        if self.shooting_range > self.detection_range {
            return Err(ConfigError::ShootingBeyondDetection {
                shooting: self.shooting_range,
                detection: self.detection_range,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(AgentConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_default_hysteresis_multipliers() {
        let config = AgentConfig::default();
        assert_eq!(config.lose_target_multiplier, 1.5);
        assert_eq!(config.break_attack_multiplier, 1.2);
        assert_eq!(config.stuck_check_interval, 2.0);
        assert_eq!(config.stuck_epsilon, 0.1);
    }

    #[test]
    fn test_derived_distances() {
        let config = AgentConfig {
            detection_range: 8.0,
            shooting_range: 5.0,
            tank_radius: 1.0,
            safety_buffer: 0.5,
            ..Default::default()
        };
        assert_eq!(config.lose_target_distance(), 12.0);
        assert_eq!(config.break_attack_distance(), 6.0);
        assert_eq!(config.safety_margin(), 1.5);
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        let config = AgentConfig {
            move_speed: 0.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "move_speed",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_rejects_inverted_fire_interval() {
        let config = AgentConfig {
            fire_cooldown: FireCooldown::Random { min: 2.0, max: 1.0 },
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidFireInterval { min: 2.0, max: 1.0 })
        );
    }

    #[test]
    fn test_rejects_shooting_beyond_detection() {
        let config = AgentConfig {
            detection_range: 5.0,
            shooting_range: 6.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ShootingBeyondDetection { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_wobble_angle() {
        let config = AgentConfig {
            patrol_wobble_angle: -0.35,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Negative {
                field: "patrol_wobble_angle",
                value: -0.35
            })
        );
    }

    #[test]
    fn test_rejects_multiplier_below_one() {
        let config = AgentConfig {
            lose_target_multiplier: 0.9,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::HysteresisBelowOne { .. })
        ));
    }
}
