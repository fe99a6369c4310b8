//! The per-tank agent aggregate and its tick pipeline.
//!
//! One [`Agent::tick`] runs, in order:
//!
//! 1. perception: resolve the target, test line of sight, scan for threats
//!    (throttled, every tick while surviving),
//! 2. state machine transitions,
//! 3. the current state's behaviour, which fills in [`Steering`],
//! 4. the movement step with lateral retries around blocked cells,
//! 5. body and turret rotation at capped angular speed,
//! 6. the fire gate, which also waits for the turret to line up.

use crate::aim::{AimController, FireControl};
use crate::avoidance::AvoidanceMemory;
use crate::diagnostics::AgentSnapshot;
use crate::fsm::{FiniteStateMachine, StateContext};
use crate::grid::GridCell;
use crate::navigation::{Navigator, StuckDetector};
use crate::profile::Capabilities;
use crate::states::{AgentState, build_state_machine};
use crate::threat::{ThreatAssessor, ThreatRecord};
use crate::world::{CombatSink, GridWorldQuery, TargetSnapshot};
use cgmath::{InnerSpace, Vector3, Zero};
use ironclad_core::math::{direction_from_yaw, planar_distance, rotate_towards, rotate_yaw, wrap_angle, yaw_of};
use ironclad_core::{AgentConfig, AgentId, Dt, EPSILON};
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::f32::consts::{FRAC_PI_3, FRAC_PI_6};

/// Height of the turret pivot above the tank's origin.
pub const TURRET_HEIGHT: f32 = 1.0;

/// Distance from the turret pivot to the muzzle.
pub const MUZZLE_LENGTH: f32 = 1.2;

/// Yaw offsets tried, in order, when the straight step is blocked.
const LATERAL_OFFSETS: [f32; 4] = [FRAC_PI_6, -FRAC_PI_6, FRAC_PI_3, -FRAC_PI_3];

/// Hit points, kept within `0..=maximum`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    current: f32,
    maximum: f32,
}

impl Default for Health {
    fn default() -> Self {
        Self::full(100.0)
    }
}

impl Health {
    pub fn new(current: f32, maximum: f32) -> Self {
        let maximum = maximum.max(0.0);
        Self {
            current: current.clamp(0.0, maximum),
            maximum,
        }
    }

    pub fn full(maximum: f32) -> Self {
        Self::new(maximum, maximum)
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn maximum(&self) -> f32 {
        self.maximum
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Sets hit points directly, clamped to the valid range.
    pub fn set_current(&mut self, value: f32) {
        self.current = value.clamp(0.0, self.maximum);
    }

    /// Subtracts `amount`; negative amounts are ignored.
    ///
    /// # Returns
    ///
    /// `true` when this hit took the last hit points.
    pub fn damage(&mut self, amount: f32) -> bool {
        let was_alive = self.is_alive();
        self.set_current(self.current - amount.max(0.0));
        was_alive && !self.is_alive()
    }
}

/// What the agent knows about the world this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perception {
    pub target: Option<TargetSnapshot>,
    /// Ground-plane distance to the target; infinite without one.
    pub target_distance: f32,
    pub has_line_of_sight: bool,
    /// Result of the latest threat scan.
    pub threat: Option<ThreatRecord>,
}

impl Default for Perception {
    fn default() -> Self {
        Self {
            target: None,
            target_distance: f32::INFINITY,
            has_line_of_sight: false,
            threat: None,
        }
    }
}

impl Perception {
    /// Target present with a clear line of sight.
    pub fn target_visible(&self) -> bool {
        self.target.is_some() && self.has_line_of_sight
    }
}

/// Intent the current state produces for the movement, rotation and fire steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    /// Unit ground-plane direction to move in.
    pub direction: Option<Vector3<f32>>,
    pub speed_multiplier: f32,
    /// Body yaw to turn towards when not moving.
    pub face_yaw: Option<f32>,
    /// Turret yaw to turn towards.
    pub aim_yaw: Option<f32>,
    pub wants_fire: bool,
    /// Forced evasive movement this tick.
    pub evading: bool,
}

impl Default for Steering {
    fn default() -> Self {
        Self {
            direction: None,
            speed_multiplier: 1.0,
            face_yaw: None,
            aim_yaw: None,
            wants_fire: false,
            evading: false,
        }
    }
}

/// A shot handed to the host's projectile system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireCommand {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub speed: f32,
}

/// Motion and weapon commands produced by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    pub velocity: Vector3<f32>,
    pub body_yaw: f32,
    pub turret_yaw: f32,
    pub fire: Option<FireCommand>,
}

impl TickOutput {
    /// No movement, no shot.
    pub fn idle(body_yaw: f32, turret_yaw: f32) -> Self {
        Self {
            velocity: Vector3::zero(),
            body_yaw,
            turret_yaw,
            fire: None,
        }
    }
}

/// Mutable agent data shared with the states through [`StateContext`].
#[derive(Debug, Clone)]
pub struct AgentCore {
    pub id: AgentId,
    pub capabilities: Capabilities,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub body_yaw: f32,
    pub turret_yaw: f32,
    pub health: Health,
    /// Spawn position; the patrol centre unless configured otherwise.
    pub home: Vector3<f32>,
    pub target: Option<AgentId>,
    pub perception: Perception,
    pub steering: Steering,
    pub navigator: Navigator,
    pub stuck: StuckDetector,
    pub threat_assessor: ThreatAssessor,
    pub avoidance: AvoidanceMemory,
    pub weapon: FireControl,
    pub patrol_target: Option<Vector3<f32>>,
    pub rng: StdRng,
    /// Agent-local clock in seconds, advanced by every tick.
    pub clock: f32,
}

impl AgentCore {
    pub fn new(id: AgentId, position: Vector3<f32>, capabilities: Capabilities, seed: u64) -> Self {
        Self {
            id,
            capabilities,
            position,
            velocity: Vector3::zero(),
            body_yaw: 0.0,
            turret_yaw: 0.0,
            health: Health::default(),
            home: position,
            target: None,
            perception: Perception::default(),
            steering: Steering::default(),
            navigator: Navigator::new(capabilities.contains(Capabilities::PATHFINDING)),
            stuck: StuckDetector::new(),
            threat_assessor: ThreatAssessor::new(),
            avoidance: AvoidanceMemory::default(),
            weapon: FireControl::new(),
            patrol_target: None,
            rng: StdRng::seed_from_u64(seed ^ u64::from(id.0)),
            clock: 0.0,
        }
    }

    pub fn turret_position(&self) -> Vector3<f32> {
        self.position + Vector3::unit_y() * TURRET_HEIGHT
    }

    /// Points the turret at the current target, if any.
    pub fn track_target(&mut self, config: &AgentConfig) {
        let lead = config.lead_target && self.capabilities.contains(Capabilities::LEAD_TARGET);
        let target = self.perception.target;
        let turret = self.turret_position();
        self.steering.aim_yaw = AimController::new(lead).compute_aim_yaw(
            turret,
            target.as_ref(),
            config.projectile_speed,
            self.perception.has_line_of_sight,
            config.aim_offset_range,
            &mut self.rng,
        );
    }

    fn perceive(&mut self, world: &dyn GridWorldQuery, config: &AgentConfig, state: AgentState, dt: f32) {
        let target = self
            .target
            .and_then(|id| world.locate(id))
            .filter(|snapshot| snapshot.alive);
        if target.is_none()
            && let Some(lost) = self.target.take()
        {
            debug!("{} dropped target {lost}", self.id);
        }

        self.perception.target = target;
        match target {
            Some(target) => {
                self.perception.target_distance = planar_distance(self.position, target.position);
                let eye = target.position + Vector3::unit_y() * TURRET_HEIGHT;
                self.perception.has_line_of_sight =
                    !world.raycast_blocked(self.turret_position(), eye, self.id);
            }
            None => {
                self.perception.target_distance = f32::INFINITY;
                self.perception.has_line_of_sight = false;
            }
        }

        let scans = self.capabilities.contains(Capabilities::THREAT_AVOIDANCE)
            && state != AgentState::Spawning;
        if !scans {
            self.perception.threat = None;
            return;
        }
        let surviving = state == AgentState::Surviving;
        if self
            .threat_assessor
            .should_scan(dt, surviving, config.threat_scan_interval)
        {
            let nearby = world.query_projectiles_in_radius(self.position, config.threat_scan_radius);
            self.perception.threat = self.threat_assessor.scan(self.id, self.position, &nearby, config);
        }
    }

    fn apply_movement(&mut self, world: &dyn GridWorldQuery, config: &AgentConfig, dt: f32) -> Vector3<f32> {
        let Some(direction) = self
            .steering
            .direction
            .filter(|d| d.magnitude2() > EPSILON * EPSILON)
        else {
            self.velocity = Vector3::zero();
            return self.velocity;
        };

        let origin = self.position;
        let step = config.move_speed * self.steering.speed_multiplier * dt;
        let cell_size = world.cell_size();
        let here = GridCell::from_world(origin, cell_size);
        let open = |dir: Vector3<f32>| {
            let next = GridCell::from_world(origin + dir * step, cell_size);
            next == here || world.is_walkable(next)
        };

        let chosen = std::iter::once(direction)
            .chain(LATERAL_OFFSETS.iter().map(|&offset| rotate_yaw(direction, offset)))
            .find(|&dir| open(dir));

        let Some(dir) = chosen else {
            debug!("{} blocked at {here:?}, holding", self.id);
            self.velocity = Vector3::zero();
            return self.velocity;
        };

        let next = world.bounds().clamp(origin + dir * step);
        self.velocity = if dt > 0.0 {
            (next - origin) / dt
        } else {
            Vector3::zero()
        };
        self.position = next;
        self.steering.face_yaw = Some(yaw_of(dir));
        self.velocity
    }

    fn apply_rotation(&mut self, config: &AgentConfig, dt: f32) {
        if let Some(yaw) = self.steering.face_yaw {
            self.body_yaw = rotate_towards(self.body_yaw, yaw, config.rotation_speed * dt);
        }
        if let Some(yaw) = self.steering.aim_yaw {
            self.turret_yaw = rotate_towards(self.turret_yaw, yaw, config.turret_rotation_speed * dt);
        }
    }

    fn try_fire(&mut self, sink: &dyn CombatSink, config: &AgentConfig) -> Option<FireCommand> {
        if !self.steering.wants_fire {
            return None;
        }
        let suppressed = self.steering.evading && config.cant_shoot_while_fleeing;
        if !self
            .weapon
            .can_fire(self.perception.has_line_of_sight, suppressed)
        {
            return None;
        }
        let turret_yaw = self.turret_yaw;
        let aligned = self.steering.aim_yaw.is_some_and(|yaw| {
            wrap_angle(yaw - turret_yaw).abs() <= config.fire_alignment_tolerance
        });
        if !aligned {
            return None;
        }

        let direction = direction_from_yaw(self.turret_yaw);
        let origin = self.turret_position() + direction * MUZZLE_LENGTH;
        sink.fire_weapon(origin, direction, config.projectile_speed, self.id);
        self.weapon.fire(config.fire_cooldown, &mut self.rng);
        Some(FireCommand {
            origin,
            direction,
            speed: config.projectile_speed,
        })
    }
}

/// One AI-controlled tank.
#[derive(Debug)]
pub struct Agent {
    core: AgentCore,
    fsm: FiniteStateMachine<AgentState>,
    initial_state: AgentState,
}

impl Agent {
    /// Creates an agent; its initial state is entered on the first tick.
    ///
    /// # Arguments
    ///
    /// * `id` - Host-assigned identity.
    /// * `position` - Spawn position.
    /// * `capabilities` - An [`AiProfile`](crate::profile::AiProfile) or an explicit capability set.
    /// * `seed` - Mixed with `id` to seed the agent's random source.
    pub fn new(
        id: AgentId,
        position: Vector3<f32>,
        capabilities: impl Into<Capabilities>,
        seed: u64,
    ) -> Self {
        let capabilities = capabilities.into();
        let initial_state = if capabilities.contains(Capabilities::SPAWN_IN) {
            AgentState::Spawning
        } else {
            AgentState::Patrol
        };
        Self {
            core: AgentCore::new(id, position, capabilities, seed),
            fsm: build_state_machine(),
            initial_state,
        }
    }

    pub fn with_health(mut self, health: Health) -> Self {
        self.core.health = health;
        self
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.core.body_yaw = yaw;
        self.core.turret_yaw = yaw;
        self
    }

    pub fn id(&self) -> AgentId {
        self.core.id
    }

    pub fn position(&self) -> Vector3<f32> {
        self.core.position
    }

    pub fn velocity(&self) -> Vector3<f32> {
        self.core.velocity
    }

    pub fn body_yaw(&self) -> f32 {
        self.core.body_yaw
    }

    pub fn turret_yaw(&self) -> f32 {
        self.core.turret_yaw
    }

    pub fn health(&self) -> Health {
        self.core.health
    }

    pub fn capabilities(&self) -> Capabilities {
        self.core.capabilities
    }

    pub fn target(&self) -> Option<AgentId> {
        self.core.target
    }

    pub fn current_state(&self) -> AgentState {
        self.fsm.current_state().unwrap_or(self.initial_state)
    }

    pub fn previous_state(&self) -> Option<AgentState> {
        self.fsm.previous_state()
    }

    pub fn is_dead(&self) -> bool {
        self.current_state() == AgentState::Dead
    }

    /// Assigns or reassigns the chase target.
    pub fn request_target(&mut self, target: AgentId) {
        if self.is_dead() || target == self.core.id {
            return;
        }
        if self.core.target != Some(target) {
            debug!("{} now targeting {target}", self.core.id);
            self.core.target = Some(target);
        }
    }

    pub fn clear_target(&mut self) {
        self.core.target = None;
    }

    /// Applies damage from the host's weapon system.
    ///
    /// Damage is reported through `sink`; a known attacker becomes the new
    /// target. Death itself is handled on the next tick.
    pub fn apply_damage(&mut self, amount: f32, attacker: Option<AgentId>, sink: &dyn CombatSink) {
        if self.is_dead() || amount <= 0.0 {
            return;
        }
        if self.core.health.damage(amount) {
            debug!("{} took lethal damage", self.core.id);
        }
        sink.report_damage(self.core.id, amount);
        if let Some(attacker) = attacker {
            self.request_target(attacker);
        }
    }

    /// Overrides the pose for hosts that integrate motion themselves.
    pub fn set_pose(&mut self, position: Vector3<f32>, body_yaw: f32) {
        self.core.position = position;
        self.core.body_yaw = body_yaw;
    }

    /// Advances the agent by one simulation step.
    ///
    /// # Arguments
    ///
    /// * `dt` - Fixed timestep.
    /// * `world` - Read-only world snapshot for this tick.
    /// * `sink` - Receives shots and death/damage notifications.
    /// * `config` - Tuning block.
    ///
    /// # Returns
    ///
    /// The commands for this tick; always idle once dead.
    pub fn tick(
        &mut self,
        dt: Dt,
        world: &dyn GridWorldQuery,
        sink: &dyn CombatSink,
        config: &AgentConfig,
    ) -> TickOutput {
        if self.is_dead() {
            return TickOutput::idle(self.core.body_yaw, self.core.turret_yaw);
        }

        let dt_secs = dt.as_secs_f32();
        let state = self.current_state();
        self.core.clock += dt_secs;
        self.core.weapon.tick(dt_secs);
        self.core.steering = Steering::default();
        self.core.perceive(world, config, state, dt_secs);

        {
            let mut context = StateContext {
                core: &mut self.core,
                world,
                sink,
                config,
                time_in_state: self.fsm.time_in_state(),
            };
            if self.fsm.current_state().is_none() {
                self.fsm.set_initial_state(self.initial_state, &mut context);
            }
            self.fsm.update(&mut context, dt);
        }

        if self.is_dead() {
            self.core.velocity = Vector3::zero();
            return TickOutput::idle(self.core.body_yaw, self.core.turret_yaw);
        }

        let velocity = self.core.apply_movement(world, config, dt_secs);
        self.core.apply_rotation(config, dt_secs);
        let fire = self.core.try_fire(sink, config);

        TickOutput {
            velocity,
            body_yaw: self.core.body_yaw,
            turret_yaw: self.core.turret_yaw,
            fire,
        }
    }

    /// Read-only view of the agent's internals for tooling and logs.
    pub fn snapshot(&self) -> AgentSnapshot {
        let core = &self.core;
        let path = core.navigator.path();
        AgentSnapshot {
            id: core.id,
            state: self.current_state(),
            previous_state: self.fsm.previous_state(),
            time_in_state: self.fsm.time_in_state(),
            position: core.position,
            velocity: core.velocity,
            body_yaw: core.body_yaw,
            turret_yaw: core.turret_yaw,
            health: core.health.current(),
            max_health: core.health.maximum(),
            target: core.target,
            target_distance: core.perception.target.map(|_| core.perception.target_distance),
            has_line_of_sight: core.perception.has_line_of_sight,
            threat: core.perception.threat.map(|t| t.projectile),
            evasion_side: core.avoidance.last_side,
            path_len: path.waypoints().len(),
            path_index: path.current_index(),
            direct_navigation: core.navigator.is_direct(),
            patrol_target: core.patrol_target,
            fire_ready_in: core.weapon.remaining(),
        }
    }
}
