//! Behaviour states of an enemy tank.
//!
//! | From | Condition | To |
//! |---|---|---|
//! | any live state | health gone | `Dead` |
//! | any live state but `Spawning` | qualifying threat | `Surviving` |
//! | `Spawning` | spawn duration elapsed | `Patrol` |
//! | `Patrol` | target visible within detection range | `Chase` |
//! | `Chase` | target visible within shooting range | `Attack` |
//! | `Chase` | target gone, or hidden beyond the lose distance | `Patrol` |
//! | `Attack` | target hidden or beyond the break distance | `Chase` |
//! | `Surviving` | no threat | re-evaluated as `Attack`, `Chase` or `Patrol` |

use crate::agent::Steering;
use crate::avoidance::{AvoidanceController, Evasion, probe_open_space};
use crate::fsm::{FiniteStateMachine, State, StateContext, StateIdentifier};
use crate::grid::GridCell;
use crate::profile::Capabilities;
use cgmath::{Vector3, Zero};
use ironclad_core::Dt;
use ironclad_core::math::{direction_from_yaw, rotate_yaw, yaw_of};
use log::{debug, info};
use rand::Rng;
use std::f32::consts::TAU;

/// Random patrol points tried before falling back to the patrol centre.
const PATROL_SAMPLE_ATTEMPTS: usize = 8;

/// How long one patrol heading wobble lasts, in seconds.
const WOBBLE_DURATION: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentState {
    Spawning,
    Patrol,
    Chase,
    Attack,
    Surviving,
    Dead,
}

impl StateIdentifier for AgentState {
    fn as_str(&self) -> &'static str {
        match self {
            AgentState::Spawning => "Spawning",
            AgentState::Patrol => "Patrol",
            AgentState::Chase => "Chase",
            AgentState::Attack => "Attack",
            AgentState::Surviving => "Surviving",
            AgentState::Dead => "Dead",
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds the agent state machine with its any-state rules.
///
/// The initial state is left unset; the agent enters it on its first tick.
pub fn build_state_machine() -> FiniteStateMachine<AgentState> {
    let mut fsm = FiniteStateMachine::new();
    fsm.add_state(AgentState::Spawning, Box::new(SpawningState));
    fsm.add_state(AgentState::Patrol, Box::new(PatrolState::default()));
    fsm.add_state(AgentState::Chase, Box::new(ChaseState));
    fsm.add_state(AgentState::Attack, Box::new(AttackState));
    fsm.add_state(AgentState::Surviving, Box::new(SurvivingState));
    fsm.add_state(AgentState::Dead, Box::new(DeadState));
    fsm.mark_terminal(AgentState::Dead);

    fsm.add_any_state_rule(|_, ctx| (!ctx.core.health.is_alive()).then_some(AgentState::Dead));
    fsm.add_any_state_rule(|current, ctx| {
        let may_evade = ctx.core.capabilities.contains(Capabilities::THREAT_AVOIDANCE)
            && current != AgentState::Spawning;
        (may_evade && ctx.core.perception.threat.is_some()).then_some(AgentState::Surviving)
    });
    fsm
}

/// Where an agent without a threat belongs, given what it currently sees.
fn reevaluate(ctx: &StateContext<'_>) -> AgentState {
    let perception = &ctx.core.perception;
    if perception.target_visible() && perception.target_distance <= ctx.config.shooting_range {
        AgentState::Attack
    } else if perception.target_visible()
        && perception.target_distance <= ctx.config.detection_range
    {
        AgentState::Chase
    } else {
        AgentState::Patrol
    }
}

/// Random walkable point within the patrol radius.
fn pick_patrol_point(ctx: &mut StateContext<'_>) -> Vector3<f32> {
    let center = ctx.config.patrol_center.unwrap_or(ctx.core.home);
    let radius = ctx.config.patrol_radius;
    let bounds = ctx.world.bounds();
    let cell_size = ctx.world.cell_size();

    for _ in 0..PATROL_SAMPLE_ATTEMPTS {
        let angle = ctx.core.rng.random_range(0.0..TAU);
        let distance = radius * ctx.core.rng.random::<f32>().sqrt();
        let point = bounds.clamp(center + direction_from_yaw(angle) * distance);
        if ctx.world.is_walkable(GridCell::from_world(point, cell_size)) {
            return point;
        }
    }
    bounds.clamp(center)
}

fn new_patrol_target(ctx: &mut StateContext<'_>) {
    let point = pick_patrol_point(ctx);
    ctx.core.patrol_target = Some(point);
    ctx.core.navigator.force_recompute();
    let position = ctx.core.position;
    ctx.core.stuck.reset(position);
}

/// Steers towards `goal`; returns `true` once arrived.
fn drive_towards(ctx: &mut StateContext<'_>, goal: Vector3<f32>, dt: f32) -> bool {
    let position = ctx.core.position;
    match ctx
        .core
        .navigator
        .steer(ctx.world, position, goal, ctx.config, dt)
    {
        Some(direction) => {
            ctx.core.steering.direction = Some(direction);
            false
        }
        None => true,
    }
}

/// Timed spawn-in before the AI activates. No movement, aim or fire.
#[derive(Debug)]
struct SpawningState;

impl State<AgentState> for SpawningState {
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        info!("{} spawning", ctx.core.id);
    }

    fn check_transitions(&self, ctx: &StateContext<'_>) -> Option<AgentState> {
        (ctx.time_in_state.as_secs_f32() >= ctx.config.spawn_duration).then_some(AgentState::Patrol)
    }
}

#[derive(Debug, Default)]
struct PatrolState {
    /// Yaw offset of the active wobble.
    wobble: f32,
    /// Seconds left of the active wobble.
    wobble_left: f32,
}

impl State<AgentState> for PatrolState {
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        info!("{} entered Patrol", ctx.core.id);
        self.wobble_left = 0.0;
        new_patrol_target(ctx);
    }

    fn on_update(&mut self, ctx: &mut StateContext<'_>, dt: Dt) {
        let dt = dt.as_secs_f32();
        let position = ctx.core.position;

        if ctx.core.stuck.sample(position, dt, ctx.config) {
            debug!("{} stuck while patrolling, picking a new point", ctx.core.id);
            new_patrol_target(ctx);
        }

        let goal = match ctx.core.patrol_target {
            Some(goal) => goal,
            None => {
                new_patrol_target(ctx);
                ctx.core.patrol_target.unwrap_or(position)
            }
        };
        if drive_towards(ctx, goal, dt) {
            new_patrol_target(ctx);
        }

        if self.wobble_left > 0.0 {
            self.wobble_left -= dt;
        } else if ctx.core.rng.random::<f32>() < ctx.config.patrol_wobble_chance * dt {
            let angle = ctx.config.patrol_wobble_angle.abs();
            self.wobble = ctx.core.rng.random_range(-angle..=angle);
            self.wobble_left = WOBBLE_DURATION;
        }
        if self.wobble_left > 0.0
            && let Some(direction) = ctx.core.steering.direction
        {
            ctx.core.steering.direction = Some(rotate_yaw(direction, self.wobble));
        }

        ctx.core.track_target(ctx.config);
    }

    fn check_transitions(&self, ctx: &StateContext<'_>) -> Option<AgentState> {
        let perception = &ctx.core.perception;
        (perception.target_visible() && perception.target_distance <= ctx.config.detection_range)
            .then_some(AgentState::Chase)
    }
}

#[derive(Debug)]
struct ChaseState;

impl State<AgentState> for ChaseState {
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        info!("{} entered Chase", ctx.core.id);
        ctx.core.navigator.force_recompute();
        let position = ctx.core.position;
        ctx.core.stuck.reset(position);
    }

    fn on_update(&mut self, ctx: &mut StateContext<'_>, dt: Dt) {
        let dt = dt.as_secs_f32();
        let Some(target) = ctx.core.perception.target else {
            return;
        };

        let position = ctx.core.position;
        if ctx.core.stuck.sample(position, dt, ctx.config) {
            debug!("{} stuck while chasing, replanning", ctx.core.id);
            ctx.core.navigator.force_recompute();
        }

        drive_towards(ctx, target.position, dt);
        ctx.core.track_target(ctx.config);
    }

    fn check_transitions(&self, ctx: &StateContext<'_>) -> Option<AgentState> {
        let perception = &ctx.core.perception;
        if perception.target.is_none() {
            Some(AgentState::Patrol)
        } else if perception.target_visible()
            && perception.target_distance <= ctx.config.shooting_range
        {
            Some(AgentState::Attack)
        } else if !perception.has_line_of_sight
            && perception.target_distance > ctx.config.lose_target_distance()
        {
            Some(AgentState::Patrol)
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct AttackState;

impl State<AgentState> for AttackState {
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        info!("{} entered Attack", ctx.core.id);
        ctx.core.navigator.halt();
    }

    fn on_update(&mut self, ctx: &mut StateContext<'_>, _dt: Dt) {
        if let Some(target) = ctx.core.perception.target {
            ctx.core.steering.face_yaw = Some(yaw_of(target.position - ctx.core.position));
        }
        ctx.core.track_target(ctx.config);
        ctx.core.steering.wants_fire = true;
    }

    fn check_transitions(&self, ctx: &StateContext<'_>) -> Option<AgentState> {
        let perception = &ctx.core.perception;
        (!perception.target_visible()
            || perception.target_distance > ctx.config.break_attack_distance())
        .then_some(AgentState::Chase)
    }
}

/// Movement belongs entirely to the avoidance controller.
#[derive(Debug)]
struct SurvivingState;

impl State<AgentState> for SurvivingState {
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        info!("{} entered Surviving", ctx.core.id);
        ctx.core.navigator.halt();
    }

    fn on_update(&mut self, ctx: &mut StateContext<'_>, _dt: Dt) {
        let Some(threat) = ctx.core.perception.threat else {
            return;
        };

        let controller = AvoidanceController::from_config(ctx.config);
        let (world, config) = (ctx.world, ctx.config);
        let (id, origin) = (ctx.core.id, ctx.core.position);
        let probe = |direction: Vector3<f32>| probe_open_space(world, origin, direction, id, config);
        let (evasion, memory) =
            controller.choose_evasion(&threat, ctx.core.avoidance, probe, ctx.core.clock);
        ctx.core.avoidance = memory;

        ctx.core.steering.evading = true;
        if let Evasion::Move {
            direction,
            speed_multiplier,
            ..
        } = evasion
        {
            ctx.core.steering.direction = Some(direction);
            ctx.core.steering.speed_multiplier = speed_multiplier;
        }

        ctx.core.track_target(ctx.config);
        ctx.core.steering.wants_fire = !ctx.config.cant_shoot_while_fleeing;
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.core.avoidance.clear();
    }

    fn check_transitions(&self, ctx: &StateContext<'_>) -> Option<AgentState> {
        ctx.core
            .perception
            .threat
            .is_none()
            .then(|| reevaluate(ctx))
    }
}

/// Terminal state.
#[derive(Debug)]
struct DeadState;

impl State<AgentState> for DeadState {
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) {
        info!("{} destroyed", ctx.core.id);
        ctx.core.velocity = Vector3::zero();
        ctx.core.steering = Steering::default();
        ctx.core.navigator.discard_path();
        ctx.core.target = None;
        ctx.sink.report_death(ctx.core.id);
    }
}
