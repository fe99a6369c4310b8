#[allow(unused)]
pub use crate::{
    agent::{Agent, FireCommand, Health, TickOutput},
    aim::{AimController, FireControl},
    avoidance::{AvoidanceController, AvoidanceMemory, Evasion, EvasionSide, probe_open_space},
    diagnostics::AgentSnapshot,
    fsm::{FiniteStateMachine, State, StateContext, StateIdentifier},
    grid::GridCell,
    intents::{Intent, IntentReceiver, IntentSender, create_intent_channel},
    navigation::{Navigator, PlanOutcome, StuckDetector},
    pathfinding::{DistanceHeuristic, Path, PathPlanner, uniform_cost, wall_proximity_cost},
    profile::{AiProfile, Capabilities},
    states::AgentState,
    threat::{ThreatAssessor, ThreatRecord},
    world::{CombatSink, GridWorldQuery, ProjectileHandle, TargetSnapshot, WorldBounds},
};
pub use ironclad_core::{AgentConfig, AgentId, ConfigError, Dt, FireCooldown, ProjectileId};
