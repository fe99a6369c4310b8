//! Enemy tank agent AI.
//!
//! Each [`Agent`](agent::Agent) combines a finite state machine, grid A*
//! navigation, incoming-projectile avoidance and turret fire control. The host
//! drives it with one [`Agent::tick`](agent::Agent::tick) per fixed timestep
//! and reaches the game world only through [`world::GridWorldQuery`] and
//! [`world::CombatSink`].

#![forbid(unsafe_code)]

pub mod agent;
pub mod aim;
pub mod avoidance;
pub mod diagnostics;
pub mod fsm;
pub mod grid;
pub mod intents;
pub mod navigation;
pub mod pathfinding;
pub mod prelude;
pub mod profile;
pub mod states;
pub mod threat;
pub mod world;
