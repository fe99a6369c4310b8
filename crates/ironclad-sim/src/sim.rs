//! Fixed-step arena loop.
//!
//! Every tick the agents run in parallel against one immutable [`WorldView`].
//! Their shots and death reports arrive over the intent channel and are
//! applied afterwards, so no agent ever sees a half-updated world.

use crate::errors::{SimError, SimResult};
use crate::map::{ArenaMap, WorldView};
use crate::projectiles::ShellPool;
use cgmath::{InnerSpace, Vector3, Zero};
use ironclad_ai::agent::{Agent, Health, TURRET_HEIGHT};
use ironclad_ai::grid::GridCell;
use ironclad_ai::intents::{Intent, IntentReceiver, IntentSender, create_intent_channel};
use ironclad_ai::profile::AiProfile;
use ironclad_ai::world::TargetSnapshot;
use ironclad_core::math::{direction_from_yaw, normalize_or_zero, planar_distance};
use ironclad_core::{AgentConfig, AgentId, Dt};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::f32::consts::TAU;
use std::time::Duration;

/// Id of the scripted player tank every agent hunts.
pub const PLAYER: AgentId = AgentId(0);

const SHELL_DAMAGE: f32 = 25.0;
const PLAYER_HEALTH: f32 = 400.0;
const PLAYER_ORBIT_RADIUS: f32 = 6.0;
const PLAYER_ORBIT_SPEED: f32 = 0.3;
const PLAYER_FIRE_INTERVAL: f32 = 1.5;

const PROFILES: [AiProfile; 3] = [AiProfile::Simple, AiProfile::Patrolling, AiProfile::ThreatAware];

#[derive(Debug, Clone, Copy)]
pub struct SimSettings {
    pub agents: usize,
    pub seed: u64,
    /// Simulation ticks per second.
    pub hz: u32,
    pub half_extent: i32,
    pub wall_segments: usize,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            agents: 6,
            seed: 42,
            hz: 20,
            half_extent: 20,
            wall_segments: 12,
        }
    }
}

/// Running totals reported in the periodic summary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimStats {
    pub ticks: u64,
    pub shots_fired: usize,
    pub hits: usize,
    pub damage_dealt: f32,
    pub deaths: usize,
}

/// Scripted target: orbits the arena centre and shoots at the nearest agent.
#[derive(Debug)]
struct Player {
    angle: f32,
    position: Vector3<f32>,
    velocity: Vector3<f32>,
    health: Health,
    cooldown: f32,
}

impl Player {
    fn new() -> Self {
        Self {
            angle: 0.0,
            position: direction_from_yaw(0.0) * PLAYER_ORBIT_RADIUS,
            velocity: Vector3::zero(),
            health: Health::full(PLAYER_HEALTH),
            cooldown: PLAYER_FIRE_INTERVAL,
        }
    }

    fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            id: PLAYER,
            position: self.position,
            velocity: self.velocity,
            alive: self.health.is_alive(),
        }
    }

    fn advance(&mut self, dt: f32) {
        if !self.health.is_alive() {
            self.velocity = Vector3::zero();
            return;
        }
        self.angle = (self.angle + PLAYER_ORBIT_SPEED * dt) % TAU;
        let next = direction_from_yaw(self.angle) * PLAYER_ORBIT_RADIUS;
        self.velocity = (next - self.position) / dt;
        self.position = next;
        self.cooldown -= dt;
    }
}

pub struct Simulation {
    map: ArenaMap,
    agents: Vec<Agent>,
    player: Player,
    shells: ShellPool,
    sender: IntentSender,
    receiver: IntentReceiver,
    config: AgentConfig,
    dt: Dt,
    hz: u32,
    stats: SimStats,
}

impl Simulation {
    /// Builds the arena and spawns the agents on a ring around the centre.
    ///
    /// # Returns
    ///
    /// An error when `config` fails validation or the arena cannot hold the agents.
    pub fn new(settings: SimSettings, config: AgentConfig) -> SimResult<Self> {
        config.validate()?;
        if settings.hz == 0 {
            return Err(SimError::InvalidTickRate(settings.hz));
        }
        let side = settings.half_extent * 2 + 1;
        if settings.half_extent < 5 || settings.agents > (side * 2) as usize {
            return Err(SimError::ArenaTooSmall {
                size: side,
                agents: settings.agents,
            });
        }

        let mut rng = StdRng::seed_from_u64(settings.seed);
        let map = ArenaMap::new(config.cell_size, settings.half_extent)
            .with_random_walls(settings.wall_segments, &mut rng);
        info!(
            "Arena {side}x{side} with {} wall cells, {} agents",
            map.wall_count(),
            settings.agents
        );

        let spawn_radius = settings.half_extent as f32 * 0.6 * config.cell_size;
        let mut agents = Vec::with_capacity(settings.agents);
        for i in 0..settings.agents {
            let yaw = TAU * i as f32 / settings.agents as f32;
            let preferred = GridCell::from_world(direction_from_yaw(yaw) * spawn_radius, config.cell_size);
            let Some(cell) = map.nearest_open(preferred) else {
                warn!("No open cell near {preferred:?}, skipping agent {i}");
                continue;
            };
            let profile = PROFILES[i % PROFILES.len()];
            let id = AgentId(i as u32 + 1);
            let mut agent = Agent::new(
                id,
                cell.to_world(config.cell_size),
                profile.with_spawn_in(),
                settings.seed,
            )
            .with_yaw(yaw + TAU / 2.0);
            agent.request_target(PLAYER);
            debug!("Spawned {id} ({profile}) at {cell:?}");
            agents.push(agent);
        }

        let (sender, receiver) = create_intent_channel();
        Ok(Self {
            map,
            agents,
            player: Player::new(),
            shells: ShellPool::new(),
            sender,
            receiver,
            config,
            dt: Duration::from_secs_f64(1.0 / f64::from(settings.hz)),
            hz: settings.hz,
            stats: SimStats::default(),
        })
    }

    pub fn dt(&self) -> Dt {
        self.dt
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn player_alive(&self) -> bool {
        self.player.health.is_alive()
    }

    /// Nothing left to fight over.
    pub fn is_finished(&self) -> bool {
        !self.player_alive() || self.agents.iter().all(Agent::is_dead)
    }

    fn tank_snapshots(&self) -> Vec<TargetSnapshot> {
        std::iter::once(self.player.snapshot())
            .chain(self.agents.iter().map(|agent| TargetSnapshot {
                id: agent.id(),
                position: agent.position(),
                velocity: agent.velocity(),
                alive: !agent.is_dead(),
            }))
            .collect()
    }

    /// Advances the whole arena by one fixed step.
    pub fn step(&mut self) {
        let dt = self.dt;
        let dt_secs = dt.as_secs_f32();

        let view = WorldView {
            map: &self.map,
            tanks: self.tank_snapshots(),
            projectiles: self.shells.handles(),
        };
        let (sender, config) = (&self.sender, &self.config);
        let fired = self
            .agents
            .par_iter_mut()
            .map(|agent| agent.tick(dt, &view, sender, config))
            .filter(|out| out.fire.is_some())
            .count();
        self.stats.shots_fired += fired;

        self.player.advance(dt_secs);
        self.player_fire();
        self.drain_intents();

        let tanks = self.tank_snapshots();
        let hits = self
            .shells
            .step(dt_secs, &self.map, &tanks, self.config.tank_radius);
        for hit in hits {
            debug!("{} from {} hit {}", hit.projectile, hit.owner, hit.victim);
            self.stats.hits += 1;
            if hit.victim == PLAYER {
                self.stats.damage_dealt += SHELL_DAMAGE;
                if self.player.health.damage(SHELL_DAMAGE) {
                    info!("Player destroyed by {}", hit.owner);
                }
            } else if let Some(agent) = self.agents.iter_mut().find(|a| a.id() == hit.victim) {
                agent.apply_damage(SHELL_DAMAGE, Some(hit.owner), &self.sender);
            }
        }
        self.drain_intents();

        self.stats.ticks += 1;
        if self.stats.ticks % u64::from(self.hz) == 0 {
            self.log_summary();
        }
    }

    /// Runs up to `ticks` steps, stopping early once the fight is over.
    pub fn run_for(&mut self, ticks: u64) -> SimStats {
        for _ in 0..ticks {
            if self.is_finished() {
                break;
            }
            self.step();
        }
        self.stats
    }

    fn player_fire(&mut self) {
        if !self.player.health.is_alive() || self.player.cooldown > 0.0 {
            return;
        }
        let origin = self.player.position;
        let nearest = self
            .agents
            .iter()
            .filter(|agent| !agent.is_dead())
            .min_by(|a, b| {
                planar_distance(a.position(), origin).total_cmp(&planar_distance(b.position(), origin))
            });
        let Some(target) = nearest else {
            return;
        };
        let direction = normalize_or_zero(target.position() - origin);
        if direction.magnitude2() == 0.0 {
            return;
        }
        let muzzle = origin + Vector3::unit_y() * TURRET_HEIGHT + direction * self.config.tank_radius * 1.5;
        self.shells
            .spawn(PLAYER, muzzle, direction, self.config.projectile_speed);
        self.player.cooldown = PLAYER_FIRE_INTERVAL;
    }

    fn drain_intents(&mut self) {
        for intent in self.receiver.try_recv_all() {
            match intent {
                Intent::Fire {
                    owner,
                    origin,
                    direction,
                    speed,
                } => {
                    self.shells.spawn(owner, origin, direction, speed);
                }
                Intent::Death { agent } => {
                    self.stats.deaths += 1;
                    info!("{agent} destroyed");
                }
                Intent::Damage { agent, amount } => {
                    self.stats.damage_dealt += amount;
                    debug!("{agent} took {amount:.0} damage");
                }
            }
        }
    }

    fn log_summary(&self) {
        let alive = self.agents.iter().filter(|a| !a.is_dead()).count();
        info!(
            "t={:.1}s alive {alive}/{} shells {} shots {} hits {} player hp {:.0}",
            self.stats.ticks as f32 * self.dt.as_secs_f32(),
            self.agents.len(),
            self.shells.len(),
            self.stats.shots_fired,
            self.stats.hits,
            self.player.health.current(),
        );
        for agent in &self.agents {
            debug!("{}", agent.snapshot());
        }
    }
}
