use crate::map::ArenaMap;
use cgmath::Vector3;
use ironclad_ai::world::{ProjectileHandle, TargetSnapshot};
use ironclad_core::math::planar_distance;
use ironclad_core::{AgentId, ProjectileId};
use log::trace;

/// Seconds a shell flies before it is discarded.
const SHELL_LIFETIME: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shell {
    pub id: ProjectileId,
    pub owner: AgentId,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    age: f32,
}

impl Shell {
    pub fn handle(&self) -> ProjectileHandle {
        ProjectileHandle {
            id: self.id,
            position: self.position,
            velocity: self.velocity,
            owner: self.owner,
        }
    }
}

/// A shell that struck a tank this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub projectile: ProjectileId,
    pub owner: AgentId,
    pub victim: AgentId,
}

/// Live shells in flight.
#[derive(Debug, Default)]
pub struct ShellPool {
    next_id: u64,
    live: Vec<Shell>,
}

impl ShellPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(
        &mut self,
        owner: AgentId,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        speed: f32,
    ) -> ProjectileId {
        self.next_id += 1;
        let id = ProjectileId(self.next_id);
        self.live.push(Shell {
            id,
            owner,
            position: origin,
            velocity: direction * speed,
            age: 0.0,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn handles(&self) -> Vec<ProjectileHandle> {
        self.live.iter().map(Shell::handle).collect()
    }

    /// Moves every shell and resolves collisions.
    ///
    /// Shells that leave the arena, hit a wall, expire or hit a tank other
    /// than their owner are removed.
    ///
    /// # Returns
    ///
    /// The tank hits of this step.
    pub fn step(&mut self, dt: f32, map: &ArenaMap, tanks: &[TargetSnapshot], hit_radius: f32) -> Vec<Hit> {
        let mut hits = Vec::new();
        self.live.retain_mut(|shell| {
            let from = shell.position;
            shell.position += shell.velocity * dt;
            shell.age += dt;

            let victim = tanks.iter().find(|tank| {
                tank.alive && tank.id != shell.owner && planar_distance(tank.position, shell.position) <= hit_radius
            });
            if let Some(victim) = victim {
                hits.push(Hit {
                    projectile: shell.id,
                    owner: shell.owner,
                    victim: victim.id,
                });
                return false;
            }
            if map.segment_blocked(from, shell.position) {
                trace!("{} hit a wall", shell.id);
                return false;
            }
            shell.age < SHELL_LIFETIME && map.bounds().contains(shell.position)
        });
        hits
    }
}
