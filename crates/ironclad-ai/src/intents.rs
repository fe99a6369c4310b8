use crate::world::CombatSink;
use cgmath::Vector3;
use crossbeam::channel::{Receiver, Sender, unbounded};
use ironclad_core::AgentId;
use std::sync::Arc;

/// Represents the commands and notifications an agent hands to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Agent wants a shell spawned.
    Fire {
        owner: AgentId,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        speed: f32,
    },
    /// Agent died.
    Death { agent: AgentId },
    /// Agent took damage.
    Damage { agent: AgentId, amount: f32 },
}

/// Host-side end of the intent channel.
///
/// Cloning shares the same queue, so several host systems may drain it.
#[derive(Clone)]
pub struct IntentReceiver {
    queue: Arc<Receiver<Intent>>,
}

impl IntentReceiver {
    pub fn new(queue: Receiver<Intent>) -> Self {
        Self {
            queue: Arc::new(queue),
        }
    }

    /// Oldest queued intent, without waiting.
    pub fn try_recv(&self) -> Option<Intent> {
        self.queue.try_recv().ok()
    }

    /// Takes everything queued so far, oldest first.
    pub fn try_recv_all(&self) -> Vec<Intent> {
        self.queue.try_iter().collect()
    }

    /// Drains the queue lazily; stops at the first empty poll.
    pub fn iter(&self) -> impl Iterator<Item = Intent> + '_ {
        self.queue.try_iter()
    }
}

/// Agent-side end of the intent channel, handed to agents as their [`CombatSink`].
///
/// Sending never blocks; intents for a host that dropped its receiver are
/// discarded.
#[derive(Clone)]
pub struct IntentSender {
    queue: Sender<Intent>,
}

impl IntentSender {
    pub fn new(queue: Sender<Intent>) -> Self {
        Self { queue }
    }

    /// Queues `intent`; `false` once the receiver is gone.
    pub fn send(&self, intent: Intent) -> bool {
        self.queue.send(intent).is_ok()
    }
}

impl CombatSink for IntentSender {
    fn fire_weapon(&self, origin: Vector3<f32>, direction: Vector3<f32>, speed: f32, owner: AgentId) {
        self.send(Intent::Fire {
            owner,
            origin,
            direction,
            speed,
        });
    }

    fn report_death(&self, agent: AgentId) {
        self.send(Intent::Death { agent });
    }

    fn report_damage(&self, agent: AgentId, amount: f32) {
        self.send(Intent::Damage { agent, amount });
    }
}

/// Unbounded sender/receiver pair shared by all agents of one host.
pub fn create_intent_channel() -> (IntentSender, IntentReceiver) {
    let (tx, rx) = unbounded();
    (IntentSender::new(tx), IntentReceiver::new(rx))
}
