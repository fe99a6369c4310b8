use bitflags::bitflags;

bitflags! {
    /// Optional sub-behaviours an agent runs with.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Navigate with A*; straight-line movement otherwise.
        const PATHFINDING      = 1 << 0;
        /// Scan for incoming shells and evade them.
        const THREAT_AVOIDANCE = 1 << 1;
        /// Start in a timed spawn-in state before the AI activates.
        const SPAWN_IN         = 1 << 2;
        /// Aim ahead of moving targets.
        const LEAD_TARGET      = 1 << 3;
    }
}

/// Preset capability sets for the enemy families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AiProfile {
    /// Drives straight at things and never dodges.
    Simple,
    /// Adds grid pathfinding.
    #[default]
    Patrolling,
    /// Adds threat avoidance and lead prediction.
    ThreatAware,
}

impl AiProfile {
    pub fn capabilities(self) -> Capabilities {
        match self {
            AiProfile::Simple => Capabilities::empty(),
            AiProfile::Patrolling => Capabilities::PATHFINDING,
            AiProfile::ThreatAware => {
                Capabilities::PATHFINDING
                    | Capabilities::THREAT_AVOIDANCE
                    | Capabilities::LEAD_TARGET
            }
        }
    }

    /// The profile's capabilities plus the spawn-in pre-state.
    pub fn with_spawn_in(self) -> Capabilities {
        self.capabilities() | Capabilities::SPAWN_IN
    }
}

impl From<AiProfile> for Capabilities {
    fn from(profile: AiProfile) -> Self {
        profile.capabilities()
    }
}

impl std::fmt::Display for AiProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiProfile::Simple => write!(f, "simple"),
            AiProfile::Patrolling => write!(f, "patrolling"),
            AiProfile::ThreatAware => write!(f, "threat-aware"),
        }
    }
}
