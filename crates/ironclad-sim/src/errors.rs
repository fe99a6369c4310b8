use ironclad_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid agent configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("arena of {size} cells cannot hold {agents} agents")]
    ArenaTooSmall { size: i32, agents: usize },

    #[error("tick rate must be positive, got {0}")]
    InvalidTickRate(u32),
}

pub type SimResult<T> = Result<T, SimError>;
