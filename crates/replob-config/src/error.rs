#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("environment variable {name} must be an integer, got {value:?}")]
    InvalidInt { name: &'static str, value: String },

    #[error("NODES must be between 1 and {max}, got {actual}")]
    NodeCountOutOfRange { actual: u64, max: u64 },

    #[error("NODE_ID must be between 1 and NODES ({nodes}), got {actual}")]
    NodeIdOutOfRange { actual: u64, nodes: u64 },

    #[error(transparent)]
    Layered(#[from] config::ConfigError),
}
