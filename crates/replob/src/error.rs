#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Net(#[from] replob_net::NetError),

    #[error(transparent)]
    Config(#[from] replob_config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
