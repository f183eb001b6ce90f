use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShuntError {
    #[error("not initialized: no .shunt/config.yaml under {0}")]
    NotInitialized(String),

    #[error("table file not found: {0}")]
    TableNotFound(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("failed to spawn executor for task '{task}': {reason}")]
    ExecutorSpawn { task: String, reason: String },

    #[error("command channel error: {0}")]
    Channel(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ShuntError>;
