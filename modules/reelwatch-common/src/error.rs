use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelwatchError {
    #[error("Configuration error: {0}")]
    Config(String),
}
