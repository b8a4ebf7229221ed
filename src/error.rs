use thiserror::Error;

#[derive(Error, Debug)]
pub enum CistatError {
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CloudWatch error: {0}")]
    Cloudwatch(String),
}

pub type Result<T> = std::result::Result<T, CistatError>;
