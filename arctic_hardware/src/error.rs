use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("no controller interface at index {index} ({count} found)")]
    NoDevice { index: usize, count: usize },
    #[error("device not open")]
    NotOpen,
    #[error("controller is disconnected or powered off")]
    Disconnected,
    #[error("timing firmware not found: {0}")]
    Firmware(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
