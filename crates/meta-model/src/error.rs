use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetaError {
    /// Fewer than two valid studies remain after validation.
    #[error("insufficient data: {available} valid studies, at least 2 required")]
    InsufficientData { available: usize },
    /// An analysis option is outside its accepted range.
    #[error("invalid option {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, MetaError>;
