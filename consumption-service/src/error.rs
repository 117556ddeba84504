use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("record source error for meter {meter_id}: {message}")]
    Source { meter_id: i64, message: String },
    #[error("record sink error: {0}")]
    Sink(String),
    #[error("import error: {0}")]
    Import(String),
    #[error("record source for meter {meter_id} timed out after {after:?}")]
    Timeout { meter_id: i64, after: Duration },
    #[error("meter {meter_id} cancelled after a sibling meter failed")]
    Cancelled { meter_id: i64 },
    #[error("meter worker join error: {0}")]
    Join(String),
}

impl ServiceError {
    /// True for errors that are a consequence of another worker failing.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
