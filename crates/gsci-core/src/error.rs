use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GsciError {
    #[error("Invalid weight{}: {reason}", .date.map(|d| format!(" on {d}")).unwrap_or_default())]
    InvalidWeight {
        date: Option<NaiveDate>,
        reason: String,
    },

    #[error("Missing prior effective weight for {commodity} on {date}: cannot freeze without a carry-forward basis")]
    MissingPriorWeight { commodity: String, date: NaiveDate },

    #[error("Missing price for {commodity} on {date}")]
    MissingPrice { commodity: String, date: NaiveDate },

    #[error("Invalid date sequence: {current} does not follow {previous}")]
    InvalidDateSequence {
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Run already finalized at {last_date}; start a new run to continue the series")]
    RunFinalized { last_date: NaiveDate },

    #[error("{source_kind} source error: {reason}")]
    DataSource { source_kind: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl GsciError {
    /// Attach a calculation date to a weight error raised by a date-agnostic helper.
    pub(crate) fn on_date(self, date: NaiveDate) -> Self {
        match self {
            GsciError::InvalidWeight { date: None, reason } => GsciError::InvalidWeight {
                date: Some(date),
                reason,
            },
            other => other,
        }
    }
}

impl From<serde_json::Error> for GsciError {
    fn from(e: serde_json::Error) -> Self {
        GsciError::SerializationError(e.to_string())
    }
}
