use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("required when period is custom")]
    MissingDate { field: &'static str },

    #[error("must not be after the end date")]
    InvertedRange { field: &'static str },

    #[error("range spans {days} days, at most {max} allowed")]
    RangeTooLong { field: &'static str, days: i64, max: i64 },

    #[error("unknown period '{0}'")]
    UnknownPeriod(String),
}

impl ReportError {
    /// Query field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            ReportError::InvalidDate { field, .. }
            | ReportError::MissingDate { field }
            | ReportError::InvertedRange { field }
            | ReportError::RangeTooLong { field, .. } => *field,
            ReportError::UnknownPeriod(_) => "period",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
