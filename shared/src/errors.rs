//! Shared error types for the differential-privacy explorer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Unknown statistic: {input}")]
    UnknownStatistic { input: String },
}
