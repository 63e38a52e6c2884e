use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Error, Debug)]
pub enum Error {
    /// The notification probe failed for a reason other than "unsupported".
    #[error("Capability probe failed: {0}")]
    Probe(String),

    #[error("Subscription to collector '{collector}' failed: {source}")]
    Subscription {
        collector: String,
        #[source]
        source: TelemetryError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

// Process exit codes used by the gcwatch binary.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const PROBE_FAILED: i32 = 3;
    pub const SUBSCRIPTION_FAILED: i32 = 4;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Probe(_) => exit_code::PROBE_FAILED,
            Error::Subscription { .. } => exit_code::SUBSCRIPTION_FAILED,
        }
    }
}
