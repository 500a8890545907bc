//! Toast notifications built from outcomes and failures.

use std::fmt;

use serde::Serialize;

use crate::error::Failure;
use crate::sync::{MutationOutcome, OutcomeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.message)
    }
}

impl From<&MutationOutcome> for Notification {
    fn from(outcome: &MutationOutcome) -> Self {
        let level = match outcome.state {
            OutcomeState::Success => Level::Success,
            OutcomeState::PartialSuccess => Level::Warning,
            OutcomeState::Failed => Level::Error,
        };
        let mut message = outcome.message.clone();
        if let Some(failure) = outcome.refresh_failure.as_ref() {
            message.push_str(&format!(
                " (the list could not be reloaded: {})",
                failure.user_message()
            ));
        }
        Self::new(level, message)
    }
}

impl From<&Failure> for Notification {
    fn from(failure: &Failure) -> Self {
        Self::new(Level::Error, failure.user_message())
    }
}
