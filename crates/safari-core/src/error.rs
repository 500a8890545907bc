//! Failure taxonomy shared by the store, the cache and the coordinator.

use std::fmt;

/// Broad category of a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Transport-level error with no HTTP response (DNS, refused, timeout)
    Network,
    /// 5xx response
    Server,
    /// 4xx response, usually with a structured `{"error": ...}` body
    Validation,
    /// Referenced record does not exist
    NotFound,
    /// Missing or rejected credential (401/403)
    Unauthorized,
    /// Caller-side precondition not met; nothing was sent
    Precondition,
    /// Response body did not have the expected shape
    Decode,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::Server => "server",
            FailureKind::Validation => "validation",
            FailureKind::NotFound => "not_found",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Precondition => "precondition",
            FailureKind::Decode => "decode",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed store call or mutation step
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} failure: {message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// HTTP status when the backend answered
    pub status: Option<u16>,
}

pub type Result<T> = std::result::Result<T, Failure>;

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Network, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Precondition, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Decode, message)
    }

    fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Map a non-2xx response to a failure.
    ///
    /// The message is taken from the body's `error` or `message` field when the
    /// body is a JSON object, otherwise a generic `HTTP <status>` text is used.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = error_detail(body);
        let kind = match status {
            401 | 403 => FailureKind::Unauthorized,
            404 => FailureKind::NotFound,
            400..=499 => FailureKind::Validation,
            _ => FailureKind::Server,
        };
        let message = detail.unwrap_or_else(|| format!("HTTP {}", status));
        Self::new(kind, message).with_status(status)
    }

    /// Whether the caller should send the session back through login
    pub fn requires_login(&self) -> bool {
        self.kind == FailureKind::Unauthorized
    }

    /// Short human-readable text for a toast notification
    pub fn user_message(&self) -> String {
        match self.kind {
            FailureKind::Network => format!("Network error: {}", self.message),
            FailureKind::Server => match self.status {
                Some(status) => format!("Server error ({}): {}", status, self.message),
                None => format!("Server error: {}", self.message),
            },
            FailureKind::Validation => self.message.clone(),
            FailureKind::NotFound => format!("Not found: {}", self.message),
            FailureKind::Unauthorized => "Your session has expired. Please log in again.".into(),
            FailureKind::Precondition => self.message.clone(),
            FailureKind::Decode => format!("Unexpected response from server: {}", self.message),
        }
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Failure::decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return Failure::from_status(status.as_u16(), "");
        }
        if err.is_timeout() {
            return Failure::network(format!("request timed out: {}", err));
        }
        Failure::network(err.to_string())
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Failure::decode(err.to_string())
    }
}

fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    ["error", "message"]
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(Failure::from_status(400, "").kind, FailureKind::Validation);
        assert_eq!(Failure::from_status(401, "").kind, FailureKind::Unauthorized);
        assert_eq!(Failure::from_status(403, "").kind, FailureKind::Unauthorized);
        assert_eq!(Failure::from_status(404, "").kind, FailureKind::NotFound);
        assert_eq!(Failure::from_status(409, "").kind, FailureKind::Validation);
        assert_eq!(Failure::from_status(500, "").kind, FailureKind::Server);
        assert_eq!(Failure::from_status(503, "").status, Some(503));
    }

    #[test]
    fn structured_body_supplies_message() {
        let failure = Failure::from_status(400, r#"{"error":"Email already in use"}"#);
        assert_eq!(failure.message, "Email already in use");
        assert_eq!(failure.user_message(), "Email already in use");

        let failure = Failure::from_status(400, r#"{"message":"Bad role"}"#);
        assert_eq!(failure.message, "Bad role");
    }

    #[test]
    fn unstructured_body_falls_back_to_status() {
        let failure = Failure::from_status(502, "<html>bad gateway</html>");
        assert_eq!(failure.message, "HTTP 502");
        assert_eq!(failure.user_message(), "Server error (502): HTTP 502");
    }

    #[test]
    fn unauthorized_requires_login() {
        assert!(Failure::from_status(401, "").requires_login());
        assert!(!Failure::network("refused").requires_login());
    }
}
