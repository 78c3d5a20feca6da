use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Lifecycle state of a call.
///
/// Calls start `Queued`, move to `Running`, and end in one of the terminal
/// states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    #[default]
    Queued,
    Running,
    Success,
    Error,
    Timeout,
    Cancelled,
}

impl CallStatus {
    /// Returns `true` once the call can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Error | Self::Timeout | Self::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "timeout" => Ok(Self::Timeout),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(TypeError::InvalidCallStatus(other.to_string())),
        }
    }
}

/// One invocation record of a route.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub id: String,
    pub app_id: String,
    pub path: String,
    pub status: CallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Call {
    /// A freshly queued call with a new time-ordered id.
    pub fn new(app_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            app_id: app_id.into(),
            path: path.into(),
            status: CallStatus::Queued,
            created_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// A copy of this call moved to `status`, stamping the matching
    /// timestamp. Used to build the `to` side of a conditional update.
    pub fn transitioned(&self, status: CallStatus) -> Self {
        let mut next = self.clone();
        next.status = status;
        let now = Utc::now();
        if status == CallStatus::Running && next.started_at.is_none() {
            next.started_at = Some(now);
        }
        if status.is_terminal() {
            next.completed_at = Some(now);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_call_is_queued() {
        let call = Call::new("app-id", "/hello");
        assert_eq!(call.status, CallStatus::Queued);
        assert!(!call.id.is_empty());
        assert!(call.created_at.is_some());
        assert!(call.started_at.is_none());
    }

    #[test]
    fn transition_stamps_timestamps() {
        let call = Call::new("app-id", "/hello");
        let running = call.transitioned(CallStatus::Running);
        assert!(running.started_at.is_some());
        assert!(running.completed_at.is_none());

        let done = running.transitioned(CallStatus::Success);
        assert_eq!(done.started_at, running.started_at);
        assert!(done.completed_at.is_some());
        // The source is untouched.
        assert_eq!(call.status, CallStatus::Queued);
    }

    #[test]
    fn terminal_states() {
        assert!(!CallStatus::Queued.is_terminal());
        assert!(!CallStatus::Running.is_terminal());
        assert!(CallStatus::Success.is_terminal());
        assert!(CallStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_string_forms_agree() {
        for status in [
            CallStatus::Queued,
            CallStatus::Running,
            CallStatus::Success,
            CallStatus::Error,
            CallStatus::Timeout,
            CallStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<CallStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().into())
            );
        }
        assert!("done".parse::<CallStatus>().is_err());
    }
}
