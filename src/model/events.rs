use serde::Serialize;
use std::fmt;

/// An event the daemon is asked to collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaemonEvent {
    pub name: String,
    /// Number of events between two samples.
    pub count: u64,
    pub unit_mask: u32,
    pub counter: u32,
}

impl DaemonEvent {
    pub fn new(name: impl Into<String>, count: u64, unit_mask: u32) -> Self {
        DaemonEvent {
            name: name.into(),
            count,
            unit_mask,
            counter: 0,
        }
    }

    pub fn on_counter(mut self, counter: u32) -> Self {
        self.counter = counter;
        self
    }
}

/// A single verdict reported in a check-events document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventCheckStatus {
    Ok,
    InvalidEvent,
    InvalidUnitMask,
    InvalidCounter,
    InvalidCount,
    Other(String),
}

impl EventCheckStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "ok" => EventCheckStatus::Ok,
            "invalid-event" => EventCheckStatus::InvalidEvent,
            "invalid-um" => EventCheckStatus::InvalidUnitMask,
            "invalid-counter" => EventCheckStatus::InvalidCounter,
            "invalid-count" => EventCheckStatus::InvalidCount,
            other => EventCheckStatus::Other(other.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, EventCheckStatus::Ok)
    }
}

impl fmt::Display for EventCheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventCheckStatus::Ok => f.write_str("event settings are valid"),
            EventCheckStatus::InvalidEvent => f.write_str("event is not supported by this counter"),
            EventCheckStatus::InvalidUnitMask => f.write_str("unit mask is not valid for this event"),
            EventCheckStatus::InvalidCounter => f.write_str("counter does not exist"),
            EventCheckStatus::InvalidCount => {
                f.write_str("count is below the minimum allowed for this event")
            }
            EventCheckStatus::Other(code) => write!(f, "opxml reported `{}`", code),
        }
    }
}

/// Outcome of validating an event setting.
///
/// An invalid setting is a successful parse: callers inspect `valid` and `reason` instead
/// of handling an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckEventsResult {
    pub valid: bool,
    pub reason: Option<String>,
    pub statuses: Vec<EventCheckStatus>,
}

impl CheckEventsResult {
    pub(crate) fn from_statuses(statuses: Vec<EventCheckStatus>) -> Self {
        let mut result = CheckEventsResult {
            statuses,
            ..CheckEventsResult::default()
        };
        result.conclude();
        result
    }

    /// Derives `valid` and `reason` from the collected statuses.
    pub(crate) fn conclude(&mut self) {
        if self.statuses.is_empty() {
            self.valid = false;
            self.reason = Some("opxml reported no result for the event check".to_string());
            return;
        }

        let failures: Vec<String> = self
            .statuses
            .iter()
            .filter(|s| !s.is_ok())
            .map(ToString::to_string)
            .collect();

        self.valid = failures.is_empty();
        self.reason = if failures.is_empty() {
            None
        } else {
            Some(failures.join("; "))
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_statuses_is_not_valid() {
        let result = CheckEventsResult::from_statuses(vec![]);
        assert!(!result.valid);
        assert!(result.reason.is_some());
    }

    #[test]
    fn test_reason_lists_every_failure() {
        let result = CheckEventsResult::from_statuses(vec![
            EventCheckStatus::Ok,
            EventCheckStatus::InvalidUnitMask,
            EventCheckStatus::from_code("weird"),
        ]);

        assert!(!result.valid);
        assert_eq!(
            result.reason.as_deref(),
            Some("unit mask is not valid for this event; opxml reported `weird`")
        );
    }
}
