use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Tile color used when none is given.
pub const DEFAULT_COLOR: &str = "#6366F1";

/// Upper bound for an event value: one day in seconds.
pub const MAX_EVENT_VALUE: u32 = 86_400;

/// How progress on a task is aggregated.
///
/// Stored as a lowercase string. A value that is none of the known
/// metrics is kept verbatim in `Unknown` so a drifted record still loads.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
#[serde(from = "String", into = "String")]
pub enum MetricType {
    /// Increment per tap.
    #[default]
    Count,
    /// Start/stop timer sessions.
    Timer,
    /// Checkbox complete.
    Check,
    Unknown(String),
}

impl MetricType {
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::Count => "count",
            MetricType::Timer => "timer",
            MetricType::Check => "check",
            MetricType::Unknown(raw) => raw,
        }
    }

    /// Whether events of type `kind` are meaningful for this metric.
    pub fn accepts(&self, kind: EventType) -> bool {
        match self {
            MetricType::Count => kind == EventType::Increment,
            MetricType::Timer => matches!(kind, EventType::TimerStart | EventType::TimerStop),
            MetricType::Check => kind == EventType::Check,
            MetricType::Unknown(_) => false,
        }
    }
}

impl From<String> for MetricType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "count" => MetricType::Count,
            "timer" => MetricType::Timer,
            "check" => MetricType::Check,
            _ => MetricType::Unknown(raw),
        }
    }
}

impl From<MetricType> for String {
    fn from(metric: MetricType) -> Self {
        match metric {
            MetricType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for MetricType {
    type Err = String;

    /// Strict parse for user input: unknown metrics are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match MetricType::from(s.trim().to_lowercase()) {
            MetricType::Unknown(raw) => {
                Err(format!("unknown metric '{}'. Use count, timer or check.", raw))
            }
            known => Ok(known),
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of fact recorded against a task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Increment,
    TimerStart,
    TimerStop,
    Check,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Increment => "increment",
            EventType::TimerStart => "timer_start",
            EventType::TimerStop => "timer_stop",
            EventType::Check => "check",
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "increment" => Ok(EventType::Increment),
            "timer_start" => Ok(EventType::TimerStart),
            "timer_stop" => Ok(EventType::TimerStop),
            "check" => Ok(EventType::Check),
            other => Err(format!(
                "unknown event type '{}'. Use increment, timer_start, timer_stop or check.",
                other
            )),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a single trackable task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub name: String,
    /// Tile color as `#RRGGBB`.
    pub color: String,
    /// Aggregation semantics, fixed at creation.
    pub metric: MetricType,
    /// Goal units (sets, seconds, checks).
    #[serde(default)]
    pub goal: Option<u32>,
    /// Template this task was generated from, if any. May dangle.
    #[serde(default)]
    pub template_id: Option<String>,
    /// Day this task belongs to, if it was scheduled.
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// A recurring task definition expanded onto dates by weekday.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub color: String,
    pub metric: MetricType,
    #[serde(default)]
    pub goal: Option<u32>,
    /// Weekdays the template fires on, Monday = 0 .. Sunday = 6. Sorted, unique.
    pub active_days: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// An immutable timestamped fact about a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Increment amount or elapsed seconds for `timer_stop`.
    #[serde(default)]
    pub value: Option<u32>,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_metric_survives_roundtrip() {
        let metric: MetricType = serde_json::from_str("\"streak\"").unwrap();
        assert_eq!(metric, MetricType::Unknown("streak".into()));
        assert_eq!(serde_json::to_string(&metric).unwrap(), "\"streak\"");
    }

    #[test]
    fn strict_parse_rejects_unknown_metric() {
        assert_eq!("Timer".parse::<MetricType>(), Ok(MetricType::Timer));
        assert!("streak".parse::<MetricType>().is_err());
    }

    #[test]
    fn metric_accepts_only_matching_events() {
        assert!(MetricType::Count.accepts(EventType::Increment));
        assert!(!MetricType::Count.accepts(EventType::Check));
        assert!(MetricType::Timer.accepts(EventType::TimerStart));
        assert!(MetricType::Timer.accepts(EventType::TimerStop));
        assert!(!MetricType::Unknown("x".into()).accepts(EventType::Check));
    }

    #[test]
    fn event_type_serializes_as_type_field() {
        let json = serde_json::json!({
            "id": "e1",
            "task_id": "t1",
            "type": "timer_stop",
            "value": 90,
            "at": "2024-06-03T08:00:00Z",
        });
        let event: Event = serde_json::from_value(json).unwrap();
        assert_eq!(event.kind, EventType::TimerStop);
        assert_eq!(event.value, Some(90));
    }
}
