//! Status conditions
//!
//! Both resources record reconciliation history as a list of conditions.
//! `FoundationLoadBalancerConfig` uses the standard `metav1.Condition` shape
//! ([`Condition`]); `IPAddressAllocation` uses its own typed condition. The
//! [`HasConditions`] accessor gives generic status utilities uniform access to
//! either list, and [`set_status_condition`] implements the usual
//! merge-by-type semantics on top of it.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a condition holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, Default)]
pub enum ConditionStatus {
    /// The condition holds
    True,
    /// The condition does not hold
    False,
    /// The controller cannot tell yet
    #[default]
    Unknown,
}

impl ConditionStatus {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard Kubernetes condition (`metav1.Condition`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition in CamelCase
    pub r#type: String,

    /// Status of the condition: True, False or Unknown
    pub status: ConditionStatus,

    /// Generation of the object the condition was set against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Last time the condition transitioned from one status to another
    pub last_transition_time: DateTime<Utc>,

    /// Programmatic identifier for the last transition, in CamelCase
    pub reason: String,

    /// Human readable message about the transition
    pub message: String,
}

impl Condition {
    /// Create a condition stamped with the current time
    pub fn new(
        r#type: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            r#type: r#type.into(),
            status,
            observed_generation: None,
            last_transition_time: Utc::now(),
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Record the generation the condition was computed from
    #[must_use]
    pub fn with_observed_generation(mut self, generation: i64) -> Self {
        self.observed_generation = Some(generation);
        self
    }

    /// Override the transition time
    #[must_use]
    pub fn with_last_transition_time(mut self, time: DateTime<Utc>) -> Self {
        self.last_transition_time = time;
        self
    }
}

/// Common view over condition types so merge helpers work on any of them.
pub trait StatusCondition {
    /// The condition type as it appears on the wire
    fn condition_type(&self) -> &str;

    /// Current status of the condition
    fn condition_status(&self) -> ConditionStatus;

    /// Last transition time, if recorded
    fn last_transition_time(&self) -> Option<DateTime<Utc>>;

    /// Overwrite the last transition time
    fn set_last_transition_time(&mut self, time: DateTime<Utc>);
}

impl StatusCondition for Condition {
    fn condition_type(&self) -> &str {
        &self.r#type
    }

    fn condition_status(&self) -> ConditionStatus {
        self.status
    }

    fn last_transition_time(&self) -> Option<DateTime<Utc>> {
        Some(self.last_transition_time)
    }

    fn set_last_transition_time(&mut self, time: DateTime<Utc>) {
        self.last_transition_time = time;
    }
}

/// Uniform read/write access to the condition list of a resource.
///
/// `set_conditions` replaces the list wholesale and keeps the given order.
/// Merging by type is left to [`set_status_condition`] or the caller.
pub trait HasConditions {
    /// Condition type stored in the resource's status
    type Condition: StatusCondition;

    /// Current conditions in insertion (transition) order
    fn conditions(&self) -> &[Self::Condition];

    /// Replace all conditions
    fn set_conditions(&mut self, conditions: Vec<Self::Condition>);
}

/// Insert or update a condition, keyed by its type.
///
/// When the status is unchanged the existing transition time is kept. When it
/// changes, the new time is used but never moves backwards past the previous
/// one. A missing time is stamped with the current time.
///
/// Returns `true` if the list changed.
pub fn set_status_condition<C>(conditions: &mut Vec<C>, mut condition: C) -> bool
where
    C: StatusCondition + PartialEq,
{
    let Some(existing) = conditions
        .iter_mut()
        .find(|c| c.condition_type() == condition.condition_type())
    else {
        if condition.last_transition_time().is_none() {
            condition.set_last_transition_time(Utc::now());
        }
        conditions.push(condition);
        return true;
    };

    let previous = existing.last_transition_time();
    let stamped = if existing.condition_status() == condition.condition_status() {
        previous
            .or_else(|| condition.last_transition_time())
            .unwrap_or_else(Utc::now)
    } else {
        let requested = condition.last_transition_time().unwrap_or_else(Utc::now);
        previous.map_or(requested, |p| requested.max(p))
    };
    condition.set_last_transition_time(stamped);

    if *existing == condition {
        return false;
    }
    *existing = condition;
    true
}

/// Remove the condition of the given type. Returns `true` if one was removed.
pub fn remove_status_condition<C: StatusCondition>(conditions: &mut Vec<C>, condition_type: &str) -> bool {
    let before = conditions.len();
    conditions.retain(|c| c.condition_type() != condition_type);
    conditions.len() != before
}

/// Find the condition of the given type.
pub fn find_status_condition<'a, C: StatusCondition>(
    conditions: &'a [C],
    condition_type: &str,
) -> Option<&'a C> {
    conditions.iter().find(|c| c.condition_type() == condition_type)
}

/// `true` if a condition of the given type exists with status `True`.
pub fn is_status_condition_true<C: StatusCondition>(conditions: &[C], condition_type: &str) -> bool {
    find_status_condition(conditions, condition_type)
        .is_some_and(|c| c.condition_status() == ConditionStatus::True)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_condition_status_wire_format() {
        assert_eq!(serde_json::to_string(&ConditionStatus::True).unwrap(), "\"True\"");
        assert_eq!(serde_json::to_string(&ConditionStatus::Unknown).unwrap(), "\"Unknown\"");
        assert!(serde_json::from_str::<ConditionStatus>("\"true\"").is_err());
    }

    #[test]
    fn test_condition_serializes_type_field() {
        let condition = Condition::new("Healthy", ConditionStatus::True, "Running", "all nodes up")
            .with_last_transition_time(at(1));
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["type"], "Healthy");
        assert_eq!(json["status"], "True");
        assert_eq!(json["lastTransitionTime"], "2024-01-01T01:00:00Z");
        assert!(json.get("observedGeneration").is_none());
    }

    #[test]
    fn test_set_status_condition_appends_new_type() {
        let mut conditions = vec![];
        let changed = set_status_condition(
            &mut conditions,
            Condition::new("Healthy", ConditionStatus::True, "Running", "").with_last_transition_time(at(1)),
        );
        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time, at(1));
    }

    #[test]
    fn test_set_status_condition_keeps_time_when_status_unchanged() {
        let mut conditions = vec![
            Condition::new("Healthy", ConditionStatus::True, "Running", "").with_last_transition_time(at(1)),
        ];
        let changed = set_status_condition(
            &mut conditions,
            Condition::new("Healthy", ConditionStatus::True, "Running", "still fine")
                .with_last_transition_time(at(5)),
        );
        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].message, "still fine");
        assert_eq!(conditions[0].last_transition_time, at(1));
    }

    #[test]
    fn test_set_status_condition_no_change() {
        let original =
            Condition::new("Healthy", ConditionStatus::True, "Running", "").with_last_transition_time(at(1));
        let mut conditions = vec![original.clone()];
        let changed = set_status_condition(&mut conditions, original.with_last_transition_time(at(3)));
        assert!(!changed);
    }

    #[test]
    fn test_set_status_condition_transition_time_never_decreases() {
        let mut conditions = vec![
            Condition::new("Healthy", ConditionStatus::True, "Running", "").with_last_transition_time(at(4)),
        ];
        set_status_condition(
            &mut conditions,
            Condition::new("Healthy", ConditionStatus::False, "NodeDown", "").with_last_transition_time(at(2)),
        );
        assert_eq!(conditions[0].status, ConditionStatus::False);
        assert_eq!(conditions[0].last_transition_time, at(4));

        set_status_condition(
            &mut conditions,
            Condition::new("Healthy", ConditionStatus::True, "Running", "").with_last_transition_time(at(6)),
        );
        assert_eq!(conditions[0].last_transition_time, at(6));
    }

    #[test]
    fn test_find_and_remove() {
        let mut conditions = vec![
            Condition::new("Healthy", ConditionStatus::True, "Running", ""),
            Condition::new("DeploymentStatusReady", ConditionStatus::False, "Deploying", ""),
        ];
        assert!(is_status_condition_true(&conditions, "Healthy"));
        assert!(!is_status_condition_true(&conditions, "DeploymentStatusReady"));
        assert!(!is_status_condition_true(&conditions, "OperationStatusReady"));

        assert!(remove_status_condition(&mut conditions, "Healthy"));
        assert!(!remove_status_condition(&mut conditions, "Healthy"));
        assert!(find_status_condition(&conditions, "Healthy").is_none());
        assert_eq!(conditions.len(), 1);
    }
}
