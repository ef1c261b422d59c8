//! Control-plane state as seen by the evaluator.
//!
//! These are plain snapshots, fetched fresh for every check and dropped when
//! the check ends. The kube adapter converts API objects into them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::ControlPlaneError;

/// Workload condition consulted for availability.
pub const WORKLOAD_AVAILABLE: &str = "Available";
/// Instance condition consulted for readiness.
pub const INSTANCE_READY: &str = "Ready";

/// Tri-state condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    /// Anything other than the literal `True`/`False` is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "True" => ConditionStatus::True,
            "False" => ConditionStatus::False,
            _ => ConditionStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub type_: String,
    pub status: ConditionStatus,
}

impl Condition {
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
        }
    }
}

/// Status of the first condition of `type_`, if any.
pub fn condition_status(conditions: &[Condition], type_: &str) -> Option<ConditionStatus> {
    conditions
        .iter()
        .find(|c| c.type_ == type_)
        .map(|c| c.status)
}

/// Operator of a set-based selector requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl SelectorOperator {
    pub fn parse(raw: &str) -> Result<Self, ControlPlaneError> {
        match raw {
            "In" => Ok(SelectorOperator::In),
            "NotIn" => Ok(SelectorOperator::NotIn),
            "Exists" => Ok(SelectorOperator::Exists),
            "DoesNotExist" => Ok(SelectorOperator::DoesNotExist),
            other => Err(ControlPlaneError::InvalidSelector(format!(
                "unknown operator {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorRequirement {
    pub key: String,
    pub operator: SelectorOperator,
    pub values: Vec<String>,
}

/// Which instances belong to a workload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceSelector {
    pub match_labels: BTreeMap<String, String>,
    pub match_expressions: Vec<SelectorRequirement>,
}

impl InstanceSelector {
    pub fn from_labels<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            match_labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            match_expressions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    /// Render as a label-selector query string.
    ///
    /// An empty selector is rejected: it would select every instance in the
    /// namespace.
    pub fn to_query(&self) -> Result<String, ControlPlaneError> {
        if self.is_empty() {
            return Err(ControlPlaneError::InvalidSelector(
                "selector matches every instance".to_string(),
            ));
        }

        let mut terms: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        for req in &self.match_expressions {
            let term = match req.operator {
                SelectorOperator::In | SelectorOperator::NotIn if req.values.is_empty() => {
                    return Err(ControlPlaneError::InvalidSelector(format!(
                        "{:?} requirement on {:?} has no values",
                        req.operator, req.key
                    )));
                }
                SelectorOperator::In => format!("{} in ({})", req.key, req.values.join(",")),
                SelectorOperator::NotIn => format!("{} notin ({})", req.key, req.values.join(",")),
                SelectorOperator::Exists => req.key.clone(),
                SelectorOperator::DoesNotExist => format!("!{}", req.key),
            };
            terms.push(term);
        }

        Ok(terms.join(","))
    }
}

/// The control plane's current view of a named workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSnapshot {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub selector: InstanceSelector,
}

impl WorkloadSnapshot {
    pub fn is_available(&self) -> bool {
        condition_status(&self.conditions, WORKLOAD_AVAILABLE) == Some(ConditionStatus::True)
    }
}

/// One running member of a workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub conditions: Vec<Condition>,
}

impl Instance {
    /// Ready only when the `Ready` condition is present and `True`.
    pub fn is_ready(&self) -> bool {
        condition_status(&self.conditions, INSTANCE_READY) == Some(ConditionStatus::True)
    }
}

/// A lifecycle event recorded against an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceEvent {
    /// Event type (`Normal`, `Warning`, `Error`).
    pub type_: String,
    pub reason: String,
    pub message: String,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Most recent event by occurrence time.
///
/// Events without a timestamp sort before timestamped ones; ties keep list
/// order, so the later entry wins.
pub fn most_recent_event(events: &[InstanceEvent]) -> Option<&InstanceEvent> {
    events
        .iter()
        .enumerate()
        .max_by_key(|(idx, e)| (e.occurred_at, *idx))
        .map(|(_, e)| e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(type_: &str, reason: &str, at: Option<i64>) -> InstanceEvent {
        InstanceEvent {
            type_: type_.into(),
            reason: reason.into(),
            message: String::new(),
            occurred_at: at.map(|secs| Utc.timestamp_opt(secs, 0).unwrap()),
        }
    }

    #[test]
    fn selector_renders_labels_and_expressions() {
        let mut selector = InstanceSelector::from_labels([("app", "api"), ("tier", "web")]);
        selector.match_expressions = vec![
            SelectorRequirement {
                key: "track".into(),
                operator: SelectorOperator::In,
                values: vec!["stable".into(), "canary".into()],
            },
            SelectorRequirement {
                key: "legacy".into(),
                operator: SelectorOperator::DoesNotExist,
                values: vec![],
            },
            SelectorRequirement {
                key: "zone".into(),
                operator: SelectorOperator::NotIn,
                values: vec!["b".into()],
            },
            SelectorRequirement {
                key: "owner".into(),
                operator: SelectorOperator::Exists,
                values: vec![],
            },
        ];

        assert_eq!(
            selector.to_query().unwrap(),
            "app=api,tier=web,track in (stable,canary),!legacy,zone notin (b),owner"
        );
    }

    #[test]
    fn empty_selector_is_rejected() {
        let err = InstanceSelector::default().to_query().unwrap_err();
        assert!(matches!(err, ControlPlaneError::InvalidSelector(_)));
    }

    #[test]
    fn set_requirement_without_values_is_rejected() {
        let selector = InstanceSelector {
            match_labels: BTreeMap::new(),
            match_expressions: vec![SelectorRequirement {
                key: "app".into(),
                operator: SelectorOperator::In,
                values: vec![],
            }],
        };
        assert!(selector.to_query().is_err());
    }

    #[test]
    fn readiness_requires_true_ready_condition() {
        let mut instance = Instance {
            name: "api-0".into(),
            conditions: vec![Condition::new("PodScheduled", ConditionStatus::True)],
        };
        assert!(!instance.is_ready());

        instance
            .conditions
            .push(Condition::new(INSTANCE_READY, ConditionStatus::Unknown));
        assert!(!instance.is_ready());

        instance.conditions[1].status = ConditionStatus::True;
        assert!(instance.is_ready());
    }

    #[test]
    fn condition_status_parsing() {
        assert_eq!(ConditionStatus::parse("True"), ConditionStatus::True);
        assert_eq!(ConditionStatus::parse("False"), ConditionStatus::False);
        assert_eq!(ConditionStatus::parse("true"), ConditionStatus::Unknown);
    }

    #[test]
    fn most_recent_prefers_timestamps_then_position() {
        let events = vec![
            event("Warning", "BackOff", Some(200)),
            event("Normal", "Pulled", Some(100)),
            event("Normal", "Started", None),
        ];
        assert_eq!(most_recent_event(&events).unwrap().reason, "BackOff");

        let untimed = vec![event("Warning", "BackOff", None), event("Normal", "Started", None)];
        assert_eq!(most_recent_event(&untimed).unwrap().reason, "Started");

        let tied = vec![event("Normal", "Pulled", Some(5)), event("Error", "Failed", Some(5))];
        assert_eq!(most_recent_event(&tied).unwrap().reason, "Failed");

        assert!(most_recent_event(&[]).is_none());
    }
}
