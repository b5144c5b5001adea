//! Conditions reported on a WordpressInstance and the requeue decision for each pass.
//!
//! Conditions live on two axes: `Ready` (Creating / Available) and `Synced`
//! (ReconcileSuccess / ReconcileError). Setting a condition replaces the one on
//! the same axis and leaves the other axis alone.
use std::fmt::Display;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use kube::runtime::controller::Action;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::WordpressInstanceStatus;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, JsonSchema, PartialEq, Eq)]
pub enum ConditionType { Ready, Synced }

#[derive(Serialize, Deserialize, Debug, Clone, Copy, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus { True, False, Unknown }

#[derive(Serialize, Deserialize, Debug, Clone, Copy, JsonSchema, PartialEq, Eq)]
pub enum ConditionReason { Creating, Available, ReconcileSuccess, ReconcileError }

#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    pub last_transition_time: String,
    pub reason: ConditionReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    fn new(type_: ConditionType, status: ConditionStatus, reason: ConditionReason, message: Option<String>) -> Self {
        Self { type_, status, last_transition_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true), reason, message }
    }

    /// Resources are being created and are not usable yet.
    pub fn creating() -> Self { Self::new(ConditionType::Ready, ConditionStatus::False, ConditionReason::Creating, None) }
    /// The instance answers on its endpoint.
    pub fn available() -> Self { Self::new(ConditionType::Ready, ConditionStatus::True, ConditionReason::Available, None) }
    pub fn reconcile_success() -> Self { Self::new(ConditionType::Synced, ConditionStatus::True, ConditionReason::ReconcileSuccess, None) }
    pub fn reconcile_error(err: &impl Display) -> Self {
        Self::new(ConditionType::Synced, ConditionStatus::False, ConditionReason::ReconcileError, Some(err.to_string()))
    }

    pub fn equal_ignoring_time(&self, other: &Self) -> bool {
        self.type_ == other.type_ && self.status == other.status && self.reason == other.reason && self.message == other.message
    }
}

impl WordpressInstanceStatus {
    /// Sets each condition, replacing any of the same type. An identical
    /// existing condition is kept so its transition time stays put.
    pub fn set_conditions(&mut self, conditions: impl IntoIterator<Item = Condition>) {
        for new in conditions {
            match self.conditions.iter_mut().find(|c| c.type_ == new.type_) {
                Some(existing) if existing.equal_ignoring_time(&new) => {}
                Some(existing) => *existing = new,
                None => self.conditions.push(new),
            }
        }
    }

    pub fn condition(&self, type_: ConditionType) -> Option<&Condition> { self.conditions.iter().find(|c| c.type_ == type_) }

    pub fn has_reason(&self, reason: ConditionReason) -> bool { self.conditions.iter().any(|c| c.reason == reason) }
}

/// Records a fully successful pass.
pub fn report_success(status: &mut WordpressInstanceStatus, endpoint: String) {
    status.endpoint = endpoint;
    status.set_conditions([Condition::creating()]);
    if !status.endpoint.is_empty() {
        status.set_conditions([Condition::available()]);
    }
    status.set_conditions([Condition::reconcile_success()]);
}

pub fn report_error(status: &mut WordpressInstanceStatus, err: &impl Display) {
    status.set_conditions([Condition::reconcile_error(err)]);
}

/// How soon the scheduler should come back to an instance. A hint only: watch
/// events can trigger a pass earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequeuePolicy { pub short_wait: Duration, pub long_wait: Duration }

impl Default for RequeuePolicy {
    fn default() -> Self { Self { short_wait: Duration::from_secs(30), long_wait: Duration::from_secs(60) } }
}

impl RequeuePolicy {
    pub fn on_success(&self) -> Action { Action::requeue(self.long_wait) }
    pub fn on_error(&self) -> Action { Action::requeue(self.short_wait) }
    /// The instance is gone; only a new watch event brings it back.
    pub fn on_deleted(&self) -> Action { Action::await_change() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_without_endpoint_is_creating() {
        let mut status = WordpressInstanceStatus::default();
        report_success(&mut status, String::new());
        assert_eq!(status.condition(ConditionType::Ready).unwrap().reason, ConditionReason::Creating);
        assert_eq!(status.condition(ConditionType::Synced).unwrap().reason, ConditionReason::ReconcileSuccess);
        assert!(!status.has_reason(ConditionReason::Available));
    }

    #[test]
    fn endpoint_makes_it_available() {
        let mut status = WordpressInstanceStatus::default();
        report_success(&mut status, "1.2.3.4".into());
        let ready = status.condition(ConditionType::Ready).unwrap();
        assert_eq!((ready.reason, ready.status), (ConditionReason::Available, ConditionStatus::True));
        assert_eq!(status.conditions.len(), 2);
    }

    #[test]
    fn error_replaces_success_but_keeps_ready_axis() {
        let mut status = WordpressInstanceStatus::default();
        report_success(&mut status, String::new());
        report_error(&mut status, &"boom");
        let synced = status.condition(ConditionType::Synced).unwrap();
        assert_eq!(synced.reason, ConditionReason::ReconcileError);
        assert_eq!(synced.message.as_deref(), Some("boom"));
        assert!(!status.has_reason(ConditionReason::ReconcileSuccess));
        assert!(status.has_reason(ConditionReason::Creating));
    }

    #[test]
    fn identical_condition_keeps_transition_time() {
        let mut status = WordpressInstanceStatus::default();
        let mut old = Condition::reconcile_success();
        old.last_transition_time = "2020-01-01T00:00:00Z".into();
        status.conditions.push(old);
        status.set_conditions([Condition::reconcile_success()]);
        assert_eq!(status.conditions[0].last_transition_time, "2020-01-01T00:00:00Z");
    }

    #[test]
    fn requeue_waits() {
        let policy = RequeuePolicy::default();
        assert_eq!(policy.on_success(), Action::requeue(Duration::from_secs(60)));
        assert_eq!(policy.on_error(), Action::requeue(Duration::from_secs(30)));
        assert_eq!(policy.on_deleted(), Action::await_change());
    }
}
