//! Delivery session state machine
//!
//! A session tracks one presentation of one survey:
//!
//! ```text
//! Created ──display created──▶ Displayed ──first response──▶ Responding ──finished──▶ Finished
//! ```
//!
//! Transitions only move forward. A later step may be reached without the
//! earlier one (a response can be accepted even if display creation failed).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::update::QueuedResponseUpdate;
use crate::error::SessionError;

/// Lifecycle state of a delivery session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SessionState {
    Created,
    Displayed,
    Responding,
    Finished,
}

/// Everything the session has been told about the response so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccumulatedResponse {
    pub data: BTreeMap<String, Value>,
    pub ttc: BTreeMap<String, u64>,
    pub variables: BTreeMap<String, Value>,
    pub finished: bool,
    /// Number of updates folded in
    pub updates: usize,
}

/// Identity and progress of one survey presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverySession {
    survey_id: String,
    display_id: Option<String>,
    response_id: Option<String>,
    user_id: Option<String>,
    state: SessionState,
    accumulated: AccumulatedResponse,
}

impl DeliverySession {
    pub fn new(survey_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            survey_id: survey_id.into(),
            display_id: None,
            response_id: None,
            user_id,
            state: SessionState::Created,
            accumulated: AccumulatedResponse::default(),
        }
    }

    pub fn survey_id(&self) -> &str {
        &self.survey_id
    }

    pub fn display_id(&self) -> Option<&str> {
        self.display_id.as_deref()
    }

    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn accumulated(&self) -> &AccumulatedResponse {
        &self.accumulated
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    /// Record the id of the remotely created display
    pub fn mark_displayed(&mut self, display_id: &str) -> Result<(), SessionError> {
        set_once(&mut self.display_id, display_id).map_err(|existing| {
            SessionError::DisplayIdConflict {
                existing,
                attempted: display_id.to_string(),
            }
        })?;
        self.advance(SessionState::Displayed);
        Ok(())
    }

    /// Record the id of the remotely created response
    pub fn record_response(&mut self, response_id: &str) -> Result<(), SessionError> {
        set_once(&mut self.response_id, response_id).map_err(|existing| {
            SessionError::ResponseIdConflict {
                existing,
                attempted: response_id.to_string(),
            }
        })?;
        self.advance(SessionState::Responding);
        Ok(())
    }

    /// The terminal update was accepted
    pub fn finish(&mut self) {
        self.advance(SessionState::Finished);
    }

    /// Attach a user who identified after the presentation started
    pub fn attach_user(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    /// Fold an outgoing update into the accumulated response
    pub fn accumulate(&mut self, update: &QueuedResponseUpdate) {
        let acc = &mut self.accumulated;
        acc.data
            .extend(update.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        acc.ttc.extend(update.ttc.iter().map(|(k, v)| (k.clone(), *v)));
        acc.variables
            .extend(update.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        acc.finished |= update.finished;
        acc.updates += 1;
    }

    /// Merge what another copy of this session knows into this one
    ///
    /// Ids already set here are kept; the state only moves forward. A
    /// conflicting id rejects the whole merge and leaves `self` unchanged.
    pub fn absorb(&mut self, other: &DeliverySession) -> Result<(), SessionError> {
        if other.survey_id != self.survey_id {
            return Err(SessionError::SurveyMismatch {
                expected: self.survey_id.clone(),
                actual: other.survey_id.clone(),
            });
        }
        if let (Some(existing), Some(attempted)) = (self.display_id(), other.display_id()) {
            if existing != attempted {
                return Err(SessionError::DisplayIdConflict {
                    existing: existing.to_string(),
                    attempted: attempted.to_string(),
                });
            }
        }
        if let (Some(existing), Some(attempted)) = (self.response_id(), other.response_id()) {
            if existing != attempted {
                return Err(SessionError::ResponseIdConflict {
                    existing: existing.to_string(),
                    attempted: attempted.to_string(),
                });
            }
        }

        if let Some(display_id) = other.display_id() {
            self.mark_displayed(display_id)?;
        }
        if let Some(response_id) = other.response_id() {
            self.record_response(response_id)?;
        }
        if let Some(user_id) = other.user_id() {
            self.attach_user(user_id);
        }
        if other.accumulated.updates > self.accumulated.updates {
            self.accumulated = other.accumulated.clone();
        }
        self.advance(other.state);
        Ok(())
    }

    fn advance(&mut self, to: SessionState) {
        self.state = self.state.max(to);
    }
}

/// Set `slot` unless it already holds a different value; returns the existing value on conflict
fn set_once(slot: &mut Option<String>, value: &str) -> Result<(), String> {
    match slot {
        Some(existing) if existing != value => Err(existing.clone()),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value.to_string());
            Ok(())
        }
    }
}
