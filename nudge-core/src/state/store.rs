//! Snapshot store
//!
//! Holds the one piece of shared mutable state: the current [`ClientState`].
//! Every write replaces the whole snapshot and recomputes the eligible survey
//! list, so a reader holding an `Arc` never sees a half-applied update.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use tracing::debug;

use super::types::{ClientState, EnvironmentSnapshot, PersonSnapshot};
use crate::eligibility::{EnvironmentPolicy, RecontactPolicy, filter_surveys};

pub struct StateStore {
    current: RwLock<Arc<ClientState>>,
    policy: Arc<dyn RecontactPolicy>,
}

impl StateStore {
    /// Create a store using the environment's own recontact rules
    pub fn new(environment: EnvironmentSnapshot, person: PersonSnapshot) -> Self {
        Self::with_policy(environment, person, Arc::new(EnvironmentPolicy))
    }

    pub fn with_policy(
        environment: EnvironmentSnapshot,
        person: PersonSnapshot,
        policy: Arc<dyn RecontactPolicy>,
    ) -> Self {
        let state = derive(environment, person, policy.as_ref());
        Self {
            current: RwLock::new(Arc::new(state)),
            policy,
        }
    }

    /// Restore a persisted state, recomputing its eligible surveys
    pub fn from_state(state: ClientState) -> Self {
        Self::new(state.environment, state.person)
    }

    /// Current snapshot
    pub fn get(&self) -> Arc<ClientState> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace both snapshots
    pub fn update(&self, environment: EnvironmentSnapshot, person: PersonSnapshot) -> Arc<ClientState> {
        let next = Arc::new(derive(environment, person, self.policy.as_ref()));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        next
    }

    /// Replace the environment after a refresh, keeping person history
    pub fn set_environment(&self, environment: EnvironmentSnapshot) -> Arc<ClientState> {
        self.modify(|state| (environment, state.person.clone()))
    }

    /// Read-modify-write of the person snapshot
    ///
    /// The write lock is held across `f`, so concurrent updates cannot lose
    /// each other's appends.
    pub fn update_person<F>(&self, f: F) -> Arc<ClientState>
    where
        F: FnOnce(&PersonSnapshot) -> PersonSnapshot,
    {
        self.modify(|state| (state.environment.clone(), f(&state.person)))
    }

    /// Recompute eligibility against the current snapshots
    pub fn refresh_eligibility(&self) -> Arc<ClientState> {
        self.modify(|state| (state.environment.clone(), state.person.clone()))
    }

    fn modify<F>(&self, f: F) -> Arc<ClientState>
    where
        F: FnOnce(&ClientState) -> (EnvironmentSnapshot, PersonSnapshot),
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let (environment, person) = f(&guard);
        let next = Arc::new(derive(environment, person, self.policy.as_ref()));
        *guard = Arc::clone(&next);
        next
    }
}

fn derive(
    environment: EnvironmentSnapshot,
    person: PersonSnapshot,
    policy: &dyn RecontactPolicy,
) -> ClientState {
    let filtered_surveys = filter_surveys(&environment, &person, policy, Utc::now());
    debug!(
        eligible = filtered_surveys.len(),
        total = environment.surveys.len(),
        "Recomputed eligible surveys"
    );
    ClientState {
        environment,
        person,
        filtered_surveys,
    }
}
