// ── App readiness gate ──
//
// Derives whether the dashboard can render from three inputs: session
// presence, the profile loading flag, and the loading flags of the gated
// queries (devices and locations). Losing the session wins over
// everything else.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::info;

use crate::cache::ResourceKind;

/// What the dashboard shell should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Readiness {
    NotAuthenticated,
    Loading,
    Ready,
}

/// Inputs to [`derive`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateInputs {
    pub session_present: bool,
    pub profile_loading: bool,
    /// Pending reads per gated kind.
    pub loading: BTreeMap<ResourceKind, usize>,
}

impl GateInputs {
    fn any_query_loading(&self) -> bool {
        self.loading.values().any(|&n| n > 0)
    }
}

/// Pure derivation of the gate state.
pub fn derive(inputs: &GateInputs) -> Readiness {
    if !inputs.session_present {
        Readiness::NotAuthenticated
    } else if inputs.profile_loading || inputs.any_query_loading() {
        Readiness::Loading
    } else {
        Readiness::Ready
    }
}

/// Queries whose loading state holds the gate in `Loading`.
pub const GATED_KINDS: [ResourceKind; 2] = [ResourceKind::Devices, ResourceKind::Locations];

// ── ReadinessGate ────────────────────────────────────────────────────

struct GateState {
    inputs: GateInputs,
    /// Bumped whenever the session changes so guards from an earlier
    /// session cannot touch the new one's counters.
    epoch: u64,
}

/// Live readiness state, observable through a `watch` channel.
#[derive(Clone)]
pub struct ReadinessGate {
    state: Arc<Mutex<GateState>>,
    tx: Arc<watch::Sender<Readiness>>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Readiness::NotAuthenticated);
        Self {
            state: Arc::new(Mutex::new(GateState {
                inputs: GateInputs::default(),
                epoch: 0,
            })),
            tx: Arc::new(tx),
        }
    }

    pub fn state(&self) -> Readiness {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Readiness> {
        self.tx.subscribe()
    }

    pub fn inputs(&self) -> GateInputs {
        self.lock().inputs.clone()
    }

    /// Record that a session appeared or went away.
    ///
    /// Either way, pending loading flags from the previous session are
    /// discarded.
    pub fn set_session_present(&self, present: bool) {
        self.update(|state| {
            state.epoch += 1;
            state.inputs.session_present = present;
            state.inputs.loading.clear();
            if !present {
                state.inputs.profile_loading = false;
            }
        });
    }

    pub fn set_profile_loading(&self, loading: bool) {
        self.update(|state| state.inputs.profile_loading = loading);
    }

    /// Mark a read of `kind` as pending until the guard is dropped.
    ///
    /// Kinds outside [`GATED_KINDS`] get an inert guard.
    pub fn track(&self, kind: ResourceKind) -> LoadingGuard {
        if !GATED_KINDS.contains(&kind) {
            return LoadingGuard { slot: None };
        }
        let mut epoch = 0;
        self.update(|state| {
            epoch = state.epoch;
            *state.inputs.loading.entry(kind).or_default() += 1;
        });
        LoadingGuard {
            slot: Some((self.clone(), kind, epoch)),
        }
    }

    fn finish(&self, kind: ResourceKind, epoch: u64) {
        self.update(|state| {
            if state.epoch != epoch {
                return;
            }
            if let Some(count) = state.inputs.loading.get_mut(&kind) {
                *count = count.saturating_sub(1);
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut GateState)) {
        let next = {
            let mut state = self.lock();
            apply(&mut state);
            derive(&state.inputs)
        };
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            info!(from = %current, to = %next, "readiness changed");
            *current = next;
            true
        });
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears one pending-read flag on drop.
#[must_use = "the read counts as pending only while the guard is alive"]
pub struct LoadingGuard {
    slot: Option<(ReadinessGate, ResourceKind, u64)>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if let Some((gate, kind, epoch)) = self.slot.take() {
            gate.finish(kind, epoch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_table() {
        let mut inputs = GateInputs::default();
        assert_eq!(derive(&inputs), Readiness::NotAuthenticated);

        inputs.profile_loading = true;
        assert_eq!(derive(&inputs), Readiness::NotAuthenticated);

        inputs.session_present = true;
        assert_eq!(derive(&inputs), Readiness::Loading);

        inputs.profile_loading = false;
        inputs.loading.insert(ResourceKind::Devices, 1);
        assert_eq!(derive(&inputs), Readiness::Loading);

        inputs.loading.insert(ResourceKind::Devices, 0);
        assert_eq!(derive(&inputs), Readiness::Ready);
    }

    #[test]
    fn session_loss_wins_over_pending_reads() {
        let gate = ReadinessGate::new();
        gate.set_session_present(true);
        gate.set_profile_loading(true);
        let devices = gate.track(ResourceKind::Devices);
        assert_eq!(gate.state(), Readiness::Loading);

        gate.set_profile_loading(false);
        assert_eq!(gate.state(), Readiness::Loading);
        drop(devices);
        assert_eq!(gate.state(), Readiness::Ready);

        let _mid_flight = gate.track(ResourceKind::Locations);
        assert_eq!(gate.state(), Readiness::Loading);
        gate.set_session_present(false);
        assert_eq!(gate.state(), Readiness::NotAuthenticated);
    }

    #[test]
    fn guards_from_previous_session_are_ignored() {
        let gate = ReadinessGate::new();
        gate.set_session_present(true);
        let stale = gate.track(ResourceKind::Devices);

        gate.set_session_present(false);
        gate.set_session_present(true);
        let current = gate.track(ResourceKind::Devices);

        drop(stale);
        assert_eq!(gate.inputs().loading.get(&ResourceKind::Devices), Some(&1));
        drop(current);
        assert_eq!(gate.state(), Readiness::Ready);
    }

    #[test]
    fn ungated_kinds_do_not_hold_the_gate() {
        let gate = ReadinessGate::new();
        gate.set_session_present(true);
        let _events = gate.track(ResourceKind::ProximityEvents);
        assert_eq!(gate.state(), Readiness::Ready);
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let gate = ReadinessGate::new();
        let mut rx = gate.subscribe();

        gate.set_session_present(true);
        rx.changed().await.ok();
        assert_eq!(*rx.borrow_and_update(), Readiness::Ready);

        gate.set_session_present(false);
        rx.changed().await.ok();
        assert_eq!(*rx.borrow(), Readiness::NotAuthenticated);
    }

    #[test]
    fn display_uses_screaming_case() {
        assert_eq!(Readiness::NotAuthenticated.to_string(), "NOT_AUTHENTICATED");
    }
}
