//! Agent state machine: `Idle -> Running -> (Finished | Error) -> Idle`.
//!
//! Transitions go through [`StateCell::enter`], which hands back a
//! [`TransitionGuard`]. Dropping the guard without calling [`TransitionGuard::commit`]
//! restores the prior state — a run that exits early (an error, a panic
//! unwind) never leaves the agent parked in `Running`.

use std::cell::Cell;

use ah_domain::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Idle,
    Running,
    Finished,
    Error,
}

pub struct StateCell {
    inner: Cell<State>,
}

impl StateCell {
    pub fn new() -> Self {
        Self { inner: Cell::new(State::Idle) }
    }

    pub fn get(&self) -> State {
        self.inner.get()
    }

    /// Force-set the state with no guard. Used for transitions that don't
    /// need restore-on-drop semantics (e.g. `Running -> Finished` at the
    /// natural end of a step).
    pub fn set(&self, to: State) {
        self.inner.set(to);
    }

    /// Enter `to` from `from`, returning a guard that restores `from` on
    /// drop unless [`TransitionGuard::commit`] is called first.
    pub fn enter(&self, from: State, to: State) -> Result<TransitionGuard<'_>> {
        if self.inner.get() != from {
            return Err(Error::IllegalState(format!(
                "expected {from:?}, found {:?}",
                self.inner.get()
            )));
        }
        self.inner.set(to);
        Ok(TransitionGuard { cell: self, restore_to: from, committed: false })
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TransitionGuard<'a> {
    cell: &'a StateCell,
    restore_to: State,
    committed: bool,
}

impl TransitionGuard<'_> {
    /// Land on `final_state` instead of restoring the pre-transition state.
    pub fn commit(mut self, final_state: State) {
        self.cell.set(final_state);
        self.committed = true;
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.cell.set(self.restore_to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_rejects_wrong_starting_state() {
        let cell = StateCell::new();
        cell.set(State::Finished);
        assert!(cell.enter(State::Idle, State::Running).is_err());
    }

    #[test]
    fn uncommitted_guard_restores_on_drop() {
        let cell = StateCell::new();
        {
            let _guard = cell.enter(State::Idle, State::Running).unwrap();
            assert_eq!(cell.get(), State::Running);
        }
        assert_eq!(cell.get(), State::Idle);
    }

    #[test]
    fn committed_guard_lands_on_requested_state() {
        let cell = StateCell::new();
        let guard = cell.enter(State::Idle, State::Running).unwrap();
        guard.commit(State::Finished);
        assert_eq!(cell.get(), State::Finished);
    }
}
