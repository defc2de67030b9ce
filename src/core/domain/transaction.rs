use std::fmt;
use std::sync::Arc;

use crate::core::domain::repository_error::RepositoryError;

/// An open transaction against a repository backend.
///
/// Calls are blocking; the core only ever invokes them from the I/O
/// dispatcher or, on cancellation, from a destructor.
pub trait TransactionContext<C>: Send + Sync {
    fn connection(&self) -> &C;
    fn commit(&self) -> Result<(), RepositoryError>;
    fn rollback(&self) -> Result<(), RepositoryError>;
}

pub type SharedTransaction<C> = Arc<dyn TransactionContext<C>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
    /// The backend rejected the terminal call.
    Failed,
}

impl TransactionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionState::Open)
    }

    /// Moves to `next`. Only `Open` may transition, and only to a terminal state.
    pub fn transition(&mut self, next: TransactionState) -> Result<(), RepositoryError> {
        match (*self, next) {
            (TransactionState::Open, TransactionState::Committed)
            | (TransactionState::Open, TransactionState::RolledBack)
            | (TransactionState::Open, TransactionState::Failed) => {
                *self = next;
                Ok(())
            }
            (from, to) => Err(RepositoryError::Database(format!(
                "illegal transaction state transition: {from} -> {to}"
            ))),
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionState::Open => "open",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
            TransactionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_moves_to_either_terminal_state_once() {
        let mut state = TransactionState::Open;
        state.transition(TransactionState::Committed).unwrap();
        assert!(state.is_terminal());
        assert!(state.transition(TransactionState::RolledBack).is_err());
        assert_eq!(state, TransactionState::Committed);

        let mut state = TransactionState::Open;
        state.transition(TransactionState::RolledBack).unwrap();
        assert!(state.transition(TransactionState::Committed).is_err());
    }

    #[test]
    fn failed_is_terminal() {
        let mut state = TransactionState::Open;
        state.transition(TransactionState::Failed).unwrap();
        assert!(state.is_terminal());
        assert!(state.transition(TransactionState::RolledBack).is_err());
    }

    #[test]
    fn open_cannot_transition_to_open() {
        let mut state = TransactionState::Open;
        assert!(state.transition(TransactionState::Open).is_err());
        assert!(!state.is_terminal());
    }
}
