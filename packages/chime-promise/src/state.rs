use crate::reason::Reason;
use std::fmt;

/// The three-state lifecycle of a promise. Immutable once settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromiseState<T> {
    Pending,
    Fulfilled(T),
    Rejected(Reason),
}

impl<T> PromiseState<T> {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl<T: Clone> PromiseState<T> {
    /// The settled outcome, or `None` while pending.
    pub(crate) fn outcome(&self) -> Option<Result<T, Reason>> {
        match self {
            Self::Pending => None,
            Self::Fulfilled(value) => Some(Ok(value.clone())),
            Self::Rejected(reason) => Some(Err(reason.clone())),
        }
    }
}

impl<T> fmt::Display for PromiseState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Fulfilled(_) => f.write_str("fulfilled"),
            Self::Rejected(_) => f.write_str("rejected"),
        }
    }
}
