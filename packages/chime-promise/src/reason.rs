use std::rc::Rc;
use thiserror::Error;

/// Why a promise was rejected. Cheap to clone, since every continuation
/// observing the rejection receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Reason {
    message: Rc<str>,
}

impl Reason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Rc::from(message.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for Reason {
    fn from(message: &str) -> Self {
        Self {
            message: Rc::from(message),
        }
    }
}

impl From<String> for Reason {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
