//! A collaborator handle that remembers whether it is the real implementation or a stand-in.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum Origin {
    Real,
    Fallback { reason: String },
}

/// Shared handle to one capability. Callers use it uniformly; only UI code inspects the origin.
pub struct Bound<T: ?Sized> {
    inner: Arc<T>,
    origin: Origin,
}

impl<T: ?Sized> Bound<T> {
    pub fn real(inner: Arc<T>) -> Self {
        Self {
            inner,
            origin: Origin::Real,
        }
    }

    pub fn fallback(inner: Arc<T>, reason: impl Into<String>) -> Self {
        Self {
            inner,
            origin: Origin::Fallback {
                reason: reason.into(),
            },
        }
    }

    pub fn get(&self) -> &T {
        self.inner.as_ref()
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn is_real(&self) -> bool {
        self.origin == Origin::Real
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match &self.origin {
            Origin::Real => None,
            Origin::Fallback { reason } => Some(reason.as_str()),
        }
    }
}

impl<T: ?Sized> Clone for Bound<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            origin: self.origin.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound").field("origin", &self.origin).finish()
    }
}
