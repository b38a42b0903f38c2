//! Request kind: which embedding function a request is routed to.

use std::fmt;

/// Kind of an embedding request.
///
/// Determines which backend entry point is invoked and which requests may
/// share a kind-partition inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Decoded RGB image.
    Image,
    /// Raw text.
    Text,
}

impl RequestKind {
    /// Lowercase name used in logs and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Image => "image",
            RequestKind::Text => "text",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
