//! Round-robin rotation over a chain's interchangeable RPC endpoints.

use anyhow::{ensure, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Ordered endpoint set with a wrapping rotation cursor.
///
/// Selection is pure round-robin: no endpoint is ever marked unhealthy or
/// skipped, a failing endpoint simply comes up again on its next turn. One
/// pool is shared by every account tracked on the same chain.
pub struct EndpointPool {
    endpoints: Vec<Url>,
    cursor: AtomicUsize,
}

impl EndpointPool {
    pub fn new(endpoints: Vec<Url>) -> Result<Self> {
        ensure!(!endpoints.is_empty(), "endpoint pool cannot be empty");
        Ok(Self {
            endpoints,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Next endpoint in rotation. Advances the cursor on every call,
    /// regardless of whether the previous selection worked out.
    pub fn select_next(&self) -> &Url {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[index]
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
