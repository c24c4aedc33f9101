//! Continuation-token bookkeeping for listing loops

use super::error::BrokerError;
use std::collections::HashSet;

/// Tracks the token for the next page and refuses to revisit a token.
#[derive(Debug, Default)]
pub struct PageCursor {
    current: Option<String>,
    seen: HashSet<String>,
}

impl PageCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token to send with the next request, `None` on the first page
    pub fn token(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Move to the token returned by the last page.
    ///
    /// Returns `Ok(false)` once the listing is complete. A token that was
    /// already followed would loop forever, so it is a fault.
    pub fn advance(&mut self, next_token: Option<String>) -> Result<bool, BrokerError> {
        let Some(token) = next_token else {
            self.current = None;
            return Ok(false);
        };

        if !self.seen.insert(token.clone()) {
            return Err(BrokerError::RepeatedCursor { cursor: token });
        }

        self.current = Some(token);
        Ok(true)
    }
}
