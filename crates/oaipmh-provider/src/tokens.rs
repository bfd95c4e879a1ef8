//! The resumption-token registry.
//!
//! Tokens are minted when a list response leaves records unserved. The
//! wire token is `<uuid>/<position>`: the uuid keys the registry entry,
//! the position rewinds the stored cursor on resumption. An entry is
//! removed the moment it is resumed, so each token is single-use from
//! the server's perspective.
//!
//! The registry is unbounded and entries never expire. A long-lived
//! deployment would want both; this one serves interactive use.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use oaipmh_core::RecordCursor;

struct RegisteredToken {
    created: DateTime<Utc>,
    cursor: Box<dyn RecordCursor>,
}

/// Registry of live resumption tokens.
#[derive(Default)]
pub struct TokenRegistry {
    tokens: Mutex<HashMap<Uuid, RegisteredToken>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cursor and return the wire token continuing from the
    /// cursor's current position.
    pub fn mint(&self, cursor: Box<dyn RecordCursor>) -> String {
        let id = Uuid::new_v4();
        let pos = cursor.pos();

        self.tokens
            .lock()
            .expect("token registry mutex poisoned")
            .insert(
                id,
                RegisteredToken {
                    created: Utc::now(),
                    cursor,
                },
            );

        let token = format!("{}/{}", id, pos);
        debug!(token = %token, "minted resumption token");
        token
    }

    /// Resume a wire token: look up the cursor, remove the registry
    /// entry, and rewind to the token's position. Returns `None` for
    /// unknown, malformed or unrewindable tokens.
    pub fn resume(&self, token: &str) -> Option<Box<dyn RecordCursor>> {
        let (id, pos) = token.split_once('/')?;
        let id: Uuid = id.parse().ok()?;
        let pos: usize = pos.parse().ok()?;

        let entry = self
            .tokens
            .lock()
            .expect("token registry mutex poisoned")
            .remove(&id)?;

        debug!(token = %token, created = %entry.created, "resuming token");

        let mut cursor = entry.cursor;
        if !cursor.set_pos(pos) {
            return None;
        }
        Some(cursor)
    }

    /// Number of live tokens.
    pub fn len(&self) -> usize {
        self.tokens
            .lock()
            .expect("token registry mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
