use std::collections::HashMap;
use std::sync::RwLock;

use rand::RngCore;

/// Maps opaque bearer tokens to user ids for the lifetime of the process.
///
/// Sessions are memory-only: a restart logs everyone out. That is a
/// deliberate simplification of this deployment, not a recommended
/// production design. A single instance lives on `AppState`; tokens never
/// expire and are only removed by logout.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, i32>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Generates a fresh 256-bit token, binds it to `user_id`, returns it.
    pub fn create(&self, user_id: i32) -> String {
        let token = generate_token();
        self.sessions
            .write()
            .expect("session store lock poisoned")
            .insert(token.clone(), user_id);
        token
    }

    /// O(1) lookup of the user id bound to `token`.
    pub fn resolve(&self, token: &str) -> Option<i32> {
        self.sessions
            .read()
            .expect("session store lock poisoned")
            .get(token)
            .copied()
    }

    /// Removes `token`. Revoking an unknown token is not an error.
    pub fn revoke(&self, token: &str) {
        self.sessions
            .write()
            .expect("session store lock poisoned")
            .remove(token);
    }

    /// Number of live sessions, surfaced in monitoring logs.
    pub fn active_count(&self) -> usize {
        self.sessions
            .read()
            .expect("session store lock poisoned")
            .len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn create_then_resolve_roundtrip() {
        let store = SessionStore::new();
        let token = store.create(42);
        assert_eq!(store.resolve(&token), Some(42));
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn resolve_unknown_token_is_none() {
        let store = SessionStore::new();
        assert_eq!(store.resolve("deadbeef"), None);
    }

    #[test]
    fn revoke_is_idempotent_and_scoped() {
        let store = SessionStore::new();
        let alice = store.create(1);
        let bob = store.create(2);

        store.revoke(&alice);
        store.revoke(&alice);

        assert_eq!(store.resolve(&alice), None);
        assert_eq!(store.resolve(&bob), Some(2));
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn consecutive_tokens_differ() {
        let store = SessionStore::new();
        assert_ne!(store.create(1), store.create(1));
    }
}
