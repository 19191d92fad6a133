use grapevine_store::{keys, StorageAdapter};

/// Plain-string session values: who logged in, with which token, and the
/// CSRF state of a login in progress.
#[derive(Clone)]
pub struct SessionStore {
    storage: StorageAdapter,
}

impl SessionStore {
    pub fn new(storage: StorageAdapter) -> Self {
        Self { storage }
    }

    pub fn remembered_username(&self) -> Option<String> {
        self.storage.load_string(keys::REMEMBERED_USERNAME)
    }

    pub fn remember_username(&self, username: &str) -> bool {
        self.storage.save_string(keys::REMEMBERED_USERNAME, username)
    }

    pub fn forget_username(&self) -> bool {
        self.storage.remove(keys::REMEMBERED_USERNAME)
    }

    pub fn token(&self) -> Option<String> {
        self.storage
            .load_string(keys::AUTH_TOKEN)
            .filter(|t| !t.is_empty())
    }

    pub fn set_token(&self, token: &str) -> bool {
        self.storage.save_string(keys::AUTH_TOKEN, token)
    }

    pub fn clear_token(&self) -> bool {
        self.storage.remove(keys::AUTH_TOKEN)
    }

    pub fn oauth_state(&self) -> Option<String> {
        self.storage.load_string(keys::OAUTH_STATE)
    }

    pub fn set_oauth_state(&self, state: &str) -> bool {
        self.storage.save_string(keys::OAUTH_STATE, state)
    }

    pub fn clear_oauth_state(&self) -> bool {
        self.storage.remove(keys::OAUTH_STATE)
    }

    pub fn is_logged_in(&self) -> bool {
        self.token().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grapevine_store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_values_round_trip_as_plain_strings() {
        let storage = StorageAdapter::new(Arc::new(MemoryStore::new()));
        let session = SessionStore::new(storage.clone());

        assert!(!session.is_logged_in());
        session.set_token("gho_abc");
        session.remember_username("octocat");

        assert!(session.is_logged_in());
        // Stored verbatim, not as JSON strings
        assert_eq!(storage.load_string(keys::AUTH_TOKEN).as_deref(), Some("gho_abc"));
        assert_eq!(session.remembered_username().as_deref(), Some("octocat"));

        session.clear_token();
        assert_eq!(session.token(), None);
        assert_eq!(session.remembered_username().as_deref(), Some("octocat"));

        assert!(session.forget_username());
        assert_eq!(session.remembered_username(), None);
    }
}
