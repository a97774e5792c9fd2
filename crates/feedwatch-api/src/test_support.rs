use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use feedwatch_db::Database;

use crate::provider::{IdentityProvider, ProviderError, ProviderSession};
use crate::{AppState, AppStateInner};

pub(crate) const TEST_SECRET: &str = "test-secret";

enum Script {
    Session(ProviderSession),
    Empty,
    Reject(String),
}

/// Identity provider double with canned answers per code. Codes are
/// single-use, like a real provider.
pub(crate) struct ScriptedProvider {
    script: HashMap<String, Script>,
    consumed: Mutex<HashSet<String>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            script: HashMap::new(),
            consumed: Mutex::new(HashSet::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn with_session(mut self, code: &str, user_id: &str, access_token: &str) -> Self {
        self.script.insert(
            code.to_string(),
            Script::Session(ProviderSession {
                user_id: user_id.to_string(),
                access_token: access_token.to_string(),
            }),
        );
        self
    }

    pub(crate) fn with_empty(mut self, code: &str) -> Self {
        self.script.insert(code.to_string(), Script::Empty);
        self
    }

    pub(crate) fn with_rejection(mut self, code: &str, message: &str) -> Self {
        self.script.insert(code.to_string(), Script::Reject(message.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn exchange_code(&self, code: &str) -> Result<Option<ProviderSession>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.consumed.lock().unwrap().insert(code.to_string()) {
            return Err(ProviderError::Rejected("Auth code already used".into()));
        }

        match self.script.get(code) {
            Some(Script::Session(session)) => Ok(Some(session.clone())),
            Some(Script::Empty) => Ok(None),
            Some(Script::Reject(message)) => Err(ProviderError::Rejected(message.clone())),
            None => Err(ProviderError::Rejected("Invalid auth code".into())),
        }
    }
}

pub(crate) fn test_state(provider: ScriptedProvider) -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        provider: Arc::new(provider),
        jwt_secret: TEST_SECRET.to_string(),
        landing_path: "/protected".to_string(),
        session_ttl: chrono::Duration::days(30),
    })
}
