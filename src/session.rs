//! The session store: who is logged in, their keys and preferences, and the
//! videos they have produced.
//!
//! Every command is synchronous and applies in memory first. The new state is
//! then written through to the configured [`StateStorage`] and, last,
//! observers are told. A storage failure never rolls the command back; it is
//! logged and forwarded to [`SessionObserver::on_persist_error`].

use crate::error::ShortsError;
use crate::model::{AiModel, User, UserPatch, Video};
use crate::storage::{self, FileStorage, MemoryStorage, SessionState, StateStorage};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The one credential pair `login` accepts.
pub const DEMO_EMAIL: &str = "user@example.com";
pub const DEMO_PASSWORD: &str = "pass";

const DEMO_USER_ID: &str = "1";
const DEMO_USER_NAME: &str = "Demo User";

/// Receives session changes. All methods default to no-ops.
pub trait SessionObserver: Send + Sync {
    fn on_login(&self, user: &User) {
        let _ = user;
    }

    fn on_logout(&self) {}

    fn on_user_updated(&self, user: &User) {
        let _ = user;
    }

    fn on_video_added(&self, video: &Video) {
        let _ = video;
    }

    /// The in-memory change stands; only the write-through failed.
    fn on_persist_error(&self, error: &ShortsError) {
        let _ = error;
    }
}

/// Handle returned by [`SessionStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct SessionStore {
    state: SessionState,
    storage: Box<dyn StateStorage>,
    observers: Vec<(SubscriptionId, Arc<dyn SessionObserver>)>,
    next_subscription: u64,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("storage", &self.storage.location())
            .field("is_authenticated", &self.state.is_authenticated)
            .field("videos", &self.state.videos.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SessionStore {
    /// Load the session from `storage`, or start empty if nothing is stored.
    ///
    /// Fails on a corrupt blob or one from a newer schema; the stored blob is
    /// left untouched in both cases.
    pub fn open(storage: impl StateStorage + 'static) -> Result<Self, ShortsError> {
        let location = storage.location();
        let state = match storage.load()? {
            Some(blob) => storage::decode(&blob, &location)?,
            None => SessionState::default(),
        };
        debug!(
            "Opened session at {} (authenticated: {}, {} videos)",
            location,
            state.is_authenticated,
            state.videos.len()
        );
        Ok(Self {
            state,
            storage: Box::new(storage),
            observers: Vec::new(),
            next_subscription: 0,
        })
    }

    /// [`SessionStore::open`] over a file.
    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self, ShortsError> {
        Self::open(FileStorage::new(path))
    }

    /// A fresh session kept only in memory.
    pub fn in_memory() -> Self {
        Self {
            state: SessionState::default(),
            storage: Box::new(MemoryStorage::new()),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    /// Newest first.
    pub fn videos(&self) -> &[Video] {
        &self.state.videos
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated
    }

    /// The logged-in user's key for `model`, if any.
    pub fn api_key_for(&self, model: AiModel) -> Option<&str> {
        self.state.user.as_ref().and_then(|u| u.api_keys.get(model))
    }

    // ── Commands ─────────────────────────────────────────────────────────

    /// Log in with the demo credentials.
    ///
    /// Any other pair fails with [`ShortsError::InvalidCredentials`] and
    /// changes nothing.
    pub fn login(&mut self, email: &str, password: &str) -> Result<(), ShortsError> {
        self.login_at(email, password, Utc::now())
    }

    fn login_at(
        &mut self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ShortsError> {
        if email != DEMO_EMAIL || password != DEMO_PASSWORD {
            warn!("Login rejected for {}", email);
            return Err(ShortsError::InvalidCredentials);
        }
        let user = User::free_tier(DEMO_USER_ID, DEMO_EMAIL, DEMO_USER_NAME, now);
        self.install(user);
        Ok(())
    }

    /// Create and log in a new free-tier profile.
    ///
    /// No uniqueness or password policy is applied.
    pub fn register(&mut self, email: &str, _password: &str, name: &str) {
        self.register_at(email, name, Utc::now());
    }

    fn register_at(&mut self, email: &str, name: &str, now: DateTime<Utc>) {
        let user = User::free_tier(uuid::Uuid::new_v4().to_string(), email, name, now);
        self.install(user);
    }

    fn install(&mut self, user: User) {
        info!("Logged in as {} ({})", user.email, user.id);
        self.state.user = Some(user);
        self.state.is_authenticated = true;
        self.persist();
        if let Some(user) = self.state.user.as_ref() {
            for (_, o) in &self.observers {
                o.on_login(user);
            }
        }
    }

    /// Clear the user from memory and from storage. Videos stay.
    pub fn logout(&mut self) {
        self.state.user = None;
        self.state.is_authenticated = false;
        info!("Logged out");
        self.persist();
        for (_, o) in &self.observers {
            o.on_logout();
        }
    }

    /// Shallow-merge `patch` into the current user.
    ///
    /// Returns `false` (and does nothing) when nobody is logged in.
    pub fn update_user(&mut self, patch: UserPatch) -> bool {
        let Some(user) = self.state.user.as_mut() else {
            debug!("update_user ignored: not authenticated");
            return false;
        };
        user.apply(patch);
        self.persist();
        if let Some(user) = self.state.user.as_ref() {
            for (_, o) in &self.observers {
                o.on_user_updated(user);
            }
        }
        true
    }

    /// Set or clear one provider key, keeping the others.
    pub fn set_api_key(&mut self, model: AiModel, key: Option<String>) -> bool {
        let Some(user) = self.state.user.as_ref() else {
            return false;
        };
        let mut keys = user.api_keys.clone();
        keys.set(model, key);
        self.update_user(UserPatch {
            api_keys: Some(keys),
            ..Default::default()
        })
    }

    /// Put `video` at the front of the list.
    pub fn add_video(&mut self, video: Video) {
        info!("Added video {} ({})", video.title, video.id);
        self.state.videos.insert(0, video);
        self.persist();
        for (_, o) in &self.observers {
            o.on_video_added(&self.state.videos[0]);
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────────

    pub fn subscribe(&mut self, observer: Arc<dyn SessionObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, observer));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    fn persist(&self) {
        let result = storage::encode(&self.state).and_then(|blob| self.storage.save(&blob));
        if let Err(e) = result {
            warn!("Session write-through failed: {}", e);
            for (_, o) in &self.observers {
                o.on_persist_error(&e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Plan;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn video(id: &str) -> Video {
        Video {
            id: id.to_string(),
            title: format!("Video {id}"),
            url: format!("{id}.mp4"),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            duration: 12,
            thumbnail: None,
        }
    }

    #[derive(Default)]
    struct Counting {
        logins: AtomicUsize,
        logouts: AtomicUsize,
        updates: AtomicUsize,
        videos: Mutex<Vec<String>>,
        persist_errors: AtomicUsize,
    }

    impl SessionObserver for Counting {
        fn on_login(&self, _user: &User) {
            self.logins.fetch_add(1, Ordering::SeqCst);
        }
        fn on_logout(&self) {
            self.logouts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_user_updated(&self, _user: &User) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
        fn on_video_added(&self, video: &Video) {
            self.videos.lock().unwrap().push(video.id.clone());
        }
        fn on_persist_error(&self, _error: &ShortsError) {
            self.persist_errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FailingStorage;

    impl StateStorage for FailingStorage {
        fn location(&self) -> String {
            "<failing>".into()
        }
        fn load(&self) -> Result<Option<String>, ShortsError> {
            Ok(None)
        }
        fn save(&self, _blob: &str) -> Result<(), ShortsError> {
            Err(ShortsError::StateWriteFailed {
                location: self.location(),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    #[test]
    fn demo_login_grants_thirty_day_free_tier() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        let mut store = SessionStore::in_memory();
        store.login_at(DEMO_EMAIL, DEMO_PASSWORD, now).unwrap();

        assert!(store.is_authenticated());
        let user = store.user().unwrap();
        assert_eq!(user.id, "1");
        assert_eq!(user.name, "Demo User");
        assert_eq!(user.subscription.plan, Plan::Free);
        assert_eq!(user.subscription.valid_until, now + Duration::days(30));
        assert_eq!(user.api_keys, Default::default());
    }

    #[test]
    fn login_via_clock_lands_thirty_days_out() {
        let mut store = SessionStore::in_memory();
        let before = Utc::now();
        store.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        let after = Utc::now();

        let until = store.user().unwrap().subscription.valid_until;
        assert!(until >= before + Duration::days(30));
        assert!(until <= after + Duration::days(30));
    }

    #[test]
    fn wrong_credentials_leave_session_unauthenticated() {
        let mut store = SessionStore::in_memory();
        for (email, password) in [
            (DEMO_EMAIL, "wrong"),
            ("other@example.com", DEMO_PASSWORD),
            ("", ""),
        ] {
            let err = store.login(email, password).unwrap_err();
            assert!(matches!(err, ShortsError::InvalidCredentials));
            assert!(!store.is_authenticated());
            assert!(store.user().is_none());
        }
    }

    #[test]
    fn register_creates_distinct_free_profiles() {
        let mut store = SessionStore::in_memory();
        store.register("a@example.com", "x", "Ada");
        let first = store.user().unwrap().id.clone();
        assert_eq!(store.user().unwrap().name, "Ada");
        assert_eq!(store.user().unwrap().subscription.plan, Plan::Free);

        store.register("a@example.com", "y", "Ada again");
        assert_ne!(store.user().unwrap().id, first);
        assert!(store.is_authenticated());
    }

    #[test]
    fn logout_clears_user_but_keeps_videos() {
        let mut store = SessionStore::in_memory();
        store.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        store.add_video(video("a"));
        store.logout();

        assert!(!store.is_authenticated());
        assert!(store.user().is_none());
        assert_eq!(store.videos().len(), 1);
    }

    #[test]
    fn update_user_is_noop_when_logged_out() {
        let mut store = SessionStore::in_memory();
        let applied = store.update_user(UserPatch {
            name: Some("Nobody".into()),
            ..Default::default()
        });
        assert!(!applied);
        assert!(store.user().is_none());
        assert!(!store.set_api_key(AiModel::Groq, Some("k".into())));
    }

    #[test]
    fn set_api_key_keeps_other_providers() {
        let mut store = SessionStore::in_memory();
        store.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        store.set_api_key(AiModel::Groq, Some("g".into()));
        store.set_api_key(AiModel::OpenAi, Some("o".into()));

        assert_eq!(store.api_key_for(AiModel::Groq), Some("g"));
        assert_eq!(store.api_key_for(AiModel::OpenAi), Some("o"));
        assert_eq!(store.api_key_for(AiModel::Gemini), None);

        store.set_api_key(AiModel::Groq, None);
        assert_eq!(store.api_key_for(AiModel::Groq), None);
    }

    #[test]
    fn add_video_prepends_for_every_call() {
        let mut store = SessionStore::in_memory();
        let ids: Vec<String> = (0..6).map(|i| i.to_string()).collect();
        for (n, id) in ids.iter().enumerate() {
            let before: Vec<Video> = store.videos().to_vec();
            store.add_video(video(id));
            assert_eq!(store.videos().len(), n + 1);
            assert_eq!(store.videos()[0].id, *id);
            assert_eq!(&store.videos()[1..], before.as_slice());
        }
        let order: Vec<&str> = store.videos().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(order, vec!["5", "4", "3", "2", "1", "0"]);
    }

    #[test]
    fn observers_see_each_mutation_until_unsubscribed() {
        let mut store = SessionStore::in_memory();
        let counting = Arc::new(Counting::default());
        let id = store.subscribe(counting.clone());

        store.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        store.set_api_key(AiModel::Gemini, Some("k".into()));
        store.add_video(video("v1"));
        store.logout();

        assert_eq!(counting.logins.load(Ordering::SeqCst), 1);
        assert_eq!(counting.updates.load(Ordering::SeqCst), 1);
        assert_eq!(*counting.videos.lock().unwrap(), vec!["v1".to_string()]);
        assert_eq!(counting.logouts.load(Ordering::SeqCst), 1);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.add_video(video("v2"));
        assert_eq!(counting.videos.lock().unwrap().len(), 1);
    }

    #[test]
    fn persist_failure_keeps_memory_state_and_notifies() {
        let mut store = SessionStore::open(FailingStorage).unwrap();
        let counting = Arc::new(Counting::default());
        store.subscribe(counting.clone());

        store.add_video(video("kept"));

        assert_eq!(store.videos()[0].id, "kept");
        assert_eq!(counting.persist_errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn state_survives_reopen_and_logout_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth-storage.json");

        {
            let mut store = SessionStore::open_file(&path).unwrap();
            store.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
            store.set_api_key(AiModel::Groq, Some("k".into()));
            store.add_video(video("old"));
        }

        let mut store = SessionStore::open_file(&path).unwrap();
        assert!(store.is_authenticated());
        assert_eq!(store.api_key_for(AiModel::Groq), Some("k"));
        assert_eq!(store.videos()[0].id, "old");

        store.logout();
        let reopened = SessionStore::open_file(&path).unwrap();
        assert!(!reopened.is_authenticated());
        assert!(reopened.user().is_none());
        assert_eq!(reopened.videos().len(), 1);
    }

    #[test]
    fn open_refuses_newer_schema() {
        let blob = r#"{"schemaVersion": 99, "state": {}}"#;
        let err = SessionStore::open(MemoryStorage::with_blob(blob)).unwrap_err();
        assert!(matches!(err, ShortsError::UnsupportedSchemaVersion { .. }));
    }
}
