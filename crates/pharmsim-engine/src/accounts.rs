//! Account session and notification inbox.
//!
//! Both wrap external backends reached through `pharmsim-core` traits.
//! Identity failures surface as `SimError::Auth` carrying the backend's text.
//! Notification read-marking is optimistic: the inbox updates first and
//! reverts if the store refuses or fails.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use pharmsim_contracts::account::{AuthEvent, AuthEventKind, AuthSession, Notification, PendingVerification, Profile};
use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_contracts::labels::TrainingPhase;
use pharmsim_core::optimistic::optimistic_update;
use pharmsim_core::traits::{IdentityBackend, ProfileStore};

/// Keep `Auth` errors as they are; wrap anything else so callers only ever
/// see one identity error kind.
fn as_auth_error(error: SimError) -> SimError {
    match error {
        SimError::Auth { .. } => error,
        other => SimError::Auth {
            reason: other.to_string(),
        },
    }
}

fn signed_out() -> SimError {
    SimError::Auth {
        reason: "You are not signed in.".to_string(),
    }
}

// ── Accounts ─────────────────────────────────────────────────────────────────

pub struct AccountService {
    identity: Arc<dyn IdentityBackend>,
    profiles: Arc<dyn ProfileStore>,
    session: watch::Sender<Option<AuthSession>>,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityBackend>, profiles: Arc<dyn ProfileStore>) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            identity,
            profiles,
            session,
        }
    }

    /// Current session, if signed in.
    pub fn session(&self) -> Option<AuthSession> {
        (*self.session.borrow()).clone()
    }

    pub fn training_phase(&self) -> Option<TrainingPhase> {
        self.session.borrow().as_ref().and_then(|s| s.training_phase)
    }

    /// Receive every session change, including ones echoed by the backend.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.session.subscribe()
    }

    /// Apply a session-change event from the identity backend.
    pub fn handle_event(&self, event: AuthEvent) {
        debug!(event = ?event.event, has_session = event.session.is_some(), "auth event");
        let next = match event.event {
            AuthEventKind::SignedOut => None,
            AuthEventKind::SignedIn | AuthEventKind::UserUpdated | AuthEventKind::TokenRefreshed => event.session,
        };
        self.session.send_replace(next);
    }

    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> SimResult<PendingVerification> {
        let pending = self
            .identity
            .sign_up(email.trim(), password, full_name.trim())
            .await
            .map_err(as_auth_error)?;
        info!(email = %pending.email, "sign-up pending verification");
        Ok(pending)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> SimResult<AuthSession> {
        let session = self
            .identity
            .sign_in(email.trim(), password)
            .await
            .map_err(as_auth_error)?;
        info!(user_id = %session.user_id, "signed in");
        self.handle_event(AuthEvent {
            event: AuthEventKind::SignedIn,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    pub async fn sign_out(&self) -> SimResult<()> {
        self.identity.sign_out().await.map_err(as_auth_error)?;
        self.handle_event(AuthEvent {
            event: AuthEventKind::SignedOut,
            session: None,
        });
        Ok(())
    }

    /// Store the training phase in user metadata. The refreshed session is
    /// published to subscribers as a `UserUpdated` event.
    pub async fn update_training_phase(&self, phase: TrainingPhase) -> SimResult<AuthSession> {
        if self.session.borrow().is_none() {
            return Err(signed_out());
        }
        let session = self
            .identity
            .update_training_phase(phase)
            .await
            .map_err(as_auth_error)?;
        info!(training_phase = %phase, "training phase updated");
        self.handle_event(AuthEvent {
            event: AuthEventKind::UserUpdated,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    pub async fn profile(&self) -> SimResult<Profile> {
        let user_id = self.session().ok_or_else(signed_out)?.user_id.to_string();
        self.profiles.fetch_profile(&user_id).await
    }

    /// An inbox for the signed-in user.
    pub fn notification_center(&self) -> SimResult<NotificationCenter> {
        let user_id = self.session().ok_or_else(signed_out)?.user_id.to_string();
        Ok(NotificationCenter::new(self.profiles.clone(), user_id))
    }
}

// ── Notifications ────────────────────────────────────────────────────────────

pub struct NotificationCenter {
    profiles: Arc<dyn ProfileStore>,
    user_id: String,
    notifications: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new(profiles: Arc<dyn ProfileStore>, user_id: impl Into<String>) -> Self {
        Self {
            profiles,
            user_id: user_id.into(),
            notifications: Vec::new(),
        }
    }

    /// Replace the inbox with the store's list, keeping its order.
    pub async fn refresh(&mut self) -> SimResult<()> {
        self.notifications = self.profiles.fetch_notifications(&self.user_id).await?;
        debug!(count = self.notifications.len(), unread = self.unread_count(), "notifications refreshed");
        Ok(())
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    /// Mark one notification read. Unknown ids return `Ok(false)`; already
    /// read ones return `Ok(true)` without a remote call.
    pub async fn mark_read(&mut self, notification_id: &str) -> SimResult<bool> {
        match self.notifications.iter().find(|n| n.id == notification_id) {
            None => {
                warn!(notification_id, "mark_read for unknown notification");
                return Ok(false);
            }
            Some(n) if n.is_read => return Ok(true),
            Some(_) => {}
        }

        let profiles = self.profiles.clone();
        let user_id = self.user_id.clone();
        let id = notification_id.to_string();
        optimistic_update(
            &mut self.notifications,
            |list| {
                if let Some(n) = list.iter_mut().find(|n| n.id == id) {
                    n.is_read = true;
                }
            },
            profiles.mark_read(notification_id, &user_id),
        )
        .await
    }

    pub async fn mark_all_read(&mut self) -> SimResult<bool> {
        if self.unread_count() == 0 {
            return Ok(true);
        }
        let profiles = self.profiles.clone();
        let user_id = self.user_id.clone();
        optimistic_update(
            &mut self.notifications,
            |list| list.iter_mut().for_each(|n| n.is_read = true),
            profiles.mark_all_read(&user_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    // ── Mocks ────────────────────────────────────────────────────────────────

    struct MockIdentity {
        user_id: Uuid,
        phase: Mutex<Option<TrainingPhase>>,
    }

    impl MockIdentity {
        fn new() -> Self {
            Self {
                user_id: Uuid::new_v4(),
                phase: Mutex::new(None),
            }
        }

        fn session(&self) -> AuthSession {
            AuthSession {
                user_id: self.user_id,
                email: "student@example.edu".to_string(),
                access_token: "token".to_string(),
                training_phase: *self.phase.lock().unwrap(),
            }
        }
    }

    #[async_trait]
    impl IdentityBackend for MockIdentity {
        async fn sign_up(&self, email: &str, _password: &str, _full_name: &str) -> SimResult<PendingVerification> {
            if email.ends_with("@taken.edu") {
                return Err(SimError::Auth {
                    reason: "User already registered".to_string(),
                });
            }
            Ok(PendingVerification { email: email.to_string() })
        }

        async fn sign_in(&self, _email: &str, password: &str) -> SimResult<AuthSession> {
            match password {
                "correct horse" => Ok(self.session()),
                "offline" => Err(SimError::Upstream {
                    reason: "connection refused".to_string(),
                }),
                _ => Err(SimError::Auth {
                    reason: "Invalid login credentials".to_string(),
                }),
            }
        }

        async fn sign_out(&self) -> SimResult<()> {
            Ok(())
        }

        async fn update_training_phase(&self, phase: TrainingPhase) -> SimResult<AuthSession> {
            *self.phase.lock().unwrap() = Some(phase);
            Ok(self.session())
        }
    }

    struct MockProfiles {
        notifications: Vec<Notification>,
        accept_writes: bool,
        fail_writes: bool,
        writes: Mutex<Vec<String>>,
    }

    impl MockProfiles {
        fn new(accept_writes: bool, fail_writes: bool) -> Self {
            Self {
                notifications: vec![note("n2", false), note("n1", false), note("n0", true)],
                accept_writes,
                fail_writes,
                writes: Mutex::new(Vec::new()),
            }
        }

        fn write(&self, what: String) -> SimResult<bool> {
            self.writes.lock().unwrap().push(what);
            if self.fail_writes {
                return Err(SimError::Upstream {
                    reason: "HTTP 500".to_string(),
                });
            }
            Ok(self.accept_writes)
        }
    }

    fn note(id: &str, is_read: bool) -> Notification {
        Notification {
            id: id.to_string(),
            title: format!("Title {id}"),
            message: "New case feedback is available.".to_string(),
            kind: "info".to_string(),
            is_read,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            link: None,
        }
    }

    #[async_trait]
    impl ProfileStore for MockProfiles {
        async fn fetch_profile(&self, _user_id: &str) -> SimResult<Profile> {
            Ok(Profile {
                full_name: "Asha Rao".to_string(),
                email: "student@example.edu".to_string(),
            })
        }

        async fn fetch_notifications(&self, _user_id: &str) -> SimResult<Vec<Notification>> {
            Ok(self.notifications.clone())
        }

        async fn mark_read(&self, notification_id: &str, _user_id: &str) -> SimResult<bool> {
            self.write(format!("one:{notification_id}"))
        }

        async fn mark_all_read(&self, _user_id: &str) -> SimResult<bool> {
            self.write("all".to_string())
        }
    }

    fn service() -> AccountService {
        AccountService::new(Arc::new(MockIdentity::new()), Arc::new(MockProfiles::new(true, false)))
    }

    async fn inbox(accept: bool, fail: bool) -> (Arc<MockProfiles>, NotificationCenter) {
        let profiles = Arc::new(MockProfiles::new(accept, fail));
        let mut center = NotificationCenter::new(profiles.clone(), "user-1");
        center.refresh().await.unwrap();
        (profiles, center)
    }

    // ── Accounts ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn sign_in_publishes_session() {
        let accounts = service();
        let mut changes = accounts.subscribe();

        accounts.sign_in("student@example.edu", "correct horse").await.unwrap();

        assert!(changes.has_changed().unwrap());
        assert!(changes.borrow_and_update().is_some());
        assert!(accounts.session().is_some());
        assert_eq!(accounts.profile().await.unwrap().full_name, "Asha Rao");
    }

    #[tokio::test]
    async fn auth_errors_are_verbatim() {
        let accounts = service();
        match accounts.sign_in("student@example.edu", "wrong").await {
            Err(SimError::Auth { reason }) => assert_eq!(reason, "Invalid login credentials"),
            other => panic!("expected Auth, got {:?}", other),
        }
        match accounts.sign_up("a@taken.edu", "pw", "A").await {
            Err(e) => assert_eq!(e.user_message(), "User already registered"),
            Ok(_) => panic!("expected sign-up failure"),
        }
        assert!(matches!(
            accounts.sign_in("student@example.edu", "offline").await,
            Err(SimError::Auth { .. })
        ));
        assert!(accounts.session().is_none());
    }

    #[tokio::test]
    async fn training_phase_update_is_echoed() {
        let accounts = service();
        assert!(accounts.update_training_phase(TrainingPhase::Year3).await.is_err());

        accounts.sign_in("student@example.edu", "correct horse").await.unwrap();
        let mut changes = accounts.subscribe();
        accounts.update_training_phase(TrainingPhase::Year3).await.unwrap();

        assert!(changes.has_changed().unwrap());
        assert_eq!(accounts.training_phase(), Some(TrainingPhase::Year3));
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let accounts = service();
        accounts.sign_in("student@example.edu", "correct horse").await.unwrap();
        accounts.sign_out().await.unwrap();
        assert!(accounts.session().is_none());
        assert!(accounts.profile().await.is_err());
        assert!(accounts.notification_center().is_err());
    }

    #[test]
    fn backend_events_replace_session() {
        let accounts = service();
        let session = AuthSession {
            user_id: Uuid::new_v4(),
            email: "x@example.edu".to_string(),
            access_token: "t".to_string(),
            training_phase: Some(TrainingPhase::Year1),
        };
        accounts.handle_event(AuthEvent {
            event: AuthEventKind::TokenRefreshed,
            session: Some(session.clone()),
        });
        assert_eq!(accounts.session(), Some(session));

        accounts.handle_event(AuthEvent {
            event: AuthEventKind::SignedOut,
            session: None,
        });
        assert_eq!(accounts.session(), None);
    }

    // ── Notifications ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn inbox_keeps_store_order() {
        let (_, center) = inbox(true, false).await;
        let ids: Vec<&str> = center.notifications().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n2", "n1", "n0"]);
        assert_eq!(center.unread_count(), 2);
    }

    #[tokio::test]
    async fn mark_read_commits() {
        let (profiles, mut center) = inbox(true, false).await;
        assert!(center.mark_read("n1").await.unwrap());
        assert_eq!(center.unread_count(), 1);
        assert_eq!(*profiles.writes.lock().unwrap(), vec!["one:n1".to_string()]);

        assert!(center.mark_read("n0").await.unwrap());
        assert!(!center.mark_read("missing").await.unwrap());
        assert_eq!(profiles.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn refused_write_reverts() {
        let (_, mut center) = inbox(false, false).await;
        assert!(!center.mark_all_read().await.unwrap());
        assert_eq!(center.unread_count(), 2);
    }

    #[tokio::test]
    async fn failed_write_reverts_and_errors() {
        let (_, mut center) = inbox(true, true).await;
        assert!(center.mark_read("n2").await.is_err());
        assert!(!center.notifications()[0].is_read);

        assert!(center.mark_all_read().await.is_err());
        assert_eq!(center.unread_count(), 2);
    }

    #[tokio::test]
    async fn mark_all_read_commits() {
        let (profiles, mut center) = inbox(true, false).await;
        assert!(center.mark_all_read().await.unwrap());
        assert_eq!(center.unread_count(), 0);
        assert!(center.mark_all_read().await.unwrap());
        assert_eq!(profiles.writes.lock().unwrap().len(), 1);
    }
}
