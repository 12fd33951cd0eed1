//! Authentication state: who is signed in, plus sign-up / sign-in flows.

use std::sync::Arc;

use domains::{collections, encode, AuthService, DocumentStore, DomainError, Result, UserProfile};

use crate::holder::HolderState;
use crate::observable::Observable;

/// Minimum password length accepted by the auth backend.
pub const MIN_PASSWORD_LEN: usize = 6;

/// The signed-in user id, shared by every holder that acts on behalf of
/// the user. `Clone` shares the same cell.
#[derive(Clone)]
pub struct Session {
    auth: Arc<dyn AuthService>,
    current_user: Observable<Option<String>>,
}

impl Session {
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self {
            auth,
            current_user: Observable::new(None),
        }
    }

    /// Picks up a session the auth service already holds (app restart).
    pub async fn restore(&self) -> Option<String> {
        let user = self.auth.current_user().await;
        self.current_user.set(user.clone());
        user
    }

    pub fn current_user(&self) -> &Observable<Option<String>> {
        &self.current_user
    }

    pub fn user_id(&self) -> Option<String> {
        self.current_user.get()
    }

    /// The signed-in user id, or `Unauthenticated`.
    pub fn require_user(&self) -> Result<String> {
        self.user_id()
            .ok_or_else(|| DomainError::Unauthenticated("no signed-in user".into()))
    }
}

/// Sign-up details collected by the registration form.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub surname: String,
}

/// State holder behind the sign-in and registration screens. `data` is the
/// signed-in user id.
#[derive(Clone)]
pub struct SessionHolder {
    session: Session,
    auth: Arc<dyn AuthService>,
    documents: Arc<dyn DocumentStore>,
    state: HolderState<Option<String>>,
}

impl SessionHolder {
    pub fn new(
        session: Session,
        auth: Arc<dyn AuthService>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let state = HolderState::with_data(session.current_user().clone());
        Self {
            session,
            auth,
            documents,
            state,
        }
    }

    pub fn state(&self) -> &HolderState<Option<String>> {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Creates the account, signs it in and writes its `users/{uid}`
    /// profile document.
    ///
    /// The user is signed in as soon as the account exists. A failed profile
    /// write is reported on its own and does not undo the sign-in; the
    /// profile screen recreates the document on the next save.
    pub async fn sign_up(&self, registration: Registration) -> Option<String> {
        if let Err(error) = validate_credentials(&registration.email, &registration.password) {
            self.state.report("sign_up", &error);
            return None;
        }

        let user_id = self
            .state
            .track(
                "sign_up",
                self.auth
                    .sign_up(registration.email.trim(), &registration.password),
            )
            .await?;
        tracing::info!(%user_id, "account created");
        self.session.current_user.set(Some(user_id.clone()));

        let profile = UserProfile {
            id: user_id.clone(),
            name: registration.name.trim().to_string(),
            surname: registration.surname.trim().to_string(),
            ..Default::default()
        };
        self.state
            .track("create_profile", async {
                self.documents
                    .set(collections::USERS, &user_id, encode(&profile)?)
                    .await
            })
            .await;
        Some(user_id)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Option<String> {
        if let Err(error) = validate_credentials(email, password) {
            self.state.report("sign_in", &error);
            return None;
        }

        let user_id = self
            .state
            .track("sign_in", self.auth.sign_in(email.trim(), password))
            .await?;
        tracing::info!(%user_id, "signed in");
        self.session.current_user.set(Some(user_id.clone()));
        Some(user_id)
    }

    pub async fn sign_out(&self) {
        if self
            .state
            .track("sign_out", self.auth.sign_out())
            .await
            .is_some()
        {
            self.session.current_user.set(None);
        }
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::Validation("Enter a valid email address".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockAuthService, MockDocumentStore};

    fn holder(auth: MockAuthService, documents: MockDocumentStore) -> SessionHolder {
        let auth: Arc<dyn AuthService> = Arc::new(auth);
        SessionHolder::new(Session::new(Arc::clone(&auth)), auth, Arc::new(documents))
    }

    #[tokio::test]
    async fn sign_up_writes_profile_and_publishes_user() {
        let mut auth = MockAuthService::new();
        auth.expect_sign_up()
            .withf(|email, _| email == "ana@example.com")
            .returning(|_, _| Ok("uid-1".into()));
        let mut documents = MockDocumentStore::new();
        documents
            .expect_set()
            .withf(|collection, id, fields| {
                collection == "users" && id == "uid-1" && fields["name"] == "Ana"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let holder = holder(auth, documents);
        let user = holder
            .sign_up(Registration {
                email: " ana@example.com ".into(),
                password: "secret1".into(),
                name: "Ana".into(),
                surname: "Lopez".into(),
            })
            .await;

        assert_eq!(user.as_deref(), Some("uid-1"));
        assert_eq!(holder.session().user_id().as_deref(), Some("uid-1"));
        assert_eq!(holder.state().data.get().as_deref(), Some("uid-1"));
    }

    #[tokio::test]
    async fn failed_profile_write_keeps_new_account_signed_in() {
        let mut auth = MockAuthService::new();
        auth.expect_sign_up().times(1).returning(|_, _| Ok("uid-3".into()));
        let mut documents = MockDocumentStore::new();
        documents
            .expect_set()
            .times(1)
            .returning(|_, _, _| Err(DomainError::NetworkFailure("offline".into())));

        let holder = holder(auth, documents);
        let user = holder
            .sign_up(Registration {
                email: "cy@example.com".into(),
                password: "secret1".into(),
                ..Default::default()
            })
            .await;

        assert_eq!(user.as_deref(), Some("uid-3"));
        assert_eq!(holder.session().user_id().as_deref(), Some("uid-3"));
        assert_eq!(
            holder.state().error_message.get(),
            Some(DomainError::NetworkFailure(String::new()).user_message())
        );
        assert!(!holder.state().is_loading.get());
    }

    #[tokio::test]
    async fn short_password_never_reaches_backend() {
        let mut auth = MockAuthService::new();
        auth.expect_sign_in().never();
        let holder = holder(auth, MockDocumentStore::new());

        assert!(holder.sign_in("ana@example.com", "123").await.is_none());
        assert!(holder
            .state()
            .error_message
            .get()
            .unwrap()
            .contains("at least 6"));
    }

    #[tokio::test]
    async fn rejected_credentials_keep_user_signed_out() {
        let mut auth = MockAuthService::new();
        auth.expect_sign_in()
            .returning(|_, _| Err(DomainError::Unauthenticated("bad password".into())));
        let holder = holder(auth, MockDocumentStore::new());

        assert!(holder.sign_in("ana@example.com", "wrong-pass").await.is_none());
        assert_eq!(holder.session().user_id(), None);
        assert!(holder.state().error_message.get().is_some());
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let mut auth = MockAuthService::new();
        auth.expect_sign_in().returning(|_, _| Ok("uid-2".into()));
        auth.expect_sign_out().returning(|| Ok(()));
        let holder = holder(auth, MockDocumentStore::new());

        holder.sign_in("bo@example.com", "hunter22").await;
        holder.sign_out().await;
        assert_eq!(holder.session().user_id(), None);
        assert!(holder.session().require_user().is_err());
    }

    #[tokio::test]
    async fn restore_reads_existing_session() {
        let mut auth = MockAuthService::new();
        auth.expect_current_user().returning(|| Some("uid-9".into()));
        let session = Session::new(Arc::new(auth));
        assert_eq!(session.restore().await.as_deref(), Some("uid-9"));
        assert_eq!(session.require_user().unwrap(), "uid-9");
    }
}
