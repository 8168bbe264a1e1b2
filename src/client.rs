// src/client.rs

//! The assembled client: configuration, session, transport, and cache
//! wired together behind one facade.

use std::sync::Arc;

use crate::api::{ComplaintsBackend, HttpBackend};
use crate::cache::TicketCache;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::models::{AuthSession, UserRef};
use crate::session::SessionStore;
use crate::transport::Transport;

/// Entry point for applications embedding the client.
///
/// Owns the session store and the ticket cache; all ticket operations are
/// reached through [`ScmsClient::cache`]. Authentication changes flow
/// through this type so the cache scope and persisted session stay in
/// step.
pub struct ScmsClient {
    session: SessionStore,
    backend: Arc<dyn ComplaintsBackend>,
    cache: TicketCache,
}

impl ScmsClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let session = SessionStore::new(config.session.file.clone());
        let transport = Transport::new(&config.api, session.clone())?;
        let backend: Arc<dyn ComplaintsBackend> = Arc::new(HttpBackend::new(transport));
        let cache = TicketCache::new(Arc::clone(&backend));
        Ok(Self {
            session,
            backend,
            cache,
        })
    }

    pub fn cache(&self) -> &TicketCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn user(&self) -> Option<UserRef> {
        self.session.user()
    }

    /// Sign in and persist the session. Cached data from any previous
    /// identity is dropped.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let session = self.backend.login(email, password).await?;
        self.install_session(session.clone()).await?;
        Ok(session)
    }

    /// Create an account and sign in with it.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<AuthSession> {
        let session = self.backend.signup(name, email, password).await?;
        self.install_session(session.clone()).await?;
        Ok(session)
    }

    /// Resume a session: reuse the in-memory one or load the persisted
    /// file, then validate the credential against the profile endpoint.
    /// Returns `false` when no usable session exists; a session the server
    /// rejects is discarded.
    pub async fn resume(&self) -> Result<bool> {
        if !self.session.is_authenticated() && !self.session.load_from_disk().await? {
            return Ok(false);
        }
        match self.backend.me().await {
            Ok(user) => {
                self.cache.set_admin_scope(user.is_admin());
                if let Some(mut session) = self.session.session() {
                    session.user = user;
                    self.session.set(session).await?;
                }
                Ok(true)
            }
            Err(e) => {
                log::warn!("Stored session failed validation: {e}");
                self.session.clear().await?;
                self.cache.clear();
                Ok(false)
            }
        }
    }

    /// [`resume`](Self::resume), then the initial loads for the account's
    /// surface (student ticket page, or the admin inbox, review queue and
    /// analytics).
    pub async fn bootstrap(&self) -> Result<bool> {
        if !self.resume().await? {
            return Ok(false);
        }
        self.cache.bootstrap().await?;
        Ok(true)
    }

    /// Drop the session and all cached state. Safe to call when already
    /// signed out.
    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await?;
        self.cache.clear();
        Ok(())
    }

    /// Tear down cached state when the transport reported a credential
    /// loss. Returns whether a teardown happened.
    pub fn reset_if_unauthorized(&self) -> bool {
        if self.session.unauthorized_fired() {
            self.cache.clear();
            return true;
        }
        false
    }

    async fn install_session(&self, session: AuthSession) -> Result<()> {
        self.cache.clear();
        self.cache.set_admin_scope(session.user.is_admin());
        self.session.set(session).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path as mock_path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(base_url: &str, tmp: &TempDir) -> ScmsClient {
        let mut config = ClientConfig::default();
        config.api.base_url = base_url.to_string();
        config.session.file = tmp.path().join("session.json");
        ScmsClient::new(&config).unwrap()
    }

    async fn mount_login(server: &MockServer, role: &str) {
        Mock::given(method("POST"))
            .and(mock_path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "accessToken": "tok-1",
                    "tokenType": "Bearer",
                    "user": { "id": 7, "name": "Asha Rao", "role": role },
                }
            })))
            .mount(server)
            .await;
    }

    async fn mount_me(server: &MockServer, role: &str) {
        Mock::given(method("GET"))
            .and(mock_path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "name": "Asha Rao", "role": role,
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn login_persists_the_session_and_sets_the_scope() {
        let server = MockServer::start().await;
        mount_login(&server, "ROLE_DEPT_ADMIN").await;

        let tmp = TempDir::new().unwrap();
        let client = make_client(&server.uri(), &tmp);
        let session = client.login("asha@campus.edu", "pw").await.unwrap();

        assert_eq!(session.access_token, "tok-1");
        assert!(client.is_authenticated());
        assert!(client.cache().admin_scope());
        assert!(client.session().path().exists());
    }

    #[tokio::test]
    async fn resume_restores_a_persisted_session() {
        let server = MockServer::start().await;
        mount_login(&server, "ROLE_USER").await;
        mount_me(&server, "ROLE_USER").await;

        let tmp = TempDir::new().unwrap();
        make_client(&server.uri(), &tmp)
            .login("asha@campus.edu", "pw")
            .await
            .unwrap();

        // a fresh process: same config, nothing in memory
        let client = make_client(&server.uri(), &tmp);
        assert!(!client.is_authenticated());
        assert!(client.resume().await.unwrap());
        assert!(client.is_authenticated());
        assert_eq!(client.user().unwrap().name, "Asha Rao");
        assert!(!client.cache().admin_scope());
    }

    #[tokio::test]
    async fn resume_without_a_session_is_false() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let client = make_client(&server.uri(), &tmp);
        assert!(!client.resume().await.unwrap());
    }

    #[tokio::test]
    async fn rejected_session_is_discarded_on_resume() {
        let server = MockServer::start().await;
        mount_login(&server, "ROLE_USER").await;
        Mock::given(method("GET"))
            .and(mock_path("/api/auth/me"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" })),
            )
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        make_client(&server.uri(), &tmp)
            .login("asha@campus.edu", "pw")
            .await
            .unwrap();

        let client = make_client(&server.uri(), &tmp);
        assert!(!client.resume().await.unwrap());
        assert!(!client.is_authenticated());
        assert!(!client.session().path().exists());
    }

    #[tokio::test]
    async fn bootstrap_loads_the_student_page() {
        let server = MockServer::start().await;
        mount_login(&server, "ROLE_USER").await;
        mount_me(&server, "ROLE_USER").await;
        Mock::given(method("GET"))
            .and(mock_path("/api/complaints"))
            .and(query_param("mine", "true"))
            .and(query_param("page", "0"))
            .and(query_param("size", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [ { "id": 4, "title": "Leak", "status": "NEW" } ],
                "page": 0,
                "size": 20,
                "totalElements": 1,
            })))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let client = make_client(&server.uri(), &tmp);
        client.login("asha@campus.edu", "pw").await.unwrap();

        assert!(client.bootstrap().await.unwrap());
        let page = client.cache().user_tickets();
        assert_eq!(page.tickets.len(), 1);
        assert_eq!(page.tickets[0].title, "Leak");
        assert_eq!(client.cache().user_metrics().open, 1);
    }

    #[tokio::test]
    async fn logout_clears_session_and_cache() {
        let server = MockServer::start().await;
        mount_login(&server, "ROLE_USER").await;

        let tmp = TempDir::new().unwrap();
        let client = make_client(&server.uri(), &tmp);
        client.login("asha@campus.edu", "pw").await.unwrap();
        client.logout().await.unwrap();

        assert!(!client.is_authenticated());
        assert!(!client.session().path().exists());
        assert!(client.cache().user_tickets().tickets.is_empty());
        // signing out twice is fine
        client.logout().await.unwrap();
    }
}
