use std::path::PathBuf;
use std::sync::mpsc::{Receiver, channel};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::api::{HttpApi, MatchApi, ProfilePatch, RegistrationInput};
use crate::error::ApiError;
use crate::models::{Credential, UserProfile};

/// Result of `login`/`register`. These never surface an `Err` to the
/// caller; a failure is an outcome with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failure(String),
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success)
    }
}

/// Durable home of the one persisted credential string.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn open() -> Result<Self> {
        Ok(Self { path: Self::default_path()? })
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "resmatch") {
            Ok(proj_dirs.data_dir().join("credential"))
        } else {
            Ok(PathBuf::from("resmatch-credential"))
        }
    }

    pub fn load(&self) -> Option<Credential> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match raw.parse::<Credential>() {
            Ok(cred) => Some(cred),
            Err(e) => {
                warn!("ignoring persisted credential: {}", e);
                None
            }
        }
    }

    pub fn save(&self, cred: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, cred.to_string())
            .with_context(|| format!("failed to persist credential to {}", self.path.display()))
    }

    /// Removal is best-effort: logout must not fail.
    pub fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove persisted credential: {}", e);
            }
        }
    }
}

/// Owns the credential and the resolved identity for the lifetime of the
/// process. All authentication-state teardown happens here and nowhere
/// else: the API boundary publishes credential rejections on a channel
/// that this store subscribes to exactly once, at construction.
pub struct SessionStore {
    api: Box<dyn MatchApi>,
    store: CredentialStore,
    auth_events: Receiver<crate::api::AuthRejected>,
    credential: Option<Credential>,
    user: Option<UserProfile>,
}

impl SessionStore {
    pub fn connect(base_url: &str) -> Result<Self> {
        let (tx, rx) = channel();
        let api = HttpApi::new(base_url, tx);
        Ok(Self {
            api: Box::new(api),
            store: CredentialStore::open()?,
            auth_events: rx,
            credential: None,
            user: None,
        })
    }

    #[cfg(test)]
    pub fn with_api(
        api: Box<dyn MatchApi>,
        auth_events: Receiver<crate::api::AuthRejected>,
        store: CredentialStore,
    ) -> Self {
        Self { api, store, auth_events, credential: None, user: None }
    }

    pub fn api(&self) -> &dyn MatchApi {
        self.api.as_ref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Credential for an outgoing call, or `Auth` when anonymous.
    pub fn require_credential(&self) -> Result<Credential, ApiError> {
        self.credential.clone().ok_or(ApiError::Auth)
    }

    /// Resolves any persisted credential into a live session. Completes in
    /// every case; a rejected credential is discarded, a transport failure
    /// leaves the credential on disk for the next run.
    pub fn initialize(&mut self) {
        let Some(cred) = self.store.load() else {
            debug!("no persisted credential; starting anonymous");
            return;
        };
        match self.api.get_current_user(&cred) {
            Ok(user) => {
                info!("session restored for {}", user.email);
                self.credential = Some(cred);
                self.user = Some(user);
            }
            Err(ApiError::Auth) => {
                info!("persisted credential rejected; discarding");
                self.store.clear();
            }
            Err(e) => {
                warn!("could not restore session: {}", e);
            }
        }
        // An event published by the probe above has already been acted on.
        while self.auth_events.try_recv().is_ok() {}
    }

    pub fn login(&mut self, email: &str, password: &str) -> AuthOutcome {
        let cred = match self.api.authenticate(email, password) {
            Ok(cred) => cred,
            Err(e) => return AuthOutcome::Failure(e.to_string()),
        };
        if let Err(e) = self.store.save(&cred) {
            return AuthOutcome::Failure(e.to_string());
        }
        match self.api.get_current_user(&cred) {
            Ok(user) => {
                info!("logged in as {}", user.email);
                self.credential = Some(cred);
                self.user = Some(user);
                AuthOutcome::Success
            }
            Err(e) => {
                // No half-set state: roll the persisted credential back.
                self.store.clear();
                AuthOutcome::Failure(e.to_string())
            }
        }
    }

    /// Account creation followed by a login with the same credentials; the
    /// login's outcome is the reported outcome.
    pub fn register(&mut self, input: &RegistrationInput) -> AuthOutcome {
        if let Err(e) = self.api.create_account(input) {
            return AuthOutcome::Failure(e.to_string());
        }
        self.login(&input.email, &input.password)
    }

    pub fn logout(&mut self) {
        self.store.clear();
        self.credential = None;
        self.user = None;
    }

    /// The server's returned representation replaces the stored profile,
    /// never a locally merged guess.
    pub fn update_user(&mut self, patch: &ProfilePatch) -> Result<UserProfile, ApiError> {
        let cred = self.require_credential()?;
        let user = self.api.update_profile(&cred, patch)?;
        self.user = Some(user.clone());
        Ok(user)
    }

    /// Drains the auth-event channel; any credential rejection observed on
    /// the wire since the last call forces the session back to anonymous.
    /// Returns true when a teardown happened.
    pub fn reconcile(&mut self) -> bool {
        let mut rejected = false;
        while self.auth_events.try_recv().is_ok() {
            rejected = true;
        }
        if rejected && self.credential.is_some() {
            warn!("credential no longer valid; signing out");
            self.logout();
            return true;
        }
        false
    }
}
