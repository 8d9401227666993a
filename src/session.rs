//! Durable session store: who is logged in and with what role.

use std::{fs, path::PathBuf};

use anyhow::Result;

use crate::model::{AuthResponse, User};

/// Role list marker that grants administrative capability.
const ADMIN_MARKER: &str = "ROLE_ADMIN";

/// Coarse capability class derived from the account's role list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

/// An authenticated identity plus its issued token.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    /// Derive the role from the account's role list. Recomputed on every
    /// call so it can never drift from the stored list.
    pub fn role(&self) -> Role {
        if self.user.roles.iter().any(|r| r == ADMIN_MARKER) {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// File-backed store holding the current session.
///
/// Two files under `<root>/session/` carry the durable state: `token`
/// (opaque string) and `user.json` (serialized account record). They
/// are written together, read together, and cleared together.
pub struct SessionStore {
    root: PathBuf,
    current: Option<Session>,
}

impl SessionStore {
    /// Open the store rooted at `root` and restore any persisted session.
    pub fn open(root: PathBuf) -> Self {
        let mut store = Self {
            root,
            current: None,
        };
        store.restore();
        store
    }

    /// Load the persisted session, if any. Malformed or partial data is
    /// cleared from disk and treated as no session; this never errors.
    pub fn restore(&mut self) {
        self.current = None;
        let token = fs::read_to_string(self.token_path()).ok();
        let user = fs::read_to_string(self.user_path())
            .ok()
            .and_then(|data| serde_json::from_str::<User>(&data).ok());
        match (token, user) {
            (Some(token), Some(user)) if !token.trim().is_empty() => {
                self.current = Some(Session {
                    token: token.trim().to_string(),
                    user,
                });
            }
            (None, None) => {}
            // One file present or unreadable: drop the remnants so the
            // next restore starts from a clean slate.
            _ => {
                let _ = fs::remove_file(self.token_path());
                let _ = fs::remove_file(self.user_path());
            }
        }
    }

    /// Persist a fresh login and make it the current session.
    pub fn login(&mut self, auth: AuthResponse) -> Result<()> {
        let dir = self.session_dir();
        fs::create_dir_all(&dir)?;
        // Write each file via a temp file and rename, so a crash cannot
        // leave a truncated token or user record behind.
        let token_tmp = tempfile::NamedTempFile::new_in(&dir)?;
        fs::write(token_tmp.path(), &auth.token)?;
        let user_tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&user_tmp, &auth.user)?;
        token_tmp.persist(self.token_path())?;
        user_tmp.persist(self.user_path())?;
        self.current = Some(Session {
            token: auth.token,
            user: auth.user,
        });
        Ok(())
    }

    /// Clear durable storage and the in-memory session in one operation.
    /// No network call is involved.
    pub fn logout(&mut self) -> Result<()> {
        for path in [self.token_path(), self.user_path()] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        self.current = None;
        Ok(())
    }

    /// The current session, if authenticated.
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// True iff both token and user identity are present.
    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Derived role; `None` whenever unauthenticated.
    pub fn role(&self) -> Option<Role> {
        self.current.as_ref().map(Session::role)
    }

    fn session_dir(&self) -> PathBuf {
        self.root.join("session")
    }

    fn token_path(&self) -> PathBuf {
        self.session_dir().join("token")
    }

    fn user_path(&self) -> PathBuf {
        self.session_dir().join("user.json")
    }
}
