//! Session and identity.
//!
//! Every batch command needs to know whose ferments it is touching. How the
//! user signs in depends on the deployment:
//!
//! - Demo mode keeps the signed-in user in a session slot on disk. Login
//!   codes are simulated: any send succeeds, and `123456` verifies.
//! - The relational deployment delegates login-code delivery to its auth
//!   provider, outside this program. The acting user is resolved through a
//!   chain instead:
//!
//!   1. `--as <identity>`: explicit per-command override
//!   2. `KEFIR_IDENTITY` env var: process/session level
//!   3. `identity` in `~/.kefir/config.toml`: the usual single-user setup

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::{Deserialize, Serialize};

/// Environment variable naming the acting user.
pub const IDENTITY_ENV: &str = "KEFIR_IDENTITY";

/// Code accepted by the demo session.
pub const DEMO_CODE: &str = "123456";

/// User id the demo session signs in as.
pub const DEMO_USER_ID: &str = "demo-user-123";

const SESSION_SLOT: &str = "session.json";

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid code. Try 123456")]
    InvalidCode,

    #[error("{0}")]
    Unsupported(&'static str),

    #[error("session I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("session JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolves and changes who is signed in.
pub trait Session {
    /// The signed-in user, if any.
    fn current_user(&self) -> Result<Option<User>, AuthError>;

    /// Asks the provider to send a one-time code to `email`.
    fn send_login_code(&self, email: &str) -> Result<(), AuthError>;

    /// Exchanges a one-time code for a signed-in user.
    fn verify_login_code(&self, email: &str, code: &str) -> Result<User, AuthError>;

    fn sign_out(&self) -> Result<(), AuthError>;
}

/// Demo-mode session stored in a slot file under the data root.
pub struct DemoSession {
    path: PathBuf,
}

impl DemoSession {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(SESSION_SLOT),
        }
    }
}

impl Session for DemoSession {
    fn current_user(&self) -> Result<Option<User>, AuthError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn send_login_code(&self, email: &str) -> Result<(), AuthError> {
        tracing::debug!(email, "demo mode: pretending to send login code");
        Ok(())
    }

    fn verify_login_code(&self, email: &str, code: &str) -> Result<User, AuthError> {
        if code.trim() != DEMO_CODE {
            return Err(AuthError::InvalidCode);
        }
        let user = User {
            id: DEMO_USER_ID.to_string(),
            email: email.to_string(),
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&user)?)?;
        Ok(user)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Relational-mode session: the user comes from the identity chain.
pub struct ConfiguredSession {
    explicit: Option<String>,
    configured: Option<String>,
}

const PROVIDER_MANAGED: &str = "login codes are handled by the auth provider; \
    set KEFIR_IDENTITY or `identity` in ~/.kefir/config.toml instead";

impl ConfiguredSession {
    /// `explicit` is the `--as` value; `configured` the config file's `identity`.
    pub fn new(explicit: Option<String>, configured: Option<String>) -> Self {
        Self {
            explicit,
            configured,
        }
    }
}

impl Session for ConfiguredSession {
    fn current_user(&self) -> Result<Option<User>, AuthError> {
        let env_identity = env::var(IDENTITY_ENV).ok();
        Ok(resolve_identity(
            self.explicit.as_deref(),
            env_identity.as_deref(),
            self.configured.as_deref(),
        )
        .map(|id| User {
            id,
            email: String::new(),
        }))
    }

    fn send_login_code(&self, _email: &str) -> Result<(), AuthError> {
        Err(AuthError::Unsupported(PROVIDER_MANAGED))
    }

    fn verify_login_code(&self, _email: &str, _code: &str) -> Result<User, AuthError> {
        Err(AuthError::Unsupported(PROVIDER_MANAGED))
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// First non-empty identity in chain order: explicit, environment, config.
pub fn resolve_identity(
    explicit: Option<&str>,
    from_env: Option<&str>,
    configured: Option<&str>,
) -> Option<String> {
    [explicit, from_env, configured]
        .into_iter()
        .flatten()
        .find(|id| !id.is_empty())
        .map(str::to_owned)
}
