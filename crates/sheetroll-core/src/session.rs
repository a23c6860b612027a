//! Sign-in state for writes.

use crate::config::CredentialsConfig;

/// OAuth scope a token needs for every write path.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Whether writes can be attempted for real.
///
/// Obtaining and refreshing the token is the caller's business; the session
/// only carries it. A signed-out session turns every write into a simulation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    access_token: Option<String>,
}

impl AuthSession {
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// A session holding `token`. Blank tokens count as signed out.
    pub fn signed_in(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            access_token: (!token.trim().is_empty()).then_some(token),
        }
    }

    pub fn from_credentials(credentials: &CredentialsConfig) -> Self {
        credentials
            .access_token
            .as_deref()
            .map_or_else(Self::signed_out, Self::signed_in)
    }

    pub fn is_signed_in(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("signed_in", &self.is_signed_in())
            .finish()
    }
}
