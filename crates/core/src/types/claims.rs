//! Claims carried by the backend-issued session token.
//!
//! The gateway never mints tokens. It decodes them only to decide what to
//! show (account links, admin pages); the backend re-checks every request.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Claims structure of the backend session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Backend user identifier.
    #[serde(alias = "sub", alias = "_id", alias = "userId")]
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Role name, e.g. `user` or `admin`.
    #[serde(default = "default_role")]
    pub role: String,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

fn default_role() -> String {
    "user".to_string()
}

impl SessionClaims {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }

    /// Whether the token has expired at the given unix timestamp.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }
}
