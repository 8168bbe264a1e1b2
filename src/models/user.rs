// src/models/user.rs

//! User identity and authenticated-session models.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Backend role of a user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    User,
    Reviewer,
    Resolver,
    DeptAdmin,
    SuperAdmin,
    /// A role this client does not know; treated as non-admin.
    Other(String),
}

impl Role {
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim() {
            "ROLE_USER" => Self::User,
            "ROLE_REVIEWER" => Self::Reviewer,
            "ROLE_RESOLVER" => Self::Resolver,
            "ROLE_DEPT_ADMIN" => Self::DeptAdmin,
            "ROLE_SUPER_ADMIN" => Self::SuperAdmin,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            Self::User => "ROLE_USER",
            Self::Reviewer => "ROLE_REVIEWER",
            Self::Resolver => "ROLE_RESOLVER",
            Self::DeptAdmin => "ROLE_DEPT_ADMIN",
            Self::SuperAdmin => "ROLE_SUPER_ADMIN",
            Self::Other(raw) => raw,
        }
    }

    /// Reviewer, resolver and admin roles get the admin surface.
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Reviewer | Self::Resolver | Self::DeptAdmin | Self::SuperAdmin
        )
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Err(D::Error::custom("role must not be empty"));
        }
        Ok(Role::from_wire(&raw))
    }
}

/// A user as referenced by tickets and sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub department: Option<String>,
}

impl UserRef {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// An authenticated session as issued by login/signup and persisted locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    pub user: UserRef,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl AuthSession {
    /// Value for the Authorization header.
    pub fn bearer(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}
