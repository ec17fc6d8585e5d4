use crate::error::{LookupError, Result};
use serde::{Deserialize, Serialize};

pub const READ_LEADS_PERMISSION: &str = "read_leads";
pub const ADMIN_PERMISSION: &str = "admin";

/// The signed-in user on whose behalf lookups run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Who is allowed to read lead data.
#[derive(Debug, Clone, Default)]
pub enum AccessPolicy {
    /// No principal checks (local fixtures, tooling).
    #[default]
    Open,
    /// Lookups run on behalf of a principal; `None` means nobody is signed in.
    Principal(Option<Principal>),
}

impl AccessPolicy {
    /// Rules: a principal is required, an unverified email denies, and otherwise
    /// `read_leads`, `admin` or an empty permission list grants access.
    pub fn check(&self) -> Result<()> {
        let principal = match self {
            Self::Open => return Ok(()),
            Self::Principal(None) => {
                return Err(LookupError::AccessDenied(
                    "no authenticated user".to_string(),
                ))
            }
            Self::Principal(Some(principal)) => principal,
        };

        if principal.email.is_some() && !principal.email_verified {
            return Err(LookupError::AccessDenied(format!(
                "email not verified for {}",
                principal.uid
            )));
        }

        let granted = principal.permissions.is_empty()
            || principal
                .permissions
                .iter()
                .any(|p| p == READ_LEADS_PERMISSION || p == ADMIN_PERMISSION);
        if !granted {
            return Err(LookupError::AccessDenied(format!(
                "{} lacks {READ_LEADS_PERMISSION}",
                principal.uid
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn principal_uid(&self) -> Option<&str> {
        match self {
            Self::Principal(Some(p)) => Some(p.uid.as_str()),
            _ => None,
        }
    }
}
