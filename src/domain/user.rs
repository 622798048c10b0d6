use chrono::{DateTime, Utc};
use derive_more::Display;
use nutype::nutype;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::identifiers::UserId;
use crate::domain::validation_constants::token;

/// User email address (validated, case-insensitive)
#[nutype(
    sanitize(trim, lowercase),
    validate(predicate = |email| email.contains('@') && email.len() >= 5 && email.len() <= 255),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, AsRef, Display)
)]
pub struct EmailAddress(String);

/// User display name
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, AsRef, Display)
)]
pub struct DisplayName(String);

/// What a user is allowed to do on the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[display("client")]
    Client,
    #[display("vendor")]
    Vendor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Vendor => "vendor",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "vendor" => Ok(Self::Vendor),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered marketplace participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub display_name: DisplayName,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: EmailAddress, display_name: DisplayName, role: Role) -> Self {
        Self {
            id: UserId::generate(),
            email,
            display_name,
            role,
            created_at: Utc::now(),
        }
    }

    pub fn is_vendor(&self) -> bool {
        self.role == Role::Vendor
    }

    pub fn is_client(&self) -> bool {
        self.role == Role::Client
    }
}

/// Bearer token handed to a user once, at registration
///
/// Only the SHA-256 digest is ever persisted. `Debug` never prints the
/// secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiToken").field(&"[REDACTED]").finish()
    }
}

impl ApiToken {
    pub fn generate() -> Self {
        let raw = format!(
            "{}{}{}",
            token::PREFIX,
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        Self(raw)
    }

    pub fn from_bearer(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn digest(&self) -> TokenDigest {
        TokenDigest(hex::encode(Sha256::digest(self.0.as_bytes())))
    }
}

/// Hex-encoded SHA-256 of an [`ApiToken`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenDigest(String);

impl TokenDigest {
    pub fn from_stored(digest: String) -> Self {
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(s: &str) -> EmailAddress {
        EmailAddress::try_new(s.to_string()).unwrap()
    }

    #[test]
    fn test_email_validation() {
        assert!(EmailAddress::try_new("test@example.com".to_string()).is_ok());
        assert!(EmailAddress::try_new("invalid-email".to_string()).is_err());
        assert!(EmailAddress::try_new("a@b".to_string()).is_err());
    }

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(email("  Farmer@Example.COM ").as_ref(), "farmer@example.com");
    }

    #[test]
    fn test_display_name_validation() {
        assert!(DisplayName::try_new("Jo Farmer".to_string()).is_ok());
        assert!(DisplayName::try_new("".to_string()).is_err());
        assert!(DisplayName::try_new("   ".to_string()).is_err());
        assert!(DisplayName::try_new("a".repeat(256)).is_err());
    }

    #[test]
    fn test_user_roles() {
        let name = DisplayName::try_new("Green Acres".to_string()).unwrap();
        let vendor = User::new(email("green@acres.test"), name.clone(), Role::Vendor);
        let client = User::new(email("buyer@acres.test"), name, Role::Client);

        assert!(vendor.is_vendor());
        assert!(!vendor.is_client());
        assert!(client.is_client());
        assert_ne!(vendor.id, client.id);
    }

    #[test]
    fn test_role_round_trips_through_its_name() {
        for role in [Role::Client, Role::Vendor] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            assert_eq!(role.to_string(), role.as_str());
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_tokens_are_unique_and_digest_deterministically() {
        let first = ApiToken::generate();
        let second = ApiToken::generate();
        assert_ne!(first, second);
        assert!(first.expose().starts_with(token::PREFIX));

        let digest = first.digest();
        assert_eq!(digest, ApiToken::from_bearer(first.expose()).digest());
        assert_eq!(digest.as_str().len(), 64);
        assert_ne!(digest, second.digest());
    }

    #[test]
    fn test_token_debug_output_hides_the_secret() {
        let token = ApiToken::generate();
        let printed = format!("{token:?}");
        assert!(!printed.contains(token.expose()));
        assert_eq!(printed, r#"ApiToken("[REDACTED]")"#);
    }
}
