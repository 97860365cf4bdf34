//! Domain DTOs for the Authena user and token API.
//!
//! # Design
//! Per-call inputs are explicit structs. Optional fields are `Option` and
//! carry `skip_serializing_if`, so an absent field is omitted from the JSON
//! body instead of being sent as `null`. For `UpdateUser` this is what gives
//! partial-update semantics: fields left out keep their server-side value.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A user as reported by the service.
///
/// `/user/filter` and `/user/create` return partial users: sets default to
/// empty and `is_active` is `None` when the endpoint does not report it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub preferred_username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub group_ids: BTreeSet<String>,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// One-time password, only present on the value returned by `create`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmp_password: Option<String>,
}

/// Credentials issued by the authentication endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Lifetime of `access_token` in seconds, as sent. See
    /// [`Token::expires_in_secs`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Anything else the service returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    /// `expires_in` as whole seconds. Fractions are truncated; negative or
    /// non-finite values yield `None`.
    pub fn expires_in_secs(&self) -> Option<u64> {
        let expires_in = self.expires_in.as_ref()?;
        if let Some(secs) = expires_in.as_u64() {
            return Some(secs);
        }
        expires_in
            .as_f64()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| secs as u64)
    }
}

/// A pending authentication step returned instead of a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Challenge {
    pub challenge_name: String,
    pub session: String,
}

/// Envelope returned by `/token/create` and `/token/challenge`.
///
/// `authentication` stays untyped until a caller needs a `Token`, so a
/// malformed or empty token bag can be reported as a failed confirmation
/// rather than a decoding error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    #[serde(default)]
    pub is_challenge: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<Challenge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Value>,
}

impl TokenResponse {
    /// The non-empty access token inside `authentication`, if any.
    pub fn access_token(&self) -> Option<&str> {
        self.authentication
            .as_ref()?
            .get("access_token")?
            .as_str()
            .filter(|token| !token.is_empty())
    }
}

/// Input for `/user/create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateUser {
    /// Generated by the service when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_ids: Option<Vec<String>>,
    pub email: String,
    pub preferred_username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl CreateUser {
    pub fn new(
        email: impl Into<String>,
        preferred_username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            username: None,
            group_ids: None,
            email: email.into(),
            preferred_username: preferred_username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            permissions: None,
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn group_ids<I, S>(mut self, group_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_ids = Some(group_ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }
}

/// Input for `/user/update`. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateUser {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl UpdateUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }
}

/// Query for `/user/filter`. Unset scalars are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub group_id: Option<String>,
    pub usernames: Vec<String>,
    pub is_active: Option<bool>,
}

impl UserFilter {
    /// Query pairs in wire order: `group_id`, `is_active`, then one
    /// `username` per entry.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.usernames.len() + 2);
        if let Some(group_id) = &self.group_id {
            pairs.push(("group_id".to_string(), group_id.clone()));
        }
        if let Some(is_active) = self.is_active {
            let value = if is_active { "True" } else { "False" };
            pairs.push(("is_active".to_string(), value.to_string()));
        }
        pairs.extend(
            self.usernames
                .iter()
                .map(|username| ("username".to_string(), username.clone())),
        );
        pairs
    }
}
