//! Stateless HTTP request builder and response parser for the Authena API.
//!
//! # Design
//! `AuthenaClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! `UserClient` wires the two halves together through a `Transport`; callers
//! that run their own HTTP stack can use this type directly.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Challenge, CreateUser, Token, TokenResponse, UpdateUser, User, UserFilter};

#[derive(Serialize)]
struct UsernameBody<'a> {
    username: &'a str,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct AuthorizationCodeGrant<'a> {
    authorization_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

#[derive(Serialize)]
struct ChallengeReply<'a> {
    challenge_name: &'a str,
    challenge_session: &'a str,
    challenge_response: NewPasswordAnswer<'a>,
}

#[derive(Serialize)]
struct NewPasswordAnswer<'a> {
    #[serde(rename = "USERNAME")]
    username: &'a str,
    #[serde(rename = "NEW_PASSWORD")]
    new_password: &'a str,
}

#[derive(Serialize)]
struct AccessTokenBody<'a> {
    access_token: &'a str,
}

#[derive(Serialize)]
struct RefreshTokenBody<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct CreatedUser {
    username: String,
    tmp_password: String,
}

#[derive(Deserialize)]
struct Validity {
    valid: bool,
}

#[derive(Deserialize)]
struct Permissions {
    permissions: Vec<String>,
}

/// Synchronous, stateless request builder for the Authena API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct AuthenaClient {
    base_url: String,
}

impl AuthenaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- users ---

    pub fn build_get_user(&self, username: &str) -> HttpRequest {
        self.query_request("/user/get", vec![("username".to_string(), username.to_string())])
    }

    pub fn parse_get_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        parse_json(response)
    }

    pub fn build_delete_user(&self, username: &str) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Delete, "/user/delete", &UsernameBody { username })
    }

    pub fn build_create_user(&self, input: &CreateUser) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/user/create", input)
    }

    /// The service only echoes `username` and `tmp_password`; everything else
    /// comes from the request that created the user.
    pub fn parse_create_user(
        &self,
        input: &CreateUser,
        response: HttpResponse,
    ) -> Result<User, ApiError> {
        let created: CreatedUser = parse_json(response)?;
        Ok(User {
            username: created.username,
            preferred_username: input.preferred_username.clone(),
            email: input.email.clone(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            group_ids: input.group_ids.iter().flatten().cloned().collect(),
            permissions: input.permissions.iter().flatten().cloned().collect(),
            is_active: None,
            tmp_password: Some(created.tmp_password),
        })
    }

    pub fn build_enable_user(&self, username: &str) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/user/enable", &UsernameBody { username })
    }

    pub fn build_disable_user(&self, username: &str) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/user/disable", &UsernameBody { username })
    }

    pub fn build_update_user(&self, input: &UpdateUser) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, "/user/update", input)
    }

    pub fn build_filter_users(&self, filter: &UserFilter) -> HttpRequest {
        self.query_request("/user/filter", filter.query_pairs())
    }

    pub fn parse_filter_users(
        &self,
        response: HttpResponse,
    ) -> Result<BTreeMap<String, User>, ApiError> {
        parse_json(response)
    }

    /// Parse responses whose body carries nothing the caller needs
    /// (delete, enable, disable, update).
    pub fn parse_ack(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    // --- tokens ---

    pub fn build_create_token(&self, username: &str, password: &str) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            "/token/create",
            &PasswordGrant { username, password },
        )
    }

    pub fn build_exchange_auth_code(
        &self,
        authorization_code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            "/token/create",
            &AuthorizationCodeGrant {
                authorization_code,
                redirect_uri,
            },
        )
    }

    pub fn build_respond_to_challenge(
        &self,
        username: &str,
        challenge: &Challenge,
        new_password: &str,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            "/token/challenge",
            &ChallengeReply {
                challenge_name: &challenge.challenge_name,
                challenge_session: &challenge.session,
                challenge_response: NewPasswordAnswer {
                    username,
                    new_password,
                },
            },
        )
    }

    /// Parse the envelope shared by `/token/create` and `/token/challenge`.
    pub fn parse_token_response(&self, response: HttpResponse) -> Result<TokenResponse, ApiError> {
        parse_json(response)
    }

    /// Extract the token from an envelope that is not a challenge.
    pub fn token_from_response(&self, response: TokenResponse) -> Result<Token, ApiError> {
        if response.is_challenge {
            return Err(ApiError::UserNotConfirmed);
        }
        let authentication = response.authentication.ok_or_else(|| {
            ApiError::Deserialization("token response has no `authentication` field".to_string())
        })?;
        serde_json::from_value(authentication).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    pub fn build_validate_token(&self, access_token: &str) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            "/token/validate",
            &AccessTokenBody { access_token },
        )
    }

    pub fn parse_validate_token(&self, response: HttpResponse) -> Result<bool, ApiError> {
        let validity: Validity = parse_json(response)?;
        Ok(validity.valid)
    }

    pub fn build_refresh_token(&self, refresh_token: &str) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Post,
            "/token/refresh",
            &RefreshTokenBody { refresh_token },
        )
    }

    /// `/token/refresh` returns the token bag directly, with no envelope.
    pub fn parse_refresh_token(&self, response: HttpResponse) -> Result<Token, ApiError> {
        parse_json(response)
    }

    // --- permissions ---

    pub fn build_get_permissions(&self, username: &str) -> HttpRequest {
        self.query_request(
            "/permission/get",
            vec![("username".to_string(), username.to_string())],
        )
    }

    pub fn parse_get_permissions(&self, response: HttpResponse) -> Result<Vec<String>, ApiError> {
        let permissions: Permissions = parse_json(response)?;
        Ok(permissions.permissions)
    }

    fn query_request(&self, path: &str, query: Vec<(String, String)>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}{path}", self.base_url),
            query,
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            query: Vec::new(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
