//! High-level user and token operations over an injected `Transport`.
//!
//! # Design
//! `UserClient` pairs a stateless `AuthenaClient` with a `Transport`. Every
//! method is one build → send → parse round-trip, except `confirm`, which may
//! answer a password challenge with a second request. Nothing is cached and
//! nothing is retried.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::client::AuthenaClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::{CreateUser, Token, UpdateUser, User, UserFilter};

/// Typed client for the Authena user, token and permission endpoints.
#[derive(Debug, Clone)]
pub struct UserClient<T> {
    client: AuthenaClient,
    transport: T,
}

#[cfg(feature = "ureq")]
impl UserClient<crate::transport::UreqTransport> {
    /// Client over a blocking `ureq` transport configured from `config`.
    pub fn from_config(config: &crate::config::ClientConfig) -> Self {
        Self::new(
            &config.base_url,
            crate::transport::UreqTransport::from_config(config),
        )
    }
}

impl<T: Transport> UserClient<T> {
    pub fn new(base_url: &str, transport: T) -> Self {
        Self {
            client: AuthenaClient::new(base_url),
            transport,
        }
    }

    /// The underlying request builder.
    pub fn requests(&self) -> &AuthenaClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn get(&self, username: &str) -> Result<User, ApiError> {
        let response = self.send(self.client.build_get_user(username))?;
        self.client.parse_get_user(response)
    }

    pub fn delete(&self, username: &str) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete_user(username)?)?;
        self.client.parse_ack(response)
    }

    /// Create a user. The returned value carries the one-time `tmp_password`
    /// needed by [`UserClient::confirm`].
    pub fn create(&self, input: &CreateUser) -> Result<User, ApiError> {
        let response = self.send(self.client.build_create_user(input)?)?;
        self.client.parse_create_user(input, response)
    }

    pub fn enable(&self, username: &str) -> Result<(), ApiError> {
        let response = self.send(self.client.build_enable_user(username)?)?;
        self.client.parse_ack(response)
    }

    pub fn disable(&self, username: &str) -> Result<(), ApiError> {
        let response = self.send(self.client.build_disable_user(username)?)?;
        self.client.parse_ack(response)
    }

    /// Partial update: fields left as `None` keep their server-side value.
    pub fn update(&self, input: &UpdateUser) -> Result<(), ApiError> {
        let response = self.send(self.client.build_update_user(input)?)?;
        self.client.parse_ack(response)
    }

    pub fn filter(&self, filter: &UserFilter) -> Result<BTreeMap<String, User>, ApiError> {
        let response = self.send(self.client.build_filter_users(filter))?;
        self.client.parse_filter_users(response)
    }

    /// Replace a freshly created user's temporary password.
    ///
    /// Fails with [`ApiError::ConfirmationFailed`] when the flow ends without
    /// an access token.
    pub fn confirm(
        &self,
        username: &str,
        tmp_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let response = self.send(self.client.build_create_token(username, tmp_password)?)?;
        let mut token_response = self.client.parse_token_response(response)?;

        if token_response.is_challenge {
            let Some(challenge) = token_response.challenge.take() else {
                warn!(username, "challenge requested without challenge details");
                return Err(ApiError::ConfirmationFailed);
            };
            debug!(username, challenge = %challenge.challenge_name, "answering challenge");
            let request = self
                .client
                .build_respond_to_challenge(username, &challenge, new_password)?;
            token_response = self.client.parse_token_response(self.send(request)?)?;
        }

        if token_response.access_token().is_none() {
            warn!(username, "confirmation finished without an access token");
            return Err(ApiError::ConfirmationFailed);
        }
        Ok(())
    }

    pub fn validate_token(&self, access_token: &str) -> Result<bool, ApiError> {
        let response = self.send(self.client.build_validate_token(access_token)?)?;
        self.client.parse_validate_token(response)
    }

    /// Fails with [`ApiError::UserNotConfirmed`] while the account still has
    /// a pending challenge.
    pub fn create_token(&self, username: &str, password: &str) -> Result<Token, ApiError> {
        let response = self.send(self.client.build_create_token(username, password)?)?;
        let token_response = self.client.parse_token_response(response)?;
        if token_response.is_challenge {
            warn!(username, "token requested for an unconfirmed user");
        }
        self.client.token_from_response(token_response)
    }

    pub fn exchange_auth_code(
        &self,
        authorization_code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<Token, ApiError> {
        let request = self
            .client
            .build_exchange_auth_code(authorization_code, redirect_uri)?;
        let token_response = self.client.parse_token_response(self.send(request)?)?;
        self.client.token_from_response(token_response)
    }

    pub fn refresh_token(&self, refresh_token: &str) -> Result<Token, ApiError> {
        let response = self.send(self.client.build_refresh_token(refresh_token)?)?;
        self.client.parse_refresh_token(response)
    }

    pub fn permissions(&self, username: &str) -> Result<Vec<String>, ApiError> {
        let response = self.send(self.client.build_get_permissions(username))?;
        self.client.parse_get_permissions(response)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method.as_str();
        let path = request.path.clone();
        debug!(method, %path, "sending request");
        let response = self.transport.send(request).inspect_err(|e| {
            warn!(method, %path, error = %e, "transport failed");
        })?;
        debug!(method, %path, status = response.status, "received response");
        Ok(response)
    }
}
