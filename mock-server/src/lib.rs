//! In-memory emulation of the Authena identity service.
//!
//! Serves the same user, token and permission endpoints as the real service
//! over a shared `Directory`. New users start unconfirmed with a temporary
//! password; the first password login answers with a `NEW_PASSWORD_REQUIRED`
//! challenge until `/token/challenge` sets a permanent password.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Query, RawQuery, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const NEW_PASSWORD_REQUIRED: &str = "NEW_PASSWORD_REQUIRED";
pub const ACCESS_TOKEN_TTL_SECS: u64 = 3600;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub preferred_username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub group_ids: Vec<String>,
    pub permissions: Vec<String>,
    pub is_active: bool,
}

#[derive(Debug)]
struct Account {
    user: User,
    password: String,
    confirmed: bool,
}

#[derive(Debug)]
struct AuthorizationCode {
    username: String,
    redirect_uri: Option<String>,
}

/// Everything the emulated service remembers.
#[derive(Debug, Default)]
pub struct Directory {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, String>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    codes: HashMap<String, AuthorizationCode>,
}

impl Directory {
    /// Issue a single-use authorization code for `username`, as the hosted
    /// login page would after a successful sign-in.
    pub fn issue_authorization_code(
        &mut self,
        username: &str,
        redirect_uri: Option<&str>,
    ) -> String {
        let code = Uuid::new_v4().simple().to_string();
        self.codes.insert(
            code.clone(),
            AuthorizationCode {
                username: username.to_string(),
                redirect_uri: redirect_uri.map(str::to_string),
            },
        );
        code
    }

    fn issue_tokens(&mut self, username: &str) -> Value {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();
        self.access_tokens
            .insert(access_token.clone(), username.to_string());
        self.refresh_tokens
            .insert(refresh_token.clone(), username.to_string());
        json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "id_token": Uuid::new_v4().to_string(),
            "expires_in": ACCESS_TOKEN_TTL_SECS,
            "token_type": "Bearer",
        })
    }

    fn account(&self, username: &str) -> Result<&Account, ApiFailure> {
        self.accounts.get(username).ok_or_else(user_not_found)
    }

    fn account_mut(&mut self, username: &str) -> Result<&mut Account, ApiFailure> {
        self.accounts.get_mut(username).ok_or_else(user_not_found)
    }
}

pub type Db = Arc<RwLock<Directory>>;

type ApiFailure = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiFailure>;

fn failure(status: StatusCode, message: &str) -> ApiFailure {
    (status, Json(json!({ "message": message })))
}

fn user_not_found() -> ApiFailure {
    failure(StatusCode::NOT_FOUND, "user not found")
}

#[derive(Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

#[derive(Deserialize)]
pub struct UsernameBody {
    pub username: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub username: Option<String>,
    pub group_ids: Option<Vec<String>>,
    pub email: String,
    pub preferred_username: String,
    pub first_name: String,
    pub last_name: String,
    pub permissions: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub username: String,
    pub email: Option<String>,
    pub preferred_username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub group_ids: Option<Vec<String>>,
    pub permissions: Option<Vec<String>>,
}

/// Either a password grant or an authorization-code grant.
#[derive(Deserialize)]
pub struct CreateToken {
    pub username: Option<String>,
    pub password: Option<String>,
    pub authorization_code: Option<String>,
    pub redirect_uri: Option<String>,
}

#[derive(Deserialize)]
pub struct ChallengeReply {
    pub challenge_name: String,
    pub challenge_session: String,
    pub challenge_response: HashMap<String, String>,
}

#[derive(Deserialize)]
pub struct AccessTokenBody {
    pub access_token: String,
}

#[derive(Deserialize)]
pub struct RefreshTokenBody {
    pub refresh_token: String,
}

pub fn app() -> Router {
    app_with(Db::default())
}

/// Router over an existing directory, so tests can reach into the state.
pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/user/get", get(get_user))
        .route("/user/delete", delete(delete_user))
        .route("/user/create", post(create_user))
        .route("/user/enable", post(enable_user))
        .route("/user/disable", post(disable_user))
        .route("/user/update", put(update_user))
        .route("/user/filter", get(filter_users))
        .route("/token/create", post(create_token))
        .route("/token/challenge", post(respond_to_challenge))
        .route("/token/validate", post(validate_token))
        .route("/token/refresh", post(refresh_token))
        .route("/permission/get", get(get_permissions))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(db)).await
}

async fn get_user(State(db): State<Db>, Query(query): Query<UsernameQuery>) -> ApiResult<User> {
    let directory = db.read().await;
    Ok(Json(directory.account(&query.username)?.user.clone()))
}

async fn delete_user(State(db): State<Db>, Json(input): Json<UsernameBody>) -> ApiResult<Value> {
    let mut directory = db.write().await;
    directory
        .accounts
        .remove(&input.username)
        .ok_or_else(user_not_found)?;
    directory
        .access_tokens
        .retain(|_, owner| *owner != input.username);
    directory
        .refresh_tokens
        .retain(|_, owner| *owner != input.username);
    Ok(Json(json!({})))
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<CreateUser>,
) -> ApiResult<Value> {
    let mut directory = db.write().await;
    let username = input
        .username
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if username.is_empty() || input.email.is_empty() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "username and email must not be empty",
        ));
    }
    if directory.accounts.contains_key(&username) {
        return Err(failure(StatusCode::CONFLICT, "user already exists"));
    }

    let tmp_password = format!("Tmp#{}", Uuid::new_v4().simple());
    let user = User {
        username: username.clone(),
        preferred_username: input.preferred_username,
        email: input.email,
        first_name: input.first_name,
        last_name: input.last_name,
        group_ids: input.group_ids.unwrap_or_default(),
        permissions: input.permissions.unwrap_or_default(),
        is_active: true,
    };
    directory.accounts.insert(
        username.clone(),
        Account {
            user,
            password: tmp_password.clone(),
            confirmed: false,
        },
    );
    Ok(Json(
        json!({ "username": username, "tmp_password": tmp_password }),
    ))
}

async fn enable_user(State(db): State<Db>, Json(input): Json<UsernameBody>) -> ApiResult<Value> {
    set_active(db, &input.username, true).await
}

async fn disable_user(State(db): State<Db>, Json(input): Json<UsernameBody>) -> ApiResult<Value> {
    set_active(db, &input.username, false).await
}

async fn set_active(db: Db, username: &str, is_active: bool) -> ApiResult<Value> {
    let mut directory = db.write().await;
    directory.account_mut(username)?.user.is_active = is_active;
    Ok(Json(json!({})))
}

async fn update_user(State(db): State<Db>, Json(input): Json<UpdateUser>) -> ApiResult<Value> {
    let mut directory = db.write().await;
    let user = &mut directory.account_mut(&input.username)?.user;
    if let Some(email) = input.email {
        user.email = email;
    }
    if let Some(preferred_username) = input.preferred_username {
        user.preferred_username = preferred_username;
    }
    if let Some(first_name) = input.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = input.last_name {
        user.last_name = last_name;
    }
    if let Some(group_ids) = input.group_ids {
        user.group_ids = group_ids;
    }
    if let Some(permissions) = input.permissions {
        user.permissions = permissions;
    }
    Ok(Json(json!({})))
}

/// `username` may repeat, which `Query` cannot express, so the raw query is
/// parsed by hand.
async fn filter_users(
    State(db): State<Db>,
    RawQuery(query): RawQuery,
) -> ApiResult<BTreeMap<String, Value>> {
    let mut group_id = None;
    let mut is_active = None;
    let mut usernames = Vec::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match &*key {
            "group_id" => group_id = Some(value.into_owned()),
            "is_active" => is_active = Some(value.eq_ignore_ascii_case("true")),
            "username" => usernames.push(value.into_owned()),
            _ => {}
        }
    }

    let directory = db.read().await;
    let users = directory
        .accounts
        .values()
        .map(|account| &account.user)
        .filter(|user| usernames.is_empty() || usernames.contains(&user.username))
        .filter(|user| {
            group_id
                .as_ref()
                .is_none_or(|group| user.group_ids.contains(group))
        })
        .filter(|user| is_active.is_none_or(|active| user.is_active == active))
        .map(|user| {
            let summary = json!({
                "username": user.username,
                "preferred_username": user.preferred_username,
                "email": user.email,
                "first_name": user.first_name,
                "last_name": user.last_name,
                "group_ids": user.group_ids,
            });
            (user.username.clone(), summary)
        })
        .collect();
    Ok(Json(users))
}

async fn create_token(State(db): State<Db>, Json(input): Json<CreateToken>) -> ApiResult<Value> {
    let mut directory = db.write().await;

    if let Some(code) = input.authorization_code {
        let grant = directory
            .codes
            .remove(&code)
            .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "invalid authorization code"))?;
        if grant.redirect_uri.is_some() && grant.redirect_uri != input.redirect_uri {
            return Err(failure(StatusCode::BAD_REQUEST, "redirect_uri mismatch"));
        }
        let authentication = directory.issue_tokens(&grant.username);
        return Ok(Json(
            json!({ "is_challenge": false, "authentication": authentication }),
        ));
    }

    let (Some(username), Some(password)) = (input.username, input.password) else {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "either username and password or authorization_code is required",
        ));
    };
    let account = directory.account(&username)?;
    if account.password != password {
        return Err(failure(StatusCode::UNAUTHORIZED, "incorrect username or password"));
    }
    if !account.user.is_active {
        return Err(failure(StatusCode::FORBIDDEN, "user is disabled"));
    }
    if !account.confirmed {
        let session = Uuid::new_v4().to_string();
        directory.sessions.insert(session.clone(), username);
        return Ok(Json(json!({
            "is_challenge": true,
            "challenge": { "challenge_name": NEW_PASSWORD_REQUIRED, "session": session },
        })));
    }
    let authentication = directory.issue_tokens(&username);
    Ok(Json(
        json!({ "is_challenge": false, "authentication": authentication }),
    ))
}

async fn respond_to_challenge(
    State(db): State<Db>,
    Json(input): Json<ChallengeReply>,
) -> ApiResult<Value> {
    if input.challenge_name != NEW_PASSWORD_REQUIRED {
        return Err(failure(StatusCode::BAD_REQUEST, "unsupported challenge"));
    }
    let (Some(username), Some(new_password)) = (
        input.challenge_response.get("USERNAME"),
        input.challenge_response.get("NEW_PASSWORD"),
    ) else {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "challenge_response requires USERNAME and NEW_PASSWORD",
        ));
    };

    let mut directory = db.write().await;
    match directory.sessions.get(&input.challenge_session) {
        Some(owner) if owner == username => {}
        _ => return Err(failure(StatusCode::BAD_REQUEST, "invalid challenge session")),
    }
    directory.sessions.remove(&input.challenge_session);

    let account = directory.account_mut(username)?;
    account.password = new_password.clone();
    account.confirmed = true;
    let authentication = directory.issue_tokens(username);
    Ok(Json(
        json!({ "is_challenge": false, "authentication": authentication }),
    ))
}

async fn validate_token(
    State(db): State<Db>,
    Json(input): Json<AccessTokenBody>,
) -> Json<Value> {
    let directory = db.read().await;
    let valid = directory.access_tokens.contains_key(&input.access_token);
    Json(json!({ "valid": valid }))
}

async fn refresh_token(
    State(db): State<Db>,
    Json(input): Json<RefreshTokenBody>,
) -> ApiResult<Value> {
    let mut directory = db.write().await;
    let username = directory
        .refresh_tokens
        .get(&input.refresh_token)
        .cloned()
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "invalid refresh token"))?;
    let access_token = Uuid::new_v4().to_string();
    directory.access_tokens.insert(access_token.clone(), username);
    Ok(Json(json!({
        "access_token": access_token,
        "id_token": Uuid::new_v4().to_string(),
        "expires_in": ACCESS_TOKEN_TTL_SECS,
        "token_type": "Bearer",
    })))
}

async fn get_permissions(
    State(db): State<Db>,
    Query(query): Query<UsernameQuery>,
) -> ApiResult<Value> {
    let directory = db.read().await;
    let permissions = &directory.account(&query.username)?.user.permissions;
    Ok(Json(json!({ "permissions": permissions })))
}
