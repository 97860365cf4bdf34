//! Full user and token lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every `UserClient`
//! operation over real HTTP through `UreqTransport`. Validates that request
//! building and response parsing agree with the server end-to-end.

#![cfg(feature = "ureq")]

use authena_core::{
    ApiError, ClientConfig, CreateUser, UpdateUser, UreqTransport, UserClient, UserFilter,
};
use mock_server::Db;

/// Start the mock server on a random port and return its base URL.
fn start_server(db: Db) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, db).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client(base_url: &str) -> UserClient<UreqTransport> {
    let mut config = ClientConfig::new(base_url);
    config.timeout_secs = Some(10);
    UserClient::from_config(&config)
}

fn jane() -> CreateUser {
    CreateUser::new("jane@example.com", "jane", "Jane", "Doe")
        .username("jdoe")
        .group_ids(["admins"])
        .permissions(["users:read", "users:write"])
}

#[test]
fn user_lifecycle() {
    let client = client(&start_server(Db::default()));

    // Step 1: unknown user.
    let err = client.get("jdoe").unwrap_err();
    assert!(matches!(err, ApiError::NotFound));

    // Step 2: create, then get returns the same profile.
    let created = client.create(&jane()).unwrap();
    assert_eq!(created.username, "jdoe");
    assert!(created.tmp_password.is_some());

    let fetched = client.get("jdoe").unwrap();
    assert_eq!(fetched.username, created.username);
    assert_eq!(fetched.email, created.email);
    assert_eq!(fetched.preferred_username, created.preferred_username);
    assert_eq!(fetched.first_name, created.first_name);
    assert_eq!(fetched.last_name, created.last_name);
    assert_eq!(fetched.group_ids, created.group_ids);
    assert_eq!(fetched.is_active, Some(true));
    assert_eq!(fetched.tmp_password, None);

    // Step 3: duplicate create is rejected by the service.
    let err = client.create(&jane()).unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 409, .. }));

    // Step 4: partial update leaves the other fields alone.
    let update = UpdateUser {
        last_name: Some("Smith".to_string()),
        ..UpdateUser::new("jdoe")
    };
    client.update(&update).unwrap();
    let fetched = client.get("jdoe").unwrap();
    assert_eq!(fetched.last_name, "Smith");
    assert_eq!(fetched.first_name, "Jane");

    // Step 5: disable / enable.
    client.disable("jdoe").unwrap();
    assert_eq!(client.get("jdoe").unwrap().is_active, Some(false));
    client.enable("jdoe").unwrap();
    assert_eq!(client.get("jdoe").unwrap().is_active, Some(true));

    // Step 6: filter with repeated usernames and scalar filters.
    client
        .create(&CreateUser::new("bob@example.com", "bob", "Bob", "Roe").username("bob"))
        .unwrap();
    let users = client
        .filter(&UserFilter {
            usernames: vec!["jdoe".into(), "bob".into()],
            ..UserFilter::default()
        })
        .unwrap();
    assert_eq!(users.keys().collect::<Vec<_>>(), vec!["bob", "jdoe"]);

    let admins = client
        .filter(&UserFilter {
            group_id: Some("admins".into()),
            is_active: Some(true),
            ..UserFilter::default()
        })
        .unwrap();
    assert_eq!(admins.len(), 1);
    assert!(admins["jdoe"].group_ids.contains("admins"));

    // Step 7: permissions.
    let permissions = client.permissions("jdoe").unwrap();
    assert_eq!(permissions, vec!["users:read", "users:write"]);

    // Step 8: delete, then the user is gone.
    client.delete("bob").unwrap();
    assert!(matches!(client.get("bob"), Err(ApiError::NotFound)));
    assert!(matches!(client.delete("bob"), Err(ApiError::NotFound)));
}

#[test]
fn token_lifecycle() {
    let db = Db::default();
    let client = client(&start_server(db.clone()));

    let created = client.create(&jane()).unwrap();
    let tmp_password = created.tmp_password.unwrap();

    // Step 1: tokens are refused until the user is confirmed.
    let err = client.create_token("jdoe", &tmp_password).unwrap_err();
    assert!(matches!(err, ApiError::UserNotConfirmed));

    // Step 2: confirm answers the challenge with the new password.
    client.confirm("jdoe", &tmp_password, "N3w!pass").unwrap();

    // Step 3: the new password issues tokens.
    let token = client.create_token("jdoe", "N3w!pass").unwrap();
    assert!(client.validate_token(&token.access_token).unwrap());
    assert!(!client.validate_token("not-a-token").unwrap());
    assert_eq!(token.token_type.as_deref(), Some("Bearer"));

    // Step 4: confirming again goes straight to a token, no challenge.
    client.confirm("jdoe", "N3w!pass", "ignored").unwrap();

    // Step 5: refresh.
    let refreshed = client
        .refresh_token(token.refresh_token.as_deref().unwrap())
        .unwrap();
    assert_ne!(refreshed.access_token, token.access_token);
    assert!(client.validate_token(&refreshed.access_token).unwrap());

    // Step 6: authorization code exchange, with and without redirect URI.
    let code = db
        .blocking_write()
        .issue_authorization_code("jdoe", Some("https://app.example.com/cb"));
    let exchanged = client
        .exchange_auth_code(&code, Some("https://app.example.com/cb"))
        .unwrap();
    assert!(client.validate_token(&exchanged.access_token).unwrap());

    let code = db.blocking_write().issue_authorization_code("jdoe", None);
    client.exchange_auth_code(&code, None).unwrap();
    let err = client.exchange_auth_code(&code, None).unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 400, .. }));

    // Step 7: wrong password surfaces the service's error.
    let err = client.create_token("jdoe", "wrong").unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 401, .. }));

    // Step 8: a disabled account is refused even with the right password.
    client.disable("jdoe").unwrap();
    let err = client.create_token("jdoe", "N3w!pass").unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 403, .. }));
    client.enable("jdoe").unwrap();
    client.create_token("jdoe", "N3w!pass").unwrap();

    // Step 9: a code bound to a redirect URI rejects a different one.
    let code = db
        .blocking_write()
        .issue_authorization_code("jdoe", Some("https://app.example.com/cb"));
    let err = client
        .exchange_auth_code(&code, Some("https://evil.example.com/cb"))
        .unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 400, .. }));
}

#[test]
fn unreachable_service_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}")).get("jdoe").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
