//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Comparing parsed JSON (not raw strings) avoids
//! false negatives from field-ordering differences.

use std::collections::BTreeMap;

use authena_core::{ApiError, AuthenaClient, HttpMethod, HttpRequest, HttpResponse, Token, UpdateUser, User, UserFilter};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:3000";

fn client() -> AuthenaClient {
    AuthenaClient::new(BASE_URL)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let arr = pair.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

fn simulated_response(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

/// Check method, path and whichever of query/headers/body the vector lists.
fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.path, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: path");
    if let Some(query) = expected.get("query") {
        assert_eq!(req.query, pairs(query), "{name}: query");
    }
    if let Some(headers) = expected.get("headers") {
        assert_eq!(req.headers, pairs(headers), "{name}: headers");
    }
    match expected.get("body") {
        Some(body) => {
            let req_body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&req_body, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: body should be None"),
    }
}

fn assert_expected_error(name: &str, expected: &Value, err: ApiError) {
    match expected.as_str().unwrap() {
        "NotFound" => assert!(matches!(err, ApiError::NotFound), "{name}: expected NotFound, got {err:?}"),
        "UserNotConfirmed" => assert!(
            matches!(err, ApiError::UserNotConfirmed),
            "{name}: expected UserNotConfirmed, got {err:?}"
        ),
        "Http" => assert!(matches!(err, ApiError::Http { .. }), "{name}: expected Http, got {err:?}"),
        other => panic!("{name}: unknown expected_error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Get user
// ---------------------------------------------------------------------------

#[test]
fn get_user_test_vectors() {
    let raw = include_str!("../../test-vectors/get_user.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let username = case["input_username"].as_str().unwrap();

        let req = c.build_get_user(username);
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_get_user(simulated_response(case));
        if let Some(expected_error) = case.get("expected_error") {
            assert_expected_error(name, expected_error, result.unwrap_err());
        } else {
            let expected: User = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(result.unwrap(), expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Update user
// ---------------------------------------------------------------------------

#[test]
fn update_user_test_vectors() {
    let raw = include_str!("../../test-vectors/update_user.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input: UpdateUser = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_update_user(&input).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_ack(simulated_response(case));
        if let Some(expected_error) = case.get("expected_error") {
            assert_expected_error(name, expected_error, result.unwrap_err());
        } else {
            assert!(result.is_ok(), "{name}: expected success");
        }
    }
}

// ---------------------------------------------------------------------------
// Filter users
// ---------------------------------------------------------------------------

#[test]
fn filter_users_test_vectors() {
    let raw = include_str!("../../test-vectors/filter_users.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let filter = UserFilter {
            group_id: input["group_id"].as_str().map(str::to_string),
            usernames: serde_json::from_value(input["usernames"].clone()).unwrap(),
            is_active: input["is_active"].as_bool(),
        };

        let req = c.build_filter_users(&filter);
        assert_request(name, &req, &case["expected_request"]);

        let users = c.parse_filter_users(simulated_response(case)).unwrap();
        let expected: BTreeMap<String, User> =
            serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(users, expected, "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// Create token
// ---------------------------------------------------------------------------

#[test]
fn create_token_test_vectors() {
    let raw = include_str!("../../test-vectors/create_token.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let username = case["input"]["username"].as_str().unwrap();
        let password = case["input"]["password"].as_str().unwrap();

        let req = c.build_create_token(username, password).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let result = c
            .parse_token_response(simulated_response(case))
            .and_then(|response| c.token_from_response(response));
        if let Some(expected_error) = case.get("expected_error") {
            assert_expected_error(name, expected_error, result.unwrap_err());
        } else {
            let expected: Token = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(result.unwrap(), expected, "{name}: parsed result");
        }
    }
}
