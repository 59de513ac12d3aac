use super::*;

// =============================================================================
// env_bool — uses unique env var names to avoid races with parallel tests.
// =============================================================================

#[test]
fn env_bool_true_variants() {
    for (i, val) in ["1", "true", "yes", "on"].iter().enumerate() {
        let key = format!("__TEST_EB_TRUE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(true), "expected true for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_false_variants() {
    for (i, val) in ["0", "false", "no", "off"].iter().enumerate() {
        let key = format!("__TEST_EB_FALSE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(false), "expected false for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_case_insensitive_and_trimmed() {
    let key = "__TEST_EB_CI_71__";
    unsafe { std::env::set_var(key, "  TRUE ") };
    assert_eq!(env_bool(key), Some(true));
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_bool_invalid_returns_none() {
    let key = "__TEST_EB_INVALID_417__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_bool_unset_returns_none() {
    assert_eq!(env_bool("__TEST_EB_SURELY_UNSET_SOJOURN_42__"), None);
}

// =============================================================================
// cookie_secure — tested via its inference logic; the env vars themselves
// are shared globals and racing other tests on them is not worth it.
// =============================================================================

#[test]
fn cookie_secure_https_inference_logic() {
    assert!("https://portal.example.com".starts_with("https://"));
    assert!(!"http://localhost:3000".starts_with("https://"));
}

// =============================================================================
// cookies
// =============================================================================

#[test]
fn session_cookie_is_http_only_and_site_wide() {
    let cookie = session_cookie("tok123".into(), true);
    assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
    assert_eq!(cookie.value(), "tok123");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.secure(), Some(true));
    // Session-lived: no explicit max-age.
    assert_eq!(cookie.max_age(), None);
}

#[test]
fn clear_session_cookie_expires_immediately() {
    let cookie = clear_session_cookie(false);
    assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
}

// =============================================================================
// set_role — the anonymous path never touches the database, so the lazy
// test pool suffices.
// =============================================================================

use crate::roles::ROLE_COOKIE_NAME;
use crate::state::test_helpers;

fn set_cookie_values(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
        .collect()
}

#[tokio::test]
async fn set_role_persists_preference_for_anonymous_visitors() {
    let state = test_helpers::test_app_state();
    let response = set_role(
        State(state),
        CookieJar::new(),
        Json(SetRoleBody { role: "agent".into() }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookie_values(&response);
    assert!(
        cookies.iter().any(|c| c.starts_with(&format!("{ROLE_COOKIE_NAME}=agent"))),
        "expected role cookie in {cookies:?}"
    );
}

#[tokio::test]
async fn set_role_is_idempotent() {
    let state = test_helpers::test_app_state();
    let jar = CookieJar::new().add(crate::roles::role_cookie(Role::Agent, false));

    let response = set_role(State(state), jar, Json(SetRoleBody { role: "agent".into() })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookie_values(&response);
    assert!(cookies.iter().any(|c| c.starts_with(&format!("{ROLE_COOKIE_NAME}=agent"))));
}

#[tokio::test]
async fn set_role_rejects_unknown_roles() {
    let state = test_helpers::test_app_state();
    let response = set_role(
        State(state),
        CookieJar::new(),
        Json(SetRoleBody { role: "superuser".into() }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(set_cookie_values(&response).is_empty());
}
