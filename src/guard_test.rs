use super::*;

use uuid::Uuid;

fn user(role: Role) -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        email: "visitor@example.com".into(),
        name: "Visitor".into(),
        role,
    }
}

// =============================================================================
// decide — the four outcomes
// =============================================================================

#[test]
fn pending_probe_never_redirects() {
    // No stored role, auth not yet settled: keep waiting.
    let decision = decide(&SessionProbe::Pending, Role::default(), RoleSet::ADMIN);
    assert_eq!(decision, Decision::Pending);
}

#[test]
fn settled_anonymous_goes_to_login() {
    // No stored role, auth settled with no user.
    let decision = decide(&SessionProbe::Settled(None), Role::default(), RoleSet::ANY);
    assert_eq!(decision, Decision::RedirectToLogin);
}

#[test]
fn settled_wrong_role_goes_to_unauthorized() {
    // Agent visiting a route that requires student or admin.
    let probe = SessionProbe::Settled(Some(user(Role::Agent)));
    let allowed = RoleSet::of(&[Role::Student, Role::Admin]);
    assert_eq!(decide(&probe, Role::Agent, allowed), Decision::RedirectToUnauthorized);
}

#[test]
fn settled_matching_role_is_allowed() {
    let probe = SessionProbe::Settled(Some(user(Role::Admin)));
    assert_eq!(decide(&probe, Role::Admin, RoleSet::ADMIN), Decision::Allow);
}

#[test]
fn anonymous_role_preference_does_not_authenticate() {
    // A stray stored role marker must not count as a login.
    let decision = decide(&SessionProbe::Settled(None), Role::Admin, RoleSet::ADMIN);
    assert_eq!(decision, Decision::RedirectToLogin);
}

#[test]
fn exactly_one_outcome_for_every_combination() {
    // Allow iff settled, authenticated, and role in set; otherwise exactly
    // one deny outcome.
    for role in Role::ALL {
        for allowed in [RoleSet::STUDENT, RoleSet::AGENT, RoleSet::ADMIN, RoleSet::STAFF, RoleSet::ANY] {
            assert_eq!(decide(&SessionProbe::Pending, role, allowed), Decision::Pending);
            assert_eq!(
                decide(&SessionProbe::Settled(None), role, allowed),
                Decision::RedirectToLogin
            );

            let authed = SessionProbe::Settled(Some(user(role)));
            let expected = if allowed.contains(role) {
                Decision::Allow
            } else {
                Decision::RedirectToUnauthorized
            };
            assert_eq!(decide(&authed, role, allowed), expected);
        }
    }
}

// =============================================================================
// deny — response mapping
// =============================================================================

#[test]
fn api_paths_get_statuses_not_redirects() {
    let response = deny("/api/admin/students", UNAUTHORIZED_PATH, StatusCode::FORBIDDEN);
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get("location").is_none());
}

#[test]
fn page_paths_get_temporary_redirects() {
    let response = deny("/admin", LOGIN_PATH, StatusCode::UNAUTHORIZED);
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get("location").and_then(|v| v.to_str().ok()),
        Some(LOGIN_PATH)
    );
}

#[test]
fn unauthenticated_api_deny_is_401() {
    let response = deny("/api/applications", LOGIN_PATH, StatusCode::UNAUTHORIZED);
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Visitor extractor
// =============================================================================

fn request_parts() -> Parts {
    axum::http::Request::builder()
        .uri("/api/anything")
        .body(())
        .expect("request should build")
        .into_parts()
        .0
}

#[tokio::test]
async fn visitor_extractor_reads_guard_extension() {
    let mut parts = request_parts();
    parts.extensions.insert(Visitor {
        user: user(Role::Agent),
        role: Role::Agent,
        token: "token".into(),
    });

    let visitor = Visitor::from_request_parts(&mut parts, &())
        .await
        .expect("visitor should extract");
    assert_eq!(visitor.role, Role::Agent);
}

#[tokio::test]
async fn visitor_extractor_rejects_unguarded_routes() {
    let mut parts = request_parts();
    let result = Visitor::from_request_parts(&mut parts, &()).await;
    assert_eq!(result.err(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}
