use super::*;

// =============================================================================
// Role::parse
// =============================================================================

#[test]
fn parse_accepts_all_three_roles() {
    assert_eq!(Role::parse("student"), Some(Role::Student));
    assert_eq!(Role::parse("agent"), Some(Role::Agent));
    assert_eq!(Role::parse("admin"), Some(Role::Admin));
}

#[test]
fn parse_trims_whitespace() {
    assert_eq!(Role::parse("  admin  "), Some(Role::Admin));
}

#[test]
fn parse_rejects_unknown_values() {
    for raw in ["", "superuser", "Student", "ADMIN", "agent,admin", "null"] {
        assert_eq!(Role::parse(raw), None, "expected None for {raw:?}");
    }
}

#[test]
fn as_str_round_trips() {
    for role in Role::ALL {
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }
}

#[test]
fn default_role_is_student() {
    assert_eq!(Role::default(), Role::Student);
}

#[test]
fn staff_covers_agent_and_admin_only() {
    assert!(!Role::Student.is_staff());
    assert!(Role::Agent.is_staff());
    assert!(Role::Admin.is_staff());
}

// =============================================================================
// RoleSet
// =============================================================================

#[test]
fn role_set_contains_only_its_members() {
    let set = RoleSet::of(&[Role::Student, Role::Admin]);
    assert!(set.contains(Role::Student));
    assert!(!set.contains(Role::Agent));
    assert!(set.contains(Role::Admin));
}

#[test]
fn any_contains_every_role() {
    for role in Role::ALL {
        assert!(RoleSet::ANY.contains(role));
    }
}

#[test]
fn staff_set_excludes_students() {
    assert!(!RoleSet::STAFF.contains(Role::Student));
    assert!(RoleSet::STAFF.contains(Role::Agent));
    assert!(RoleSet::STAFF.contains(Role::Admin));
}

#[test]
fn role_set_display_joins_members() {
    assert_eq!(RoleSet::STAFF.to_string(), "agent|admin");
    assert_eq!(RoleSet::ADMIN.to_string(), "admin");
}

// =============================================================================
// Persisted role
// =============================================================================

fn jar_with_role(value: &str) -> CookieJar {
    CookieJar::new().add(Cookie::new(ROLE_COOKIE_NAME, value.to_owned()))
}

#[test]
fn stored_role_reads_valid_cookie() {
    assert_eq!(stored_role(&jar_with_role("agent")), Some(Role::Agent));
}

#[test]
fn stored_role_ignores_invalid_cookie() {
    assert_eq!(stored_role(&jar_with_role("owner")), None);
    assert_eq!(stored_role(&CookieJar::new()), None);
}

#[test]
fn resolve_role_returns_stored_without_write_back() {
    let (role, write_back) = resolve_role(&jar_with_role("admin"), false);
    assert_eq!(role, Role::Admin);
    assert!(write_back.is_none());
}

#[test]
fn resolve_role_defaults_and_persists_when_missing() {
    let (role, write_back) = resolve_role(&CookieJar::new(), false);
    assert_eq!(role, Role::Student);
    let cookie = write_back.expect("default should be written back");
    assert_eq!(cookie.value(), "student");
}

#[test]
fn resolve_role_normalizes_invalid_value() {
    let (role, write_back) = resolve_role(&jar_with_role("root"), false);
    assert_eq!(role, Role::Student);
    assert!(write_back.is_some());
}

#[test]
fn role_cookie_is_long_lived_and_site_wide() {
    let cookie = role_cookie(Role::Agent, true);
    assert_eq!(cookie.name(), ROLE_COOKIE_NAME);
    assert_eq!(cookie.value(), "agent");
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.max_age(), Some(Duration::days(365)));
    // Readable by the SPA.
    assert_ne!(cookie.http_only(), Some(true));
}

#[test]
fn serde_uses_lowercase_wire_form() {
    assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
    let parsed: Role = serde_json::from_str("\"admin\"").unwrap();
    assert_eq!(parsed, Role::Admin);
}
