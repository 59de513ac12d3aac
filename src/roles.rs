//! Acting-role store.
//!
//! DESIGN
//! ======
//! The portal has three access levels: student, agent, admin. A visitor's
//! acting role is persisted in a long-lived `user_role` cookie so the SPA
//! can restore it across visits. Absent or unrecognized stored values
//! normalize to the student default and the normalized value is written
//! back; invalid input is never surfaced as an error.
//!
//! For authenticated visitors the granted role on the user row is
//! authoritative. The cookie is only a preference and is never treated as
//! proof of authentication.

use std::fmt;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

/// Cookie holding the persisted acting role.
pub const ROLE_COOKIE_NAME: &str = "user_role";

const ROLE_COOKIE_MAX_AGE_DAYS: i64 = 365;

// =============================================================================
// ROLE
// =============================================================================

/// Access level governing which routes a session may view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Agent,
    Admin,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Student, Self::Agent, Self::Admin];

    /// Parse a stored role string. Returns `None` for anything that is not
    /// exactly one of the three valid lowercase values after trimming.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "student" => Some(Self::Student),
            "agent" => Some(Self::Agent),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Agent => "agent",
            Self::Admin => "admin",
        }
    }

    /// Agents and admins act on behalf of the agency.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Agent | Self::Admin)
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Student => 0b001,
            Self::Agent => 0b010,
            Self::Admin => 0b100,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ROLE SET
// =============================================================================

/// Non-empty set of roles allowed to view a route group. Attached to
/// routers at assembly time, so the path-to-roles mapping lives next to the
/// route declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const STUDENT: Self = Self::of(&[Role::Student]);
    pub const AGENT: Self = Self::of(&[Role::Agent]);
    pub const ADMIN: Self = Self::of(&[Role::Admin]);
    pub const STAFF: Self = Self::of(&[Role::Agent, Role::Admin]);
    pub const ANY: Self = Self::of(&[Role::Student, Role::Agent, Role::Admin]);

    #[must_use]
    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        Self(bits)
    }

    #[must_use]
    pub const fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for role in Role::ALL {
            if self.contains(role) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(role.as_str())?;
                first = false;
            }
        }
        Ok(())
    }
}

// =============================================================================
// PERSISTED ROLE
// =============================================================================

/// Read the stored acting role, if the cookie holds a valid value.
#[must_use]
pub fn stored_role(jar: &CookieJar) -> Option<Role> {
    jar.get(ROLE_COOKIE_NAME).and_then(|c| Role::parse(c.value()))
}

/// Read the persisted acting role from the cookie jar.
///
/// Missing or invalid values resolve to the default role, and the second
/// element carries the write-back cookie that persists the normalized
/// value. A valid stored role returns no write-back.
#[must_use]
pub fn resolve_role(jar: &CookieJar, secure: bool) -> (Role, Option<Cookie<'static>>) {
    match stored_role(jar) {
        Some(role) => (role, None),
        None => {
            let role = Role::default();
            (role, Some(role_cookie(role, secure)))
        }
    }
}

/// Build the long-lived role cookie. Readable by the SPA (not HttpOnly) so
/// the client can restore its last acting role without a round trip.
#[must_use]
pub fn role_cookie(role: Role, secure: bool) -> Cookie<'static> {
    Cookie::build((ROLE_COOKIE_NAME, role.as_str()))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(ROLE_COOKIE_MAX_AGE_DAYS))
        .build()
}

#[cfg(test)]
#[path = "roles_test.rs"]
mod tests;
