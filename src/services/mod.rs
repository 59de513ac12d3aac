//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on request translation and auth plumbing.

pub mod application;
pub mod document;
pub mod email_auth;
pub mod mailer;
pub mod message;
pub mod program;
pub mod session;
pub mod university;
