//! # Sensorgate
//!
//! `sensorgate` exposes temperature readings and LED control over HTTP. Every
//! `/cmd/*` route sits behind an authentication gateway that re-authenticates
//! each request with HTTP Basic credentials.
//!
//! ## Gateway
//!
//! The gateway resolves the caller's network address, refuses origins that
//! accumulated too many recent failures, decodes and sanity checks the
//! credentials, and finally compares a SHA-512 digest of the password with the
//! stored one.
//!
//! - **Lockout:** 4 failed verifications from one origin block it until 14
//!   minutes after the *first* failure. The window does not slide.
//! - **No oracle:** unknown users and wrong passwords produce the same response.
//! - **Key:** failures are counted per origin, never per username.

pub mod api;
pub mod bus;
pub mod cli;
pub mod gateway;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
