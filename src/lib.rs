//! # Accounts (User Account Management API)
//!
//! `accounts` serves a small REST surface for user accounts: list, fetch,
//! create, update, password change and delete.
//!
//! ## Request Flow
//!
//! Every write request passes two stages before the account store is touched:
//!
//! - **Validation Gate:** a declarative schema per operation checks presence,
//!   type, length and email format of each body field. A violation answers
//!   `422` with kind `VALIDATION_ERROR`; the handler never runs.
//! - **Guard Checks:** the handler then evaluates the rules a static schema
//!   cannot express (password confirmation, email uniqueness, credential
//!   verification) in a fixed order. The first failing guard wins and no
//!   mutation happens after it.
//!
//! ## Error Taxonomy
//!
//! Failures are reported as `{"kind": ..., "message": ...}` where `kind` is one
//! of `VALIDATION_ERROR`, `INVALID_PASSWORD`, `EMAIL_ALREADY_TAKEN`,
//! `UNPROCESSABLE_ENTITY`, `INVALID_CREDENTIALS` or `INTERNAL_ERROR`.
//!
//! ## Storage
//!
//! Handlers talk to a [`store::UserService`]. Without a DSN the server keeps
//! accounts in memory; with `--dsn` it uses `PostgreSQL`.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
