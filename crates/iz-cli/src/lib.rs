#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(dead_code, unused, unreachable_pub, missing_docs)]
#![allow(clippy::redundant_pub_crate)]

//! Command-line client for the Izanami feature-flag service.
//!
//! Layout:
//! - `cli.rs`: argument parsing and command dispatch
//! - `context.rs`: per-invocation stores, environment snapshot and overrides
//! - `login/`: the login state machine (target, authentication, profile, session)
//! - `commands/`: command handlers grouped by concern
//! - `client.rs`: HTTP client and CLI error type
//! - `prompt.rs`: interactive input
//! - `output.rs`: renderers and formatting helpers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod context;
pub(crate) mod login;
pub(crate) mod output;
pub(crate) mod prompt;

pub use cli::run;
