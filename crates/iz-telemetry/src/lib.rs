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

//! Logging setup for the `iz` client.
//!
//! Diagnostics go to stderr so stdout carries only command output.

pub mod init;

pub use init::{
    DEFAULT_LOG_LEVEL, ENV_LOG_FORMAT, LogFormat, LoggingConfig, VERBOSE_LOG_LEVEL, init_logging,
};
