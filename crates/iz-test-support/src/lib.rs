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

//! Shared test helpers used across integration suites.
//! Layout: paths.rs (temp-directory document locations), fixtures.rs (seeded profiles and sessions).

pub mod fixtures;
pub mod paths;

pub use paths::TempPaths;
