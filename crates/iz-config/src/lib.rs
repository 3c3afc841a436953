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

//! File-backed identity and configuration layer for the `iz` client.
//!
//! Layout: `paths.rs` (document locations), `model.rs` (profiles, sessions and
//! the persisted documents), `validate.rs` (key and value parsing),
//! `store.rs` / `sessions.rs` (load-modify-save stores), `resolve.rs`
//! (per-invocation precedence resolution).

pub mod defaults;
pub mod error;
pub mod model;
pub mod paths;
pub mod resolve;
pub mod sessions;
pub mod store;
pub mod validate;

pub use error::{ConfigError, ConfigResult, Violation};
pub use model::{AuthMethod, ConfigDocument, Profile, Session, SessionDocument};
pub use paths::{FixedPaths, OsPaths, PathProvider};
pub use resolve::{
    AdminAuth, EffectiveSettings, Environment, Overrides, ResolvedConfig, Resolver, Setting,
    Source,
};
pub use sessions::SessionStore;
pub use store::{ConfigStore, SettingLookup};
pub use validate::{ColorMode, OutputFormat, ProfileKey, SettingKey};
