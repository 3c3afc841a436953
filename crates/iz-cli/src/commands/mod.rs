//! Command handlers grouped by concern.

pub(crate) mod config;
pub(crate) mod health;
pub(crate) mod login;
pub(crate) mod profiles;
pub(crate) mod sessions;
