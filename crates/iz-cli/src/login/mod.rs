//! `iz login`: authenticate, store the session and link it to a profile.

mod flow;
mod oidc;
mod profile;
mod target;

pub(crate) use flow::{LoginFlow, LoginOutcome, LoginRequest};
