//! HTTP API surface.
//!
//! - `webhook`: gateway notifications (signed with the gateway key)
//! - `billet`: billet download for buyers (public)
//! - `service`: shop backend API (signed with the service secret)

pub mod billet;
pub mod extractors;
pub mod service;
pub mod webhook;
