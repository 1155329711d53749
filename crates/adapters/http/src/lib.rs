//! # relayhub-adapter-http
//!
//! [`RelayController`](relayhub_app::ports::RelayController) implementation
//! speaking the local relay REST API.
//!
//! ## Endpoints
//!
//! | Operation | Request | Success reply |
//! |-----------|---------|---------------|
//! | `set_on` / `set_off` | `POST {base}/io/{id}/state/{on,off}` | `{"status": "success"}` |
//! | `pulse` | `POST {base}/io/{id}/state/pulse` with `{"duration": secs}` | `{"status": "success"}` |
//! | `get_state` | `GET {base}/io/relays/state` | `{"relay_1": 1, "relay_2": 0}` |
//!
//! Every request carries the `X-Internal-API-Key` header when a key is configured.
//!
//! ## Dependency rule
//!
//! Depends on `relayhub-app` (port traits) and `relayhub-domain` only.

mod client;
mod config;
mod error;

pub use client::{API_KEY_HEADER, HttpRelayController};
pub use config::HttpRelayConfig;
pub use error::HttpRelayError;
