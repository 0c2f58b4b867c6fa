//! Integration tests for the session manager and the OAuth flows.
//!
//! - `harness.rs`        - Mock backend, recording navigator, wired components
//! - `session_flows.rs`  - Password login, credential handling, cached user
//! - `oauth_begin.rs`    - Redirect initiation
//! - `oauth_callback.rs` - Callback coordinator: validation, CSRF, gating

mod session_flows;
