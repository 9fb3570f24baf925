//! Shared test utilities for evalform.
//!
//! This crate provides:
//! - [`RecordingFormService`]: in-memory evaluation backend with call recording
//! - [`TestContext`]: a service plus a unique form key
//! - [`SnapshotFactory`]: builders for form snapshots
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use evalform_test_utils::{SnapshotFactory, TestContext, assert_fan_out};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let ctx = TestContext::with_form(SnapshotFactory::mixed("form-1"));
//!     let mut session = ctx.session();
//!     session.open(ctx.key.clone()).await.unwrap();
//!     // ... edit and submit ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod service;

pub use assertions::*;
pub use fixtures::*;
pub use service::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("evalform_core=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
