//! Shared test utilities for fluxa integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. The in-memory [`FakeRemote`] is deterministic and can
//! park individual fetches so tests decide the order in which resyncs finish.

pub mod assertions;
pub mod builders;
pub mod fake_remote;

pub use assertions::IntoRemoteError;
pub use builders::*;
pub use fake_miniflux_api::FakeMinifluxApi;
pub use fake_remote::{FakeRemote, Gate};
