//! fluxa-miniflux — Miniflux v1 API adapter for fluxa.
//!
//! [`MinifluxClient`] implements [`fluxa_core::RemoteClient`] over HTTP with
//! hyper, translating Miniflux JSON into core types and HTTP failures into
//! classified [`fluxa_core::RemoteError`]s.

pub mod client;
mod wire;

pub use client::{field_hint, ClientError, MinifluxClient};
