//! Per-account client for the X API v2
//!
//! Owns exactly one mutable OAuth credential set and wraps every outbound
//! API call with the credential lifecycle. Endpoint catalogs live with the
//! caller; this crate provides the authorized transport they build on.
//!
//! Request flow:
//! 1. `ClientBuilder::authorization_url()` starts the consent flow
//! 2. `ClientBuilder::exchange_code()` redeems the callback code, resolves
//!    the account identity, and notifies the rotation hook
//! 3. `Client::request()` (or `get`/`post_json`/`post_form`) checks token
//!    freshness, refreshes through the single-flight gate when needed,
//!    attaches the bearer header, and normalizes failure responses
//! 4. Every rotated credential set reaches the caller's `RotationHook`
//!    before the refresh that produced it resolves

pub mod client;
pub mod config;
pub mod gate;
pub mod rotate;

pub use client::{Client, ClientBuilder, Payload, QueryValue, build_query};
pub use config::AppConfig;
pub use gate::{CredentialGuard, CredentialState, RefreshTuning};
pub use rotate::{NoopRotation, RotationHook};
