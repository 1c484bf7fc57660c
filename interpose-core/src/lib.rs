#![warn(missing_docs)]
//! # interpose-core
//!
//! Core traits and types for the interpose outbound request pipeline.
//!
//! This crate defines the vocabulary shared by the pipeline executor, the
//! behaviors that wrap a call and the transports that perform it. Caching and
//! deduplication live in the `interpose` crate, cache stores in
//! `interpose-backend`.
//!
//! ## Architecture
//!
//! - **Describe** a call with [`Request`], [`Body`] and the per-call [`Context`]
//! - **Intercept** it with [`Behavior`]s chained through [`Next`]
//! - **Perform** it with a [`Transport`]
//! - **Return** an [`Outcome`], optionally carrying a background continuation
//! - **Replay** responses any number of times through [`CachedEntry`]
//!

pub mod behavior;
pub mod body;
pub mod context;
pub mod entry;
pub mod error;
pub mod key;
pub mod label;
pub mod outcome;
pub mod request;
pub mod status;
pub mod transport;

pub use behavior::{Behavior, Next};
pub use body::{Body, BodyStream};
pub use context::Context;
pub use entry::{CachedEntry, ReasonPhrase};
pub use error::{BoxError, Error, Result, SharedError};
pub use key::CacheKey;
pub use label::BehaviorLabel;
pub use outcome::Outcome;
pub use request::Request;
pub use status::CacheStatus;
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use transport::Transport;

/// Response type flowing back through the pipeline.
pub type Response = http::Response<Body>;
