#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![allow(clippy::future_not_send)]

//! Gemini-backed route estimator for the EtherLink bridge.
//!
//! [`GeminiEstimator`] implements [`etherlink::estimate::RouteEstimator`] by
//! calling the Gemini `generateContent` endpoint with a JSON response schema
//! and reading the answer as a [`etherlink::estimate::RouteEstimate`].
//!
//! # Configuration
//!
//! The API key comes from the `API_KEY` environment variable (a `.env` file is
//! honored). See [`GeminiConfig`].
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::GeminiEstimator;
pub use config::GeminiConfig;
pub use error::GeminiError;
