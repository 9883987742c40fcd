//! HTTP client for the shadematch analysis service.
//!
//! Provides the REST wrapper, typed response models, a server-sent event
//! decoder, the training-progress stream and the multi-step training and
//! analysis workflows built on them.

pub mod api;
pub mod messages;
pub mod models;
pub mod progress;
pub mod sse;
pub mod workflow;
