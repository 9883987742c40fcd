//! Client-side domain logic for the shadematch analysis service.
//!
//! Everything here runs locally: loading and batching image files,
//! downscaling them before upload, gating the manager commands and the
//! product shade catalogue. Network access lives in `shadematch-client`.

pub mod batch;
pub mod catalog;
pub mod error;
pub mod file;
pub mod gate;
pub mod preprocess;
pub mod types;
