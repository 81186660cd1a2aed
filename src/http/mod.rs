//! HTTP boundary for the classifier.
//!
//! An Axum router exposing a liveness marker, a health probe, and the
//! multipart `/predict` endpoint that drives the prediction pipeline.

mod routes;
mod upload;


pub use routes::{build_router, run_http_server, HttpServerError};
pub use upload::{allowed_file, file_extension, secure_filename, TempUpload};
