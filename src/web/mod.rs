//! HTTP API for question solutions and videos.

pub mod error;
pub mod middleware;
pub mod questions;
pub mod routes;
pub mod status;
pub mod videos;

pub use routes::*;
