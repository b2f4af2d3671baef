//! Demo Server
//!
//! The sample workload shipped alongside the Application Controller: a
//! single `/example` route that answers `GET` with a JSON greeting and the
//! current time.

pub mod error;
pub mod http;
pub mod logging;
pub mod server;

pub use error::DemoServerError;
pub use server::{ServerConfig, run};
