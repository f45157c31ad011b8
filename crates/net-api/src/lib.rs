//! Netplan API
//!
//! JSON request/response contract over the reconciliation engine. Every
//! request is handled to completion and answered with exactly one response.

pub mod engine;
pub mod request;
pub mod response;


pub use engine::Engine;
pub use request::{Action, Request};
pub use response::Response;
