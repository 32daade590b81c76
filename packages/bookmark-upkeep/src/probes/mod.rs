//! Probe transport implementations.

pub mod http;

pub use http::ReqwestProbe;
