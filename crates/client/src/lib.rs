//! Client side of offgrid.
//!
//! This crate provides the reqwest fetch pipeline and the intercept engine
//! (classification, retrieval strategies, fallbacks, install and activation)
//! used by the server.

pub mod engine;
pub mod exchange;
pub mod fetch;

pub use engine::{
    CleanupReport, Engine, EngineConfig, Interception, LifecycleState, PreloadReport, RequestClass,
};
pub use exchange::{ProxyRequest, ProxyResponse, RequestMode, ResponseSource};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher};
