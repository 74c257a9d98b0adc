//! AWS transport: credentials, SigV4 HTTP and protocol handlers

pub mod client;
pub mod credentials;
pub mod handlers;
pub mod http;

pub use client::{error_hint, AwsClients, LazyAwsClients};
