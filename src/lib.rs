//! awsop: invoke AWS operations from a declarative catalog
//!
//! `operation` holds the protocol-agnostic invoker; `aws` is the SigV4
//! transport that backs it.

pub mod aws;
pub mod config;
pub mod operation;
