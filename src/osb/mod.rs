//! A client for the Open Service Broker API v2, the HTTP protocol the catalog speaks with
//! every registered broker.

mod client;
mod err;
mod types;

pub use client::*;
pub use err::*;
pub use types::*;
