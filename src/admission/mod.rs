//! Admission control for catalog resources: request attributes, the plugin interfaces
//! and the chain that runs the configured plugins in order.

mod access;
mod attributes;
mod chain;
mod err;
mod handler;
mod interfaces;
pub mod plugins;
pub(crate) mod test_utils;

pub use access::*;
pub use attributes::*;
pub use chain::*;
pub use err::*;
pub use handler::*;
pub use interfaces::*;
