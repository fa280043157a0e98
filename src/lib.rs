pub mod admission;
pub mod apis;
pub mod client;
pub mod controller;
pub mod osb;
pub mod recorder;
pub mod registry;
pub mod validation;
pub mod webhook;
