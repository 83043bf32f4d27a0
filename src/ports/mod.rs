//! Port traits: the boundaries the domain talks to.

pub mod config_port;
pub mod quote_port;
pub mod report_port;
pub mod store_port;
