//! Port traits at the edges of the domain.

pub mod config_port;
pub mod portfolio_store;
pub mod report_port;
