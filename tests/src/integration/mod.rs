//! Cross-crate integration flows.

pub mod http_flows;
pub mod socket;
pub mod store_flows;
