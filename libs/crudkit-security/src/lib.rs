#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod context;
pub mod tenant;

pub use context::{SecurityContext, SecurityContextBuilder};
pub use tenant::TenantId;
