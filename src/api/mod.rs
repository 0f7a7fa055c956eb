//! API endpoint modules.

pub mod disablement;
pub mod health;
pub mod ingest;
pub mod openapi;
pub mod skip_rules;
pub mod test_health;

pub use disablement::configure_routes as configure_disablement_routes;
pub use health::configure_health_routes;
pub use ingest::configure_routes as configure_ingest_routes;
pub use openapi::ApiDoc;
pub use skip_rules::configure_routes as configure_skip_rule_routes;
pub use test_health::configure_routes as configure_test_health_routes;
