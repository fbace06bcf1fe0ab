//! Service modules, one per feature area. Each exposes a
//! `configure_routes() -> Scope` registered in `main.rs`.

pub mod approvals;
pub mod clients;
pub mod documents;
pub mod generate;
pub mod notifications;
pub mod profiles;
pub mod resolve;
pub mod templates;
