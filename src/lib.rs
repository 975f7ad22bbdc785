#![doc = "The `tasksafe` library crate."]
#![doc = ""]
#![doc = "Bearer-token authentication, single-use password recovery, owner-scoped to-do"]
#![doc = "management and a failure-auditing middleware that records every failed request."]
#![doc = "The binary (`main.rs`) wires these into an actix-web server."]

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;

pub use audit::FailureAuditor;
pub use config::Config;
pub use error::AppError;
pub use state::AppState;
