//! IndCric quiz backend library: sourcing chain, stores and HTTP router.

pub mod admins;
pub mod config;
pub mod corpus;
pub mod db;
pub mod domain;
pub mod error;
pub mod genai;
pub mod history;
pub mod logic;
pub mod pool;
pub mod protocol;
pub mod routes;
pub mod sourcing;
pub mod state;
pub mod telemetry;
pub mod util;
pub mod validate;

pub use routes::build_router;
