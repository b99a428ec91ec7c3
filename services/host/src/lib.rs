//! ---------------------------------------------------------------------------
//! Log Track Host Shell
//! ---------------------------------------------------------------------------
//! Server-rendered host for independently deployed micro-frontends. At start
//! the host probes every configured remote once, freezes the verdicts into an
//! availability registry, and only then renders navigation and gated routes
//! from it. Routes of offline remotes show a static notice and never attempt
//! a load; routes of reachable remotes mount the remote's fragment behind a
//! loading indicator.

pub mod bootstrap;
pub mod check;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod views;

pub use bootstrap::{bootstrap, spawn_bootstrap};
pub use check::{run_check, CheckSummary};
pub use error::AppError;
pub use routes::router;
pub use server::{spawn_host, HostServer};
pub use state::HostState;
