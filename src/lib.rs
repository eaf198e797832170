pub mod app;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod session;
pub mod state;
pub mod store;
pub mod views;

pub use app::app;
pub use state::AppState;
