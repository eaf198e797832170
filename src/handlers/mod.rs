// handlers/mod.rs - Two-tier handler layout
//
// Public (no session) → Protected (session resolved by `session_middleware`)
pub mod protected;
pub mod public;

pub const DASHBOARD_PATH: &str = "/dashboard";
