// lib.rs
// Building management service: periods, ledger and apportionment calculators
// behind a MongoDB-backed JSON API.

pub mod apportionment;
pub mod config;
pub mod error;
pub mod ledger;
pub mod levels;
pub mod models;
pub mod periods;
pub mod receipts;
pub mod routes;
pub mod session;
pub mod state;
pub mod totp;
