// src/services/mod.rs

pub mod admin;
pub mod cache;
pub mod identity;
pub mod leaderboard;
pub mod ledger;
pub mod points;
pub mod questions;
pub mod results;
pub mod session;
