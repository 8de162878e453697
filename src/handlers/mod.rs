// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod leaderboard;
pub mod quiz;
