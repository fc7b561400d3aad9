pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod shortlink;
pub mod startup;
pub mod state;
pub mod tasks;
pub mod test_utils;
pub mod web;
