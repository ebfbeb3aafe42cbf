//! Library crate for the quiz buzzer backend, exposing modules for the binary and integration tests.

pub mod auth;
mod config;
pub mod dao;
mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

pub use config::AppConfig;
