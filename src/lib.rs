pub mod client;
pub mod config;
pub mod contracts;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
