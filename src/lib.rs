pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http_client;
pub mod library;
pub mod logger;
pub mod persistence;
pub mod reconciler;
pub mod spotify;
