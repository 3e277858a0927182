// Library exports for quintet
// This allows integration tests and external code to use quintet modules

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod hooks;
pub mod listing;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
