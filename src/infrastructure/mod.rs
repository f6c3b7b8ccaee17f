pub mod config;
pub mod credential_store;
pub mod error;
pub mod pattern_client;
pub mod schedule_repository;
