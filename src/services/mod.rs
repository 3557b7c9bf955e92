//! Core ingestion services and external integrations

pub mod filename_parser;
pub mod ingest;
pub mod metadata;
pub mod notify;
pub mod tmdb;
pub mod worker;
