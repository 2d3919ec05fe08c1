pub mod config;
pub mod error;
pub mod ingest;
pub mod report;
pub mod sink;
