pub mod adapters;
pub mod audit;
pub mod config;
pub mod determinism;
pub mod export;
pub mod ingest;
pub mod session;
pub mod suite;

pub mod error;
