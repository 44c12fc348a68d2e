pub mod handoff;
pub mod ingest;
pub mod tokens;
