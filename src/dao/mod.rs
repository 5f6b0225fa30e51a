/// Record definitions shared across layers.
pub mod models;
/// Session store contract and backends.
pub mod session_store;
/// Store error types shared by backends.
pub mod storage;
