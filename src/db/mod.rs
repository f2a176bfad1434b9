pub mod initialize;
pub mod log;
pub mod members;
pub mod memory;
pub mod migrate;
pub mod outbox;
pub mod pool;
pub mod queries;
pub mod stats;
pub mod store;
