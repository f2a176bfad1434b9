pub mod backup;
pub mod gateway;
pub mod log;
pub mod machine;
pub mod notify;
pub mod outbox;
pub mod ports;
pub mod scheduler;
