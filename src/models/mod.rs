pub mod action;
pub mod change;
pub mod hour_log;
pub mod member;
pub mod response;
