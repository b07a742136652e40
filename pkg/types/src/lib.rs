pub mod config;
pub mod countdown;
pub mod lease;
pub mod validate;
