pub mod bot;
pub mod config;
pub mod error;
pub mod platform;
pub mod source;
pub mod storage;
