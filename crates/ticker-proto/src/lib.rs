pub mod config;
pub mod data;
pub mod platform;
pub mod protocol;
pub mod state;
