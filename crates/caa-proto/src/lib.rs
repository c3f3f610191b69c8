pub mod config;
pub mod platform;
pub mod songs;
pub mod state;
