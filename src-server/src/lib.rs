pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod main_lib;
pub mod seed;
