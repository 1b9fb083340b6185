pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod db;
pub mod list;
pub mod object;
pub mod protocol;
pub mod reply;
pub mod server;
pub mod shared;
pub mod shutdown;
pub mod utils;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
