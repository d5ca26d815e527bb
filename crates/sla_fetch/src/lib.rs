pub mod client;
pub mod config;
pub mod source;
pub mod wire;

pub use client::ZabbixClient;
pub use config::ZabbixConfig;
