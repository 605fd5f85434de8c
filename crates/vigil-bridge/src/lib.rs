mod client;
pub mod types;

pub use client::{Client, ClientTx, ServerRx, connect, connect_with_config};
pub use client::config::Config;
