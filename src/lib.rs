pub mod adapters;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod notice;
pub mod ports;
pub mod recipes;
pub mod state;
pub mod subscription;
pub mod timers;
pub mod types;
pub mod worker;

#[cfg(test)]
mod testing;

pub use client::{Client, ClientEvent};
pub use config::ClientConfig;
pub use error::ClientError;
pub use subscription::SubscriptionStatus;
pub use subscription::keys::{ClientKeys, generate_client_keys};
