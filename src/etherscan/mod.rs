pub mod account;
pub mod chains;
pub mod client;
pub mod codec;
pub mod contract;
pub mod proxy;
pub mod stats;

pub use client::EtherscanClient;
