pub mod client;
pub mod submitter;

pub use client::BlockchainClient;
pub use submitter::{LaunchOutcome, TransactionSubmitter, TxOutcome};
