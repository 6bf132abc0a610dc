//! # xsend
//!
//! Sponsored cross-chain token transfers through ERC-4337 smart accounts.
//!
//! A transfer is three user operations (approve, send-to-bridge, deliver) built for two chains,
//! sponsored by each chain's paymaster, signed once as a merkle-rooted batch and executed in order
//! by the [`execution::ExecutionSequencer`]. See [`orchestrator::TransferOrchestrator`].

pub mod accounts;
pub mod balances;
pub mod builder;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod execution;
pub mod orchestrator;
pub mod records;
pub mod serde;
pub mod session;
pub mod signers;
pub mod spawn;
pub mod sponsorship;
pub mod storage;
pub mod types;
