//! Launchnet - join chain launches coordinated on a launch registry
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Join Flow
//! - [`builder`] - Existence checks, request construction and broadcast
//! - [`events`] - Progress events and sinks
//! - [`launch`] - Registry records, messages and the query/broadcast traits
//!
//! ## Local Node
//! - [`chain`] - Account address lookup through the chain binary
//! - [`genesis`] - Local genesis reader
//! - [`gentx`] - Gentx parsing
//!
//! ## Identity
//! - [`crypto`] - Keys, signatures and addresses (secp256k1)
//! - [`account`] - On-disk keyring
//! - [`coin`] - Coin amounts
//!
//! ## Registry
//! - [`registry`] - Ledger over SQLite or in-memory storage
//! - [`client`] - HTTP client for a served registry
//! - [`api`] - HTTP server for the registry
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`logging`] - Tracing setup
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Join Flow
// ============================================================================
pub mod builder;
pub mod events;
pub mod launch;

// ============================================================================
// Local Node
// ============================================================================
pub mod chain;
pub mod genesis;
pub mod gentx;

// ============================================================================
// Identity
// ============================================================================
pub mod account;
pub mod coin;
pub mod crypto;

// ============================================================================
// Registry
// ============================================================================
pub mod client;
pub mod registry;

#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
