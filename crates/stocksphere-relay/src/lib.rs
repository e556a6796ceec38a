//! # stocksphere-relay: Barcode Scan Relay for StockSphere
//!
//! This crate fans out barcode-scan payloads between connected clients in
//! real time: a phone acting as a scanner pushes a code, and every other
//! connected till sees it immediately.
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scan Relay Data Flow                             │
//! │                                                                         │
//! │  Scanner phone                                                         │
//! │       │  ws text frame: "8901234567890"                                │
//! │       ▼                                                                 │
//! │  RelayServer (/ws) ──▶ ScanHub::broadcast_from(sender, payload)        │
//! │                              │                                          │
//! │               ┌──────────────┴──────────────┐                          │
//! │               ▼                             ▼                          │
//! │          Till #1                        Till #2      (sender excluded) │
//! │                                                                         │
//! │  The payload passes through verbatim. The relay never parses barcode   │
//! │  content and keeps no per-scan state: resolution against the product   │
//! │  ledger is the receiving client's job.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`hub`] - The connection registry, fan-out policy, and axum server
//! - [`error`] - Relay error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod hub;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{RelayError, RelayResult};
pub use hub::{RelayConfig, RelayHandle, RelayServer, ScanHub, DEFAULT_RELAY_PORT};
