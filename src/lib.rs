//! # tyrantkv
//!
//! A blocking client for the Tokyo Tyrant 1.1.x binary protocol with:
//! - The full command set, from `put` through `misc`
//! - A map-style facade with `Option` reads and iterator-based key scans
//! - Binary-safe keys and values (any byte sequence, length-prefixed)
//! - One TCP connection per client, strict request/response
//!
//! ## Layering Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       TyrantMap                              │
//! │        (mapping semantics: Option, KeyNotFound, iter)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Tyrant                                │
//! │         (one method per wire command, raw semantics)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  protocol   │          │  Transport  │
//!   │  (frames)   │          │ (socket IO) │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use tyrantkv::{Config, Tyrant};
//!
//! fn main() -> tyrantkv::Result<()> {
//!     let mut db = Tyrant::connect(&Config::default())?;
//!     db.put("greeting", "hello")?;
//!     assert_eq!(db.get("greeting")?, b"hello");
//!     db.close()
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod client;
pub mod map;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TyrantError};
pub use config::{Config, ConfigBuilder, DEFAULT_PORT};
pub use client::Tyrant;
pub use map::{KeyIter, TyrantMap};
pub use protocol::{ExtOpts, MiscOpts};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tyrantkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
