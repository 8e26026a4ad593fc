//! Wire protocol definitions
//!
//! Implements the request side of the Tokyo Tyrant binary protocol and the
//! constants shared with the response decoder in
//! [`transport`](crate::transport).
//!
//! ## Request Format
//! ```text
//! ┌──────────┬──────────┬──────────────────────────────────────┐
//! │Magic (1) │Opcode (1)│  fixed-width fields + operands       │
//! └──────────┴──────────┴──────────────────────────────────────┘
//! ```
//! The magic byte is always 0xC8. Every length or count field is an unsigned
//! big-endian integer of the exact width given in [`frame`], placed
//! immediately before the variable-length data it describes.
//!
//! ## Response Format
//! ```text
//! ┌──────────┬──────────────────────────────────────────────────┐
//! │Status (1)│  operation-specific payload (success only)       │
//! └──────────┴──────────────────────────────────────────────────┘
//! ```
//! Status 0x00 is success; any other value is a server error code and no
//! payload follows. Success payloads are, per operation: nothing, one
//! length-prefixed record, a count followed by that many records (or record
//! pairs), or a fixed-width integer.
//!
//! ## Opcodes
//! See [`Opcode`] for the closed table. Responses carry no opcode and no
//! request identifier: the protocol is strictly one-request-one-response per
//! connection, in order.

pub mod frame;
mod opcode;

pub use opcode::{ExtOpts, MiscOpts, Opcode, MAGIC, STATUS_ERR, STATUS_OK};
