//! Foundation types for itemkv.
//!
//! Every other itemkv crate depends on `itemkv-types`.
//!
//! # Key Types
//!
//! - [`ItemId`]: Opaque item identifier (UUID v7 when generated here)
//! - [`Item`]: The persisted record: type, tags, raw JSON payload, timestamps
//! - [`ItemDraft`]: Client-supplied body for create and update
//! - [`ValidDraft`]: A draft that passed validation
//! - [`Payload`]: Raw JSON text preserved byte-for-byte

pub mod error;
pub mod id;
pub mod item;
pub mod payload;

pub use error::{TypeError, TypeResult};
pub use id::ItemId;
pub use item::{Item, ItemDraft, ValidDraft};
pub use payload::Payload;
