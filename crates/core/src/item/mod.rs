//! Item records and their orchestration.
//!
//! An item is one media entry (a sermon or talk) with optional thumbnail and
//! audio files held in the remote file store. This module provides:
//! - Field parsing with sparse-patch semantics
//! - The `ItemRepository` persistence seam
//! - `ItemService`, which keeps a record's file references in step with the
//!   remote store across create, edit, and delete

mod error;
mod service;
mod types;

pub use error::ItemError;
pub use service::{ItemRepository, ItemService};
pub use types::{FileSlot, Item, ItemFields, ItemFiles, ItemPatch, NewItem, parse_item_date};
