//! Core domain logic for Lectern.
//!
//! This crate contains the item orchestration logic with ZERO web or database
//! dependencies. Persistence is reached through the `ItemRepository` trait,
//! which the db crate implements.
//!
//! # Modules
//!
//! - `storage` - Remote file store client (Google Drive, S3, Azure Blob, local)
//! - `item` - Item records and the create/edit/delete orchestration

pub mod item;
pub mod storage;
