//! `SeaORM` entities.

pub mod items;
