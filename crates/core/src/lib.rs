//! `batchledger-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod batch_no;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use batch_no::BatchNumber;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{EventId, LocationId, ProductId};
pub use value_object::ValueObject;
