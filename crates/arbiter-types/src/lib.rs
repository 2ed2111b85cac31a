//! # arbiter-types
//!
//! Shared types for the arbiter scheduling framework.
//!
//! This crate provides:
//! - [`UnitId`], [`ComponentId`], [`CallId`] - arena indices
//! - [`UnitKind`] - transaction or method
//! - [`Priority`] and [`Relation`] - explicit scheduling relations

#![warn(missing_docs)]
#![warn(clippy::all)]

mod id;
mod relation;

pub use id::{CallId, ComponentId, UnitId};
pub use relation::{Priority, Relation, RelationKind, UnitKind};
