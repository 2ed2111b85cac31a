//! # arbiter-logic
//!
//! Word-level combinational logic for arbiter.
//!
//! The scheduler does not decide anything at runtime. It emits logic into a
//! [`Netlist`], and that logic is what decides, every cycle, which units run.
//! This crate provides:
//! - [`Netlist`] - builder for a DAG of word-level nodes (1 to 64 bits wide)
//! - [`Layout`] and [`StructValue`] - named-field data for method arguments
//! - [`Simulator`] - levelized evaluation of a finished netlist

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod layout;
mod netlist;
mod node;
mod sim;

pub use error::{LogicError, LogicResult};
pub use layout::{Field, Layout, StructValue};
pub use netlist::Netlist;
pub use node::{mask, BinaryOp, Node, NodeId, UnaryOp, MAX_WIDTH};
pub use sim::{Evaluation, Inputs, Simulator};
