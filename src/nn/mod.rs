//! Neural network building blocks.
//!
//! - [`Linear`]: the projector used for queries, keys, values and output projections.
//! - [`Module`]: common trait for layers.
//! - [`attention`]: scaled dot-product attention, single-head, cross and multi-head.

pub mod attention;
pub mod linear;
pub mod module;

pub use linear::Linear;
pub use module::Module;
