//! # Geometry
//!
//! Pure value types for locating text: [`Position`] and half-open [`Span`].
//! Nothing here knows about buffers or trees.

pub mod position;
pub mod span;

pub use position::Position;
pub use span::Span;
