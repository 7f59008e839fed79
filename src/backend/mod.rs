//! Backend selection and per-backend pattern tables.

mod kind;
mod patterns;

pub use kind::*;
pub use patterns::*;
