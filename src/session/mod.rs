//! Public session API.

mod error;
mod handle;

pub use error::SessionError;
pub use handle::Session;
