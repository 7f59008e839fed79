//! Query protocol: goal encoding and reply decoding.

mod encode;
mod reply;
mod solutions;

pub use encode::{encode_query, extract_variables, EncodedQuery};
pub(crate) use encode::normalize_goal;
pub(crate) use reply::{drain, run_directive};
pub use solutions::{Solutions, Timeouts};
