mod count;
mod index;
mod state;

pub use count::{Approximate, Counting, Exact};
pub(crate) use state::RingState;
