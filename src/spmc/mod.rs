mod multi;
mod single;

pub use multi::MpmcQueue;
pub use single::{Producer, SpmcQueue};
