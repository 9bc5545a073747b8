//! Drivers shipped with the crate

mod aaigrid;
mod mem;

pub use aaigrid::AaiGridDriver;
pub use mem::{MemDataset, MemDriver};

use crate::Driver;

/// Every built-in driver, in registration order.
pub(crate) fn builtin_drivers() -> Vec<Driver> {
    vec![Driver::new(MemDriver), Driver::new(AaiGridDriver)]
}
