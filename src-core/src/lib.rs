pub mod constants;
pub mod dates;
pub mod errors;
pub mod goals;
pub mod valuation;

pub use errors::{Error, Result};
