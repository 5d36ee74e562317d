pub mod errors;

pub use errors::{CcaError, Result};
