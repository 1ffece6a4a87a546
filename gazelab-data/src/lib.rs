pub mod error;
pub mod manager;

pub use error::{DataError, Result};
pub use manager::{DataManager, TrialStore};
