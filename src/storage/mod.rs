mod error;
mod staging;

pub use error::StagingError;
pub use staging::{StagedFile, StagingArea};
