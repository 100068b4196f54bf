pub mod error;
pub mod options;

pub use error::BuildError;
pub use options::MissingInputPolicy;
