pub mod error;
pub mod failpoint;
pub mod store;
pub mod student;
pub mod validation;

pub use error::{RegistryError, Result};
pub use store::{LoadWarning, Registry, RegistryConfig, DEFAULT_CAPACITY, DEFAULT_PATH};
pub use student::Student;
