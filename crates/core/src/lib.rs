pub mod config;
pub mod errors;
pub mod profile;
pub mod validation;

pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use profile::{ProfileStore, ProfileStoreError, UserProfile};
pub use validation::{FormSubmission, FormValidator, ValidationError, ValidationRule};
