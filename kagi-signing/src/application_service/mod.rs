pub mod signing_service;

pub use signing_service::{SigningService, SigningServiceError, VerificationService};
