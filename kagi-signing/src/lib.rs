pub mod application_service;
pub mod common;
pub mod domain;
pub mod infrastructure;

pub use application_service::signing_service::{
    SigningService, SigningServiceError, VerificationService,
};
pub use domain::key_pair::SigningKeyPair;
pub use domain::key_type::KeyTypeRegistry;
pub use domain::key_version::KeyVersion;
pub use infrastructure::keyset_reader::KeysetFileReader;
pub use infrastructure::pem_importer::{import_key_file, import_key_pem};
