pub mod envelope;
pub mod key_pair;
pub mod key_type;
pub mod key_version;

pub use envelope::{EnvelopeError, EnvelopeHeader};
pub use key_pair::{KeyMaterial, KeyPairError, SigningKeyPair};
pub use key_type::{KeyCategory, KeyPurpose, KeyType, KeyTypeError, KeyTypeRegistry};
pub use key_version::{KeyVersion, KeyVersionError};
