pub mod keyset_reader;
pub mod pem_importer;

pub use keyset_reader::{KeysetFileReader, KeysetMetadata, KeysetReaderError};
pub use pem_importer::{import_key_file, import_key_pem, PortableKeyError};
