pub mod base64url;

pub use base64url::{decode_base64url, encode_base64url, Base64DecodeError};
