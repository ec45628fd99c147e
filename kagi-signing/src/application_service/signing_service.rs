use thiserror::Error;

use crate::common::base64url::{decode_base64url, encode_base64url, Base64DecodeError};
use crate::domain::envelope::{self, EnvelopeError};
use crate::domain::key_pair::{KeyPairError, SigningKeyPair};
use crate::domain::key_type::KeyTypeRegistry;
use crate::domain::key_version::KeyVersion;
use crate::infrastructure::keyset_reader::{
    private_key_from_value, public_key_from_value, KeyStatus, KeysetFileReader, KeysetMetadata,
    KeysetPurpose, KeysetReaderError,
};

#[derive(Debug, Error)]
pub enum SigningServiceError {
    #[error("keyset has no PRIMARY version")]
    NoPrimaryKey,
    #[error(transparent)]
    Keyset(#[from] KeysetReaderError),
    #[error(transparent)]
    KeyPair(#[from] KeyPairError),
    #[error(transparent)]
    Decoding(#[from] Base64DecodeError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// 秘密鍵 keyset を読み込み、PRIMARY の鍵で署名するサービス。
///
/// - 署名は base64url テキストとして返す（署名ファイルの保存表現そのもの）。
/// - 検証はエンベロープヘッダの鍵ハッシュで対象バージョンを選ぶため、
///   ローテーション済みの古い鍵による署名もそのまま検証できる。
#[derive(Debug)]
pub struct SigningService {
    keys: Vec<SigningKeyPair>,
    primary: Option<usize>,
}

impl SigningService {
    /// keyset ディレクトリから全バージョンの秘密鍵を読み込む。
    pub fn read(
        registry: &KeyTypeRegistry,
        reader: &KeysetFileReader,
    ) -> Result<Self, SigningServiceError> {
        let metadata = reader.read_metadata()?;
        if metadata.purpose != KeysetPurpose::SignAndVerify {
            return Err(KeysetReaderError::MalformedKeyset(
                "keyset purpose does not allow signing".to_string(),
            )
            .into());
        }

        let mut keys = Vec::with_capacity(metadata.versions.len());
        let mut primary = None;
        for entry in &metadata.versions {
            let version = parse_version(entry.version_number)?;
            let value = reader.read_key(entry.version_number)?;
            let key = private_key_from_value(registry, &value, version)?;
            if entry.status == KeyStatus::Primary {
                primary = Some(keys.len());
            }
            keys.push(key);
        }
        Ok(Self { keys, primary })
    }

    /// PRIMARY の鍵で署名し、base64url テキストを返す。
    pub fn sign(&self, data: &[u8]) -> Result<String, SigningServiceError> {
        let primary = self.primary.ok_or(SigningServiceError::NoPrimaryKey)?;
        let envelope_bytes = self.keys[primary].sign(data)?;
        Ok(encode_base64url(&envelope_bytes))
    }

    pub fn verify(&self, data: &[u8], signature: &str) -> Result<bool, SigningServiceError> {
        verify_with_keys(&self.keys, data, signature)
    }
}

/// 公開鍵 keyset（または秘密鍵 keyset）を読み込み、検証のみを行うサービス。
pub struct VerificationService {
    keys: Vec<SigningKeyPair>,
}

impl VerificationService {
    pub fn read(
        registry: &KeyTypeRegistry,
        reader: &KeysetFileReader,
    ) -> Result<Self, SigningServiceError> {
        let metadata = reader.read_metadata()?;
        let mut keys = Vec::with_capacity(metadata.versions.len());
        for entry in &metadata.versions {
            let version = parse_version(entry.version_number)?;
            let value = reader.read_key(entry.version_number)?;
            let key = read_entry(registry, &metadata, &value, version)?;
            keys.push(key);
        }
        Ok(Self { keys })
    }

    pub fn verify(&self, data: &[u8], signature: &str) -> Result<bool, SigningServiceError> {
        verify_with_keys(&self.keys, data, signature)
    }
}

fn parse_version(version_number: u32) -> Result<KeyVersion, SigningServiceError> {
    KeyVersion::new(version_number)
        .map_err(|e| KeysetReaderError::MalformedKeyset(e.to_string()).into())
}

fn read_entry(
    registry: &KeyTypeRegistry,
    metadata: &KeysetMetadata,
    value: &serde_json::Value,
    version: KeyVersion,
) -> Result<SigningKeyPair, SigningServiceError> {
    let key = match metadata.purpose {
        KeysetPurpose::SignAndVerify => private_key_from_value(registry, value, version)?,
        KeysetPurpose::Verify => public_key_from_value(registry, value, version)?,
    };
    Ok(key)
}

fn verify_with_keys(
    keys: &[SigningKeyPair],
    data: &[u8],
    signature: &str,
) -> Result<bool, SigningServiceError> {
    let envelope_bytes = decode_base64url(signature)?;
    let (header, raw_signature) = envelope::decode(&envelope_bytes)?;
    let payload = envelope::signed_payload(data);
    for key in keys {
        if header.key_hash() == &key.key_hash() {
            return Ok(key.verify_detached(&payload, raw_signature));
        }
    }
    // 整形式だが、この keyset のどの鍵にも対応しない署名
    Ok(false)
}
