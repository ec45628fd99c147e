use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::common::base64url::{decode_base64url, encode_base64url};
use crate::domain::key_pair::p256_key_pair::P256KeyPair;
use crate::domain::key_pair::p384_key_pair::P384KeyPair;
use crate::domain::key_pair::{KeyMaterial, SigningKeyPair};
use crate::domain::key_type::{self, KeyTypeError, KeyTypeRegistry};
use crate::domain::key_version::KeyVersion;

#[derive(Debug, Error)]
pub enum KeysetReaderError {
    #[error("key version {0} not found in keyset")]
    KeyNotFound(u32),
    #[error("malformed keyset: {0}")]
    MalformedKeyset(String),
    #[error(transparent)]
    UnknownKeyType(#[from] KeyTypeError),
    #[error("keyset read error: {0}")]
    Io(#[from] std::io::Error),
}

/// keyset 内での鍵の状態。
///
/// - PRIMARY: 新規署名に使う鍵。keyset に高々 1 つ。
/// - ACTIVE: 検証には使うが、新規署名には使わない鍵。
/// - INACTIVE: 廃止予定の鍵。検証のためだけに残されている。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyStatus {
    Primary,
    Active,
    Inactive,
}

/// keyset の用途。`meta` の `purpose` フィールドに対応する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeysetPurpose {
    SignAndVerify,
    Verify,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVersionEntry {
    pub version_number: u32,
    pub status: KeyStatus,
    pub exportable: bool,
}

/// keyset ディレクトリの `meta` ファイルに対応するメタデータ。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysetMetadata {
    pub name: String,
    pub purpose: KeysetPurpose,
    #[serde(rename = "type")]
    pub key_type: String,
    pub encrypted: bool,
    pub versions: Vec<KeyVersionEntry>,
}

/// 公開鍵エントリの JSON スキーマ。
///
/// - フィールド名は外部ストレージとの互換契約。変更するとフォーマットの
///   リビジョンを上げることになる。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyRecord {
    #[serde(rename = "type")]
    pub key_type: String,
    pub named_curve: String,
    pub public_bytes: String,
    pub size: u32,
}

/// 秘密鍵エントリの JSON スキーマ。秘密スカラーは base64url テキスト。
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateKeyRecord {
    #[serde(rename = "type")]
    pub key_type: String,
    pub private_key: String,
    pub public_key: PublicKeyRecord,
    pub size: u32,
}

// 秘密スカラーをデバッグ出力やログへ流さない
impl fmt::Debug for PrivateKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyRecord")
            .field("key_type", &self.key_type)
            .field("public_key", &self.public_key)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// ディレクトリ形式の keyset（`meta` + バージョン番号ごとの JSON ファイル）を
/// 読むリーダ。各ファイルは一度の読み取りで取り込み、途中状態を持たない。
pub struct KeysetFileReader {
    path: PathBuf,
}

impl KeysetFileReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `meta` を読み、バージョン番号の一意性と PRIMARY の多重定義を検証する。
    pub fn read_metadata(&self) -> Result<KeysetMetadata, KeysetReaderError> {
        let text = fs::read_to_string(self.path.join("meta"))?;
        let metadata: KeysetMetadata = serde_json::from_str(&text)
            .map_err(|e| KeysetReaderError::MalformedKeyset(format!("meta: {e}")))?;

        let mut seen = HashSet::new();
        let mut primary_count = 0usize;
        for entry in &metadata.versions {
            if !seen.insert(entry.version_number) {
                return Err(KeysetReaderError::MalformedKeyset(format!(
                    "duplicate version number: {}",
                    entry.version_number
                )));
            }
            if entry.status == KeyStatus::Primary {
                primary_count += 1;
            }
        }
        if primary_count > 1 {
            return Err(KeysetReaderError::MalformedKeyset(
                "more than one PRIMARY version".to_string(),
            ));
        }

        tracing::debug!(
            name = %metadata.name,
            versions = metadata.versions.len(),
            "keyset metadata loaded"
        );
        Ok(metadata)
    }

    /// 指定バージョンの鍵エントリを JSON 値として読む。
    ///
    /// - エントリが存在しなければ KeyNotFound
    /// - JSON として読めなければ MalformedKeyset
    pub fn read_key(&self, version: u32) -> Result<Value, KeysetReaderError> {
        let path = self.path.join(version.to_string());
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeysetReaderError::KeyNotFound(version));
            }
            Err(e) => return Err(KeysetReaderError::Io(e)),
        };
        serde_json::from_str(&text)
            .map_err(|e| KeysetReaderError::MalformedKeyset(format!("version {version}: {e}")))
    }
}

/// keyset から読んだ公開鍵エントリを検証用の鍵ペアにする。
///
/// - `type` フィールドをレジストリで引き、未知の識別子は UnknownKeyType
/// - スキーマに合わない値は MalformedKeyset
pub fn public_key_from_value(
    registry: &KeyTypeRegistry,
    value: &Value,
    version: KeyVersion,
) -> Result<SigningKeyPair, KeysetReaderError> {
    let record: PublicKeyRecord = serde_json::from_value(value.clone())
        .map_err(|e| KeysetReaderError::MalformedKeyset(format!("public key entry: {e}")))?;
    let key_type = registry.create(&record.key_type)?.clone();

    let public_bytes = decode_base64url(&record.public_bytes)
        .map_err(|e| KeysetReaderError::MalformedKeyset(format!("publicBytes: {e}")))?;
    let material = public_material(&record.named_curve, record.size, &public_bytes)?;

    SigningKeyPair::from_material(key_type, version, material)
        .map_err(|e| KeysetReaderError::MalformedKeyset(e.to_string()))
}

/// keyset から読んだ秘密鍵エントリを署名用の鍵ペアにする。
pub fn private_key_from_value(
    registry: &KeyTypeRegistry,
    value: &Value,
    version: KeyVersion,
) -> Result<SigningKeyPair, KeysetReaderError> {
    let record: PrivateKeyRecord = serde_json::from_value(value.clone())
        .map_err(|e| KeysetReaderError::MalformedKeyset(format!("private key entry: {e}")))?;
    let key_type = registry.create(&record.key_type)?.clone();

    let scalar = Zeroizing::new(
        decode_base64url(&record.private_key)
            .map_err(|e| KeysetReaderError::MalformedKeyset(format!("privateKey: {e}")))?,
    );
    let material = private_material(&record.public_key.named_curve, record.size, &scalar)?;

    // 秘密スカラーから導いた公開鍵が、エントリ内の公開鍵と一致することを確認する
    let declared_public = decode_base64url(&record.public_key.public_bytes)
        .map_err(|e| KeysetReaderError::MalformedKeyset(format!("publicBytes: {e}")))?;
    if material.public_bytes() != declared_public {
        return Err(KeysetReaderError::MalformedKeyset(
            "publicKey does not match the private scalar".to_string(),
        ));
    }

    SigningKeyPair::from_material(key_type, version, material)
        .map_err(|e| KeysetReaderError::MalformedKeyset(e.to_string()))
}

/// 秘密鍵ペアを keyset の秘密鍵エントリに直列化する。
/// 公開鍵のみのペアには None を返す。
pub fn private_key_to_record(pair: &SigningKeyPair) -> Option<PrivateKeyRecord> {
    let scalar = match pair.material() {
        KeyMaterial::P256(inner) => inner.private_scalar()?,
        KeyMaterial::P384(inner) => inner.private_scalar()?,
    };
    Some(PrivateKeyRecord {
        key_type: key_type::ECDSA_PRIV.to_string(),
        private_key: encode_base64url(&scalar),
        public_key: public_key_to_record(pair),
        size: pair.size(),
    })
}

/// 鍵ペアの公開側を keyset の公開鍵エントリに直列化する。
pub fn public_key_to_record(pair: &SigningKeyPair) -> PublicKeyRecord {
    PublicKeyRecord {
        key_type: key_type::ECDSA_PUB.to_string(),
        named_curve: pair.material().named_curve().to_string(),
        public_bytes: encode_base64url(&pair.public_bytes()),
        size: pair.size(),
    }
}

fn public_material(
    named_curve: &str,
    size: u32,
    bytes: &[u8],
) -> Result<KeyMaterial, KeysetReaderError> {
    match (named_curve, size) {
        ("P-256", 256) => P256KeyPair::from_public_bytes(bytes)
            .map(KeyMaterial::P256)
            .map_err(|e| KeysetReaderError::MalformedKeyset(format!("publicBytes: {e}"))),
        ("P-384", 384) => P384KeyPair::from_public_bytes(bytes)
            .map(KeyMaterial::P384)
            .map_err(|e| KeysetReaderError::MalformedKeyset(format!("publicBytes: {e}"))),
        (curve, size) => Err(KeysetReaderError::MalformedKeyset(format!(
            "unsupported curve/size combination: {curve}/{size}"
        ))),
    }
}

fn private_material(
    named_curve: &str,
    size: u32,
    scalar: &[u8],
) -> Result<KeyMaterial, KeysetReaderError> {
    match (named_curve, size) {
        ("P-256", 256) => P256KeyPair::from_private_scalar(scalar)
            .map(KeyMaterial::P256)
            .map_err(|e| KeysetReaderError::MalformedKeyset(format!("privateKey: {e}"))),
        ("P-384", 384) => P384KeyPair::from_private_scalar(scalar)
            .map(KeyMaterial::P384)
            .map_err(|e| KeysetReaderError::MalformedKeyset(format!("privateKey: {e}"))),
        (curve, size) => Err(KeysetReaderError::MalformedKeyset(format!(
            "unsupported curve/size combination: {curve}/{size}"
        ))),
    }
}
