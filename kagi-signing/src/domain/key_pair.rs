pub mod p256_key_pair;
pub mod p384_key_pair;

use thiserror::Error;

use crate::domain::envelope::{self, EnvelopeError, EnvelopeHeader, KEY_HASH_LEN};
use crate::domain::key_pair::p256_key_pair::P256KeyPair;
use crate::domain::key_pair::p384_key_pair::P384KeyPair;
use crate::domain::key_type::{self, KeyCategory, KeyType, KeyTypeError, KeyTypeRegistry};
use crate::domain::key_version::KeyVersion;

#[derive(Debug, Error)]
pub enum KeyPairError {
    #[error("unsupported key size: {0}")]
    UnsupportedKeySize(u32),
    #[error("key pair has no private material")]
    NoPrivateMaterial,
    #[error("malformed key material: {0}")]
    MalformedKeyMaterial(String),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    KeyType(#[from] KeyTypeError),
}

/// 曲線ごとの鍵素材。
///
/// - 対応する曲線を増やす場合はここへバリアントを足し、レジストリの
///   サイズ表と合わせる。
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    P256(P256KeyPair),
    P384(P384KeyPair),
}

impl KeyMaterial {
    pub fn size(&self) -> u32 {
        match self {
            KeyMaterial::P256(_) => 256,
            KeyMaterial::P384(_) => 384,
        }
    }

    pub fn named_curve(&self) -> &'static str {
        match self {
            KeyMaterial::P256(_) => "P-256",
            KeyMaterial::P384(_) => "P-384",
        }
    }

    pub fn has_private(&self) -> bool {
        match self {
            KeyMaterial::P256(pair) => pair.has_private(),
            KeyMaterial::P384(pair) => pair.has_private(),
        }
    }

    pub fn public_bytes(&self) -> Vec<u8> {
        match self {
            KeyMaterial::P256(pair) => pair.public_bytes(),
            KeyMaterial::P384(pair) => pair.public_bytes(),
        }
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyPairError> {
        let signature = match self {
            KeyMaterial::P256(pair) => pair.sign(message),
            KeyMaterial::P384(pair) => pair.sign(message),
        };
        signature.ok_or(KeyPairError::NoPrivateMaterial)
    }

    fn verify(&self, message: &[u8], raw_signature: &[u8]) -> bool {
        match self {
            KeyMaterial::P256(pair) => pair.verify(message, raw_signature),
            KeyMaterial::P384(pair) => pair.verify(message, raw_signature),
        }
    }

    fn public_only(&self) -> Result<KeyMaterial, KeyPairError> {
        let material = match self {
            KeyMaterial::P256(pair) => KeyMaterial::P256(
                P256KeyPair::from_public_bytes(&pair.public_bytes())
                    .map_err(|e| KeyPairError::MalformedKeyMaterial(e.to_string()))?,
            ),
            KeyMaterial::P384(pair) => KeyMaterial::P384(
                P384KeyPair::from_public_bytes(&pair.public_bytes())
                    .map_err(|e| KeyPairError::MalformedKeyMaterial(e.to_string()))?,
            ),
        };
        Ok(material)
    }
}

/// 署名・検証に用いる鍵ペア。
///
/// - 生成・keyset 読み込み・PEM インポートのいずれかで作られ、以後不変。
/// - 秘密素材を持たないインスタンスは検証のみ可能。
/// - 秘密スカラーは曲線クレート側でドロップ時にゼロ化される。
#[derive(Debug, Clone)]
pub struct SigningKeyPair {
    key_type: KeyType,
    version: KeyVersion,
    material: KeyMaterial,
}

impl SigningKeyPair {
    /// 新しい秘密鍵ペアを生成する。
    ///
    /// - `size` がレジストリの許可リストに無い場合は、鍵素材を一切
    ///   作らずにエラーを返す。
    /// - バージョンは初期値 1 が割り当てられる（keyset へ組み込む際に
    ///   `with_version` で差し替える）。
    pub fn generate(registry: &KeyTypeRegistry, size: u32) -> Result<Self, KeyPairError> {
        let key_type = registry.create(key_type::ECDSA_PRIV)?;
        if !key_type.supports_size(size) {
            return Err(KeyPairError::UnsupportedKeySize(size));
        }
        let material = match size {
            256 => KeyMaterial::P256(P256KeyPair::generate()),
            384 => KeyMaterial::P384(P384KeyPair::generate()),
            other => return Err(KeyPairError::UnsupportedKeySize(other)),
        };
        Ok(SigningKeyPair {
            key_type: key_type.clone(),
            version: KeyVersion::INITIAL,
            material,
        })
    }

    /// keyset リーダや PEM インポータが素材から鍵ペアを組み立てるための
    /// コンストラクタ。種別と素材の整合性をここで検証する。
    pub fn from_material(
        key_type: KeyType,
        version: KeyVersion,
        material: KeyMaterial,
    ) -> Result<Self, KeyPairError> {
        if !key_type.supports_size(material.size()) {
            return Err(KeyPairError::UnsupportedKeySize(material.size()));
        }
        if key_type.category() == KeyCategory::Private && !material.has_private() {
            return Err(KeyPairError::NoPrivateMaterial);
        }
        Ok(SigningKeyPair {
            key_type,
            version,
            material,
        })
    }

    pub fn with_version(mut self, version: KeyVersion) -> Self {
        self.version = version;
        self
    }

    pub fn key_type(&self) -> &KeyType {
        &self.key_type
    }

    pub fn version(&self) -> KeyVersion {
        self.version
    }

    pub fn size(&self) -> u32 {
        self.material.size()
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    pub fn has_private(&self) -> bool {
        self.material.has_private()
    }

    pub fn public_bytes(&self) -> Vec<u8> {
        self.material.public_bytes()
    }

    /// エンベロープヘッダに載る 4 バイトの鍵ハッシュ。
    pub fn key_hash(&self) -> [u8; KEY_HASH_LEN] {
        envelope::key_hash(&self.material.public_bytes())
    }

    /// data に署名し、エンベロープ（ヘッダ + 生署名）を返す。
    ///
    /// - 署名対象は `data || フォーマットバージョンバイト`。
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, KeyPairError> {
        let payload = envelope::signed_payload(data);
        let raw_signature = self.material.sign(&payload)?;
        Ok(envelope::encode(
            &EnvelopeHeader::new(self.key_hash()),
            &raw_signature,
        ))
    }

    /// エンベロープを分解し、署名の暗号学的な正しさを判定する。
    ///
    /// - 構造的に壊れたエンベロープのみエラー
    /// - 鍵ハッシュの不一致や署名の不正は false（エラーではない）
    pub fn verify(&self, data: &[u8], envelope_bytes: &[u8]) -> Result<bool, KeyPairError> {
        let (header, raw_signature) = envelope::decode(envelope_bytes)?;
        if header.key_hash() != &self.key_hash() {
            return Ok(false);
        }
        Ok(self.verify_detached(&envelope::signed_payload(data), raw_signature))
    }

    /// 与えられたバイト列そのものに署名する。
    /// ヘッダもフォーマットバージョンバイトも付加しない。
    pub fn sign_detached(&self, message: &[u8]) -> Result<Vec<u8>, KeyPairError> {
        self.material.sign(message)
    }

    /// ヘッダ無しの生署名を検証する。
    pub fn verify_detached(&self, message: &[u8], raw_signature: &[u8]) -> bool {
        self.material.verify(message, raw_signature)
    }

    /// 公開鍵のみのビュー（ECDSA_PUB）を導出する。
    /// 秘密鍵・公開鍵どちらのインスタンスにも使える。
    pub fn export_public(&self, registry: &KeyTypeRegistry) -> Result<SigningKeyPair, KeyPairError> {
        let key_type = registry.create(key_type::ECDSA_PUB)?;
        Ok(SigningKeyPair {
            key_type: key_type.clone(),
            version: self.version,
            material: self.material.public_only()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::HEADER_LEN;

    #[test]
    fn generate_sign_verify_for_every_registered_size() {
        let registry = KeyTypeRegistry::new();
        let key_type = registry.create(key_type::ECDSA_PRIV).unwrap();

        for size in key_type.sizes() {
            let pair = SigningKeyPair::generate(&registry, *size).expect("generate should succeed");
            assert_eq!(pair.size(), *size);
            assert_eq!(pair.version(), KeyVersion::INITIAL);

            let envelope_bytes = pair.sign(b"input data").expect("sign should succeed");
            assert!(envelope_bytes.len() > HEADER_LEN);
            assert!(pair.verify(b"input data", &envelope_bytes).unwrap());
            assert!(!pair.verify(b"different data", &envelope_bytes).unwrap());
        }
    }

    #[test]
    fn generate_rejects_unregistered_size() {
        let registry = KeyTypeRegistry::new();
        let err = SigningKeyPair::generate(&registry, 521).unwrap_err();
        assert!(matches!(err, KeyPairError::UnsupportedKeySize(521)));
    }

    #[test]
    fn public_only_pair_cannot_sign() {
        let registry = KeyTypeRegistry::new();
        let pair = SigningKeyPair::generate(&registry, 256).unwrap();
        let public_only = pair.export_public(&registry).expect("export should succeed");

        assert!(!public_only.has_private());
        assert_eq!(
            public_only.key_type().identifier(),
            key_type::ECDSA_PUB
        );
        let err = public_only.sign(b"data").unwrap_err();
        assert!(matches!(err, KeyPairError::NoPrivateMaterial));
    }

    #[test]
    fn exported_public_pair_verifies_signatures() {
        let registry = KeyTypeRegistry::new();
        let pair = SigningKeyPair::generate(&registry, 384).unwrap();
        let envelope_bytes = pair.sign(b"payload").unwrap();

        let public_only = pair.export_public(&registry).unwrap();
        assert_eq!(public_only.key_hash(), pair.key_hash());
        assert!(public_only.verify(b"payload", &envelope_bytes).unwrap());
    }

    #[test]
    fn verify_returns_error_only_for_malformed_envelopes() {
        let registry = KeyTypeRegistry::new();
        let pair = SigningKeyPair::generate(&registry, 256).unwrap();

        // ヘッダ長未満は構造エラー
        assert!(pair.verify(b"data", &[0u8; 3]).is_err());

        // 鍵ハッシュが合わない整形式エンベロープは false
        let mut envelope_bytes = pair.sign(b"data").unwrap();
        envelope_bytes[1] ^= 0xFF;
        assert!(!pair.verify(b"data", &envelope_bytes).unwrap());

        // 署名本体が壊れている場合も false
        let mut corrupted = pair.sign(b"data").unwrap();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;
        assert!(!pair.verify(b"data", &corrupted).unwrap());
    }

    #[test]
    fn detached_signing_round_trip() {
        let registry = KeyTypeRegistry::new();
        let pair = SigningKeyPair::generate(&registry, 256).unwrap();

        let raw = pair.sign_detached(b"detached message").unwrap();
        assert!(pair.verify_detached(b"detached message", &raw));
        assert!(!pair.verify_detached(b"another message", &raw));
    }

    #[test]
    fn from_material_rejects_private_type_without_private_material() {
        let registry = KeyTypeRegistry::new();
        let generated = SigningKeyPair::generate(&registry, 256).unwrap();
        let public_material = generated.material().public_only().unwrap();

        let private_type = registry.create(key_type::ECDSA_PRIV).unwrap().clone();
        let err =
            SigningKeyPair::from_material(private_type, KeyVersion::INITIAL, public_material)
                .unwrap_err();
        assert!(matches!(err, KeyPairError::NoPrivateMaterial));
    }
}
