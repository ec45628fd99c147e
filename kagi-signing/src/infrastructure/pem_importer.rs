use std::fs;
use std::path::Path;

use p256::NistP256;
use p384::NistP384;
use pkcs8::{AssociatedOid, DecodePrivateKey, EncryptedPrivateKeyInfo, PrivateKeyInfo};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::domain::key_pair::p256_key_pair::P256KeyPair;
use crate::domain::key_pair::p384_key_pair::P384KeyPair;
use crate::domain::key_pair::{KeyMaterial, SigningKeyPair};
use crate::domain::key_type::{self, KeyTypeError, KeyTypeRegistry};
use crate::domain::key_version::KeyVersion;

#[derive(Debug, Error)]
pub enum PortableKeyError {
    #[error("malformed portable key: {0}")]
    MalformedPortableKey(String),
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),
    #[error("invalid or missing passphrase")]
    InvalidPassphrase,
    #[error(transparent)]
    UnknownKeyType(#[from] KeyTypeError),
    #[error("portable key read error: {0}")]
    Io(#[from] std::io::Error),
}

const PKCS8_LABEL: &str = "PRIVATE KEY";
const PKCS8_ENCRYPTED_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const SEC1_LABEL: &str = "EC PRIVATE KEY";

/// id-ecPublicKey。PKCS#8 の algorithm フィールドに入る OID。
const EC_PUBLIC_KEY_OID: pkcs8::der::asn1::ObjectIdentifier =
    pkcs8::der::asn1::ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// PEM ファイルを読み込んで秘密鍵ペアを構築する。
///
/// - ファイルは一度だけ読み、その後のパースはメモリ上で行う。
pub fn import_key_file(
    registry: &KeyTypeRegistry,
    path: &Path,
    passphrase: Option<&str>,
) -> Result<SigningKeyPair, PortableKeyError> {
    let pem = fs::read_to_string(path)?;
    import_key_pem(registry, &pem, passphrase)
}

/// PEM テキストから秘密鍵ペアを構築する。
///
/// - `PRIVATE KEY`（PKCS#8）、`EC PRIVATE KEY`（SEC1）、
///   `ENCRYPTED PRIVATE KEY`（PKCS#8 PBES2）の 3 種類のブロックに対応する。
/// - 暗号化ブロックでパスフレーズが無い、または復号結果が鍵として
///   成立しない場合は InvalidPassphrase。
/// - 旧式の OpenSSL ヘッダ付き暗号化 PEM（`Proc-Type: 4,ENCRYPTED`）は
///   対応しない暗号化方式として UnsupportedCipher を返す。
pub fn import_key_pem(
    registry: &KeyTypeRegistry,
    pem: &str,
    passphrase: Option<&str>,
) -> Result<SigningKeyPair, PortableKeyError> {
    if pem.contains("Proc-Type: 4,ENCRYPTED") {
        return Err(PortableKeyError::UnsupportedCipher(
            "legacy OpenSSL PEM encryption".to_string(),
        ));
    }

    let (label, der) = pem_rfc7468::decode_vec(pem.as_bytes())
        .map_err(|e| PortableKeyError::MalformedPortableKey(e.to_string()))?;
    let der = Zeroizing::new(der);

    let material = match label {
        PKCS8_LABEL => material_from_pkcs8(&der)?,
        SEC1_LABEL => material_from_sec1(&der)?,
        PKCS8_ENCRYPTED_LABEL => {
            tracing::debug!("importing passphrase-protected key block");
            let passphrase = passphrase.ok_or(PortableKeyError::InvalidPassphrase)?;
            material_from_encrypted_pkcs8(&der, passphrase)?
        }
        other => {
            return Err(PortableKeyError::MalformedPortableKey(format!(
                "unexpected PEM label: {other}"
            )))
        }
    };

    let key_type = registry.create(key_type::ECDSA_PRIV)?.clone();
    SigningKeyPair::from_material(key_type, KeyVersion::INITIAL, material)
        .map_err(|e| PortableKeyError::MalformedPortableKey(e.to_string()))
}

fn material_from_pkcs8(der: &[u8]) -> Result<KeyMaterial, PortableKeyError> {
    let info = PrivateKeyInfo::try_from(der)
        .map_err(|e| PortableKeyError::MalformedPortableKey(format!("PKCS#8: {e}")))?;
    if info.algorithm.oid != EC_PUBLIC_KEY_OID {
        return Err(PortableKeyError::MalformedPortableKey(format!(
            "not an elliptic-curve key: {}",
            info.algorithm.oid
        )));
    }

    let curve_oid = info
        .algorithm
        .parameters_oid()
        .map_err(|e| PortableKeyError::MalformedPortableKey(format!("PKCS#8 parameters: {e}")))?;

    if curve_oid == NistP256::OID {
        let secret_key = p256::SecretKey::from_pkcs8_der(der)
            .map_err(|e| PortableKeyError::MalformedPortableKey(format!("PKCS#8: {e}")))?;
        Ok(KeyMaterial::P256(P256KeyPair::from_secret_key(secret_key)))
    } else if curve_oid == NistP384::OID {
        let secret_key = p384::SecretKey::from_pkcs8_der(der)
            .map_err(|e| PortableKeyError::MalformedPortableKey(format!("PKCS#8: {e}")))?;
        Ok(KeyMaterial::P384(P384KeyPair::from_secret_key(secret_key)))
    } else {
        Err(PortableKeyError::MalformedPortableKey(format!(
            "unsupported curve: {curve_oid}"
        )))
    }
}

fn material_from_sec1(der: &[u8]) -> Result<KeyMaterial, PortableKeyError> {
    // SEC1 ブロックは曲線パラメータを自身で持つので、対応曲線を順に試す
    if let Ok(secret_key) = p256::SecretKey::from_sec1_der(der) {
        return Ok(KeyMaterial::P256(P256KeyPair::from_secret_key(secret_key)));
    }
    if let Ok(secret_key) = p384::SecretKey::from_sec1_der(der) {
        return Ok(KeyMaterial::P384(P384KeyPair::from_secret_key(secret_key)));
    }
    Err(PortableKeyError::MalformedPortableKey(
        "SEC1 block does not hold a supported curve key".to_string(),
    ))
}

fn material_from_encrypted_pkcs8(
    der: &[u8],
    passphrase: &str,
) -> Result<KeyMaterial, PortableKeyError> {
    let encrypted = EncryptedPrivateKeyInfo::try_from(der)
        .map_err(|e| PortableKeyError::MalformedPortableKey(format!("encrypted PKCS#8: {e}")))?;

    let document = encrypted
        .decrypt(passphrase)
        .map_err(map_decrypt_error)?;

    // 復号には成功しても鍵として成立しなければ、パスフレーズ不正として扱う
    material_from_pkcs8(document.as_bytes()).map_err(|_| PortableKeyError::InvalidPassphrase)
}

fn map_decrypt_error(err: pkcs8::Error) -> PortableKeyError {
    match err {
        pkcs8::Error::EncryptedPrivateKey(inner) => match inner {
            pkcs8::pkcs5::Error::UnsupportedAlgorithm { oid } => {
                PortableKeyError::UnsupportedCipher(oid.to_string())
            }
            _ => PortableKeyError::InvalidPassphrase,
        },
        _ => PortableKeyError::InvalidPassphrase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn pem_fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("testdata/ec_pem")
            .join(name)
    }

    #[test]
    fn imports_unencrypted_sec1_key() {
        let registry = KeyTypeRegistry::new();
        let pair = import_key_file(&registry, &pem_fixture("ec_priv.pem"), None)
            .expect("unencrypted SEC1 key should import");

        assert!(pair.has_private());
        assert_eq!(pair.size(), 256);
        let envelope_bytes = pair.sign(b"pem import").unwrap();
        assert!(pair.verify(b"pem import", &envelope_bytes).unwrap());
    }

    #[test]
    fn imports_unencrypted_pkcs8_key() {
        let registry = KeyTypeRegistry::new();
        let pair = import_key_file(&registry, &pem_fixture("ec_priv_pkcs8.pem"), None)
            .expect("unencrypted PKCS#8 key should import");

        assert_eq!(pair.size(), 384);
        let envelope_bytes = pair.sign(b"pem import").unwrap();
        assert!(pair.verify(b"pem import", &envelope_bytes).unwrap());
    }

    #[test]
    fn imports_encrypted_key_with_correct_passphrase() {
        let registry = KeyTypeRegistry::new();
        let pair = import_key_file(
            &registry,
            &pem_fixture("ec_priv_encrypted.pem"),
            Some("cartman"),
        )
        .expect("correct passphrase should decrypt");

        let envelope_bytes = pair.sign(b"pem import").unwrap();
        assert!(pair.verify(b"pem import", &envelope_bytes).unwrap());
    }

    #[test]
    fn rejects_wrong_passphrase() {
        let registry = KeyTypeRegistry::new();
        let err = import_key_file(
            &registry,
            &pem_fixture("ec_priv_encrypted.pem"),
            Some("kartman"),
        )
        .unwrap_err();
        assert!(matches!(err, PortableKeyError::InvalidPassphrase));
    }

    #[test]
    fn rejects_missing_passphrase_for_encrypted_key() {
        let registry = KeyTypeRegistry::new();
        let err =
            import_key_file(&registry, &pem_fixture("ec_priv_encrypted.pem"), None).unwrap_err();
        assert!(matches!(err, PortableKeyError::InvalidPassphrase));
    }

    #[test]
    fn rejects_legacy_openssl_encryption_as_unsupported_cipher() {
        let registry = KeyTypeRegistry::new();
        let err =
            import_key_file(&registry, &pem_fixture("ec_priv_legacy.pem"), Some("cartman"))
                .unwrap_err();
        assert!(matches!(err, PortableKeyError::UnsupportedCipher(_)));
    }

    #[test]
    fn rejects_foreign_pem_label() {
        let registry = KeyTypeRegistry::new();
        let pem = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        let err = import_key_pem(&registry, pem, None).unwrap_err();
        assert!(matches!(err, PortableKeyError::MalformedPortableKey(_)));
    }

    #[test]
    fn rejects_text_that_is_not_pem() {
        let registry = KeyTypeRegistry::new();
        let err = import_key_pem(&registry, "clearly not a pem block", None).unwrap_err();
        assert!(matches!(err, PortableKeyError::MalformedPortableKey(_)));
    }
}
