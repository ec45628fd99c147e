use p384::ecdsa::signature::{Signer, Verifier};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use p384::elliptic_curve::rand_core::OsRng;
use p384::elliptic_curve::sec1::ToEncodedPoint;
use p384::SecretKey;
use zeroize::Zeroizing;

/// P-384 (secp384r1) の ECDSA 鍵ペア。
///
/// - 構造は P256KeyPair と同じで、ダイジェストのみ SHA-384。
#[derive(Debug, Clone)]
pub struct P384KeyPair {
    signing_key: Option<SigningKey>,
    verifying_key: VerifyingKey,
}

impl P384KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        P384KeyPair {
            signing_key: Some(signing_key),
            verifying_key,
        }
    }

    /// 48 バイトの秘密スカラーから鍵ペアを復元する。
    pub fn from_private_scalar(scalar: &[u8]) -> Result<Self, p384::ecdsa::Error> {
        let signing_key = SigningKey::from_slice(scalar)?;
        let verifying_key = VerifyingKey::from(&signing_key);
        Ok(P384KeyPair {
            signing_key: Some(signing_key),
            verifying_key,
        })
    }

    pub fn from_public_bytes(bytes: &[u8]) -> Result<Self, p384::ecdsa::Error> {
        let verifying_key = VerifyingKey::from_sec1_bytes(bytes)?;
        Ok(P384KeyPair {
            signing_key: None,
            verifying_key,
        })
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let signing_key = SigningKey::from(&secret_key);
        let verifying_key = VerifyingKey::from(&signing_key);
        P384KeyPair {
            signing_key: Some(signing_key),
            verifying_key,
        }
    }

    pub fn has_private(&self) -> bool {
        self.signing_key.is_some()
    }

    pub fn sign(&self, message: &[u8]) -> Option<Vec<u8>> {
        let signing_key = self.signing_key.as_ref()?;
        let signature: Signature = signing_key.sign(message);
        Some(signature.to_der().as_bytes().to_vec())
    }

    pub fn verify(&self, message: &[u8], raw_signature: &[u8]) -> bool {
        match Signature::from_der(raw_signature) {
            Ok(signature) => self.verifying_key.verify(message, &signature).is_ok(),
            Err(_) => false,
        }
    }

    /// 公開鍵を uncompressed form (0x04 || X || Y, 97 バイト) で返す。
    pub fn public_bytes(&self) -> Vec<u8> {
        self.verifying_key
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    pub fn private_scalar(&self) -> Option<Zeroizing<Vec<u8>>> {
        self.signing_key
            .as_ref()
            .map(|key| Zeroizing::new(key.to_bytes().to_vec()))
    }
}

impl PartialEq for P384KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.verifying_key == other.verifying_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_sign_and_verify() {
        let pair = P384KeyPair::generate();
        let signature = pair.sign(b"message").expect("private pair should sign");
        assert!(pair.verify(b"message", &signature));
        assert!(!pair.verify(b"tampered", &signature));
    }

    #[test]
    fn scalar_round_trip_restores_same_key() {
        let pair = P384KeyPair::generate();
        let scalar = pair.private_scalar().expect("should expose scalar");
        assert_eq!(scalar.len(), 48);
        let restored = P384KeyPair::from_private_scalar(&scalar).expect("scalar should parse");
        assert_eq!(pair, restored);
    }

    #[test]
    fn p256_signature_does_not_verify_with_p384_key() {
        let p256 = crate::domain::key_pair::p256_key_pair::P256KeyPair::generate();
        let p384 = P384KeyPair::generate();
        let signature = p256.sign(b"message").unwrap();
        assert!(!p384.verify(b"message", &signature));
    }
}
