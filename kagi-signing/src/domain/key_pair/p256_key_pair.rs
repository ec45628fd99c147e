use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use zeroize::Zeroizing;

/// P-256 (prime256v1) の ECDSA 鍵ペア。
///
/// - `signing_key` が None のインスタンスは検証専用（公開鍵のみ）。
/// - 署名は SHA-256 ダイジェストに対する DER エンコードの (r, s)。
#[derive(Debug, Clone)]
pub struct P256KeyPair {
    signing_key: Option<SigningKey>,
    verifying_key: VerifyingKey,
}

impl P256KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        P256KeyPair {
            signing_key: Some(signing_key),
            verifying_key,
        }
    }

    /// 32 バイトの秘密スカラーから鍵ペアを復元する。
    pub fn from_private_scalar(scalar: &[u8]) -> Result<Self, p256::ecdsa::Error> {
        let signing_key = SigningKey::from_slice(scalar)?;
        let verifying_key = VerifyingKey::from(&signing_key);
        Ok(P256KeyPair {
            signing_key: Some(signing_key),
            verifying_key,
        })
    }

    /// SEC1 形式（uncompressed form 0x04 || X || Y など）の公開鍵バイト列から
    /// 検証専用の鍵ペアを作る。
    pub fn from_public_bytes(bytes: &[u8]) -> Result<Self, p256::ecdsa::Error> {
        let verifying_key = VerifyingKey::from_sec1_bytes(bytes)?;
        Ok(P256KeyPair {
            signing_key: None,
            verifying_key,
        })
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let signing_key = SigningKey::from(&secret_key);
        let verifying_key = VerifyingKey::from(&signing_key);
        P256KeyPair {
            signing_key: Some(signing_key),
            verifying_key,
        }
    }

    pub fn has_private(&self) -> bool {
        self.signing_key.is_some()
    }

    /// 与えられたメッセージに署名し、DER エンコードの署名を返す。
    /// 公開鍵のみのインスタンスでは None。
    pub fn sign(&self, message: &[u8]) -> Option<Vec<u8>> {
        let signing_key = self.signing_key.as_ref()?;
        let signature: Signature = signing_key.sign(message);
        Some(signature.to_der().as_bytes().to_vec())
    }

    /// DER エンコードの署名を検証する。署名がパースできない場合も false。
    pub fn verify(&self, message: &[u8], raw_signature: &[u8]) -> bool {
        match Signature::from_der(raw_signature) {
            Ok(signature) => self.verifying_key.verify(message, &signature).is_ok(),
            Err(_) => false,
        }
    }

    /// 公開鍵を uncompressed form (0x04 || X || Y, 65 バイト) で返す。
    pub fn public_bytes(&self) -> Vec<u8> {
        self.verifying_key
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// 秘密スカラーを 32 バイトで返す（keyset への書き出し用）。
    pub fn private_scalar(&self) -> Option<Zeroizing<Vec<u8>>> {
        self.signing_key
            .as_ref()
            .map(|key| Zeroizing::new(key.to_bytes().to_vec()))
    }
}

impl PartialEq for P256KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.verifying_key == other.verifying_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_sign_and_verify() {
        let pair = P256KeyPair::generate();
        let signature = pair.sign(b"message").expect("private pair should sign");
        assert!(pair.verify(b"message", &signature));
        assert!(!pair.verify(b"other message", &signature));
    }

    #[test]
    fn verify_rejects_garbage_signature_as_false() {
        let pair = P256KeyPair::generate();
        assert!(!pair.verify(b"message", b"not a der signature"));
    }

    #[test]
    fn scalar_round_trip_restores_same_key() {
        let pair = P256KeyPair::generate();
        let scalar = pair.private_scalar().expect("should expose scalar");
        let restored = P256KeyPair::from_private_scalar(&scalar).expect("scalar should parse");
        assert_eq!(pair, restored);
    }

    #[test]
    fn public_only_pair_verifies_but_cannot_sign() {
        let pair = P256KeyPair::generate();
        let signature = pair.sign(b"message").unwrap();

        let public_only =
            P256KeyPair::from_public_bytes(&pair.public_bytes()).expect("point should parse");
        assert!(!public_only.has_private());
        assert!(public_only.sign(b"message").is_none());
        assert!(public_only.verify(b"message", &signature));
    }
}
