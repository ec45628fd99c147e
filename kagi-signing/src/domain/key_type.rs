use thiserror::Error;

/// 署名用秘密鍵の種別識別子。keyset の `type` フィールドと一致する。
pub const ECDSA_PRIV: &str = "ECDSA_PRIV";
/// 検証用公開鍵の種別識別子。
pub const ECDSA_PUB: &str = "ECDSA_PUB";

const ECDSA_SIZES: &[u32] = &[256, 384];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyTypeError {
    #[error("unknown key type: {0}")]
    UnknownKeyType(String),
}

/// 鍵が秘密鍵か公開鍵かの区分。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCategory {
    Private,
    Public,
}

/// 鍵の用途。署名サブシステムでは署名・検証のみを扱う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    SignAndVerify,
}

/// レジストリが所有する鍵種別エントリ。構築後は不変。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyType {
    identifier: &'static str,
    category: KeyCategory,
    sizes: &'static [u32],
    purpose: KeyPurpose,
}

impl KeyType {
    pub fn identifier(&self) -> &str {
        self.identifier
    }

    pub fn category(&self) -> KeyCategory {
        self.category
    }

    /// 許可された鍵サイズ（ビット）を定義順で返す。
    pub fn sizes(&self) -> &[u32] {
        self.sizes
    }

    pub fn purpose(&self) -> KeyPurpose {
        self.purpose
    }

    pub fn supports_size(&self, size: u32) -> bool {
        self.sizes.contains(&size)
    }
}

/// 鍵種別のレジストリ。
///
/// - プロセス初期化時に一度だけ構築し、以降は不変の値として参照で
///   生成・keyset 読み込み・PEM インポートの各コンポーネントへ渡す。
/// - 内部に可変状態を持たないため、ロックなしで並行に参照できる。
#[derive(Debug, Clone)]
pub struct KeyTypeRegistry {
    entries: Vec<KeyType>,
}

impl KeyTypeRegistry {
    pub fn new() -> Self {
        Self {
            entries: vec![
                KeyType {
                    identifier: ECDSA_PRIV,
                    category: KeyCategory::Private,
                    sizes: ECDSA_SIZES,
                    purpose: KeyPurpose::SignAndVerify,
                },
                KeyType {
                    identifier: ECDSA_PUB,
                    category: KeyCategory::Public,
                    sizes: ECDSA_SIZES,
                    purpose: KeyPurpose::SignAndVerify,
                },
            ],
        }
    }

    /// 識別子に完全一致する KeyType を返す。
    pub fn create(&self, identifier: &str) -> Result<&KeyType, KeyTypeError> {
        self.entries
            .iter()
            .find(|entry| entry.identifier == identifier)
            .ok_or_else(|| KeyTypeError::UnknownKeyType(identifier.to_string()))
    }
}

impl Default for KeyTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_returns_registered_types() {
        let registry = KeyTypeRegistry::new();

        let private = registry.create(ECDSA_PRIV).expect("ECDSA_PRIV should exist");
        assert_eq!(private.category(), KeyCategory::Private);
        assert_eq!(private.purpose(), KeyPurpose::SignAndVerify);

        let public = registry.create(ECDSA_PUB).expect("ECDSA_PUB should exist");
        assert_eq!(public.category(), KeyCategory::Public);
    }

    #[test]
    fn sizes_are_stable_and_enumerable() {
        let registry = KeyTypeRegistry::new();
        let key_type = registry.create(ECDSA_PRIV).unwrap();

        assert_eq!(key_type.sizes(), &[256, 384]);
        for size in key_type.sizes() {
            assert!(key_type.supports_size(*size));
        }
        assert!(!key_type.supports_size(512));
    }

    #[test]
    fn create_fails_for_unknown_identifier() {
        let registry = KeyTypeRegistry::new();
        let err = registry.create("RSA_PRIV").unwrap_err();
        assert_eq!(err, KeyTypeError::UnknownKeyType("RSA_PRIV".to_string()));
    }
}
