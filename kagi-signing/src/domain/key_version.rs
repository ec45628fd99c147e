use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyVersionError {
    #[error("key version {0} is out of range (expected 0-255)")]
    OutOfRange(u32),
}

/// keyset 内で 1 つの鍵を指すバージョン番号。
///
/// - エンベロープや署名対象に 1 バイトとして載るため、0〜255 の範囲外は
///   構築時点でエラーにする（黙って切り詰めない）。
/// - エンベロープのフォーマットバージョンバイトとは別物。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyVersion(u8);

impl KeyVersion {
    /// 新規生成された鍵に割り当てる初期バージョン。
    pub const INITIAL: KeyVersion = KeyVersion(1);

    pub fn new(value: u32) -> Result<Self, KeyVersionError> {
        u8::try_from(value)
            .map(KeyVersion)
            .map_err(|_| KeyVersionError::OutOfRange(value))
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }

    pub fn as_u32(self) -> u32 {
        u32::from(self.0)
    }
}

impl fmt::Display for KeyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_byte_range() {
        assert_eq!(KeyVersion::new(0).unwrap().as_byte(), 0);
        assert_eq!(KeyVersion::new(255).unwrap().as_byte(), 255);
    }

    #[test]
    fn rejects_values_above_one_byte() {
        assert_eq!(
            KeyVersion::new(256).unwrap_err(),
            KeyVersionError::OutOfRange(256)
        );
        assert!(KeyVersion::new(1000).is_err());
    }
}
