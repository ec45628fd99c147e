use sha2::{Digest, Sha256};
use thiserror::Error;

/// 署名ペイロード末尾とヘッダ先頭に載るフォーマットリビジョンのバイト。
pub const FORMAT_VERSION: u8 = 0;
/// ヘッダに含まれる署名鍵ハッシュの長さ。
pub const KEY_HASH_LEN: usize = 4;
/// エンベロープ先頭の固定ヘッダ長（フォーマットバージョン + 鍵ハッシュ）。
pub const HEADER_LEN: usize = 1 + KEY_HASH_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("signature envelope too short: {actual} bytes")]
    Truncated { actual: usize },
    #[error("unsupported envelope format version: {0}")]
    UnsupportedFormatVersion(u8),
}

/// 署名エンベロープの固定長ヘッダ。
///
/// - 先頭 1 バイトはフォーマットバージョン、続く 4 バイトは署名鍵の
///   公開鍵バイト列（uncompressed form）に対する SHA-256 の先頭 4 バイト。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    key_hash: [u8; KEY_HASH_LEN],
}

impl EnvelopeHeader {
    pub fn new(key_hash: [u8; KEY_HASH_LEN]) -> Self {
        Self { key_hash }
    }

    pub fn key_hash(&self) -> &[u8; KEY_HASH_LEN] {
        &self.key_hash
    }
}

/// 公開鍵バイト列から 4 バイトの鍵ハッシュを計算する。
pub fn key_hash(public_bytes: &[u8]) -> [u8; KEY_HASH_LEN] {
    let digest = Sha256::digest(public_bytes);
    let mut hash = [0u8; KEY_HASH_LEN];
    hash.copy_from_slice(&digest[..KEY_HASH_LEN]);
    hash
}

/// 署名対象のペイロードを組み立てる（データ + フォーマットバージョン 1 バイト）。
///
/// - データだけでなくフォーマットにも署名を束縛し、別フォーマットへの
///   リプレイを防ぐ。
pub fn signed_payload(data: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(data.len() + 1);
    payload.extend_from_slice(data);
    payload.push(FORMAT_VERSION);
    payload
}

/// ヘッダと生署名を連結してエンベロープを作る。
pub fn encode(header: &EnvelopeHeader, raw_signature: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + raw_signature.len());
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&header.key_hash);
    out.extend_from_slice(raw_signature);
    out
}

/// エンベロープをヘッダと生署名に分解する。
///
/// - ヘッダ長未満の入力と未知のフォーマットバージョンのみエラー
/// - 生署名部分の暗号学的な正しさはここでは判定しない
pub fn decode(bytes: &[u8]) -> Result<(EnvelopeHeader, &[u8]), EnvelopeError> {
    if bytes.len() < HEADER_LEN {
        return Err(EnvelopeError::Truncated {
            actual: bytes.len(),
        });
    }
    if bytes[0] != FORMAT_VERSION {
        return Err(EnvelopeError::UnsupportedFormatVersion(bytes[0]));
    }
    let mut hash = [0u8; KEY_HASH_LEN];
    hash.copy_from_slice(&bytes[1..HEADER_LEN]);
    Ok((EnvelopeHeader::new(hash), &bytes[HEADER_LEN..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let header = EnvelopeHeader::new([0xDE, 0xAD, 0xBE, 0xEF]);
        let raw = [0x01u8, 0x02, 0x03];

        let envelope = encode(&header, &raw);
        assert_eq!(envelope.len(), HEADER_LEN + raw.len());
        assert_eq!(envelope[0], FORMAT_VERSION);

        let (decoded_header, decoded_raw) = decode(&envelope).expect("should decode");
        assert_eq!(decoded_header, header);
        assert_eq!(decoded_raw, &raw[..]);
    }

    #[test]
    fn decode_rejects_short_input() {
        let err = decode(&[FORMAT_VERSION, 0x01]).unwrap_err();
        assert_eq!(err, EnvelopeError::Truncated { actual: 2 });
    }

    #[test]
    fn decode_rejects_unknown_format_version() {
        let err = decode(&[0x07, 0, 0, 0, 0, 1, 2]).unwrap_err();
        assert_eq!(err, EnvelopeError::UnsupportedFormatVersion(0x07));
    }

    #[test]
    fn signed_payload_appends_format_version() {
        let payload = signed_payload(b"data");
        assert_eq!(&payload[..4], b"data");
        assert_eq!(payload[4], FORMAT_VERSION);
        assert_eq!(signed_payload(b""), vec![FORMAT_VERSION]);
    }

    #[test]
    fn key_hash_is_sha256_prefix() {
        let hash = key_hash(b"public-bytes");
        let digest = Sha256::digest(b"public-bytes");
        assert_eq!(hash, digest[..KEY_HASH_LEN]);
    }
}
