use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

/// base64url テキストのデコードに失敗した場合のエラー。
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid base64url text: {0}")]
pub struct Base64DecodeError(String);

/// base64url（URL_SAFE_NO_PAD）でエンコードする
pub fn encode_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// base64url（URL_SAFE_NO_PAD）をデコードする
///
/// - 署名ファイルや鍵ファイルを書き出す他ツールとの互換のため、
///   末尾の空白・改行とパディング `=` は取り除いてからデコードする
/// - アルファベット外の文字や途中に現れるパディングはエラーになる
pub fn decode_base64url(value: &str) -> Result<Vec<u8>, Base64DecodeError> {
    let trimmed = value.trim_end().trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| Base64DecodeError(e.to_string()))
}
