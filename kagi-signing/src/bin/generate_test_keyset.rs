use std::env;
use std::fs;
use std::path::Path;

use kagi_signing::common::base64url::encode_base64url;
use kagi_signing::domain::key_pair::SigningKeyPair;
use kagi_signing::domain::key_type;
use kagi_signing::domain::key_version::KeyVersion;
use kagi_signing::infrastructure::keyset_reader::{private_key_to_record, public_key_to_record};
use kagi_signing::KeyTypeRegistry;

/// テスト用の keyset 一式を生成するスクリプト。
///
/// - 引数のディレクトリ（省略時 `./generated-keyset`）配下に
///   `ecdsa/`（秘密鍵 keyset）と `ecdsa.public/`（公開鍵 keyset）を書き出す。
/// - バージョン 1 は P-384、バージョン 2 は P-256 で PRIMARY。
/// - あわせてサンプルデータへの署名を `ecdsa/2.out` に base64url で書き出す。
fn main() {
    let out_dir = env::args().nth(1).unwrap_or_else(|| "generated-keyset".to_string());
    let sample_data = b"This is test data for the signing service";

    let registry = KeyTypeRegistry::new();
    let version1 = SigningKeyPair::generate(&registry, 384)
        .expect("P-384 generation should succeed")
        .with_version(KeyVersion::new(1).expect("1 is a valid version"));
    let version2 = SigningKeyPair::generate(&registry, 256)
        .expect("P-256 generation should succeed")
        .with_version(KeyVersion::new(2).expect("2 is a valid version"));

    let private_dir = Path::new(&out_dir).join("ecdsa");
    let public_dir = Path::new(&out_dir).join("ecdsa.public");
    fs::create_dir_all(&private_dir).expect("create private keyset dir");
    fs::create_dir_all(&public_dir).expect("create public keyset dir");

    write_meta(&private_dir, "SIGN_AND_VERIFY", key_type::ECDSA_PRIV);
    write_meta(&public_dir, "VERIFY", key_type::ECDSA_PUB);

    for pair in [&version1, &version2] {
        let private_record = private_key_to_record(pair).expect("generated pair has a private half");
        write_json(
            &private_dir.join(pair.version().to_string()),
            &serde_json::to_value(&private_record).expect("record serializes"),
        );
        write_json(
            &public_dir.join(pair.version().to_string()),
            &serde_json::to_value(public_key_to_record(pair)).expect("record serializes"),
        );
    }

    let envelope_bytes = version2.sign(sample_data).expect("primary key signs");
    fs::write(private_dir.join("2.out"), encode_base64url(&envelope_bytes))
        .expect("write signature sample");

    println!("keyset written under {out_dir}");
    println!("primary key hash: {}", hex(&version2.key_hash()));
}

fn write_meta(dir: &Path, purpose: &str, key_type: &str) {
    let meta = serde_json::json!({
        "name": "ecdsa",
        "purpose": purpose,
        "type": key_type,
        "encrypted": false,
        "versions": [
            { "versionNumber": 1, "status": "ACTIVE", "exportable": false },
            { "versionNumber": 2, "status": "PRIMARY", "exportable": false }
        ]
    });
    write_json(&dir.join("meta"), &meta);
}

fn write_json(path: &Path, value: &serde_json::Value) {
    let mut text = serde_json::to_string_pretty(value).expect("serialize json");
    text.push('\n');
    fs::write(path, text).expect("write json file");
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
