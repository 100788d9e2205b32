use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

#[derive(Debug, Clone)]
pub struct IntegrityMismatch {
    pub expected: String,
    pub actual: String,
}

/// Check `data` against an `algo-digest` integrity string.
///
/// The digest is normally base64 (SRI form); for sha1 entries synthesized
/// from a registry `shasum` it is hex, so both encodings are accepted. An
/// empty integrity string verifies trivially: there is nothing to check
/// against.
pub fn verify_integrity(data: &[u8], integrity: &str) -> Result<(), IntegrityMismatch> {
    if integrity.is_empty() {
        return Ok(());
    }

    let Some((algo, expected_digest)) = integrity.split_once('-') else {
        return Err(IntegrityMismatch {
            expected: integrity.to_string(),
            actual: "malformed integrity string".to_string(),
        });
    };

    let digest: Vec<u8> = match algo {
        "sha512" => Sha512::digest(data).to_vec(),
        "sha256" => Sha256::digest(data).to_vec(),
        "sha1" => Sha1::digest(data).to_vec(),
        other => {
            return Err(IntegrityMismatch {
                expected: integrity.to_string(),
                actual: format!("unsupported algorithm '{other}'"),
            });
        }
    };

    let b64 = BASE64.encode(&digest);
    if expected_digest == b64 || expected_digest.eq_ignore_ascii_case(&hex_string(&digest)) {
        Ok(())
    } else {
        Err(IntegrityMismatch {
            expected: integrity.to_string(),
            actual: format!("{algo}-{b64}"),
        })
    }
}

/// Canonical sha512 integrity string for freshly produced bytes.
#[must_use]
pub fn integrity_for(data: &[u8]) -> String {
    format!("sha512-{}", BASE64.encode(Sha512::digest(data)))
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
