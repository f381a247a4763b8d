use sha2::{Digest, Sha256};
use ulid::Ulid;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

pub fn session_id_ulid() -> String {
    format!("s_{}", Ulid::new())
}

/// Generation ids are derived from the completion so re-parsing is stable.
pub fn generation_id_from_completion(completion: &str) -> String {
    format!("g_{}", &sha256_hex(completion.as_bytes())[..32])
}

pub fn now_rfc3339_utc() -> String {
    let now = time::OffsetDateTime::now_utc();
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
