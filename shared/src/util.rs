use serde::{Deserialize, Deserializer};

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as a provisional order id.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms)
///
/// Provisional ids are only meaningful on the device that issued them; they
/// are never compared against server-assigned ids.
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Canonical string form of an entity id.
///
/// The external API is not consistent about ids: the same order may come
/// back as `17`, `"17"` or `" 017 "`. Purely numeric ids lose their leading
/// zeros, everything else is only trimmed.
pub fn canonical_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = trimmed.trim_start_matches('0');
        if stripped.is_empty() {
            "0".to_string()
        } else {
            stripped.to_string()
        }
    } else {
        trimmed.to_string()
    }
}

/// Compare two ids by canonical form
pub fn same_id(a: &str, b: &str) -> bool {
    canonical_id(a) == canonical_id(b)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Uint(u64),
}

impl RawId {
    fn into_canonical(self) -> String {
        match self {
            RawId::Text(s) => canonical_id(&s),
            RawId::Int(n) => n.to_string(),
            RawId::Uint(n) => n.to_string(),
        }
    }
}

/// Deserialize an id that may arrive as a JSON number or string
pub fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(RawId::into_canonical)
}

/// Optional variant of [`de_id`]
pub fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(RawId::into_canonical))
}
