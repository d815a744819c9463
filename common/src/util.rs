use eyre::{Context, Result, bail};
use serde::{Deserialize, Deserializer};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Parses `4096`, `16k` or `1m` (binary multiples) into bytes
pub fn parse_size(size: &str) -> Result<u64> {
    let size = size.trim().to_lowercase();
    let (digits, multiplier) = if let Some(x) = size.strip_suffix('k') {
        (x, KIB)
    } else if let Some(x) = size.strip_suffix('m') {
        (x, MIB)
    } else {
        (size.as_str(), 1)
    };
    let value = digits
        .parse::<u64>()
        .context(format!("Parse message size: {size}"))?;
    if value == 0 {
        bail!("Message size must be positive: {size}")
    }
    value
        .checked_mul(multiplier)
        .ok_or_else(|| eyre::eyre!("Message size overflows: {size}"))
}

/// Shortest exact rendering, `2KiB`, `1MiB`, `1000B`
pub fn format_size(size: u64) -> String {
    if size >= MIB && size % MIB == 0 {
        format!("{}MiB", size / MIB)
    } else if size >= KIB && size % KIB == 0 {
        format!("{}KiB", size / KIB)
    } else {
        format!("{size}B")
    }
}

/// Tick label for a log2 axis, `2^n` on powers of two
pub fn format_power_of_two(value: f64) -> String {
    if value <= 0.0 {
        return String::new();
    }
    let exponent = value.log2();
    if (exponent - exponent.round()).abs() < 1e-9 {
        format!("2^{}", exponent.round() as i64)
    } else {
        format!("{}", value.round() as u64)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Bytes(u64),
    Text(String),
}

/// Accepts either a byte count or a [`parse_size`] string
pub fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawSize>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawSize::Bytes(0)) => Err(serde::de::Error::custom("message size must be positive")),
        Some(RawSize::Bytes(x)) => Ok(Some(x)),
        Some(RawSize::Text(x)) => parse_size(&x)
            .map(Some)
            .map_err(|err| serde::de::Error::custom(format!("{err:#}"))),
    }
}
