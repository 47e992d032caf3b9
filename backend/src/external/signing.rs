//! Request signing for the WeatherLink v2 API
//!
//! WeatherLink authenticates requests with an HMAC-SHA256 over every request
//! parameter except the signature itself, concatenated as name/value pairs in
//! name order. The `t` parameter embeds the request time, which bounds how
//! long a signature stays valid.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded WeatherLink signature for the given parameters
pub fn weatherlink_signature(api_secret: &str, params: &[(&str, String)]) -> AppResult<String> {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|_| AppError::Configuration("Failed to create HMAC".to_string()))?;
    for (name, value) in sorted {
        mac.update(name.as_bytes());
        mac.update(value.as_bytes());
    }

    Ok(hex::encode(mac.finalize().into_bytes()))
}
