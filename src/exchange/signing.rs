//! HMAC-SHA256 request signing shared by all three venues.
//!
//! Binance and Bybit want the MAC hex-encoded; Bitget wants it base64-encoded.
//! The secret is used as raw UTF-8 bytes in every case.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256(secret: &str, message: &str) -> Result<Vec<u8>, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Signing(format!("Invalid key length: {e}")))?;
    mac.update(message.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Lower-case hex HMAC-SHA256 (Binance `signature`, Bybit `X-BAPI-SIGN`).
pub fn sign_hex(secret: &str, message: &str) -> Result<String, ExchangeError> {
    hmac_sha256(secret, message).map(hex::encode)
}

/// Standard base64 HMAC-SHA256 (Bitget `ACCESS-SIGN`).
pub fn sign_base64(secret: &str, message: &str) -> Result<String, ExchangeError> {
    hmac_sha256(secret, message).map(|mac| BASE64_STANDARD.encode(mac))
}

/// Milliseconds since the Unix epoch, as every venue expects it.
pub fn timestamp_ms() -> String {
    Utc::now().timestamp_millis().to_string()
}
