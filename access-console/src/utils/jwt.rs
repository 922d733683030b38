use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

/// Registered claims the console looks at. Everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct JwtClaims {
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry in epoch seconds.
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Decode JWT claims without verifying the signature.
///
/// The backend is the only party that validates tokens; the console reads
/// claims only to learn when a token it was handed will expire.
pub fn decode_jwt_claims(token: &str) -> Result<JwtClaims> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(anyhow::anyhow!("Invalid JWT format"));
    }

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| anyhow::anyhow!("Failed to decode JWT payload: {}", e))?;

    let claims: JwtClaims = serde_json::from_slice(&payload)
        .map_err(|e| anyhow::anyhow!("Failed to parse JWT claims: {}", e))?;

    Ok(claims)
}

/// Expiry of `token` in epoch milliseconds, if it is a JWT carrying `exp`.
pub fn expiry_epoch_ms(token: &str) -> Option<i64> {
    match decode_jwt_claims(token) {
        Ok(claims) => claims.exp.map(|exp| exp.saturating_mul(1000)),
        Err(e) => {
            tracing::debug!(error = %e, "Access token is not a readable JWT");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Payload: {"sub":"user_123","exp":9999999999,"iat":1736500000}
    fn token() -> String {
        let payload = general_purpose::URL_SAFE_NO_PAD
            .encode(r#"{"sub":"user_123","exp":9999999999,"iat":1736500000}"#);
        format!("eyJhbGciOiJIUzI1NiJ9.{}.signature", payload)
    }

    #[test]
    fn test_decode_jwt_claims() {
        let claims = decode_jwt_claims(&token()).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user_123"));
        assert_eq!(claims.exp, Some(9_999_999_999));
    }

    #[test]
    fn test_expiry_epoch_ms() {
        assert_eq!(expiry_epoch_ms(&token()), Some(9_999_999_999_000));
        assert_eq!(expiry_epoch_ms("opaque-token"), None);
    }
}
