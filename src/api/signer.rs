//! HMAC-SHA256 signing for authenticated Binance endpoints.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// API key and secret for signed requests
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    secret_key: String,
}

impl ApiCredentials {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key,
        }
    }

    /// Build credentials only when both parts are present and non-empty
    pub fn from_parts(api_key: Option<&str>, secret_key: Option<&str>) -> Option<Self> {
        match (api_key, secret_key) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(Self::new(key.to_string(), secret.to_string()))
            }
            _ => None,
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Request signer for authenticated Binance API calls
pub struct RequestSigner<'a> {
    credentials: &'a ApiCredentials,
}

impl<'a> RequestSigner<'a> {
    pub fn new(credentials: &'a ApiCredentials) -> Self {
        Self { credentials }
    }

    /// Sign a message and return the lowercase hex signature
    pub fn sign(&self, message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.credentials.secret_key().as_bytes())
            .expect("HMAC can take key of any size");

        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Build a signed query string, preserving parameter order
    ///
    /// `timestamp` is appended after the given parameters, then the whole
    /// query string is signed and `signature` appended last.
    pub fn sign_params(&self, params: &[(&str, String)], timestamp_ms: i64) -> String {
        let mut query_parts: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        query_parts.push(format!("timestamp={}", timestamp_ms));

        let query_string = query_parts.join("&");
        let signature = self.sign(&query_string);
        format!("{}&signature={}", query_string, signature)
    }
}
