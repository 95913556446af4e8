//! Webhook Signature Verification
//!
//! Implements the signing scheme the identity provider delivers with:
//! HMAC-SHA256 over `{id}.{timestamp}.{body}` keyed by a
//! `whsec_`-prefixed base64 secret, a timestamp bounded by a clock-skew
//! tolerance, and one or more space-separated `v1,<base64>` candidates
//! in the signature header. Verification must pass before the request
//! body is parsed; nothing is persisted for rejected deliveries.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::WebhookSettings;
use crate::domain::events::WebhookEnvelope;
use crate::shared::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Prefix the provider attaches to webhook signing secrets.
const SECRET_PREFIX: &str = "whsec_";

/// Signature version tag this verifier understands.
const SIGNATURE_VERSION: &str = "v1";

/// The signed headers of one delivery, already lifted out of the HTTP
/// request so this layer stays transport-free.
#[derive(Debug, Clone, Default)]
pub struct SignatureHeaders {
    /// Provider delivery id (`svix-id`)
    pub message_id: Option<String>,

    /// Signed unix-seconds timestamp, still in its raw string form
    /// because the raw bytes are part of the signed content
    pub timestamp: Option<String>,

    /// Space-separated signature candidates (`svix-signature`)
    pub signature: Option<String>,
}

/// Verifies webhook deliveries and parses their envelope.
pub trait SignatureVerifier: Send + Sync {
    /// Check the delivery's signature, then parse the body's envelope.
    ///
    /// Signature failures return `AppError::SignatureInvalid`; a body
    /// that fails envelope parsing after a valid signature returns
    /// `AppError::Validation`.
    fn verify(&self, headers: &SignatureHeaders, body: &[u8])
        -> Result<WebhookEnvelope, AppError>;
}

/// HMAC-SHA256 verifier for the provider's signing scheme.
pub struct HmacSignatureVerifier {
    signing_secret: String,
    tolerance_secs: i64,
}

impl HmacSignatureVerifier {
    /// Create a verifier from the webhook settings section.
    pub fn new(settings: &WebhookSettings) -> Self {
        Self {
            signing_secret: settings.signing_secret.clone(),
            tolerance_secs: settings.tolerance_secs,
        }
    }

    /// Decode the configured secret into raw key material.
    fn key_material(&self) -> Result<Vec<u8>, AppError> {
        let trimmed = self.signing_secret.trim();
        if trimmed.is_empty() {
            return Err(AppError::SignatureInvalid(
                "webhook signing secret is not configured".into(),
            ));
        }

        let encoded = trimmed.strip_prefix(SECRET_PREFIX).unwrap_or(trimmed);
        BASE64.decode(encoded).map_err(|_| {
            AppError::SignatureInvalid("webhook signing secret is not valid base64".into())
        })
    }

    /// Check that the signed timestamp is within the allowed skew.
    fn check_timestamp(&self, raw: &str) -> Result<(), AppError> {
        let timestamp: i64 = raw.parse().map_err(|_| {
            AppError::SignatureInvalid(format!("malformed webhook timestamp: {}", raw))
        })?;

        let skew = (Utc::now().timestamp() - timestamp).abs();
        if skew > self.tolerance_secs {
            return Err(AppError::SignatureInvalid(format!(
                "webhook timestamp outside tolerance ({}s skew, {}s allowed)",
                skew, self.tolerance_secs
            )));
        }

        Ok(())
    }

    /// Compute the expected signature over `{id}.{timestamp}.{body}`.
    fn expected_signature(
        &self,
        key: &[u8],
        message_id: &str,
        timestamp: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, AppError> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|_| AppError::SignatureInvalid("webhook signing secret is unusable".into()))?;

        mac.update(message_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);

        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl SignatureVerifier for HmacSignatureVerifier {
    fn verify(
        &self,
        headers: &SignatureHeaders,
        body: &[u8],
    ) -> Result<WebhookEnvelope, AppError> {
        let key = self.key_material()?;

        let message_id = required_header(&headers.message_id, "webhook id")?;
        let timestamp = required_header(&headers.timestamp, "webhook timestamp")?;
        let signature = required_header(&headers.signature, "webhook signature")?;

        self.check_timestamp(timestamp)?;

        let expected = self.expected_signature(&key, message_id, timestamp, body)?;

        // The header may carry several candidates, each "version,b64".
        // Only v1 entries count; comparison is constant-time.
        let mut verified = false;
        for candidate in signature.split_whitespace() {
            let Some((version, encoded)) = candidate.split_once(',') else {
                continue;
            };
            if version != SIGNATURE_VERSION {
                continue;
            }
            let Ok(decoded) = BASE64.decode(encoded) else {
                continue;
            };
            if bool::from(expected.as_slice().ct_eq(decoded.as_slice())) {
                verified = true;
            }
        }

        if !verified {
            return Err(AppError::SignatureInvalid(
                "no matching webhook signature".into(),
            ));
        }

        WebhookEnvelope::parse(body)
    }
}

fn required_header<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::SignatureInvalid(format!("missing {} header", name)))
}
