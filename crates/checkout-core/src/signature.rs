//! # Webhook Signature Verification
//!
//! Stripe-style signed webhooks. The sender puts
//! `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]` in the signature header,
//! where each MAC is HMAC-SHA256 over `"<t>.<raw body>"` keyed by the shared secret.
//!
//! Verification order:
//! 1. Parse the header (`MalformedHeader`)
//! 2. Compare the computed MAC with every `v1` in constant time (`SignatureMismatch`)
//! 3. Check `|now - t| <= tolerance` (`StaleTimestamp`)
//! 4. Parse the body into a `VerifiedEvent` (`MalformedPayload`)

use crate::error::VerificationError;
use crate::event::{SignedPayload, VerifiedEvent, WebhookSecret};
use chrono::{DateTime, Utc};
use hmac::Mac;
use subtle::ConstantTimeEq;
use tracing::debug;

/// Default replay window (5 minutes), same as Stripe's libraries
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

const TIMESTAMP_KEY: &str = "t";
const SIGNATURE_SCHEME: &str = "v1";
const MAC_LEN: usize = 32;

/// Parsed components of a signature header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the payload was signed
    pub timestamp: i64,
    /// Decoded 32-byte v1 MACs, at least one
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parse `t=<timestamp>,v1=<hex>[,v1=<hex>...]`.
    ///
    /// Other schemes (`v0`, ...) are skipped.
    pub fn parse(header: &str) -> Result<Self, VerificationError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                VerificationError::MalformedHeader(format!("expected key=value, got `{}`", part))
            })?;

            match key {
                TIMESTAMP_KEY => {
                    if timestamp.is_some() {
                        return Err(VerificationError::MalformedHeader(
                            "duplicate timestamp".to_string(),
                        ));
                    }
                    let parsed = value.parse::<i64>().map_err(|_| {
                        VerificationError::MalformedHeader(format!("invalid timestamp `{}`", value))
                    })?;
                    timestamp = Some(parsed);
                }
                SIGNATURE_SCHEME => {
                    let mac = hex::decode(value).map_err(|_| {
                        VerificationError::MalformedHeader("v1 signature is not hex".to_string())
                    })?;
                    if mac.len() != MAC_LEN {
                        return Err(VerificationError::MalformedHeader(format!(
                            "v1 signature must be {} bytes, got {}",
                            MAC_LEN,
                            mac.len()
                        )));
                    }
                    signatures.push(mac);
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            VerificationError::MalformedHeader("missing timestamp".to_string())
        })?;

        if signatures.is_empty() {
            return Err(VerificationError::MalformedHeader(
                "no v1 signature found".to_string(),
            ));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

fn compute_mac(secret: &WebhookSecret, timestamp: i64, body: &[u8]) -> Vec<u8> {
    let mut mac = secret.mac();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Build a valid signature header for `body` signed at `timestamp`.
pub fn sign(secret: &WebhookSecret, timestamp: i64, body: &[u8]) -> String {
    format!(
        "t={},{}={}",
        timestamp,
        SIGNATURE_SCHEME,
        hex::encode(compute_mac(secret, timestamp, body))
    )
}

/// Verify a signed webhook against the current wall clock.
pub fn verify(
    body: &[u8],
    signature_header: &str,
    secret: &WebhookSecret,
    tolerance_secs: u64,
) -> Result<VerifiedEvent, VerificationError> {
    verify_at(body, signature_header, secret, tolerance_secs, Utc::now())
}

/// Verify a signed webhook as of `now`.
pub fn verify_at(
    body: &[u8],
    signature_header: &str,
    secret: &WebhookSecret,
    tolerance_secs: u64,
    now: DateTime<Utc>,
) -> Result<VerifiedEvent, VerificationError> {
    let header = SignatureHeader::parse(signature_header)?;

    let expected = compute_mac(secret, header.timestamp, body);
    let matched = header
        .signatures
        .iter()
        .any(|candidate| bool::from(candidate.as_slice().ct_eq(expected.as_slice())));

    if !matched {
        return Err(VerificationError::SignatureMismatch);
    }

    if now.timestamp().abs_diff(header.timestamp) > tolerance_secs {
        return Err(VerificationError::StaleTimestamp {
            timestamp: header.timestamp,
            tolerance_secs,
        });
    }

    let signed_at = DateTime::from_timestamp(header.timestamp, 0).ok_or_else(|| {
        VerificationError::MalformedHeader("timestamp out of range".to_string())
    })?;

    let event = VerifiedEvent::from_body(body, signed_at)?;
    debug!(event_type = %event.event_type(), "Verified webhook signature");
    Ok(event)
}

/// Secret and tolerance bundled once at startup
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: WebhookSecret,
    tolerance_secs: u64,
}

impl WebhookVerifier {
    /// Create a verifier with the default 5 minute tolerance
    pub fn new(secret: WebhookSecret) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Builder: set the replay window in seconds
    pub fn with_tolerance(mut self, tolerance_secs: u64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    pub fn tolerance_secs(&self) -> u64 {
        self.tolerance_secs
    }

    pub fn verify(&self, payload: &SignedPayload<'_>) -> Result<VerifiedEvent, VerificationError> {
        verify(
            payload.body,
            payload.signature_header,
            &self.secret,
            self.tolerance_secs,
        )
    }

    pub fn verify_at(
        &self,
        payload: &SignedPayload<'_>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedEvent, VerificationError> {
        verify_at(
            payload.body,
            payload.signature_header,
            &self.secret,
            self.tolerance_secs,
            now,
        )
    }

    /// Sign `body` with this verifier's secret
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> String {
        sign(&self.secret, timestamp, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    const BODY: &[u8] = br#"{"type":"payment_intent.succeeded","amount":500}"#;

    fn secret() -> WebhookSecret {
        WebhookSecret::new("whsec_test").unwrap()
    }

    #[test]
    fn test_parse_signature_header() {
        let header = format!(
            "t=1234567890,v1={},v0=ffff,v1={}",
            "ab".repeat(32),
            "cd".repeat(32)
        );
        let parsed = SignatureHeader::parse(&header).unwrap();

        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures.len(), 2);
        assert_eq!(parsed.signatures[0], vec![0xab; 32]);
        assert_eq!(parsed.signatures[1], vec![0xcd; 32]);
    }

    #[test]
    fn test_parse_rejects_malformed_headers() {
        let cases = [
            "",
            "garbage",
            "v1=abc123",
            "t=1234567890",
            "t=1234567890,v0=abc123",
            "t=notanumber,v1=abc123",
            "t=1234567890,v1=zzzz",
            "t=1,t=2,v1=abc123",
            "t=1234567890,v1=",
            "t=1234567890,v1=abc123",
        ];
        for header in cases {
            assert!(
                matches!(
                    SignatureHeader::parse(header),
                    Err(VerificationError::MalformedHeader(_))
                ),
                "header `{}` should be malformed",
                header
            );
        }
    }

    #[test]
    fn test_sign_then_verify() {
        let now = Utc::now();
        let header = sign(&secret(), now.timestamp(), BODY);

        let event = verify_at(BODY, &header, &secret(), DEFAULT_TOLERANCE_SECS, now).unwrap();

        assert_eq!(event.event_type(), "payment_intent.succeeded");
        assert_eq!(event.payload(), &json!({ "amount": 500 }));
        assert_eq!(event.timestamp().timestamp(), now.timestamp());
    }

    #[test]
    fn test_hmac_is_64_hex_chars() {
        let header = sign(&secret(), 1234567890, b"{}");
        let mac = header.split("v1=").nth(1).unwrap();
        assert_eq!(mac.len(), 64);
    }

    #[test]
    fn test_any_bit_flip_is_rejected() {
        let now = Utc::now();
        let header = sign(&secret(), now.timestamp(), BODY);

        for byte in 0..BODY.len() {
            for bit in 0..8 {
                let mut tampered = BODY.to_vec();
                tampered[byte] ^= 1 << bit;
                assert_eq!(
                    verify_at(&tampered, &header, &secret(), DEFAULT_TOLERANCE_SECS, now),
                    Err(VerificationError::SignatureMismatch)
                );
            }
        }
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let now = Utc::now();
        let other = WebhookSecret::new("whsec_other").unwrap();
        let header = sign(&other, now.timestamp(), BODY);

        assert_eq!(
            verify_at(BODY, &header, &secret(), DEFAULT_TOLERANCE_SECS, now),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let now = Utc::now();
        let valid = sign(&secret(), now.timestamp(), BODY);
        let mac = valid.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", now.timestamp(), "00".repeat(32), mac);

        assert!(verify_at(BODY, &header, &secret(), DEFAULT_TOLERANCE_SECS, now).is_ok());
    }

    #[test]
    fn test_stale_timestamp_with_valid_mac() {
        let now = Utc::now();
        let signed_at = now - Duration::seconds(DEFAULT_TOLERANCE_SECS as i64 + 1);
        let header = sign(&secret(), signed_at.timestamp(), BODY);

        assert_eq!(
            verify_at(BODY, &header, &secret(), DEFAULT_TOLERANCE_SECS, now),
            Err(VerificationError::StaleTimestamp {
                timestamp: signed_at.timestamp(),
                tolerance_secs: DEFAULT_TOLERANCE_SECS,
            })
        );
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let now = Utc::now();
        let signed_at = now - Duration::seconds(DEFAULT_TOLERANCE_SECS as i64);
        let header = sign(&secret(), signed_at.timestamp(), BODY);

        assert!(verify_at(BODY, &header, &secret(), DEFAULT_TOLERANCE_SECS, now).is_ok());
    }

    #[test]
    fn test_future_timestamp_outside_window() {
        let now = Utc::now();
        let signed_at = now + Duration::seconds(600);
        let header = sign(&secret(), signed_at.timestamp(), BODY);

        assert!(matches!(
            verify_at(BODY, &header, &secret(), DEFAULT_TOLERANCE_SECS, now),
            Err(VerificationError::StaleTimestamp { .. })
        ));
    }

    #[test]
    fn test_empty_v1_is_malformed_not_mismatch() {
        let now = Utc::now();
        let header = format!("t={},v1=", now.timestamp());

        assert!(matches!(
            verify_at(BODY, &header, &secret(), DEFAULT_TOLERANCE_SECS, now),
            Err(VerificationError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_header_checked_before_mac() {
        // Correct MAC but no timestamp: must fail on the header, not the MAC.
        let now = Utc::now();
        let valid = sign(&secret(), now.timestamp(), BODY);
        let mac_only = valid.split(',').nth(1).unwrap();

        assert!(matches!(
            verify_at(BODY, mac_only, &secret(), DEFAULT_TOLERANCE_SECS, now),
            Err(VerificationError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_signed_body_without_type() {
        let now = Utc::now();
        let body = br#"{"amount":500}"#;
        let header = sign(&secret(), now.timestamp(), body);

        assert!(matches!(
            verify_at(body, &header, &secret(), DEFAULT_TOLERANCE_SECS, now),
            Err(VerificationError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_verifier_uses_configured_tolerance() {
        let verifier = WebhookVerifier::new(secret()).with_tolerance(10);
        let now = Utc::now();
        let header = verifier.sign((now - Duration::seconds(30)).timestamp(), BODY);

        assert_eq!(verifier.tolerance_secs(), 10);
        assert!(matches!(
            verifier.verify_at(&SignedPayload::new(BODY, &header), now),
            Err(VerificationError::StaleTimestamp { .. })
        ));
    }

    #[test]
    fn test_verify_uses_wall_clock() {
        let header = sign(&secret(), Utc::now().timestamp(), BODY);
        let event = verify(BODY, &header, &secret(), DEFAULT_TOLERANCE_SECS).unwrap();
        assert_eq!(event.event_type(), "payment_intent.succeeded");
    }
}
