//! Webhook signature scheme
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`.
//! The HMAC-SHA256 is computed over `"{t}." + raw body`. Several `v1` entries
//! are accepted so the provider can roll its secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{PaymentError, PaymentResult};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Payment-Signature";

#[derive(Clone)]
pub struct SignatureVerifier {
    mac: HmacSha256,
    tolerance_secs: i64,
}

struct ParsedHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Option<ParsedHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let (key, value) = part.trim().split_once('=')?;
        match key {
            "t" => timestamp = Some(value.parse::<i64>().ok()?),
            "v1" => signatures.push(hex::decode(value).ok()?),
            _ => {}
        }
    }
    if signatures.is_empty() {
        return None;
    }
    Some(ParsedHeader {
        timestamp: timestamp?,
        signatures,
    })
}

impl SignatureVerifier {
    pub fn new(secret: &str, tolerance_secs: i64) -> PaymentResult<Self> {
        if secret.is_empty() {
            return Err(PaymentError::Configuration(
                "webhook secret must not be empty".into(),
            ));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| PaymentError::Configuration(format!("webhook secret: {}", e)))?;
        Ok(Self {
            mac,
            tolerance_secs,
        })
    }

    fn signed_mac(&self, timestamp: i64, payload: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    }

    /// Header value for `payload` signed at `timestamp`
    pub fn sign(&self, timestamp: i64, payload: &[u8]) -> String {
        let digest = self.signed_mac(timestamp, payload).finalize().into_bytes();
        format!("t={},v1={}", timestamp, hex::encode(digest))
    }

    /// Check the header against the raw payload. Comparison is constant-time.
    pub fn verify(&self, header: Option<&str>, payload: &[u8], now: i64) -> PaymentResult<()> {
        let header = header
            .ok_or_else(|| PaymentError::SignatureVerification("missing signature header".into()))?;
        let parsed = parse_header(header)
            .ok_or_else(|| PaymentError::SignatureVerification("malformed signature header".into()))?;

        let tolerance = u64::try_from(self.tolerance_secs).unwrap_or(0);
        if now.abs_diff(parsed.timestamp) > tolerance {
            return Err(PaymentError::SignatureVerification(format!(
                "timestamp {} outside tolerance",
                parsed.timestamp
            )));
        }

        let matched = parsed.signatures.iter().any(|candidate| {
            self.signed_mac(parsed.timestamp, payload)
                .verify_slice(candidate)
                .is_ok()
        });
        if matched {
            Ok(())
        } else {
            Err(PaymentError::SignatureVerification(
                "no matching v1 signature".into(),
            ))
        }
    }
}
