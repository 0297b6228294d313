//! Webhook signature checks: HMAC-SHA256 over the raw request body.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,

    #[error("malformed signature header: {0}")]
    Malformed(&'static str),

    #[error("signature mismatch")]
    Mismatch,
}

/// Verifies a hex-encoded `HMAC-SHA256(secret, payload)`. Used by Lemon Squeezy's
/// `X-Signature` header.
pub fn verify_hex_signature(
    secret: &str,
    payload: &[u8],
    signature: Option<&str>,
) -> Result<(), SignatureError> {
    let signature = signature.map(str::trim).filter(|s| !s.is_empty());
    let signature = signature.ok_or(SignatureError::Missing)?;
    verify(secret, &[payload], signature)
}

/// Verifies a Stripe `Stripe-Signature: t=<ts>,v1=<hex>[,v1=<hex>...]` header.
/// The signed payload is `"<ts>.<raw body>"`; any matching `v1` entry passes.
pub fn verify_stripe_signature(
    secret: &str,
    payload: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;

    let mut timestamp: Option<&str> = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            signatures.push(rest);
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed("missing v1 signature"));
    }

    let prefix = format!("{timestamp}.");
    let mut last = SignatureError::Mismatch;
    for signature in signatures {
        match verify(secret, &[prefix.as_bytes(), payload], signature) {
            Ok(()) => return Ok(()),
            Err(e) => last = e,
        }
    }
    Err(last)
}

fn verify(secret: &str, parts: &[&[u8]], signature_hex: &str) -> Result<(), SignatureError> {
    let provided =
        hex::decode(signature_hex).map_err(|_| SignatureError::Malformed("signature is not hex"))?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Malformed("unusable secret"))?;
    for part in parts {
        mac.update(part);
    }
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}
