//! Token decoding.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::{Capability, UcanError};

/// The only signature algorithm capability tokens may declare.
pub(crate) const EDDSA: &str = "EdDSA";

#[derive(Debug, Deserialize)]
pub(crate) struct Header {
    pub alg: String,
    /// UCAN version tag; its presence alone marks a capability token.
    #[serde(default)]
    pub ucv: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Payload {
    pub iss: String,
    pub aud: String,
    #[serde(default)]
    pub att: Vec<Capability>,
    #[serde(default)]
    pub exp: Option<u64>,
    #[serde(default)]
    pub nbf: Option<u64>,
    /// Proof entries: nested token strings or a root-proof object.
    #[serde(default)]
    pub prf: Vec<serde_json::Value>,
}

/// A decoded token, holding the raw segments the signature covers.
#[derive(Debug)]
pub(crate) struct DecodedToken {
    pub header: Header,
    pub payload: Payload,
    /// `header.payload` exactly as received — the bytes the issuer signed.
    pub signing_input: String,
    pub signature: Vec<u8>,
}

pub(crate) fn decode(token: &str) -> Result<DecodedToken, UcanError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(UcanError::Malformed("expected three segments".into()));
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| UcanError::Malformed(format!("header is not base64url: {e}")))?;
    let parsed_header: Header = serde_json::from_slice(&header_bytes)
        .map_err(|e| UcanError::Malformed(format!("header is not valid JSON: {e}")))?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| UcanError::Malformed(format!("payload is not base64url: {e}")))?;
    let parsed_payload: Payload = serde_json::from_slice(&payload_bytes)
        .map_err(|e| UcanError::Malformed(format!("payload is not valid JSON: {e}")))?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|e| UcanError::Malformed(format!("signature is not base64url: {e}")))?;

    Ok(DecodedToken {
        header: parsed_header,
        payload: parsed_payload,
        signing_input: format!("{header}.{payload}"),
        signature,
    })
}

/// Structural sniff distinguishing a capability token from a plain bearer
/// token, so credential dispatch can route it to the right verifier.
///
/// A capability token is three dot-separated base64url segments whose
/// header either carries a UCAN version tag or declares the EdDSA
/// algorithm.
pub fn is_capability_token(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return false;
    }
    let Ok(header_bytes) = URL_SAFE_NO_PAD.decode(segments[0]) else {
        return false;
    };
    let Ok(header) = serde_json::from_slice::<Header>(&header_bytes) else {
        return false;
    };
    header.ucv.is_some() || header.alg == EDDSA
}
