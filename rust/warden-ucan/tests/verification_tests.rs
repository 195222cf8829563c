//! Integration tests for capability-token verification.
//!
//! These tests use real Ed25519 and secp256k1 key material to build valid
//! and invalid tokens, delegation links, and wallet-signed root proofs,
//! then check that `verify_invocation` handles them correctly.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, SecondsFormat, Utc};
use ed25519_dalek::Signer as _;
use ed25519_dalek::SigningKey;
use serde_json::{Value, json};
use sha3::{Digest, Keccak256};
use warden_ucan::{UcanConfig, UcanError, UcanVerifier, did, is_capability_token};

const AUDIENCE: &str = "did:web:files.example.com";

fn verifier() -> UcanVerifier {
    UcanVerifier::new(UcanConfig {
        enabled: true,
        audience: AUDIENCE.to_string(),
        resource: "webdav".to_string(),
        action: "*".to_string(),
        ..UcanConfig::default()
    })
}

/// Create a deterministic agent key from a seed byte.
fn agent(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

fn did_of(key: &SigningKey) -> String {
    did::ed25519_did(&key.verifying_key())
}

/// Create a deterministic wallet key from a seed byte.
fn wallet(seed: u8) -> k256::ecdsa::SigningKey {
    let mut bytes = [0u8; 32];
    bytes[31] = seed.max(1);
    k256::ecdsa::SigningKey::from_bytes(&bytes.into()).expect("valid scalar")
}

fn wallet_address(key: &k256::ecdsa::SigningKey) -> String {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Personal-sign `message` the way a wallet would.
fn personal_sign(key: &k256::ecdsa::SigningKey, message: &str) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()));
    hasher.update(message.as_bytes());
    let (signature, recovery_id) = key.sign_digest_recoverable(hasher).expect("signable");
    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

/// Assemble and sign a three-segment token.
fn sign_token(issuer: &SigningKey, payload: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"EdDSA","typ":"JWT","ucv":"0.9.1"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).expect("serializable"));
    let signing_input = format!("{header}.{payload}");
    let signature = issuer.sign(signing_input.as_bytes());
    format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    )
}

fn in_one_hour_ms() -> u64 {
    (Utc::now() + Duration::hours(1)).timestamp_millis() as u64
}

fn rfc3339_in(hours: i64) -> String {
    (Utc::now() + Duration::hours(hours)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A wallet-signed root proof delegating to `audience`, with the statement
/// block carried inside the signed message.
fn root_proof(wallet: &k256::ecdsa::SigningKey, audience: &str, capabilities: &str) -> Value {
    root_proof_expiring(wallet, audience, capabilities, &rfc3339_in(2))
}

fn root_proof_expiring(
    wallet: &k256::ecdsa::SigningKey,
    audience: &str,
    capabilities: &str,
    expires: &str,
) -> Value {
    let message = format!(
        "I am granting access to my file space.\n\n\
         Audience: {audience}\n\
         Capabilities: {capabilities}\n\
         Expiration Time: {expires}\n"
    );
    let signature = personal_sign(wallet, &message);
    json!({
        "typ": "siwe",
        "iss": format!("did:pkh:eth:{}", wallet_address(wallet)),
        "msg": message,
        "sig": signature,
    })
}

// =============================================================================
// Happy paths
// =============================================================================

#[test]
fn test_valid_token_with_wallet_root() {
    let owner = wallet(1);
    let operator = agent(2);

    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [root_proof(&owner, &did_of(&operator), "webdav#read")],
        }),
    );

    assert!(is_capability_token(&token));
    let address = verifier().verify_invocation(&token).expect("valid token");
    assert_eq!(address, wallet_address(&owner));
}

#[test]
fn test_valid_two_link_delegation_chain() {
    let owner = wallet(3);
    let first = agent(4);
    let second = agent(5);

    // owner -> first (root proof), first -> second (token), second invokes.
    let delegation = sign_token(
        &first,
        json!({
            "iss": did_of(&first),
            "aud": did_of(&second),
            "att": [{"with": "webdav", "can": "*"}],
            "exp": in_one_hour_ms() + 60_000,
            "prf": [root_proof(&owner, &did_of(&first), "webdav#*")],
        }),
    );
    let invocation = sign_token(
        &second,
        json!({
            "iss": did_of(&second),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [delegation],
        }),
    );

    let address = verifier()
        .verify_invocation(&invocation)
        .expect("valid chain");
    assert_eq!(address, wallet_address(&owner));
}

#[test]
fn test_proofless_link_continues_through_siblings() {
    let owner = wallet(6);
    let first = agent(7);
    let second = agent(8);

    // The middle delegation carries no proofs of its own; the root proof
    // rides alongside it in the invocation's own proof list.
    let delegation = sign_token(
        &first,
        json!({
            "iss": did_of(&first),
            "aud": did_of(&second),
            "att": [{"with": "webdav", "can": "*"}],
            "exp": in_one_hour_ms() + 60_000,
        }),
    );
    let invocation = sign_token(
        &second,
        json!({
            "iss": did_of(&second),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [delegation, root_proof(&owner, &did_of(&first), "webdav#*")],
        }),
    );

    let address = verifier()
        .verify_invocation(&invocation)
        .expect("valid chain");
    assert_eq!(address, wallet_address(&owner));
}

#[test]
fn test_second_precision_expiry_is_tolerated() {
    let owner = wallet(9);
    let operator = agent(10);

    let exp_secs = (Utc::now() + Duration::hours(1)).timestamp() as u64;
    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": exp_secs,
            "prf": [root_proof(&owner, &did_of(&operator), "webdav#read")],
        }),
    );

    verifier().verify_invocation(&token).expect("seconds are fine");
}

#[test]
fn test_app_scope_extraction() {
    let operator = agent(11);
    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [
                {"with": "app:dapp.example.com", "can": "write"},
                {"with": "app:*", "can": "read"},
                {"with": "webdav", "can": "read"},
            ],
            "exp": in_one_hour_ms(),
        }),
    );

    let scope = verifier().extract_app_scope(&token).expect("decodable");
    assert!(scope.has_app_capabilities);
    assert!(scope.actions_for("dapp.example.com").unwrap().contains("write"));
    assert_eq!(scope.invalid, vec!["app:*#read".to_string()]);
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn test_empty_proof_list_is_always_rejected() {
    let operator = agent(12);
    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [],
        }),
    );

    assert!(matches!(
        verifier().verify_invocation(&token),
        Err(UcanError::ProofChainInvalid(_))
    ));
}

#[test]
fn test_audience_mismatch_is_rejected() {
    let owner = wallet(13);
    let operator = agent(14);
    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": "did:web:somewhere-else.example",
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [root_proof(&owner, &did_of(&operator), "webdav#read")],
        }),
    );

    assert!(matches!(
        verifier().verify_invocation(&token),
        Err(UcanError::AudienceMismatch { .. })
    ));
}

#[test]
fn test_root_proof_addressed_to_the_wrong_agent() {
    let owner = wallet(15);
    let operator = agent(16);
    let stranger = agent(17);

    // Root proof delegates to `stranger`, but `operator` presents it.
    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [root_proof(&owner, &did_of(&stranger), "webdav#read")],
        }),
    );

    assert!(matches!(
        verifier().verify_invocation(&token),
        Err(UcanError::AudienceMismatch { .. })
    ));
}

#[test]
fn test_expired_token_is_rejected() {
    let owner = wallet(18);
    let operator = agent(19);
    let expired = (Utc::now() - Duration::hours(1)).timestamp_millis() as u64;
    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": expired,
            "prf": [root_proof(&owner, &did_of(&operator), "webdav#read")],
        }),
    );

    assert!(matches!(
        verifier().verify_invocation(&token),
        Err(UcanError::Expired)
    ));
}

#[test]
fn test_insufficient_capabilities_are_rejected() {
    let owner = wallet(20);
    let operator = agent(21);
    // The verifier requires webdav#*; the token only grants mail access.
    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "mailto:me@example.com", "can": "send"}],
            "exp": in_one_hour_ms(),
            "prf": [root_proof(&owner, &did_of(&operator), "mailto:me@example.com#send")],
        }),
    );

    assert!(matches!(
        verifier().verify_invocation(&token),
        Err(UcanError::CapabilityDenied(_))
    ));
}

#[test]
fn test_proof_expiring_before_the_token_is_rejected() {
    let owner = wallet(22);
    let first = agent(23);
    let second = agent(24);

    // Delegation expires an hour before the invocation does.
    let delegation = sign_token(
        &first,
        json!({
            "iss": did_of(&first),
            "aud": did_of(&second),
            "att": [{"with": "webdav", "can": "*"}],
            "exp": (Utc::now() + Duration::minutes(10)).timestamp_millis() as u64,
            "prf": [root_proof(&owner, &did_of(&first), "webdav#*")],
        }),
    );
    let invocation = sign_token(
        &second,
        json!({
            "iss": did_of(&second),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [delegation],
        }),
    );

    assert!(matches!(
        verifier().verify_invocation(&invocation),
        Err(UcanError::ProofChainInvalid(_))
    ));
}

#[test]
fn test_tampered_signature_is_rejected() {
    let owner = wallet(25);
    let operator = agent(26);
    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [root_proof(&owner, &did_of(&operator), "webdav#read")],
        }),
    );

    // Re-sign the same payload with a different key: structure intact,
    // signature no longer the issuer's.
    let parts: Vec<&str> = token.split('.').collect();
    let forged_sig = agent(27).sign(format!("{}.{}", parts[0], parts[1]).as_bytes());
    let forged = format!(
        "{}.{}.{}",
        parts[0],
        parts[1],
        URL_SAFE_NO_PAD.encode(forged_sig.to_bytes())
    );

    assert!(matches!(
        verifier().verify_invocation(&forged),
        Err(UcanError::InvalidSignature(_))
    ));
}

#[test]
fn test_foreign_algorithm_is_rejected() {
    let operator = agent(28);
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT","ucv":"0.9.1"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(&json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [],
        }))
        .unwrap(),
    );
    let token = format!("{header}.{payload}.{}", URL_SAFE_NO_PAD.encode([0u8; 64]));

    assert!(matches!(
        verifier().verify_invocation(&token),
        Err(UcanError::UnsupportedAlgorithm(_))
    ));
}

#[test]
fn test_root_proof_signed_by_the_wrong_wallet() {
    let owner = wallet(29);
    let impostor = wallet(30);
    let operator = agent(31);

    // Claim the owner's DID but sign with a different wallet.
    let mut proof = root_proof(&impostor, &did_of(&operator), "webdav#read");
    proof["iss"] = json!(format!("did:pkh:eth:{}", wallet_address(&owner)));

    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [proof],
        }),
    );

    assert!(matches!(
        verifier().verify_invocation(&token),
        Err(UcanError::InvalidSignature(_))
    ));
}

#[test]
fn test_non_ethereum_root_issuer_is_rejected() {
    let operator = agent(32);
    let other = agent(33);

    let mut proof = root_proof(&wallet(34), &did_of(&operator), "webdav#read");
    proof["iss"] = json!(did_of(&other));

    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": [proof],
        }),
    );

    assert!(matches!(
        verifier().verify_invocation(&token),
        Err(UcanError::NotEthereumDid(_))
    ));
}

#[test]
fn test_expired_root_proof_is_rejected() {
    let owner = wallet(35);
    let operator = agent(36);
    let proof = root_proof_expiring(
        &owner,
        &did_of(&operator),
        "webdav#read",
        &rfc3339_in(-1),
    );

    let token = sign_token(
        &operator,
        json!({
            "iss": did_of(&operator),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            // The invocation itself is still live.
            "exp": in_one_hour_ms(),
            "prf": [proof],
        }),
    );

    assert!(matches!(
        verifier().verify_invocation(&token),
        Err(UcanError::Expired)
    ));
}

#[test]
fn test_overlong_chain_is_rejected() {
    let owner = wallet(37);

    // A flat chain of nine proofless delegations plus the root: one past
    // the depth bound. Every link shares one expiry so only the depth can
    // fail.
    let agents: Vec<SigningKey> = (40..50).map(agent).collect();
    let link_expiry = in_one_hour_ms() + 3_600_000;
    let mut proofs: Vec<Value> = Vec::new();
    for pair in agents.windows(2) {
        let delegation = sign_token(
            &pair[0],
            json!({
                "iss": did_of(&pair[0]),
                "aud": did_of(&pair[1]),
                "att": [{"with": "webdav", "can": "*"}],
                "exp": link_expiry,
            }),
        );
        proofs.insert(0, Value::String(delegation));
    }
    proofs.push(root_proof(&owner, &did_of(&agents[0]), "webdav#*"));

    let last = agents.last().unwrap();
    let invocation = sign_token(
        last,
        json!({
            "iss": did_of(last),
            "aud": AUDIENCE,
            "att": [{"with": "webdav", "can": "read"}],
            "exp": in_one_hour_ms(),
            "prf": proofs,
        }),
    );

    assert!(matches!(
        verifier().verify_invocation(&invocation),
        Err(UcanError::ProofChainInvalid(_))
    ));
}
