//! # Subcommand Handlers
//!
//! Each handler takes the protocol instance (and the replay guard where
//! verification happens) and returns what `main` prints. Nothing in here
//! touches stdout, which keeps every handler testable with a manual clock.
//!
//! A tap message travels as lowercase hex. The replay guard lives for one
//! process, so replays are only caught within a single invocation; a real
//! terminal keeps one guard for its whole uptime.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};

use tapauth_protocol::config::AEAD_KEY_LENGTH;
use tapauth_protocol::crypto::encryption::key_from_slice;
use tapauth_protocol::crypto::SigningKeypair;
use tapauth_protocol::exchange::{
    from_message_bytes, to_message_bytes, Challenge, PaymentProtocol, ProtocolError, Response,
    TapPayload, TokenRequest,
};
use tapauth_protocol::ndef::{TextRecord, UriRecord};
use tapauth_protocol::{PaymentToken, ReplayGuard};

use crate::cli::{
    ChallengeArgs, InspectArgs, IssueArgs, RespondArgs, TextArgs, UriArgs, VerifyArgs,
    VerifyResponseArgs,
};

// ---------------------------------------------------------------------------
// Key material
// ---------------------------------------------------------------------------

/// Fresh key material, printed by `keygen`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KeygenOutput {
    signing_seed: String,
    signing_public_key: String,
    agreement_private_key: String,
    agreement_public_key: String,
}

/// Generate a signing keypair and an agreement keypair.
pub fn keygen(protocol: &PaymentProtocol) -> Result<String> {
    let signing = protocol.engine().generate_signing_keypair();
    let agreement = protocol.engine().generate_agreement_keypair();
    tracing::info!(public_key = %signing.public_key_hex(), "generated signing keypair");

    let output = KeygenOutput {
        signing_seed: hex::encode(signing.seed_bytes()),
        signing_public_key: signing.public_key_hex(),
        agreement_private_key: hex::encode(agreement.private_key_bytes()),
        agreement_public_key: hex::encode(agreement.public_key_bytes()),
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn parse_signing_key(hex_str: &str) -> Result<SigningKeypair> {
    SigningKeypair::from_hex(hex_str).context("invalid signing key")
}

fn parse_key32(hex_str: &str, what: &str) -> Result<[u8; AEAD_KEY_LENGTH]> {
    let bytes = hex::decode(hex_str.trim()).with_context(|| format!("{what} is not valid hex"))?;
    key_from_slice(&bytes).with_context(|| format!("invalid {what}"))
}

fn parse_optional_key(
    hex_str: Option<&str>,
    what: &str,
) -> Result<Option<[u8; AEAD_KEY_LENGTH]>> {
    hex_str.map(|h| parse_key32(h, what)).transpose()
}

// ---------------------------------------------------------------------------
// Tap messages
// ---------------------------------------------------------------------------

fn decode_message(hex_str: &str) -> Result<Vec<TapPayload>> {
    let bytes = hex::decode(hex_str.trim()).context("tap message is not valid hex")?;
    let payloads = from_message_bytes(&bytes).context("failed to parse tap message")?;
    tracing::debug!(
        bytes = bytes.len(),
        records = payloads.len(),
        "tap message decoded"
    );
    Ok(payloads)
}

fn encode_message(payloads: &[TapPayload]) -> Result<String> {
    let bytes = to_message_bytes(payloads).context("failed to frame tap message")?;
    Ok(hex::encode(bytes))
}

fn first_challenge(payloads: Vec<TapPayload>) -> Result<Challenge> {
    payloads
        .into_iter()
        .find_map(|p| match p {
            TapPayload::Challenge(c) => Some(c),
            _ => None,
        })
        .context("tap message holds no challenge")
}

fn first_response(payloads: Vec<TapPayload>) -> Result<Response> {
    payloads
        .into_iter()
        .find_map(|p| match p {
            TapPayload::Response(r) => Some(r),
            _ => None,
        })
        .context("tap message holds no response")
}

/// Turn an optional decrypt attempt into `(plaintext, error)` report fields.
fn split_opened(
    opened: Option<Result<Vec<u8>, ProtocolError>>,
    what: &str,
    nonce_hex: &str,
) -> (Option<String>, Option<String>) {
    match opened {
        Some(Ok(plain)) => (Some(String::from_utf8_lossy(&plain).into_owned()), None),
        Some(Err(err)) => {
            tracing::warn!(nonce = %nonce_hex, error = %err, "accepted but {what} failed to open");
            (None, Some(err.to_string()))
        }
        None => (None, None),
    }
}

// ---------------------------------------------------------------------------
// Token flow
// ---------------------------------------------------------------------------

/// Issue a token and return the framed tap message as hex.
pub fn issue(protocol: &PaymentProtocol, args: &IssueArgs) -> Result<String> {
    let signer = parse_signing_key(&args.signing_key)?;
    let key = parse_optional_key(args.encryption_key.as_deref(), "encryption key")?;

    let mut request = TokenRequest::new(args.amount, &args.currency, &args.cell);
    if args.geo_auth {
        request = request.with_geo_auth();
    }
    if let Some(payload) = &args.payload {
        let Some(key) = key.as_ref() else {
            bail!("--payload needs --encryption-key");
        };
        request = request.with_encrypted_payload(payload.as_bytes(), key);
    }
    if args.memo {
        request = request.with_memo();
    }

    let token = protocol
        .issue_token(&signer, &request)
        .context("failed to issue token")?;
    encode_message(&[TapPayload::from(token)])
}

/// Verify every token in a tap message and report one verdict per token.
pub fn verify(
    protocol: &PaymentProtocol,
    guard: &ReplayGuard,
    args: &VerifyArgs,
) -> Result<String> {
    let key = parse_optional_key(args.decryption_key.as_deref(), "decryption key")?;
    let tokens: Vec<PaymentToken> = decode_message(&args.message)?
        .into_iter()
        .filter_map(|p| match p {
            TapPayload::Token(t) => Some(t),
            _ => None,
        })
        .collect();
    if tokens.is_empty() {
        bail!("tap message holds no payment token");
    }

    let mut reports = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let verdict =
            protocol.verify_token(token, guard, args.expected_cell.as_deref(), args.resolution);

        // The nonce is spent once accepted, so a payload that won't open
        // goes into this token's report instead of failing the command.
        let opened = match (&key, &token.encrypted_payload) {
            (Some(key), Some(_)) if verdict.is_accepted() => {
                Some(protocol.decrypt_token_payload(token, key))
            }
            _ => None,
        };
        let (payload, payload_error) = split_opened(opened, "token payload", &token.nonce_hex());

        reports.push(json!({
            "nonce": token.nonce_hex(),
            "amountMinorUnits": token.amount_minor_units,
            "currency": token.currency,
            "locationCell": token.location_cell,
            "verdict": verdict.to_string(),
            "accepted": verdict.is_accepted(),
            "payload": payload,
            "payloadError": payload_error,
        }));
    }
    Ok(serde_json::to_string_pretty(&reports)?)
}

// ---------------------------------------------------------------------------
// Challenge flow
// ---------------------------------------------------------------------------

/// Issue a challenge and return the framed tap message as hex.
pub fn challenge(protocol: &PaymentProtocol, args: &ChallengeArgs) -> Result<String> {
    let merchant_key = parse_key32(&args.merchant_key, "merchant key")?;
    let challenge = protocol.issue_challenge(
        &merchant_key,
        args.amount,
        &args.currency,
        &args.cell,
        args.memo.as_deref(),
    );

    let mut payloads = vec![TapPayload::from(challenge)];
    if let Some(uri) = &args.receipt_uri {
        payloads.push(TapPayload::Uri(UriRecord::new(uri.as_str())));
    }
    encode_message(&payloads)
}

/// Sign a response to the challenge in a tap message.
pub fn respond(protocol: &PaymentProtocol, args: &RespondArgs) -> Result<String> {
    let challenge = first_challenge(decode_message(&args.message)?)?;
    let signer = parse_signing_key(&args.signing_key)?;
    let key = parse_optional_key(args.encryption_key.as_deref(), "encryption key")?;

    let response = protocol
        .sign_response(
            &challenge,
            &signer,
            &args.cell,
            args.breadcrumb.as_deref().map(str::as_bytes),
            key.as_ref(),
        )
        .context("failed to sign response")?;
    encode_message(&[TapPayload::from(response)])
}

/// Check a response message against the challenge it answers.
pub fn verify_response(
    protocol: &PaymentProtocol,
    guard: &ReplayGuard,
    args: &VerifyResponseArgs,
) -> Result<String> {
    let challenge = first_challenge(decode_message(&args.challenge)?)?;
    let response = first_response(decode_message(&args.response)?)?;
    let key = parse_optional_key(args.decryption_key.as_deref(), "decryption key")?;

    let valid = protocol.verify_response(&challenge, &response, guard);
    let opened = match (&key, &response.encrypted_breadcrumb) {
        (Some(key), Some(_)) if valid => Some(protocol.decrypt_breadcrumb(&response, key)),
        _ => None,
    };
    let (breadcrumb, breadcrumb_error) =
        split_opened(opened, "breadcrumb", &hex::encode(challenge.nonce));

    let report = json!({
        "valid": valid,
        "userPublicKey": hex::encode(response.user_public_key),
        "userLocationCell": response.user_location_cell,
        "breadcrumb": breadcrumb,
        "breadcrumbError": breadcrumb_error,
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Decode a tap message and describe every record in it.
pub fn inspect(args: &InspectArgs) -> Result<String> {
    let described: Vec<Value> = decode_message(&args.message)?
        .iter()
        .map(describe)
        .collect();
    Ok(serde_json::to_string_pretty(&described)?)
}

/// Frame a text record, defaulting to the configured language.
pub fn text(protocol: &PaymentProtocol, args: &TextArgs) -> Result<String> {
    let language = args
        .language
        .clone()
        .unwrap_or_else(|| protocol.config().text_language.clone());
    encode_message(&[TapPayload::Text(TextRecord::new(language, args.text.as_str()))])
}

/// Frame a URI record.
pub fn uri(args: &UriArgs) -> Result<String> {
    encode_message(&[TapPayload::Uri(UriRecord::new(args.uri.as_str()))])
}

fn format_millis(millis: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(millis).map(|t| t.to_rfc3339())
}

fn describe(payload: &TapPayload) -> Value {
    match payload {
        TapPayload::Token(t) => json!({
            "kind": payload.kind(),
            "version": t.version,
            "geoAuth": t.flags.geo_auth_required(),
            "encrypted": t.flags.is_encrypted(),
            "memo": t.flags.has_memo(),
            "timestamp": t.timestamp,
            "issuedAt": format_millis(t.timestamp),
            "nonce": t.nonce_hex(),
            "signerPublicKey": hex::encode(t.signer_public_key),
            "amountMinorUnits": t.amount_minor_units,
            "currency": t.currency,
            "locationCell": t.location_cell,
            "payloadLength": t.encrypted_payload.as_ref().map(Vec::len),
        }),
        TapPayload::Challenge(c) => json!({
            "kind": payload.kind(),
            "issuedAt": format_millis(c.timestamp),
            "body": c,
        }),
        TapPayload::Response(r) => json!({ "kind": payload.kind(), "body": r }),
        TapPayload::Text(t) => json!({
            "kind": payload.kind(),
            "language": t.language,
            "text": t.text,
        }),
        TapPayload::Uri(u) => json!({ "kind": payload.kind(), "uri": u.uri }),
        TapPayload::Opaque(r) => json!({
            "kind": payload.kind(),
            "tnf": format!("{:?}", r.tnf),
            "type": hex::encode(&r.record_type),
            "id": r.id.as_ref().map(hex::encode),
            "payloadLength": r.payload.len(),
        }),
    }
}
