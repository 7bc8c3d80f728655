//! Walkthrough of both TapAuth flows, printed as a little story.
//!
//! A payer taps a geo-locked token on a terminal, tries to tap it again,
//! then the terminal switches to challenge/response with an encrypted
//! breadcrumb. Every message goes through the record framer, so the hex
//! dumps are exactly what would cross the NFC link.
//!
//! Run with:
//!   cargo run --example tap_flow

use tapauth_protocol::crypto::CryptoEngine;
use tapauth_protocol::exchange::{
    from_message_bytes, to_message_bytes, PaymentProtocol, TapPayload, TokenRequest,
};
use tapauth_protocol::ndef::UriRecord;

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

const CELL: &str = "891f8a2820fffff";

fn step(n: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}[{n}] {title}{RESET}");
}

fn dump(label: &str, bytes: &[u8]) {
    let hex = hex::encode(bytes);
    let shown = if hex.len() > 96 { &hex[..96] } else { hex.as_str() };
    println!("    {DIM}{label} ({} bytes): {shown}...{RESET}", bytes.len());
}

fn main() {
    let engine = CryptoEngine::default();
    let protocol = PaymentProtocol::with_defaults();
    let guard = protocol.replay_guard();

    let payer = engine.generate_signing_keypair();
    let merchant = engine.generate_signing_keypair();
    println!("{BOLD}TapAuth tap-flow demo{RESET}");
    println!("    payer    {}", payer.public_key_hex());
    println!("    merchant {}", merchant.public_key_hex());

    // --- Token flow ------------------------------------------------------

    step(1, "Payer issues a geo-locked token for 25.00 EUR");
    let token = protocol
        .issue_token(&payer, &TokenRequest::new(2500, "EUR", CELL).with_geo_auth())
        .unwrap();
    let tap = to_message_bytes(&[TapPayload::from(token)]).unwrap();
    dump("tap message", &tap);

    step(2, "Terminal verifies the tap");
    for attempt in 1..=2 {
        let payloads = from_message_bytes(&tap).unwrap();
        if let Some(TapPayload::Token(received)) = payloads.first() {
            let verdict = protocol.verify_token(received, &guard, Some(CELL), None);
            let color = if verdict.is_accepted() { GREEN } else { RED };
            println!("    attempt {attempt}: {color}{verdict}{RESET}");
        }
    }

    // --- Challenge flow --------------------------------------------------

    step(3, "Terminal issues a challenge with a receipt link");
    let challenge = protocol.issue_challenge(
        &merchant.public_key_bytes(),
        1250,
        "EUR",
        CELL,
        Some("Kiosk 3"),
    );
    let tap = to_message_bytes(&[
        TapPayload::from(challenge.clone()),
        TapPayload::Uri(UriRecord::new("https://www.tapauth.example/r/3")),
    ])
    .unwrap();
    dump("tap message", &tap);

    step(4, "Payer answers with an encrypted breadcrumb");
    let payer_dh = engine.generate_agreement_keypair();
    let merchant_dh = engine.generate_agreement_keypair();
    let key = payer_dh
        .derive_session_key(&merchant_dh.public_key_bytes(), &challenge.nonce)
        .unwrap();
    let response = protocol
        .sign_response(&challenge, &payer, CELL, Some(b"north entrance"), Some(&key))
        .unwrap();
    let tap = to_message_bytes(&[TapPayload::from(response.clone())]).unwrap();
    dump("tap message", &tap);

    step(5, "Terminal verifies and opens the breadcrumb");
    let accepted = protocol.verify_response(&challenge, &response, &guard);
    let color = if accepted { GREEN } else { RED };
    println!("    response valid: {color}{accepted}{RESET}");

    let merchant_key = merchant_dh
        .derive_session_key(&payer_dh.public_key_bytes(), &challenge.nonce)
        .unwrap();
    let crumb = protocol.decrypt_breadcrumb(&response, &merchant_key).unwrap();
    println!("    breadcrumb: {}", String::from_utf8_lossy(&crumb));

    let replay = protocol.verify_response(&challenge, &response, &guard);
    println!("    replayed response valid: {RED}{replay}{RESET}");
    println!();
}
