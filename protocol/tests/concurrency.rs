//! Concurrency tests: many terminals, one replay window.
//!
//! The double-spend scenario is a token tapped on several readers at once,
//! all sharing one guard. Exactly one of them may accept it.

use std::sync::Arc;

use tapauth_protocol::clock::ManualClock;
use tapauth_protocol::config::ProtocolConfig;
use tapauth_protocol::crypto::{CryptoEngine, SigningKeypair};
use tapauth_protocol::exchange::{PaymentProtocol, RejectReason, TokenRequest, Verdict};
use tapauth_protocol::ReplayGuard;

const NOW: i64 = 1_760_000_000_000;

fn shared() -> (Arc<PaymentProtocol>, Arc<ReplayGuard>) {
    let protocol = PaymentProtocol::new(
        CryptoEngine::seeded(42),
        Arc::new(ManualClock::new(NOW)),
        ProtocolConfig::default(),
    );
    let guard = protocol.replay_guard();
    (Arc::new(protocol), Arc::new(guard))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_double_spend_single_winner() {
    let (protocol, guard) = shared();
    let payer = SigningKeypair::from_seed(&[0x77; 32]);
    let token = Arc::new(
        protocol
            .issue_token(&payer, &TokenRequest::new(2500, "EUR", "891f8a2820fffff"))
            .expect("issue"),
    );

    let mut handles = Vec::new();
    for _ in 0..64 {
        let protocol = Arc::clone(&protocol);
        let guard = Arc::clone(&guard);
        let token = Arc::clone(&token);
        handles.push(tokio::spawn(async move {
            protocol.verify_token(&token, &guard, None, None)
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Verdict::Accepted => accepted += 1,
            Verdict::Rejected(reason) => assert_eq!(reason, RejectReason::ReplayOrBadTimestamp),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(guard.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_tokens_all_accepted() {
    let (protocol, guard) = shared();
    let payer = SigningKeypair::from_seed(&[0x78; 32]);

    let mut handles = Vec::new();
    for i in 0..32 {
        let protocol = Arc::clone(&protocol);
        let guard = Arc::clone(&guard);
        let payer = payer.clone();
        handles.push(tokio::spawn(async move {
            let token = protocol
                .issue_token(&payer, &TokenRequest::new(i, "EUR", "891f8a2820fffff"))
                .expect("issue");
            protocol.verify_token(&token, &guard, None, None)
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.expect("task panicked"), Verdict::Accepted);
    }
    assert_eq!(guard.len(), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_challenge_responses() {
    let (protocol, guard) = shared();
    let merchant = SigningKeypair::from_seed(&[0x79; 32]);
    let payer = SigningKeypair::from_seed(&[0x7A; 32]);

    let challenge = protocol.issue_challenge(&merchant.public_key_bytes(), 1, "EUR", "c", None);
    let response = protocol
        .sign_response(&challenge, &payer, "c", None, None)
        .expect("sign");
    let pair = Arc::new((challenge, response));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let protocol = Arc::clone(&protocol);
        let guard = Arc::clone(&guard);
        let pair = Arc::clone(&pair);
        handles.push(tokio::spawn(async move {
            protocol.verify_response(&pair.0, &pair.1, &guard)
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.expect("task panicked") {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
}
