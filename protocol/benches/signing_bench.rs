// Signing, verification and session-crypto benchmarks for TapAuth.
//
// Covers Ed25519-over-SHA-256 signing and verification, full token issue and
// verify round trips, X25519 + HKDF session key derivation, and
// ChaCha20-Poly1305 sealing at a few payload sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tapauth_protocol::crypto::{encryption, sign, verify, CryptoEngine, SigningKeypair};
use tapauth_protocol::exchange::{PaymentProtocol, TokenRequest};

fn bench_keypair_generation(c: &mut Criterion) {
    let engine = CryptoEngine::default();
    c.bench_function("ed25519/keypair_generate", |b| {
        b.iter(|| engine.generate_signing_keypair());
    });
}

fn bench_sign_message(c: &mut Criterion) {
    let keypair = SigningKeypair::from_seed(&[7u8; 32]);
    let message = b"2500 EUR @ 891f8a2820fffff; nonce=42";

    c.bench_function("ed25519/sign_digest", |b| {
        b.iter(|| sign(&keypair, message));
    });
}

fn bench_verify_signature(c: &mut Criterion) {
    let keypair = SigningKeypair::from_seed(&[7u8; 32]);
    let message = b"2500 EUR @ 891f8a2820fffff; nonce=42";
    let signature = sign(&keypair, message);
    let public_key = keypair.public_key_bytes();

    c.bench_function("ed25519/verify_digest", |b| {
        b.iter(|| verify(&public_key, message, &signature));
    });
}

fn bench_issue_and_verify_token(c: &mut Criterion) {
    let protocol = PaymentProtocol::with_defaults();
    let payer = SigningKeypair::from_seed(&[9u8; 32]);
    let request = TokenRequest::new(2500, "EUR", "891f8a2820fffff").with_geo_auth();

    c.bench_function("token/issue", |b| {
        b.iter(|| protocol.issue_token(&payer, &request).unwrap());
    });

    // Each iteration issues a fresh nonce, so every verify runs all four stages.
    c.bench_function("token/issue_then_verify", |b| {
        let guard = protocol.replay_guard();
        b.iter(|| {
            let token = protocol.issue_token(&payer, &request).unwrap();
            protocol.verify_token(&token, &guard, Some("891f8a2820fffff"), None)
        });
    });
}

fn bench_session_key(c: &mut Criterion) {
    let engine = CryptoEngine::default();
    let alice = engine.generate_agreement_keypair();
    let bob = engine.generate_agreement_keypair();
    let bob_public = bob.public_key_bytes();

    c.bench_function("x25519/derive_session_key", |b| {
        b.iter(|| alice.derive_session_key(&bob_public, b"salt").unwrap());
    });
}

fn bench_aead(c: &mut Criterion) {
    let mut group = c.benchmark_group("chacha20poly1305/seal");
    let key = [0x42u8; 32];
    let nonce = [0x24u8; 12];

    for size in [32usize, 256, 1024, 16 * 1024] {
        let plaintext = vec![0xABu8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &plaintext, |b, pt| {
            b.iter(|| encryption::encrypt(&key, &nonce, pt).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_keypair_generation,
    bench_sign_message,
    bench_verify_signature,
    bench_issue_and_verify_token,
    bench_session_key,
    bench_aead,
);
criterion_main!(benches);
