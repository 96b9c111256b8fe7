use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use suit_cose::{
    algorithm::{ContentAlgorithm, KeyAgreement, Prf},
    cose, decode, ecdh,
    kdf::{self, KdfContext},
    key_wrap, AsymmetricKeyPair, Curve, Encryptor,
};

// SUIT -----------------------------------------------------------------------

const RECEIVER_X: [u8; 32] = [
    0x58, 0x86, 0xCD, 0x61, 0xDD, 0x87, 0x58, 0x62, 0xE5, 0xAA, 0xA8, 0x20,
    0xE7, 0xA1, 0x52, 0x74, 0xC9, 0x68, 0xA9, 0xBC, 0x96, 0x04, 0x8D, 0xDC,
    0xAC, 0xE3, 0x2F, 0x50, 0xC3, 0x65, 0x1B, 0xA3,
];
const RECEIVER_Y: [u8; 32] = [
    0x9E, 0xED, 0x81, 0x25, 0xE9, 0x32, 0xCD, 0x60, 0xC0, 0xEA, 0xD3, 0x65,
    0x0D, 0x0A, 0x48, 0x5C, 0xF7, 0x26, 0xD3, 0x78, 0xD1, 0xB0, 0x16, 0xED,
    0x42, 0x98, 0xB2, 0x96, 0x1E, 0x25, 0x8F, 0x1B,
];
const RECEIVER_D: [u8; 32] = [
    0x60, 0xFE, 0x6D, 0xD6, 0xD8, 0x5D, 0x57, 0x40, 0xA5, 0x34, 0x9B, 0x6F,
    0x91, 0x26, 0x7E, 0xEA, 0xC5, 0xBA, 0x81, 0xB8, 0xCB, 0x53, 0xEE, 0x24,
    0x9E, 0x4B, 0x4E, 0xB1, 0x02, 0xC4, 0x76, 0xB3,
];
const SUIT_OTHER: &[u8] = b"SUIT Payload Encryption";

const ENCRYPTION_INFO: [u8; 140] = [
    0xD8, 0x60, 0x84, 0x43, 0xA1, 0x01, 0x01, 0xA1, 0x05, 0x4C, 0xF1, 0x4A,
    0xAB, 0x9D, 0x81, 0xD5, 0x1F, 0x7A, 0xD9, 0x43, 0xFE, 0x87, 0xF6, 0x81,
    0x83, 0x44, 0xA1, 0x01, 0x38, 0x1C, 0xA2, 0x04, 0x45, 0x6B, 0x69, 0x64,
    0x2D, 0x32, 0x20, 0xA4, 0x01, 0x02, 0x20, 0x01, 0x21, 0x58, 0x20, 0x51,
    0x5C, 0x3D, 0x6E, 0xB9, 0xE3, 0x96, 0xB9, 0x04, 0xD3, 0xFE, 0xCA, 0x7F,
    0x54, 0xFD, 0xCD, 0x0C, 0xC1, 0xE9, 0x97, 0xBF, 0x37, 0x5D, 0xCA, 0x51,
    0x5A, 0xD0, 0xA6, 0xC3, 0xB4, 0x03, 0x5F, 0x22, 0x58, 0x20, 0x45, 0x36,
    0xBE, 0x3A, 0x50, 0xF3, 0x18, 0xFB, 0xF9, 0xA5, 0x47, 0x59, 0x02, 0xA2,
    0x21, 0x50, 0x2B, 0xEF, 0x0D, 0x57, 0xE0, 0x8C, 0x53, 0xB2, 0xCC, 0x0A,
    0x56, 0xF1, 0x7D, 0x9F, 0x93, 0x54, 0x58, 0x18, 0xF2, 0x14, 0xEB, 0x6F,
    0x61, 0x7C, 0x5F, 0x1A, 0xE7, 0x1B, 0xE7, 0xB2, 0x09, 0x5D, 0x8C, 0x33,
    0xA0, 0xBE, 0x3D, 0xDA, 0x21, 0x55, 0xD0, 0xA7,
];
const ENCRYPTED_PAYLOAD: [u8; 46] = [
    0x75, 0x8C, 0x4B, 0x7B, 0xBA, 0xE2, 0xC4, 0xC1, 0xD4, 0x62, 0x42, 0x3E,
    0x0F, 0x0D, 0xC3, 0x16, 0x4F, 0xFA, 0x7B, 0x85, 0xBB, 0x94, 0xD4, 0xBD,
    0x6D, 0x7E, 0xD2, 0x6A, 0xB3, 0x2F, 0xEB, 0x06, 0x33, 0x85, 0xD4, 0xD3,
    0x46, 0x59, 0x27, 0xEC, 0x82, 0xCB, 0x5E, 0x19, 0x8A, 0x59,
];

fn receiver() -> AsymmetricKeyPair {
    AsymmetricKeyPair::from_components(
        Curve::P256,
        &RECEIVER_X,
        &RECEIVER_Y,
        &RECEIVER_D,
    )
    .unwrap()
}

fn context() -> KdfContext {
    KdfContext::from_name("A128KW", 128)
        .unwrap()
        .with_other(SUIT_OTHER)
}

fn suit_detailed(c: &mut Criterion) {
    let mut group = c.benchmark_group("suit_detailed");
    let receiver = receiver();
    let context = context();

    group.bench_function("parse", |b| {
        b.iter(|| cose::parse(&ENCRYPTION_INFO, 16).unwrap())
    });

    let structure = cose::parse(&ENCRYPTION_INFO, 16).unwrap();
    let recipient = &structure.recipients[0];
    let ephemeral = recipient.ephemeral_key().unwrap();
    group.bench_function("agree", |b| {
        b.iter(|| ecdh::agree(&receiver, &ephemeral).unwrap())
    });

    let secret = ecdh::agree(&receiver, &ephemeral).unwrap();
    let recipient_context = context.for_recipient(
        Prf::HmacSha256,
        &recipient.protected_bytes,
        recipient.party_u().unwrap(),
        recipient.party_v().unwrap(),
    );
    group.bench_function("derive", |b| {
        b.iter(|| kdf::derive_key(&secret, &recipient_context).unwrap())
    });

    let kek = kdf::derive_key(&secret, &recipient_context).unwrap();
    group.bench_function("unwrap", |b| {
        b.iter(|| {
            key_wrap::unwrap(kek.as_bytes(), &recipient.encrypted_key)
                .unwrap()
        })
    });

    group.finish();
}

fn suit_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("suit_full");
    let receiver = receiver();
    let context = context();

    group.bench_function("decode", |b| {
        b.iter(|| {
            decode(
                &ENCRYPTION_INFO,
                &[receiver.clone()],
                &context,
                Some(&ENCRYPTED_PAYLOAD[..]),
            )
            .unwrap()
        })
    });

    // The ephemeral key is generated anew for every encryption
    let encryptor =
        Encryptor::new(KeyAgreement::EcdhEsA128Kw, ContentAlgorithm::A128Gcm);
    group.bench_function("encrypt", |b| {
        b.iter_batched(
            || StdRng::seed_from_u64(0),
            |mut rng| {
                encryptor
                    .encrypt(&mut rng, receiver.public(), &context, &[0; 1024])
                    .unwrap()
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

// Criterion ------------------------------------------------------------------

criterion_group!(suit_benches, suit_detailed, suit_full);
criterion_main!(suit_benches);
