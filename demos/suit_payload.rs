use rand::thread_rng;

use suit_cose::{
    algorithm::{ContentAlgorithm, KeyAgreement, SymmetricAlgorithm},
    cose,
    kdf::KdfContext,
    AsymmetricKeyPair, Curve, Decoder, DecoderConfig, Encryptor,
};

fn main() {
    let mut rng = thread_rng();

    // Device -----------------------------------------------------------------

    // The device's static key pair, whose public half the author knows
    let device = AsymmetricKeyPair::generate(Curve::P256, &mut rng)
        .with_kid(b"device-1");
    // Both sides agree on the KDF context out of band
    let context = KdfContext::new(SymmetricAlgorithm::A128Kw, 128)
        .with_other(b"SUIT Payload Encryption");
    // The manifest digest binds the payload to the manifest
    let manifest_digest = b"manifest digest";

    // Author -----------------------------------------------------------------

    let firmware = b"This is a real firmware image.";
    let encrypted =
        Encryptor::new(KeyAgreement::EcdhEsA128Kw, ContentAlgorithm::A128Gcm)
            .with_kid(b"device-1")
            .with_detached(true)
            .with_external_aad(manifest_digest)
            .encrypt(&mut rng, device.public(), &context, firmware)
            .unwrap();
    let payload = encrypted.detached.unwrap();
    println!(
        "SUIT_Encryption_Info ({} bytes): {:02X?}",
        encrypted.structure.len(),
        encrypted.structure
    );
    println!("Encrypted payload: {} bytes", payload.len());

    // Device -----------------------------------------------------------------

    // Take a look at what was received
    let structure = cose::parse(&encrypted.structure, 16).unwrap();
    let recipient = &structure.recipients[0];
    println!(
        "Content algorithm {:?}, key agreement {:?} for {:?}",
        structure.content_algorithm().unwrap(),
        recipient.algorithm().unwrap(),
        recipient.kid().unwrap().map(String::from_utf8_lossy)
    );

    let decoder = Decoder::new(
        DecoderConfig::default()
            .with_external_aad(manifest_digest)
            .with_max_recipients(4),
    );
    let plaintext = decoder
        .decode(&encrypted.structure, &[device], &context, Some(&payload[..]))
        .unwrap();
    assert_eq!(&firmware[..], &plaintext[..]);
    println!("Decrypted: {}", String::from_utf8_lossy(&plaintext));
}
