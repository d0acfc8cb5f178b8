//! Integration tests for the full signing workflow against the in-memory store.

use firma_pki::{
    AuthorizationOutcome,
    Error,
    HashAlgorithm,
    MemorySlot,
    MemoryStore,
    SelectionRule,
    SignatureAlgorithm,
    SignatureScheme,
    SigningRequest,
    SigningService,
    codec,
    filter,
    signer,
    store,
};
use rsa::{
    RsaPrivateKey,
    pkcs1v15::{Signature, VerifyingKey},
    signature::Verifier,
};
use rstest::{fixture, rstest};
use sha2::Sha256;
use testresult::TestResult;

/// Payload signed by every test in this suite.
pub static PAYLOAD: &[u8] = b"Prueba de firma con DNIe";

#[fixture]
fn signing_key() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("RSA key generation works")
}

/// The rule used by a DNIe deployment: national issuer plus signing certificate class.
fn dnie_rule() -> SelectionRule {
    SelectionRule::new()
        .issuer_contains("RENIEC")
        .subject_contains(" FIR ")
}

/// A store with a non-matching machine certificate and a matching DNIe signing certificate.
fn dnie_store(signing_key: RsaPrivateKey, authorization: AuthorizationOutcome) -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert(MemorySlot::new(
        "other".parse().unwrap(),
        "CN=Some Machine",
        "CN=Other CA",
        RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("RSA key generation works"),
    ));
    store.insert(
        MemorySlot::new(
            "dnie-sign".parse().unwrap(),
            "CN=Jane Doe FIR Signing",
            "CN=RENIEC ECEP",
            signing_key,
        )
        .with_authorization(authorization),
    );
    store
}

#[rstest]
fn end_to_end_signing(signing_key: RsaPrivateKey) -> TestResult {
    let verifying_key: VerifyingKey<Sha256> = VerifyingKey::new(signing_key.to_public_key());
    let store = dnie_store(signing_key, AuthorizationOutcome::Granted);

    let request = SigningRequest::new(PAYLOAD.to_vec()).with_rule(dnie_rule());
    let outcome = SigningService::new(&store).sign(&request)?;

    // the matching entry was selected and its key acquired exactly once
    assert_eq!(outcome.alias().as_ref(), "dnie-sign");
    assert_eq!(outcome.subject_name(), "CN=Jane Doe FIR Signing");
    assert_eq!(store.acquisitions(), 1);

    // the encoded signature is non-empty, decodes back to the raw bytes and verifies
    assert!(!outcome.signature().is_empty());
    let raw = codec::decode(outcome.signature())?;
    let signature = Signature::try_from(raw.as_slice())?;
    verifying_key.verify(PAYLOAD, &signature)?;
    Ok(())
}

#[rstest]
fn signing_is_deterministic_for_a_fixed_store(signing_key: RsaPrivateKey) -> TestResult {
    let store = dnie_store(signing_key, AuthorizationOutcome::Granted);
    let request = SigningRequest::new(PAYLOAD.to_vec()).with_rule(dnie_rule());
    let service = SigningService::new(&store);

    // PKCS#1 v1.5 is deterministic, so repeated runs yield the identical encoding
    let first = service.sign(&request)?;
    let second = service.sign(&request)?;
    assert_eq!(first, second);
    Ok(())
}

#[rstest]
fn cancelled_authorization_fails_without_retry(signing_key: RsaPrivateKey) -> TestResult {
    let store = dnie_store(signing_key, AuthorizationOutcome::Cancelled);

    let request = SigningRequest::new(PAYLOAD.to_vec()).with_rule(dnie_rule());
    let result = SigningService::new(&store).sign(&request);

    assert!(matches!(
        result,
        Err(Error::Store(store::Error::AccessCancelled { .. }))
    ));
    // no second acquisition is attempted
    assert_eq!(store.acquisitions(), 1);
    Ok(())
}

#[rstest]
fn denied_authorization_is_distinguishable(signing_key: RsaPrivateKey) -> TestResult {
    let store = dnie_store(signing_key, AuthorizationOutcome::Denied);

    let request = SigningRequest::new(PAYLOAD.to_vec()).with_rule(dnie_rule());
    let result = SigningService::new(&store).sign(&request);

    assert!(matches!(
        result,
        Err(Error::Store(store::Error::AccessDenied { .. }))
    ));
    Ok(())
}

#[rstest]
fn no_match_is_an_error_not_empty_success(signing_key: RsaPrivateKey) -> TestResult {
    let store = dnie_store(signing_key, AuthorizationOutcome::Granted);

    let request = SigningRequest::new(PAYLOAD.to_vec())
        .with_rule(SelectionRule::new().issuer_contains("CN=Nonexistent CA"));
    let result = SigningService::new(&store).sign(&request);

    assert!(matches!(
        result,
        Err(Error::Filter(filter::Error::NoMatch { .. }))
    ));
    // filtering never touched a private key
    assert_eq!(store.acquisitions(), 0);
    Ok(())
}

#[rstest]
fn unparsable_slot_is_skipped_not_fatal(signing_key: RsaPrivateKey) -> TestResult {
    let mut store = MemoryStore::new();
    store.insert(MemorySlot::unparsable("scrap".parse()?));
    store.insert(MemorySlot::new(
        "dnie-sign".parse()?,
        "CN=Jane Doe FIR Signing",
        "CN=RENIEC ECEP",
        signing_key,
    ));

    let request = SigningRequest::new(PAYLOAD.to_vec()).with_rule(dnie_rule());
    let outcome = SigningService::new(&store).sign(&request)?;

    assert_eq!(outcome.alias().as_ref(), "dnie-sign");
    Ok(())
}

#[rstest]
fn unavailable_store_is_distinguishable_from_no_match(signing_key: RsaPrivateKey) -> TestResult {
    let store = dnie_store(signing_key, AuthorizationOutcome::Granted);
    store.set_available(false);

    let request = SigningRequest::new(PAYLOAD.to_vec()).with_rule(dnie_rule());
    let result = SigningService::new(&store).sign(&request);

    assert!(matches!(
        result,
        Err(Error::Store(store::Error::Unavailable { .. }))
    ));
    Ok(())
}

#[rstest]
fn oversized_payload_is_rejected_before_the_store_is_touched(
    signing_key: RsaPrivateKey,
) -> TestResult {
    let store = dnie_store(signing_key, AuthorizationOutcome::Granted);

    let request = SigningRequest::new(vec![0; 1024])
        .with_rule(dnie_rule())
        .with_max_payload_size(512);
    let result = SigningService::new(&store).sign(&request);

    assert!(matches!(
        result,
        Err(Error::Signer(signer::Error::PayloadTooLarge { size: 1024, max: 512 }))
    ));
    assert_eq!(store.acquisitions(), 0);
    Ok(())
}

#[rstest]
#[case(HashAlgorithm::Sha1)]
#[case(HashAlgorithm::Sha384)]
#[case(HashAlgorithm::Sha512)]
fn alternative_hash_algorithms_sign_and_decode(
    signing_key: RsaPrivateKey,
    #[case] hash: HashAlgorithm,
) -> TestResult {
    let store = dnie_store(signing_key, AuthorizationOutcome::Granted);

    let request = SigningRequest::new(PAYLOAD.to_vec())
        .with_rule(dnie_rule())
        .with_algorithm(SignatureAlgorithm::new(hash, SignatureScheme::RsaPkcs1));
    let outcome = SigningService::new(&store).sign(&request)?;

    // a 2048 bit RSA key yields a 256 byte signature regardless of the digest
    assert_eq!(codec::decode(outcome.signature())?.len(), 256);
    Ok(())
}

#[rstest]
fn empty_payload_is_signable(signing_key: RsaPrivateKey) -> TestResult {
    let store = dnie_store(signing_key, AuthorizationOutcome::Granted);

    let request = SigningRequest::new(Vec::new()).with_rule(dnie_rule());
    let outcome = SigningService::new(&store).sign(&request)?;

    assert!(!outcome.signature().is_empty());
    Ok(())
}
