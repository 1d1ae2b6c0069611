mod common;

use certstore_tls::store::memory::{MemoryIdentity, MemoryIdentityError, MemoryStoreProvider};
use certstore_tls::{CertificateCache, MatchRule, StoreLocation, StoreProvider};
use common::{ISSUED, SERVER};
use std::sync::Arc;

#[test]
fn from_der_parses_concatenated_chain() {
    let identity = MemoryIdentity::from_der(&ISSUED.chain_der(), ISSUED.key.content()).unwrap();
    assert_eq!(identity.chain(), ISSUED.chain.as_slice());
}

#[test]
fn from_der_rejects_bad_input() {
    assert_eq!(
        MemoryIdentity::from_der(&[], SERVER.key.content()).unwrap_err(),
        MemoryIdentityError::EmptyChain
    );
    assert!(matches!(
        MemoryIdentity::from_der(&SERVER.chain_der(), b"not a key"),
        Err(MemoryIdentityError::PrivateKey(_))
    ));
    assert!(matches!(
        MemoryIdentity::from_der(b"not a certificate", SERVER.key.content()),
        Err(MemoryIdentityError::Certificate(_))
    ));
}

#[test]
fn locations_are_separate() {
    let provider = MemoryStoreProvider::new();
    provider.add(StoreLocation::System, SERVER.memory_identity());

    let mut user = provider.open(StoreLocation::User).unwrap();
    assert!(user.identities().unwrap().is_empty());
    user.close();

    let mut system = provider.open(StoreLocation::System).unwrap();
    let identities = system.identities().unwrap();
    assert_eq!(identities.len(), 1);
    assert_eq!(provider.open_identities(), 1);

    for identity in identities {
        assert_eq!(&identity.certificate().unwrap(), SERVER.leaf());
        assert!(identity.signer().unwrap().is_some());
        identity.close();
    }
    system.close();

    assert_eq!(provider.opens(), 2);
    assert_eq!(provider.open_stores(), 0);
    assert_eq!(provider.open_identities(), 0);
}

#[test]
fn cleared_identities_are_gone_on_next_open() {
    let provider = MemoryStoreProvider::new();
    provider.add(StoreLocation::User, SERVER.memory_identity());
    let cache = CertificateCache::new(Arc::new(provider.clone()));
    let rule = MatchRule::ExactName("test.example.local".into());

    let (_, fingerprint) = cache.get_or_load(StoreLocation::User, &rule).unwrap();

    provider.clear(StoreLocation::User);
    assert!(cache.get_or_load(StoreLocation::User, &rule).is_err());

    // the cached entry is unaffected
    assert_eq!(cache.ref_count(&fingerprint), Some(1));
    cache.release(&fingerprint);
    assert_eq!(provider.open_stores(), 0);
    assert_eq!(provider.open_identities(), 0);
}

#[test]
fn signer_signs_with_the_leaf_key() {
    let provider = MemoryStoreProvider::new();
    provider.add(StoreLocation::User, SERVER.memory_identity());
    let cache = CertificateCache::new(Arc::new(provider));

    let (certificate, fingerprint) = cache
        .get_or_load(StoreLocation::User, &MatchRule::ExactName("test.example.local".into()))
        .unwrap();

    let certified = certificate.certified_key();
    assert_eq!(certified.key.algorithm(), rustls::SignatureAlgorithm::ECDSA);

    cache.release(&fingerprint);
}
