#![allow(dead_code)]

use certstore_tls::store::memory::MemoryIdentity;
use certstore_tls::{
    Certificate, Identity, PrivateKey, Store, StoreError, StoreLocation, StoreProvider,
};
use once_cell::sync::Lazy;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, SerialNumber};
use rustls::sign::SigningKey;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A generated certificate chain (leaf first) and the leaf's PKCS#8 key.
#[derive(Debug)]
pub struct Fixture {
    pub chain: Vec<Certificate>,
    pub key: PrivateKey,
}

impl Fixture {
    pub fn leaf(&self) -> &Certificate {
        &self.chain[0]
    }

    pub fn memory_identity(&self) -> MemoryIdentity {
        MemoryIdentity::from_parts(self.chain.clone(), self.key.clone()).unwrap()
    }

    pub fn chain_der(&self) -> Vec<u8> {
        self.chain
            .iter()
            .flat_map(|c| c.content().iter().copied())
            .collect()
    }
}

fn self_signed(common_name: &str) -> Fixture {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(vec![common_name.to_owned()]).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    let cert = params.self_signed(&key).unwrap();

    Fixture {
        chain: vec![Certificate::try_from(cert.der().to_vec()).unwrap()],
        key: PrivateKey::try_from(key.serialize_der()).unwrap(),
    }
}

/// Self-signed, CN and DNS SAN `test.example.local`.
pub static SERVER: Lazy<Fixture> = Lazy::new(|| self_signed("test.example.local"));

/// Self-signed, CN and DNS SAN `other.example.local`.
pub static OTHER: Lazy<Fixture> = Lazy::new(|| self_signed("other.example.local"));

/// Issuer common name of [`ISSUED`].
pub const ISSUER_CN: &str = "Example Issuing CA";

/// Serial number of [`ISSUED`], as the matcher renders it.
pub const ISSUED_SERIAL: &str = "1f2e3d";

/// `api.example.local` issued by [`ISSUER_CN`], chain `[leaf, ca]`.
pub static ISSUED: Lazy<Fixture> = Lazy::new(|| {
    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.distinguished_name.push(DnType::CommonName, ISSUER_CN);
    let ca_cert = ca_params.self_signed(&ca_key).unwrap();

    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(vec!["api.example.local".to_owned()]).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, "api.example.local");
    params.serial_number = Some(SerialNumber::from_slice(&[0x1f, 0x2e, 0x3d]));
    let cert = params.signed_by(&key, &ca_cert, &ca_key).unwrap();

    Fixture {
        chain: vec![
            Certificate::try_from(cert.der().to_vec()).unwrap(),
            Certificate::try_from(ca_cert.der().to_vec()).unwrap(),
        ],
        key: PrivateKey::try_from(key.serialize_der()).unwrap(),
    }
});

/// How a [`FakeIdentity`] answers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Behavior {
    Healthy,
    UnreadableCertificate,
    ChainFails,
    SignerFails,
    NoSigner,
    EmptyChain,
}

#[derive(Clone, Debug)]
pub struct FakeEntry {
    pub label: &'static str,
    pub fixture: &'static Fixture,
    pub behavior: Behavior,
}

pub fn healthy(label: &'static str, fixture: &'static Fixture) -> FakeEntry {
    with_behavior(label, fixture, Behavior::Healthy)
}

pub fn with_behavior(
    label: &'static str,
    fixture: &'static Fixture,
    behavior: Behavior,
) -> FakeEntry {
    FakeEntry {
        label,
        fixture,
        behavior,
    }
}

#[derive(Debug, Default)]
struct State {
    identities: Mutex<Vec<FakeEntry>>,
    fail_open: AtomicBool,
    fail_enumeration: AtomicBool,
    open_delay: Mutex<Option<Duration>>,
    open_attempts: AtomicUsize,
    opens: AtomicUsize,
    store_closes: AtomicUsize,
    identity_opens: AtomicUsize,
    identity_closes: AtomicUsize,
    closed: Mutex<Vec<&'static str>>,
}

/// Scriptable store provider that counts every handle it hands out and
/// every close it receives.
#[derive(Clone, Debug, Default)]
pub struct FakeProvider {
    state: Arc<State>,
}

impl FakeProvider {
    pub fn new(identities: Vec<FakeEntry>) -> Self {
        let provider = Self::default();
        *provider.state.identities.lock().unwrap() = identities;
        provider
    }

    pub fn fail_open(&self) {
        self.state.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn fail_enumeration(&self) {
        self.state.fail_enumeration.store(true, Ordering::SeqCst);
    }

    pub fn slow_open(&self, delay: Duration) {
        *self.state.open_delay.lock().unwrap() = Some(delay);
    }

    /// Calls to `open`, counted on entry, before any delay or failure.
    pub fn open_attempts(&self) -> usize {
        self.state.open_attempts.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn open_stores(&self) -> usize {
        self.opens() - self.state.store_closes.load(Ordering::SeqCst)
    }

    pub fn open_identities(&self) -> usize {
        self.state.identity_opens.load(Ordering::SeqCst)
            - self.state.identity_closes.load(Ordering::SeqCst)
    }

    pub fn identity_closes(&self) -> usize {
        self.state.identity_closes.load(Ordering::SeqCst)
    }

    /// Labels of closed identities, in close order. A closed store shows up
    /// as `"store"`.
    pub fn closed(&self) -> Vec<&'static str> {
        self.state.closed.lock().unwrap().clone()
    }

    /// Nothing handed out is still open.
    pub fn assert_all_closed(&self) {
        assert_eq!(self.open_stores(), 0, "stores left open");
        assert_eq!(self.open_identities(), 0, "identities left open");
    }
}

impl StoreProvider for FakeProvider {
    fn open(&self, _location: StoreLocation) -> Result<Box<dyn Store>, StoreError> {
        self.state.open_attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(StoreError::new("access denied"));
        }
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStore {
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct FakeStore {
    state: Arc<State>,
}

impl Store for FakeStore {
    fn identities(&mut self) -> Result<Vec<Box<dyn Identity>>, StoreError> {
        if self.state.fail_enumeration.load(Ordering::SeqCst) {
            return Err(StoreError::new("enumeration failed"));
        }
        let entries = self.state.identities.lock().unwrap().clone();
        Ok(entries
            .into_iter()
            .map(|entry| {
                self.state.identity_opens.fetch_add(1, Ordering::SeqCst);
                Box::new(FakeIdentity {
                    entry,
                    state: Arc::clone(&self.state),
                }) as Box<dyn Identity>
            })
            .collect())
    }

    fn close(self: Box<Self>) {
        self.state.store_closes.fetch_add(1, Ordering::SeqCst);
        self.state.closed.lock().unwrap().push("store");
    }
}

#[derive(Debug)]
struct FakeIdentity {
    entry: FakeEntry,
    state: Arc<State>,
}

impl Identity for FakeIdentity {
    fn certificate(&self) -> Result<Certificate, StoreError> {
        match self.entry.behavior {
            Behavior::UnreadableCertificate => Err(StoreError::new("certificate unreadable")),
            _ => Ok(self.entry.fixture.leaf().clone()),
        }
    }

    fn certificate_chain(&self) -> Result<Vec<Certificate>, StoreError> {
        match self.entry.behavior {
            Behavior::ChainFails => Err(StoreError::new("chain building failed")),
            Behavior::EmptyChain => Ok(Vec::new()),
            _ => Ok(self.entry.fixture.chain.clone()),
        }
    }

    fn signer(&self) -> Result<Option<Arc<dyn SigningKey>>, StoreError> {
        match self.entry.behavior {
            Behavior::SignerFails => Err(StoreError::new("key access denied")),
            Behavior::NoSigner => Ok(None),
            _ => self
                .entry
                .fixture
                .key
                .signing_key()
                .map(Some)
                .map_err(StoreError::new),
        }
    }

    fn close(self: Box<Self>) {
        self.state.identity_closes.fetch_add(1, Ordering::SeqCst);
        self.state.closed.lock().unwrap().push(self.entry.label);
    }
}
