//! Shared mocks for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::base::iana::Rcode;
use domain::base::message::Message;
use domain::base::message_builder::MessageBuilder;
use domain::base::name::Dname;

use dyndns_core::{
    AddressSource, Config, Engine, Error, FamilyName, MemoryStateStore, Platform, PublishedState,
    Result, StateStore, UpdateDispatcher, UpdateTransport, ZoneResolver,
};

pub fn ip(text: &str) -> IpAddr {
    text.parse().unwrap()
}

pub fn ep(text: &str) -> SocketAddr {
    text.parse().unwrap()
}

/// A configuration publishing IPv4 only under a fixed hostname.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.hostname = Some("host.example.com".into());
    config.ipv6.enable = false;
    config
}

/// The state an IPv4-only run would publish.
pub fn published(hostname: &str, v4: &[&str]) -> PublishedState {
    let mut addresses = dyndns_core::AddressSet::new();
    addresses.insert_family(FamilyName::Ipv4);
    addresses.extend(FamilyName::Ipv4, v4.iter().map(|text| ip(text)));
    addresses.sort();
    PublishedState {
        hostname: hostname.into(),
        addresses,
    }
}

/// Address source backed by a fixed table.
#[derive(Default)]
pub struct MockAddressSource {
    interfaces: Vec<String>,
    table: HashMap<(String, FamilyName), Vec<IpAddr>>,
}

impl MockAddressSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_v4(mut self, interface: &str, addresses: &[&str]) -> Self {
        if !self.interfaces.iter().any(|name| name == interface) {
            self.interfaces.push(interface.to_string());
        }
        self.table.insert(
            (interface.to_string(), FamilyName::Ipv4),
            addresses.iter().map(|text| ip(text)).collect(),
        );
        self
    }
}

impl AddressSource for MockAddressSource {
    fn interfaces(&self) -> Result<Vec<String>> {
        Ok(self.interfaces.clone())
    }

    fn addresses(&self, interface: &str, family: FamilyName) -> Result<Vec<IpAddr>> {
        Ok(self
            .table
            .get(&(interface.to_string(), family))
            .cloned()
            .unwrap_or_default())
    }
}

/// Zone resolver answering from fixed lists, counting SOA queries.
#[derive(Clone)]
pub struct ScriptedResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    masters: Vec<String>,
    endpoints: Vec<SocketAddr>,
    soa_queries: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new(masters: &[&str], endpoints: &[SocketAddr]) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                masters: masters.iter().map(|name| name.to_string()).collect(),
                endpoints: endpoints.to_vec(),
                soa_queries: AtomicUsize::new(0),
            }),
        }
    }

    pub fn soa_query_count(&self) -> usize {
        self.inner.soa_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ZoneResolver for ScriptedResolver {
    async fn zone_masters(&self, _zone: &Dname<Vec<u8>>) -> Result<Vec<String>> {
        self.inner.soa_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.masters.clone())
    }

    async fn master_endpoints(&self, _master: &str) -> Result<Vec<SocketAddr>> {
        Ok(self.inner.endpoints.clone())
    }
}

/// What a scripted endpoint does with an update.
#[derive(Clone)]
pub enum Reply {
    /// Respond with NOERROR
    Accept,
    /// Respond with REFUSED
    Refuse,
    /// Fail the exchange before any response
    ConnectionError(String),
}

/// Transport answering from a per-endpoint script, recording the order of
/// attempts.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<TransportInner>,
}

#[derive(Default)]
struct TransportInner {
    replies: Mutex<HashMap<SocketAddr, Reply>>,
    attempts: Mutex<Vec<SocketAddr>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reply(&self, endpoint: SocketAddr, reply: Reply) {
        self.inner.replies.lock().unwrap().insert(endpoint, reply);
    }

    pub fn attempts(&self) -> Vec<SocketAddr> {
        self.inner.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpdateTransport for ScriptedTransport {
    async fn exchange(&self, endpoint: SocketAddr, request: &[u8]) -> Result<Vec<u8>> {
        self.inner.attempts.lock().unwrap().push(endpoint);
        let reply = self.inner.replies.lock().unwrap().get(&endpoint).cloned();
        match reply {
            Some(Reply::Accept) => Ok(reply_with_rcode(request, Rcode::NoError)),
            Some(Reply::Refuse) => Ok(reply_with_rcode(request, Rcode::Refused)),
            Some(Reply::ConnectionError(reason)) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                reason,
            ))),
            None => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no script for endpoint",
            ))),
        }
    }
}

/// Builds an empty response to `request` with the given rcode. The request
/// still carries its TCP length prefix; the response is returned without
/// one, matching the transport contract.
pub fn reply_with_rcode(request: &[u8], rcode: Rcode) -> Vec<u8> {
    let message = Message::from_octets(&request[2..]).expect("request parses");
    MessageBuilder::new_vec()
        .start_answer(&message, rcode)
        .expect("answer builds")
        .into_message()
        .into_octets()
}

/// Delegates to a shared in-memory store, so tests keep a handle on the
/// state an engine writes.
pub struct SharedStore(pub Arc<MemoryStateStore>);

#[async_trait]
impl StateStore for SharedStore {
    async fn load(&self) -> Option<PublishedState> {
        self.0.load().await
    }

    async fn save(&self, state: &PublishedState) -> Result<()> {
        self.0.save(state).await
    }

    async fn clear(&self) {
        self.0.clear().await
    }
}

/// Wires an engine over the mocks with the IPv4-only test configuration.
pub fn test_engine(
    source: MockAddressSource,
    store: Option<Box<dyn StateStore>>,
    resolver: ScriptedResolver,
    transport: ScriptedTransport,
) -> Engine {
    let dispatcher = UpdateDispatcher::new(Box::new(resolver), Box::new(transport), 300, None)
        .expect("dispatcher construction succeeds");
    Engine::new(
        &test_config(),
        Platform::Posix,
        Box::new(source),
        store,
        dispatcher,
    )
    .expect("engine construction succeeds")
}
