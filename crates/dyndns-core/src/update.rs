//! Update construction and delivery
//!
//! One successful run sends a single DNS UPDATE message (RFC 2136): the
//! zone section names the enclosing zone, the update section first deletes
//! every record of the hostname and then adds one address record per
//! collected address. The message is optionally signed with TSIG
//! (RFC 2845) and delivered over TCP to the zone's primary nameserver,
//! trying its endpoints in resolution order until one accepts.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use domain::base::iana::{Class, Opcode, Rcode, Rtype};
use domain::base::message::Message;
use domain::base::message_builder::MessageBuilder;
use domain::base::name::Dname;
use domain::base::rdata::UnknownRecordData;
use domain::base::record::Ttl;
use domain::rdata::tsig::Time48;
use domain::rdata::Soa;
use domain::resolv::StubResolver;
use domain::tsig::{Algorithm, ClientTransaction, Key, KeyName};
use domain::utils::base64;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::collect::AddressSet;
use crate::config::TsigConfig;
use crate::error::{DeliveryFailures, EndpointFailure, Error, Result};
use crate::family::Family;

/// Maps a configured algorithm name to the TSIG algorithm.
///
/// The known set is fixed; anything else is a configuration error reported
/// before any network traffic happens.
pub fn tsig_algorithm(name: &str) -> Result<Algorithm> {
    match name {
        "hmac-sha1" => Ok(Algorithm::Sha1),
        "hmac-sha256" => Ok(Algorithm::Sha256),
        "hmac-sha384" => Ok(Algorithm::Sha384),
        "hmac-sha512" => Ok(Algorithm::Sha512),
        other => Err(Error::config(format!(
            "unknown TSIG algorithm {:?}, known algorithms are \
             hmac-sha1, hmac-sha256, hmac-sha384, hmac-sha512",
            other
        ))),
    }
}

/// Builds the signing key from the configured TSIG material.
pub fn build_tsig_key(config: &TsigConfig) -> Result<Key> {
    let algorithm = tsig_algorithm(&config.algorithm)?;
    let secret = base64::decode::<Vec<u8>>(&config.key)
        .map_err(|e| Error::config(format!("invalid base64 in TSIG key: {}", e)))?;
    let name = KeyName::from_str(&config.keyname)
        .map_err(|e| Error::config(format!("invalid TSIG key name: {}", e)))?;
    Key::new(algorithm, &secret, name, None, None)
        .map_err(|e| Error::config(format!("unusable TSIG key: {}", e)))
}

/// Finds the nameservers responsible for a zone.
#[async_trait]
pub trait ZoneResolver: Send + Sync {
    /// The primary nameserver names from the zone's SOA records.
    async fn zone_masters(&self, zone: &Dname<Vec<u8>>) -> Result<Vec<String>>;

    /// The socket addresses a nameserver name resolves to, in resolution
    /// order.
    async fn master_endpoints(&self, master: &str) -> Result<Vec<SocketAddr>>;
}

/// Zone discovery through the system's stub resolver.
pub struct StubZoneResolver {
    resolver: StubResolver,
}

impl StubZoneResolver {
    pub fn new() -> Self {
        Self {
            resolver: StubResolver::new(),
        }
    }
}

impl Default for StubZoneResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ZoneResolver for StubZoneResolver {
    async fn zone_masters(&self, zone: &Dname<Vec<u8>>) -> Result<Vec<String>> {
        let answer = self
            .resolver
            .query((zone.clone(), Rtype::Soa))
            .await
            .map_err(|e| Error::resolution(format!("SOA query for {} failed: {}", zone, e)))?;
        let message = answer.into_message();
        if message.header().rcode() != Rcode::NoError {
            return Err(Error::resolution(format!(
                "SOA query for {} answered with {}",
                zone,
                message.header().rcode()
            )));
        }

        let answer = message
            .answer()
            .map_err(|e| Error::protocol(format!("malformed SOA answer for {}: {}", zone, e)))?;
        let mut masters = Vec::new();
        for record in answer.limit_to::<Soa<_>>() {
            let record = record.map_err(|e| {
                Error::protocol(format!("malformed SOA record for {}: {}", zone, e))
            })?;
            masters.push(record.data().mname().to_string());
        }
        Ok(masters)
    }

    async fn master_endpoints(&self, master: &str) -> Result<Vec<SocketAddr>> {
        let host = master.trim_end_matches('.');
        let endpoints: Vec<SocketAddr> = tokio::net::lookup_host((host, 53))
            .await
            .map_err(|e| Error::resolution(format!("cannot resolve nameserver {}: {}", host, e)))?
            .collect();
        if endpoints.is_empty() {
            return Err(Error::resolution(format!(
                "nameserver {} has no addresses",
                host
            )));
        }
        Ok(endpoints)
    }
}

/// One request/response exchange with a nameserver endpoint.
///
/// The request carries the two-byte length prefix of DNS over TCP; the
/// returned response is the bare message without it.
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    async fn exchange(&self, endpoint: SocketAddr, request: &[u8]) -> Result<Vec<u8>>;
}

/// DNS over TCP with a per-exchange deadline.
pub struct TcpTransport {
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl UpdateTransport for TcpTransport {
    async fn exchange(&self, endpoint: SocketAddr, request: &[u8]) -> Result<Vec<u8>> {
        let exchange = async {
            let mut stream = TcpStream::connect(endpoint).await?;
            stream.write_all(request).await?;
            let mut prefix = [0u8; 2];
            stream.read_exact(&mut prefix).await?;
            let mut response = vec![0u8; usize::from(u16::from_be_bytes(prefix))];
            stream.read_exact(&mut response).await?;
            Ok::<_, std::io::Error>(response)
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "request timed out",
            ))),
        }
    }
}

/// Builds the update message and walks the candidate endpoints until one
/// accepts it.
pub struct UpdateDispatcher {
    resolver: Box<dyn ZoneResolver>,
    transport: Box<dyn UpdateTransport>,
    ttl: Ttl,
    tsig: Option<Key>,
}

impl UpdateDispatcher {
    /// Creates a dispatcher. TSIG material is validated here, so a broken
    /// key configuration fails before any network traffic.
    pub fn new(
        resolver: Box<dyn ZoneResolver>,
        transport: Box<dyn UpdateTransport>,
        ttl: u32,
        tsig: Option<&TsigConfig>,
    ) -> Result<Self> {
        let tsig = match tsig {
            Some(config) => Some(build_tsig_key(config)?),
            None => None,
        };
        Ok(Self {
            resolver,
            transport,
            ttl: Ttl::from_secs(ttl),
            tsig,
        })
    }

    /// Publishes `addresses` under `fqdn` in `zone`.
    ///
    /// The zone must have exactly one SOA record; zero or several make the
    /// responsible server ambiguous and abort the run. Endpoints are tried
    /// in order; the first accepted response wins, and if every endpoint
    /// fails the returned error names each one with its individual reason.
    pub async fn dispatch(
        &self,
        fqdn: &Dname<Vec<u8>>,
        zone: &Dname<Vec<u8>>,
        families: &[Family],
        addresses: &AddressSet,
    ) -> Result<()> {
        let masters = self.resolver.zone_masters(zone).await?;
        if masters.len() != 1 {
            return Err(Error::resolution(format!(
                "expected exactly one SOA record for zone {}, found {}",
                zone,
                masters.len()
            )));
        }

        let (wire, transaction) = self.build_update(fqdn, zone, families, addresses)?;
        if transaction.is_some() {
            debug!(fqdn = %fqdn, "sending authenticated update");
        } else {
            debug!(fqdn = %fqdn, "sending unauthenticated update");
        }

        let mut failures = DeliveryFailures::default();
        for master in &masters {
            debug!(master = %master, zone = %zone, "delivering update");
            for endpoint in self.resolver.master_endpoints(master).await? {
                match self
                    .try_endpoint(endpoint, &wire, transaction.as_ref())
                    .await
                {
                    Ok(()) => {
                        info!(endpoint = %endpoint, fqdn = %fqdn, "update accepted");
                        return Ok(());
                    }
                    Err(err) => {
                        warn!(endpoint = %endpoint, "update attempt failed: {}", err);
                        failures.0.push(EndpointFailure {
                            endpoint,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
        Err(Error::Exhausted(failures))
    }

    /// Builds the wire form of the update, length prefix included, plus the
    /// TSIG transaction for validating responses when signing is on.
    fn build_update(
        &self,
        fqdn: &Dname<Vec<u8>>,
        zone: &Dname<Vec<u8>>,
        families: &[Family],
        addresses: &AddressSet,
    ) -> Result<(Vec<u8>, Option<ClientTransaction<&Key>>)> {
        let mut builder = MessageBuilder::new_stream_vec();
        let header = builder.header_mut();
        header.set_random_id();
        header.set_opcode(Opcode::Update);

        let mut zone_section = builder.question();
        zone_section
            .push((zone, Rtype::Soa))
            .map_err(|e| Error::protocol(format!("failed to build zone section: {}", e)))?;

        let mut update = zone_section.authority();
        // Delete every existing record of the name before adding the
        // current addresses, so stale records never linger.
        let delete_all = UnknownRecordData::from_octets(Rtype::Any, &b""[..])
            .map_err(|e| Error::protocol(format!("failed to build deletion record: {}", e)))?;
        update
            .push((fqdn, Class::Any, Ttl::from_secs(0), delete_all))
            .map_err(|e| Error::protocol(format!("failed to build deletion record: {}", e)))?;
        for family in families {
            if let Some(list) = addresses.get(family.name()) {
                for address in list {
                    family.push_record(&mut update, fqdn, self.ttl, *address)?;
                }
            }
        }

        let mut additional = update.additional();
        let transaction = match &self.tsig {
            Some(key) => Some(
                ClientTransaction::request(key, &mut additional, Time48::now())
                    .map_err(|e| Error::protocol(format!("failed to sign update: {}", e)))?,
            ),
            None => None,
        };

        Ok((
            additional.finish().as_stream_slice().to_vec(),
            transaction,
        ))
    }

    async fn try_endpoint(
        &self,
        endpoint: SocketAddr,
        request: &[u8],
        transaction: Option<&ClientTransaction<&Key>>,
    ) -> Result<()> {
        let response = self.transport.exchange(endpoint, request).await?;
        let mut message = Message::from_octets(response)
            .map_err(|_| Error::protocol("short or malformed response message"))?;
        if let Some(transaction) = transaction {
            transaction
                .answer(&mut message, Time48::now())
                .map_err(|e| Error::protocol(format!("TSIG validation failed: {}", e)))?;
        }
        let rcode = message.header().rcode();
        if rcode != Rcode::NoError {
            return Err(Error::protocol(format!(
                "server refused the update: {}",
                rcode
            )));
        }
        Ok(())
    }
}
