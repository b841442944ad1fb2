//! Delivery behavior of the update dispatcher: endpoint failover order,
//! exhaustion reporting, and the single-SOA requirement.

mod common;

use common::*;
use domain::base::name::Dname;
use dyndns_core::{AddressSet, Error, Family, FamilyName, UpdateDispatcher};
use std::str::FromStr;

fn names() -> (Dname<Vec<u8>>, Dname<Vec<u8>>) {
    (
        Dname::from_str("host.example.com").unwrap(),
        Dname::from_str("example.com").unwrap(),
    )
}

fn addresses() -> AddressSet {
    let mut set = AddressSet::new();
    set.extend(FamilyName::Ipv4, [ip("10.0.0.5")]);
    set
}

fn dispatcher(resolver: &ScriptedResolver, transport: &ScriptedTransport) -> UpdateDispatcher {
    UpdateDispatcher::new(
        Box::new(resolver.clone()),
        Box::new(transport.clone()),
        300,
        None,
    )
    .expect("dispatcher construction succeeds")
}

#[tokio::test]
async fn first_accepting_endpoint_wins() {
    let endpoint = ep("192.0.2.1:53");
    let resolver = ScriptedResolver::new(&["ns1.example.com."], &[endpoint]);
    let transport = ScriptedTransport::new();
    transport.set_reply(endpoint, Reply::Accept);

    let (fqdn, zone) = names();
    dispatcher(&resolver, &transport)
        .dispatch(&fqdn, &zone, &[Family::V4], &addresses())
        .await
        .expect("dispatch succeeds");

    assert_eq!(transport.attempts(), vec![endpoint]);
}

#[tokio::test]
async fn endpoints_are_tried_in_order_until_one_accepts() {
    let first = ep("192.0.2.1:53");
    let second = ep("192.0.2.2:53");
    let third = ep("192.0.2.3:53");
    let resolver = ScriptedResolver::new(&["ns1.example.com."], &[first, second, third]);
    let transport = ScriptedTransport::new();
    transport.set_reply(first, Reply::ConnectionError("connection refused".into()));
    transport.set_reply(second, Reply::Refuse);
    transport.set_reply(third, Reply::Accept);

    let (fqdn, zone) = names();
    dispatcher(&resolver, &transport)
        .dispatch(&fqdn, &zone, &[Family::V4], &addresses())
        .await
        .expect("dispatch succeeds after failover");

    assert_eq!(transport.attempts(), vec![first, second, third]);
}

#[tokio::test]
async fn exhaustion_names_every_endpoint_with_its_reason() {
    let first = ep("192.0.2.1:53");
    let second = ep("192.0.2.2:53");
    let resolver = ScriptedResolver::new(&["ns1.example.com."], &[first, second]);
    let transport = ScriptedTransport::new();
    transport.set_reply(first, Reply::ConnectionError("connection refused".into()));
    transport.set_reply(second, Reply::Refuse);

    let (fqdn, zone) = names();
    let err = dispatcher(&resolver, &transport)
        .dispatch(&fqdn, &zone, &[Family::V4], &addresses())
        .await
        .expect_err("dispatch exhausts all endpoints");

    let text = err.to_string();
    assert!(matches!(err, Error::Exhausted(_)), "got {:?}", err);
    assert!(text.contains("192.0.2.1:53"), "missing endpoint in {}", text);
    assert!(text.contains("connection refused"), "missing reason in {}", text);
    assert!(text.contains("192.0.2.2:53"), "missing endpoint in {}", text);
    assert!(text.contains("REFUSED"), "missing rcode in {}", text);
    assert_eq!(transport.attempts(), vec![first, second]);
}

#[tokio::test]
async fn zone_without_soa_record_aborts_before_any_delivery() {
    let resolver = ScriptedResolver::new(&[], &[]);
    let transport = ScriptedTransport::new();

    let (fqdn, zone) = names();
    let err = dispatcher(&resolver, &transport)
        .dispatch(&fqdn, &zone, &[Family::V4], &addresses())
        .await
        .expect_err("dispatch aborts");

    assert!(matches!(err, Error::Resolution(_)), "got {:?}", err);
    assert!(transport.attempts().is_empty());
}

#[tokio::test]
async fn ambiguous_soa_answer_aborts_before_any_delivery() {
    let resolver = ScriptedResolver::new(
        &["ns1.example.com.", "ns2.example.com."],
        &[ep("192.0.2.1:53")],
    );
    let transport = ScriptedTransport::new();

    let (fqdn, zone) = names();
    let err = dispatcher(&resolver, &transport)
        .dispatch(&fqdn, &zone, &[Family::V4], &addresses())
        .await
        .expect_err("dispatch aborts");

    assert!(matches!(err, Error::Resolution(_)), "got {:?}", err);
    assert!(transport.attempts().is_empty());
}
