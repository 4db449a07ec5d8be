//! Decode error on ingress (spec §7): an undecodable payload arriving at
//! a `palm=true` ingress component must still cost exactly one broker
//! round trip and still reach the downstream sink, carrying a zero byte
//! rather than being silently dropped.

use std::sync::Arc;
use std::thread;

use palm::broker::{Broker, BrokerConfig};
use palm::cache::InMemoryCache;
use palm::domain_types::{ComponentName, MessageCap};
use palm::services;
use palm::shutdown::{LoopBudget, ShutdownSignal};
use palm::transport::{Frame, Transport};

fn name(s: &str) -> ComponentName {
    ComponentName::try_new(s.to_string()).unwrap()
}

#[test]
fn undecodable_ingress_payload_forwards_a_zero_byte_through_the_broker() {
    let transport = Arc::new(Transport::new());
    let cache = InMemoryCache::shared();
    let broker = Arc::new(Broker::new(BrokerConfig::testing()));

    let rep_to_broker = broker.register_inbound(name("in"), Some(name("out")), "log");
    let push_to_broker = broker.register_outbound(name("out"), "log");

    let (handle, shutdown) = ShutdownSignal::new();
    let budget = LoopBudget::capped(MessageCap::unbounded(), shutdown);

    let broker_handle = broker.clone();
    let broker_budget = budget.clone();
    let broker_thread = thread::spawn(move || broker_handle.start(&broker_budget));

    let ingress = services::rep_service(
        name("in"),
        "inproc://client",
        &transport,
        rep_to_broker,
        cache.clone(),
        true,
        LoopBudget::capped(MessageCap::new(1), ShutdownSignal::never()),
    );
    let egress = services::push_connection(
        name("out"),
        "inproc://consumer",
        &transport,
        push_to_broker,
        cache.clone(),
        true,
        LoopBudget::capped(MessageCap::new(1), ShutdownSignal::never()),
    );

    let ingress_thread = thread::spawn(move || ingress.start());
    let egress_thread = thread::spawn(move || egress.start());

    let client = transport.connect_duplex("inproc://client");
    let consumer = transport.bind_pull("inproc://consumer");

    // Garbage bytes that do not decode as a `PalmMessage`: the ingress is
    // `palm=true`, so `translate_to_broker` must fail here rather than
    // skip the broker round trip.
    client
        .to_peer
        .send(Frame::new(name("client"), b"not a palm message".to_vec()))
        .unwrap();

    // The ingress still performs its external reply, same as the happy
    // path — the broker round trip happened, it just carried a zero byte.
    let ack = client.from_peer.recv().unwrap();
    assert_eq!(ack.payload, b"0");

    // No stash was ever minted (decode failed before any cache.set), so
    // egress has nothing to splice against and re-emits the broker
    // payload unchanged: a bare zero byte reaches the sink.
    let delivered = consumer.recv().unwrap();
    assert_eq!(delivered.payload, b"0");

    ingress_thread.join().unwrap();
    egress_thread.join().unwrap();
    handle.trigger();
    broker_thread.join().unwrap();
}
