//! S5 — `CacheService` reachable over a bound `Transport` duplex: set,
//! get (hit and miss), and delete.

use std::sync::Arc;
use std::thread;

use palm::cache::InMemoryCache;
use palm::cache_service::CacheService;
use palm::domain_types::{ComponentName, MessageCap};
use palm::shutdown::{LoopBudget, ShutdownSignal};
use palm::transport::{Frame, Transport};
use palm::wire::PalmMessage;

fn name(s: &str) -> ComponentName {
    ComponentName::try_new(s.to_string()).unwrap()
}

fn msg(function: &str, payload: &[u8], cache: Option<&str>) -> PalmMessage {
    PalmMessage {
        client: String::new(),
        pipeline: "p".into(),
        function: function.into(),
        stage: 0,
        payload: payload.to_vec(),
        cache: cache.map(str::to_string),
    }
}

#[test]
fn set_get_delete_round_trip_over_a_bound_transport() {
    let transport = Arc::new(Transport::new());
    let cache = InMemoryCache::shared();
    let service = CacheService::new(
        name("db"),
        transport.bind_duplex("inproc://db"),
        cache,
        LoopBudget::capped(MessageCap::new(3), ShutdownSignal::never()),
    );
    let client = transport.connect_duplex("inproc://db");

    client
        .to_peer
        .send(Frame::new(name("client"), msg("db.set", b"v", Some("k")).to_bytes().unwrap()))
        .unwrap();
    client
        .to_peer
        .send(Frame::new(name("client"), msg("db.get", b"k", None).to_bytes().unwrap()))
        .unwrap();
    client
        .to_peer
        .send(Frame::new(name("client"), msg("db.delete", b"k", None).to_bytes().unwrap()))
        .unwrap();

    thread::spawn(move || service.start()).join().unwrap();

    assert_eq!(client.from_peer.recv().unwrap().payload, b"k");
    assert_eq!(client.from_peer.recv().unwrap().payload, b"v");
    assert_eq!(client.from_peer.recv().unwrap().payload, b"k");
}

#[test]
fn get_after_delete_misses_with_empty_sentinel() {
    let transport = Arc::new(Transport::new());
    let cache = InMemoryCache::shared();
    let service = CacheService::new(
        name("db"),
        transport.bind_duplex("inproc://db2"),
        cache,
        LoopBudget::capped(MessageCap::new(3), ShutdownSignal::never()),
    );
    let client = transport.connect_duplex("inproc://db2");

    client
        .to_peer
        .send(Frame::new(name("client"), msg("db.set", b"v", Some("k")).to_bytes().unwrap()))
        .unwrap();
    client
        .to_peer
        .send(Frame::new(name("client"), msg("db.delete", b"k", None).to_bytes().unwrap()))
        .unwrap();
    client
        .to_peer
        .send(Frame::new(name("client"), msg("db.get", b"k", None).to_bytes().unwrap()))
        .unwrap();

    thread::spawn(move || service.start()).join().unwrap();

    let _set_reply = client.from_peer.recv().unwrap();
    let _delete_reply = client.from_peer.recv().unwrap();
    let get_reply = client.from_peer.recv().unwrap();
    assert!(get_reply.payload.is_empty());
}
