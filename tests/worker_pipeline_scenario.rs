//! Full master-style pipeline: client -> broker -> worker fleet -> broker
//! -> consumer, with the resilience tap wired exactly as `Master` wires
//! it. Exercises the `preserve_key` worker leg (the stash minted at
//! ingress must still be found at egress after the worker round trip)
//! and S6 (a stale dispatch is re-sent on a flush tick and the eventual
//! late completion is swallowed exactly once).

use std::sync::Arc;
use std::thread;

use palm::broker::{Broker, BrokerConfig, TapConfig};
use palm::cache::InMemoryCache;
use palm::domain_types::{ComponentName, MessageCap};
use palm::resilience::ResilienceService;
use palm::services;
use palm::shutdown::{LoopBudget, ShutdownSignal};
use palm::transport::{Frame, Transport};
use palm::wire::{BrokerMessage, PalmMessage};

fn name(s: &str) -> ComponentName {
    ComponentName::try_new(s.to_string()).unwrap()
}

#[test]
fn client_request_survives_a_stale_worker_via_resilience_resend() {
    let transport = Arc::new(Transport::new());
    let cache = InMemoryCache::shared();

    let (tap_tx, tap_rx) = crossbeam::channel::unbounded();
    let broker = Arc::new(
        Broker::new(BrokerConfig::testing()).with_tap(TapConfig {
            to_route: name("WorkerPush"),
            from_route: name("WorkerPull"),
            sink: tap_tx,
        }),
    );

    let pull_to_broker = broker.register_inbound(name("Pull"), Some(name("WorkerPush")), "to_broker");
    let worker_pull_to_broker = broker.register_inbound(name("WorkerPull"), Some(name("Push")), "from_broker");
    let worker_push_to_broker = broker.register_outbound(name("WorkerPush"), "to_broker");
    let push_to_broker = broker.register_outbound(name("Push"), "to_sink");
    let resilience_to_broker = broker.register_inbound(name("Resilience"), Some(name("WorkerPush")), "resend");

    // The flush timer is driven by hand here instead of a real interval,
    // so the test is deterministic rather than depending on wall time.
    let (flush_tx, flush_rx) = crossbeam::channel::unbounded();
    let resilience = ResilienceService::new(name("Resilience"), tap_rx, flush_rx, resilience_to_broker);

    let (broker_shutdown_handle, broker_shutdown) = ShutdownSignal::new();
    let broker_budget = LoopBudget::capped(MessageCap::unbounded(), broker_shutdown.clone());
    let broker_handle = broker.clone();
    let broker_thread = thread::spawn(move || broker_handle.start(&broker_budget));
    let resilience_thread = thread::spawn(move || resilience.start(&broker_shutdown));

    let ingress = services::pull_service(
        name("Pull"),
        "inproc://client",
        &transport,
        pull_to_broker,
        cache.clone(),
        true,
        LoopBudget::capped(MessageCap::new(1), ShutdownSignal::never()),
    );
    let worker_pull = services::worker_pull_service(
        name("WorkerPull"),
        "inproc://worker-results",
        &transport,
        worker_pull_to_broker,
        cache.clone(),
        LoopBudget::capped(MessageCap::new(1), ShutdownSignal::never()),
    );
    let worker_push = services::worker_push_service(
        name("WorkerPush"),
        "inproc://worker-jobs",
        &transport,
        worker_push_to_broker,
        cache.clone(),
        LoopBudget::capped(MessageCap::new(2), ShutdownSignal::never()),
    );
    let egress = services::push_connection(
        name("Push"),
        "inproc://consumer",
        &transport,
        push_to_broker,
        cache.clone(),
        true,
        LoopBudget::capped(MessageCap::new(1), ShutdownSignal::never()),
    );

    let ingress_thread = thread::spawn(move || ingress.start());
    let worker_pull_thread = thread::spawn(move || worker_pull.start());
    let worker_push_thread = thread::spawn(move || worker_push.start());
    let egress_thread = thread::spawn(move || egress.start());

    let client = transport.connect_push("inproc://client");
    let worker_jobs = transport.bind_pull("inproc://worker-jobs");
    let worker_results = transport.connect_push("inproc://worker-results");
    let consumer = transport.bind_pull("inproc://consumer");

    let request = PalmMessage {
        client: "c1".into(),
        pipeline: "p1".into(),
        function: "s.f".into(),
        stage: 0,
        payload: b"X".to_vec(),
        cache: None,
    };
    client.send(Frame::new(name("client"), request.to_bytes().unwrap())).unwrap();

    // PullService is fire-and-forget (§4.4): no external ack is expected
    // on this leg, unlike the RepService front door exercised in
    // envelope_scenario.rs.

    // The worker fleet sees the bare BrokerMessage{key, payload}; this is
    // the first delivery, which the test deliberately does not answer
    // yet, simulating a slow/lost worker.
    let first_job = worker_jobs.recv().unwrap();
    let first_dispatch = BrokerMessage::from_bytes(&first_job.payload).unwrap();
    assert_eq!(first_dispatch.payload, b"X");

    // A flush tick fires: resilience re-sends the still-waiting key
    // through its reinject route, which re-enters the broker exactly
    // like a fresh dispatch and reaches WorkerPush a second time.
    flush_tx.send(()).unwrap();
    let second_job = worker_jobs.recv().unwrap();
    let second_dispatch = BrokerMessage::from_bytes(&second_job.payload).unwrap();
    assert_eq!(second_dispatch.key, first_dispatch.key);
    assert_eq!(second_dispatch.payload, b"X");

    // The worker now answers (with the same key, a different payload),
    // completing the job through WorkerPull -> Push -> consumer.
    let result = BrokerMessage {
        key: second_dispatch.key.clone(),
        payload: b"X-done".to_vec(),
    };
    worker_results.send(Frame::new(name("worker"), result.to_bytes().unwrap())).unwrap();

    let delivered = consumer.recv().unwrap();
    let envelope = PalmMessage::from_bytes(&delivered.payload).unwrap();
    assert_eq!(envelope.client, "c1");
    assert_eq!(envelope.payload, b"X-done");

    ingress_thread.join().unwrap();
    worker_pull_thread.join().unwrap();
    worker_push_thread.join().unwrap();
    egress_thread.join().unwrap();
    broker_shutdown_handle.trigger();
    broker_thread.join().unwrap();
    resilience_thread.join().unwrap();
}
