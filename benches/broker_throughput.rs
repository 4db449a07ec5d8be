//! Broker dispatch-loop throughput benchmarks: self-reply round trips at
//! varying payload sizes, and fan-in delivery throughput at varying
//! buffered-producer counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use palm::broker::{Broker, BrokerConfig};
use palm::domain_types::{ComponentName, MessageCap};
use palm::shutdown::{LoopBudget, ShutdownSignal};
use palm::transport::Frame;
use std::thread;

fn name(s: &str) -> ComponentName {
    ComponentName::try_new(s.to_string()).unwrap()
}

/// One self-reply round trip per iteration, at varying payload sizes.
fn bench_self_reply_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("broker_self_reply");

    for payload_size in [64, 512, 4096, 32768].iter() {
        group.throughput(Throughput::Bytes(*payload_size as u64));
        group.bench_with_input(BenchmarkId::new("round_trip", payload_size), payload_size, |b, &payload_size| {
            let broker = Broker::new(BrokerConfig::production());
            let component = broker.register_inbound(name("bench"), None, "log");
            let (handle, shutdown) = ShutdownSignal::new();
            let budget = LoopBudget::capped(MessageCap::unbounded(), shutdown);
            let broker_thread = thread::spawn(move || broker.start(&budget));

            let payload = vec![0u8; payload_size];
            b.iter(|| {
                component.to_peer.send(Frame::new(name("bench"), payload.clone())).unwrap();
                let reply = component.from_peer.recv().unwrap();
                black_box(reply);
            });

            handle.trigger();
            broker_thread.join().unwrap();
        });
    }

    group.finish();
}

/// Draining a backlog of already-buffered messages through a single
/// outbound peer, at varying backlog depths (invariant 6: FIFO delivery
/// under buffering).
fn bench_fan_in_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("broker_fan_in_drain");

    for backlog in [10, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(*backlog as u64));
        group.bench_with_input(BenchmarkId::new("drain", backlog), backlog, |b, &backlog| {
            b.iter_batched(
                || {
                    let config = BrokerConfig::production().builder().max_buffer_size(backlog * 2).build().unwrap();
                    let broker = Broker::new(config);
                    let producer = broker.register_inbound(name("producer"), Some(name("sink")), "log");
                    let sink = broker.register_outbound(name("sink"), "log");
                    let (handle, shutdown) = ShutdownSignal::new();
                    let budget = LoopBudget::capped(MessageCap::unbounded(), shutdown.clone());
                    let broker_thread = thread::spawn(move || broker.start(&budget));

                    for i in 0..backlog {
                        producer.to_peer.send(Frame::new(name("producer"), vec![i as u8])).unwrap();
                        producer.from_peer.recv().unwrap();
                    }

                    (sink, handle, broker_thread)
                },
                |(sink, handle, broker_thread)| {
                    for _ in 0..backlog {
                        sink.to_peer.send(Frame::new(name("sink"), b"1".to_vec())).unwrap();
                        let reply = sink.from_peer.recv().unwrap();
                        black_box(reply);
                    }
                    handle.trigger();
                    broker_thread.join().unwrap();
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_self_reply_round_trip, bench_fan_in_drain);
criterion_main!(benches);
