//! Message relay benchmark suite.
//!
//! Measures the in-process cost of the inbound path:
//! - Appending to the message log
//! - Fanning one inbound message out to N subscribers
//!
//! Run with: cargo bench --bench message_relay
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use parking_lot::Mutex;

use resilient_chat::{
    ConnectionState, Listener, Message, MessageChannel, MessageLink, MessageLog, Sequence,
    SubscriptionId,
};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const LOG_SIZES: &[usize] = &[100, 1_000, 10_000];
const SUBSCRIBER_COUNTS: &[usize] = &[1, 8, 64];

// ============================================================================
// Bench Link
// ============================================================================

/// In-memory link that lets the benchmark drive inbound delivery.
#[derive(Default)]
struct BenchLink {
    handlers: Mutex<Vec<Listener<Message>>>,
}

impl BenchLink {
    fn deliver(&self, message: &Message) {
        let handlers = self.handlers.lock().clone();
        for handler in handlers {
            handler(message);
        }
    }
}

impl MessageLink for Arc<BenchLink> {
    fn send(&self, _payload: &str) -> bool {
        true
    }

    fn on_message(&self, handler: Listener<Message>) -> SubscriptionId {
        let mut handlers = self.handlers.lock();
        handlers.push(handler);
        SubscriptionId::new(handlers.len() as u64)
    }

    fn remove_handler(&self, _id: SubscriptionId) -> bool {
        false
    }

    fn close(&self) {
        self.handlers.lock().clear();
    }

    fn state(&self) -> ConnectionState {
        ConnectionState::Open
    }
}

// ============================================================================
// Benchmark: Log Append
// ============================================================================

fn bench_log_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_append");

    for &size in LOG_SIZES {
        group.bench_with_input(BenchmarkId::new("push", size), &size, |b, &size| {
            b.iter(|| {
                let mut log = MessageLog::new();
                for i in 0..size {
                    log.push(Message::inbound(Sequence::new(i as u64 + 1), "payload"));
                }
                black_box(log.len())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Relay Fan-out
// ============================================================================

fn bench_relay_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("relay_fanout");

    for &count in SUBSCRIBER_COUNTS {
        let link = Arc::new(BenchLink::default());
        let channel = MessageChannel::with_link(Arc::clone(&link));
        for _ in 0..count {
            channel.subscribe(|message| {
                black_box(message.text().len());
            });
        }

        let message = Message::inbound(Sequence::FIRST, "hello");

        group.bench_with_input(BenchmarkId::new("subscribers", count), &count, |b, _| {
            b.iter(|| link.deliver(black_box(&message)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_log_append, bench_relay_fanout);
criterion_main!(benches);
