//! Ingest pipeline metrics
//!
//! Thin wrappers over the `metrics` facade so metric names and labels live
//! in one place. Without an installed recorder every call is a no-op.

use metrics::{counter, gauge, histogram};

/// Record one ingest request by ack status (`success` / `empty` / `invalid`)
pub fn record_request(status: &'static str) {
    counter!("ingest_requests_total", "status" => status).increment(1);
}

/// Record a decoded batch: its size and how many events it produced
pub fn record_batch(total_records: usize, accepted: usize) {
    histogram!("ingest_batch_size").record(total_records as f64);
    if accepted > 0 {
        counter!("ingest_events_accepted_total").increment(accepted as u64);
    }
}

/// Record a raw entry dropped before dispatch
pub fn record_record_rejected(reason: &'static str) {
    counter!("ingest_records_rejected_total", "reason" => reason).increment(1);
}

/// Record the terminal outcome of one event write (`stored` / `duplicate` / `abandoned`)
pub fn record_write_outcome(shard: &str, outcome: &'static str) {
    counter!(
        "ingest_writes_total",
        "shard" => shard.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one retry attempt inside the failover procedure
pub fn record_failover_attempt(shard: &str) {
    counter!("ingest_failover_attempts_total", "shard" => shard.to_string()).increment(1);
}

/// Record an event abandoned after exhausting failover
pub fn record_failover_exhausted(shard: &str) {
    counter!("ingest_failover_exhausted_total", "shard" => shard.to_string()).increment(1);
}

/// Current number of write tasks not yet terminal
pub fn record_in_flight(count: usize) {
    gauge!("ingest_writes_in_flight").set(count as f64);
}
