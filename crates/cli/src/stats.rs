//! Service statistics reported at shutdown.

use std::time::Duration;

use contracts::ShardName;
use dispatcher::MetricsSnapshot;
use tracing::info;
use transport::IngestService;

/// Statistics from one `serve` run
#[derive(Debug, Clone, Default)]
pub struct ServeStats {
    /// Wall time the listener was up
    pub duration: Duration,

    /// Ingestion counters
    pub ingestion: ingestion::MetricsSnapshot,

    /// Per-shard write counters, in routing order
    pub shards: Vec<(ShardName, MetricsSnapshot)>,

    /// Events recorded in the dead-letter store
    pub dead_letters: usize,

    /// Writes still running when the shutdown grace elapsed
    pub unfinished_writes: usize,
}

impl ServeStats {
    pub fn collect<B>(
        service: &IngestService<B>,
        duration: Duration,
        unfinished_writes: usize,
    ) -> Self {
        let dispatcher = service.dispatcher();
        Self {
            duration,
            ingestion: service.metrics().snapshot(),
            shards: dispatcher.metrics(),
            dead_letters: dispatcher.dead_letters().len(),
            unfinished_writes,
        }
    }

    /// Accepted events per second of uptime
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ingestion.events_accepted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    fn total(&self, field: impl Fn(&MetricsSnapshot) -> u64) -> u64 {
        self.shards.iter().map(|(_, m)| field(m)).sum()
    }

    pub fn log(&self) {
        info!(
            duration_secs = self.duration.as_secs_f64(),
            events_accepted = self.ingestion.events_accepted,
            records_rejected = self.ingestion.records_rejected,
            stored = self.total(|m| m.stored_count),
            duplicates = self.total(|m| m.duplicate_count),
            abandoned = self.total(|m| m.abandoned_count),
            unfinished = self.unfinished_writes,
            "Ingest service stopped"
        );
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Ingest Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Batches received: {}", self.ingestion.batches_received);
        println!("   ├─ Undecodable requests: {}", self.ingestion.decode_errors);
        println!("   ├─ Empty batches: {}", self.ingestion.empty_batches);
        println!("   ├─ Events accepted: {}", self.ingestion.events_accepted);
        println!("   ├─ Records rejected: {}", self.ingestion.records_rejected);
        println!("   └─ Events/s: {:.2}", self.events_per_sec());

        println!("\n🗄️  Shards ({})", self.shards.len());
        for (i, (name, m)) in self.shards.iter().enumerate() {
            let prefix = if i + 1 == self.shards.len() { "└─" } else { "├─" };
            println!(
                "   {} {}: stored {}, duplicate {}, retries {}, abandoned {}",
                prefix, name, m.stored_count, m.duplicate_count, m.retry_count, m.abandoned_count
            );
        }

        if self.dead_letters > 0 || self.unfinished_writes > 0 {
            println!("\n⚠️  Attention");
            println!("   ├─ Dead letters: {}", self.dead_letters);
            println!("   └─ Unfinished at shutdown (dead-lettered): {}", self.unfinished_writes);
        }

        println!();
    }
}
