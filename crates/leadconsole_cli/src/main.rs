//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run one console session end to end against the in-memory reference
//!   store and the local realtime hub.
//! - Keep output short and deterministic apart from generated ids.

use leadconsole_core::{
    core_version, default_log_level, init_logging, Console, ConsoleContext, ExportFormat,
    FilterPatch, LeadIntent, LeadQuality, LeadRecord, LeadStatus, LocalRealtimeHub, LoggingConfig,
    NotificationCategory, PushEvent, SqliteLeadStore,
};
use log::info;
use std::error::Error;
use std::sync::Arc;

const SEED_EPOCH_MS: i64 = 1_700_000_000_000;
const NOTIFICATION_WAIT_YIELDS: usize = 100;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("leadconsole smoke failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    println!("leadconsole_core version={}", core_version());

    let log_dir = std::env::temp_dir().join("leadconsole-smoke-logs");
    if let Err(err) = init_logging(&LoggingConfig::new(default_log_level(), &log_dir)) {
        eprintln!("logging disabled: {err}");
    }

    let store = Arc::new(SqliteLeadStore::open_in_memory()?);
    for lead in seed_leads() {
        store.insert_lead(&lead)?;
    }

    let hub = Arc::new(LocalRealtimeHub::default());
    let context = ConsoleContext::with_store(Arc::clone(&store), hub.clone());
    let mut console = Console::new(context)?;

    let health = console.activate();
    console.settle().await;
    println!(
        "activated degraded={} rows={}",
        health.is_degraded(),
        console.results().map_or(0, |page| page.total_count)
    );

    console.update_filters(&FilterPatch::new().lead_quality([LeadQuality::Hot]));
    console.settle().await;
    println!(
        "hot leads rows={} page={}",
        console.results().map_or(0, |page| page.total_count),
        console.page()
    );

    hub.publish_notification(PushEvent::new(
        NotificationCategory::NewLead,
        "New lead assigned to the queue",
        None,
        SEED_EPOCH_MS,
    ));
    let buffered = wait_for_notifications(&console, 1).await;
    println!("notifications buffered={buffered}");

    let artifact = console.export_results(ExportFormat::Csv).await?;
    println!(
        "export filename={} rows={} bytes={}",
        artifact.filename,
        artifact.row_count,
        artifact.bytes.len()
    );

    console.deactivate();
    info!(
        "event=smoke_session module=cli status=ok released={}",
        hub.released_count()
    );
    println!("released subscriptions={}", hub.released_count());
    Ok(())
}

/// Yields to the notification pump, which shares this thread, until at least
/// `expected` notifications are buffered or the yield budget runs out.
async fn wait_for_notifications(console: &Console, expected: usize) -> usize {
    for _ in 0..NOTIFICATION_WAIT_YIELDS {
        if console.notifications().len() >= expected {
            break;
        }
        tokio::task::yield_now().await;
    }
    console.notifications().len()
}

fn seed_leads() -> Vec<LeadRecord> {
    use LeadIntent::{Buy, Invest, Rent, Sell};
    use LeadQuality::{Cold, Hot, Warm};

    let specs = [
        ("Ada Lovelace", LeadStatus::New, Hot, Buy, "downtown", 82),
        ("Grace Hopper", LeadStatus::InProgress, Warm, Rent, "harbor", 55),
        ("Alan Turing", LeadStatus::New, Hot, Invest, "uptown", 91),
        ("Edsger Dijkstra", LeadStatus::Completed, Cold, Sell, "downtown", 30),
        ("Barbara Liskov", LeadStatus::Lost, Warm, Buy, "harbor", 12),
    ];

    specs
        .into_iter()
        .enumerate()
        .map(|(index, (name, status, quality, intent, area, score))| {
            let mut lead = LeadRecord::new(name, SEED_EPOCH_MS + index as i64);
            lead.status = status;
            lead.lead_quality = quality;
            lead.intent = intent;
            lead.area = area.to_string();
            lead.score = score;
            lead
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{seed_leads, wait_for_notifications, SEED_EPOCH_MS};
    use leadconsole_core::{
        Console, ConsoleContext, LocalRealtimeHub, NotificationCategory, PushEvent,
        SqliteLeadStore,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn waits_until_the_pushed_notification_is_buffered() {
        let store = Arc::new(SqliteLeadStore::open_in_memory().unwrap());
        let hub = Arc::new(LocalRealtimeHub::default());
        let mut console = Console::new(ConsoleContext::with_store(store, hub.clone())).unwrap();
        console.activate();
        assert_eq!(wait_for_notifications(&console, 0).await, 0);

        hub.publish_notification(PushEvent::new(
            NotificationCategory::NewLead,
            "queued",
            None,
            SEED_EPOCH_MS,
        ));
        assert_eq!(wait_for_notifications(&console, 1).await, 1);
    }

    #[test]
    fn seeds_have_distinct_creation_times() {
        let leads = seed_leads();
        assert_eq!(leads.len(), 5);
        assert!(leads
            .windows(2)
            .all(|pair| pair[0].created_at < pair[1].created_at));
    }
}
