mod common;

use common::{lead, page_of, GatedExecutor, MemoryLeads};
use leadconsole_core::query::DispatchSequencer;
use leadconsole_core::{
    Console, ConsoleContext, ConsoleEvent, EventOutcome, FilterPatch, LeadQuality, LeadStatus,
    LocalRealtimeHub, SortOrder,
};
use std::sync::Arc;

fn gated_console(executor: Arc<GatedExecutor>) -> Console {
    let context = ConsoleContext::new(
        executor,
        Arc::new(MemoryLeads::default()),
        Arc::new(LocalRealtimeHub::default()),
    );
    Console::new(context).unwrap()
}

/// Handles events until a page response arrives and returns its outcome.
async fn next_page_outcome(console: &mut Console) -> EventOutcome {
    loop {
        let event = console.next_event().await.unwrap();
        let is_page = matches!(event, ConsoleEvent::PageLoaded { .. });
        let outcome = console.handle_event(event);
        if is_page {
            return outcome;
        }
    }
}

#[tokio::test]
async fn later_dispatch_wins_even_when_earlier_response_arrives_last() {
    let executor = Arc::new(GatedExecutor::default());
    let mut console = gated_console(Arc::clone(&executor));

    let first = console.update_filters(&FilterPatch::new().status([LeadStatus::Completed]));
    let second = console.update_filters(&FilterPatch::new().sort(SortOrder::ScoreHigh));
    assert!(second > first);
    common::wait_until(|| executor.call_count() == 2).await;

    let fresh = lead("Fresh", LeadStatus::Completed, LeadQuality::Hot, 90, 2);
    let stale = lead("Stale", LeadStatus::Completed, LeadQuality::Cold, 10, 1);

    executor.respond(1, page_of(vec![fresh.clone()]));
    assert_eq!(next_page_outcome(&mut console).await, EventOutcome::Applied);
    assert!(!console.is_loading());

    executor.respond(0, page_of(vec![stale]));
    assert_eq!(next_page_outcome(&mut console).await, EventOutcome::Discarded);

    let results = console.results().unwrap();
    assert_eq!(results.records, vec![fresh.clone()]);
    assert_eq!(console.selected(), Some(fresh.id));
}

#[tokio::test]
async fn in_order_responses_only_apply_the_latest() {
    let executor = Arc::new(GatedExecutor::default());
    let mut console = gated_console(Arc::clone(&executor));

    console.set_page(2);
    console.set_page(3);
    common::wait_until(|| executor.call_count() == 2).await;

    executor.respond(0, page_of(vec![]));
    assert_eq!(next_page_outcome(&mut console).await, EventOutcome::Discarded);
    assert!(console.is_loading());
    assert!(console.results().is_none());

    let record = lead("Third page", LeadStatus::New, LeadQuality::Warm, 40, 1);
    executor.respond(1, page_of(vec![record.clone()]));
    assert_eq!(next_page_outcome(&mut console).await, EventOutcome::Applied);
    assert_eq!(console.results().unwrap().first_id(), Some(record.id));
    assert_eq!(console.page(), 3);
}

#[tokio::test]
async fn every_mutation_dispatches_exactly_one_request_with_the_composed_filter() {
    let executor = Arc::new(MemoryLeads::default());
    let context = ConsoleContext::with_store(
        Arc::clone(&executor),
        Arc::new(LocalRealtimeHub::default()),
    );
    let mut console = Console::new(context).unwrap();

    console.toggle_lead_quality(LeadQuality::Hot);
    console.set_query("harbor");
    console.set_page(2);
    console.settle().await;

    let calls = executor.page_calls();
    assert_eq!(calls.len(), 3);
    let (filters, page, page_size) = &calls[2];
    assert_eq!(filters.lead_quality.as_slice(), &[LeadQuality::Hot]);
    assert_eq!(filters.free_text, "harbor");
    assert_eq!(*page, 2);
    assert_eq!(*page_size, 25);
    assert_eq!(console.latest_seq(), 3);
}

#[test]
fn sequencer_marks_everything_before_latest_as_stale() {
    let mut sequencer = DispatchSequencer::new();
    let one = sequencer.next();
    let two = sequencer.next();

    assert!(sequencer.is_stale(one));
    assert!(!sequencer.is_current(one));
    assert!(sequencer.is_current(two));
    assert!(!sequencer.is_stale(two));
}
