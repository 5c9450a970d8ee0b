use leadconsole_core::filter::ChangeKind;
use leadconsole_core::{
    FilterPatch, FilterState, FilterStore, LeadIntent, LeadQuality, LeadStatus, ScoreRange,
    SortOrder, ValidationError,
};

#[test]
fn initial_state_matches_console_defaults() {
    let store = FilterStore::new();
    let state = store.state();

    assert_eq!(
        state.status.as_slice(),
        &[LeadStatus::New, LeadStatus::InProgress]
    );
    assert!(state.lead_quality.is_empty());
    assert!(state.intent.is_empty());
    assert!(state.area.is_empty());
    assert!(state.tag.is_empty());
    assert_eq!(state.score_range, ScoreRange::full());
    assert_eq!(state.sort, SortOrder::Recent);
    assert_eq!(state.free_text, "");
    assert_eq!(store.page(), 1);
}

#[test]
fn update_filters_applies_patch_and_resets_page() {
    let mut store = FilterStore::new();
    store.set_page(4);

    let change = store.update_filters(
        &FilterPatch::new()
            .status([LeadStatus::Completed])
            .score_range(ScoreRange::new(50, 100).unwrap()),
    );

    let state = store.state();
    assert_eq!(state.status.as_slice(), &[LeadStatus::Completed]);
    assert_eq!(state.score_range, ScoreRange::new(50, 100).unwrap());
    assert!(state.lead_quality.is_empty());
    assert_eq!(store.page(), 1);
    assert_eq!(change.kind, ChangeKind::Filters);
    assert_eq!(change.page, 1);
}

#[test]
fn sort_change_after_paging_returns_to_first_page() {
    let mut store = FilterStore::new();
    store.set_page(5);
    assert_eq!(store.page(), 5);

    store.update_filters(&FilterPatch::new().sort(SortOrder::ScoreHigh));

    assert_eq!(store.page(), 1);
    assert_eq!(store.state().sort, SortOrder::ScoreHigh);
}

#[test]
fn every_filter_mutation_resets_page_but_set_page_does_not_touch_filters() {
    let mut store = FilterStore::new();
    let mutations: Vec<Box<dyn Fn(&mut FilterStore)>> = vec![
        Box::new(|store| {
            store.update_filters(&FilterPatch::new().intent([LeadIntent::Rent]));
        }),
        Box::new(|store| {
            store.clear_filters();
        }),
        Box::new(|store| {
            store.set_query("harbor view");
        }),
        Box::new(|store| {
            store.toggle_status(LeadStatus::Lost);
        }),
        Box::new(|store| {
            store.toggle_lead_quality(LeadQuality::Hot);
        }),
        Box::new(|store| {
            store.toggle_intent(LeadIntent::Invest);
        }),
        Box::new(|store| {
            store.toggle_area("Old Town").unwrap();
        }),
        Box::new(|store| {
            store.toggle_tag("vip").unwrap();
        }),
    ];

    for mutate in mutations {
        store.set_page(7);
        let before = store.state().clone();
        assert_eq!(store.page(), 7);
        assert_eq!(store.state(), &before);

        mutate(&mut store);
        assert_eq!(store.page(), 1);
    }
}

#[test]
fn update_filters_never_touches_absent_keys() {
    let mut store = FilterStore::new();
    store.update_filters(
        &FilterPatch::new()
            .lead_quality([LeadQuality::Hot, LeadQuality::Warm])
            .area(["Downtown"])
            .free_text("ada"),
    );
    let before = store.state().clone();

    let patch = FilterPatch::new().intent([LeadIntent::Sell]);
    let patch_copy = patch.clone();
    store.update_filters(&patch);

    let after = store.state();
    assert_eq!(after.intent.as_slice(), &[LeadIntent::Sell]);
    assert_eq!(after.status, before.status);
    assert_eq!(after.lead_quality, before.lead_quality);
    assert_eq!(after.area, before.area);
    assert_eq!(after.tag, before.tag);
    assert_eq!(after.score_range, before.score_range);
    assert_eq!(after.sort, before.sort);
    assert_eq!(after.free_text, before.free_text);
    assert_eq!(patch, patch_copy);
}

#[test]
fn present_key_replaces_instead_of_union() {
    let mut store = FilterStore::new();
    store.update_filters(&FilterPatch::new().status([LeadStatus::Lost]));
    assert_eq!(store.state().status.as_slice(), &[LeadStatus::Lost]);
}

#[test]
fn clear_filters_restores_defaults_after_arbitrary_mutations() {
    let mut store = FilterStore::new();
    store.toggle_status(LeadStatus::Completed);
    store.toggle_lead_quality(LeadQuality::Cold);
    store.update_filters(
        &FilterPatch::new()
            .score_range(ScoreRange::new(10, 20).unwrap())
            .tag(["repeat"])
            .sort(SortOrder::Name),
    );
    store.set_query("ada lovelace");
    store.set_page(3);

    let change = store.clear_filters();

    assert_eq!(store.state(), &FilterState::default());
    assert_eq!(store.state().free_text, "");
    assert_eq!(store.page(), 1);
    assert_eq!(change.kind, ChangeKind::Filters);
}

#[test]
fn set_query_replaces_text_and_resets_page() {
    let mut store = FilterStore::new();
    store.set_page(2);
    store.set_query("first");
    store.set_query("  second   query ");

    assert_eq!(store.state().free_text, "  second   query ");
    assert_eq!(store.state().normalized_query().as_deref(), Some("second query"));
    assert_eq!(store.page(), 1);
}

#[test]
fn score_range_validation_happens_before_any_patch() {
    assert_eq!(
        ScoreRange::new(80, 20),
        Err(ValidationError::InvertedScoreRange { low: 80, high: 20 })
    );
    assert!(matches!(
        ScoreRange::new(0, 101),
        Err(ValidationError::ScoreOutOfBounds { .. })
    ));
}

#[test]
fn filter_state_serializes_with_wire_names() {
    let mut store = FilterStore::new();
    store.update_filters(&FilterPatch::new().sort(SortOrder::ScoreLow));
    let json = serde_json::to_value(store.state()).unwrap();

    assert_eq!(json["status"], serde_json::json!(["new", "in-progress"]));
    assert_eq!(json["scoreRange"], serde_json::json!([0, 100]));
    assert_eq!(json["sort"], "score-low");
    assert_eq!(json["freeText"], "");
}
