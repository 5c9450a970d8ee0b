use leadconsole_core::{
    FilterPatch, FilterState, FilterStore, FollowUpTask, LeadIntent, LeadPatch, LeadQuality,
    LeadRecord, LeadStatus, MutationGateway, QueryExecutor, ScoreRange, SortOrder, SqliteLeadStore,
    StoreError,
};
use uuid::Uuid;

fn fixed_clock() -> i64 {
    42_000
}

struct Seed {
    store: SqliteLeadStore,
    ada: LeadRecord,
    grace: LeadRecord,
    alan: LeadRecord,
    edsger: LeadRecord,
}

fn seeded() -> Seed {
    let store = SqliteLeadStore::open_in_memory().unwrap().with_clock(fixed_clock);

    let mut ada = LeadRecord::new("Ada Lovelace", 4_000);
    ada.status = LeadStatus::New;
    ada.lead_quality = LeadQuality::Hot;
    ada.intent = LeadIntent::Buy;
    ada.area = "Old Town".to_string();
    ada.tags = vec!["VIP".to_string(), "repeat".to_string()];
    ada.score = 85;

    let mut grace = LeadRecord::new("Grace Hopper", 3_000);
    grace.status = LeadStatus::InProgress;
    grace.lead_quality = LeadQuality::Warm;
    grace.intent = LeadIntent::Rent;
    grace.area = "harbor".to_string();
    grace.tags = vec!["referral".to_string()];
    grace.score = 60;
    grace.assigned_agent = Some("kim".to_string());

    let mut alan = LeadRecord::new("alan turing", 2_000);
    alan.status = LeadStatus::Completed;
    alan.lead_quality = LeadQuality::Hot;
    alan.intent = LeadIntent::Invest;
    alan.area = "harbor".to_string();
    alan.score = 95;

    let mut edsger = LeadRecord::new("Edsger Dijkstra", 1_000);
    edsger.status = LeadStatus::New;
    edsger.lead_quality = LeadQuality::Cold;
    edsger.intent = LeadIntent::Sell;
    edsger.area = "old town".to_string();
    edsger.tags = vec!["vip".to_string()];
    edsger.score = 15;

    for record in [&ada, &grace, &alan, &edsger] {
        store.insert_lead(record).unwrap();
    }

    Seed {
        store,
        ada,
        grace,
        alan,
        edsger,
    }
}

fn filters(patch: FilterPatch) -> FilterState {
    let mut store = FilterStore::new();
    store.update_filters(&patch.status(Vec::<LeadStatus>::new()));
    store.state().clone()
}

fn names(seed: &Seed, state: &FilterState) -> Vec<String> {
    seed.store
        .query_page(state, 1, 50)
        .unwrap()
        .records
        .into_iter()
        .map(|record| record.name)
        .collect()
}

#[test]
fn insert_normalizes_area_and_tags() {
    let seed = seeded();
    let loaded = seed.store.get_lead(seed.ada.id).unwrap().unwrap();

    assert_eq!(loaded.area, "old-town");
    assert_eq!(loaded.tags, vec!["repeat", "vip"]);
    assert_eq!(loaded.score, 85);
    assert_eq!(loaded.created_at, 4_000);
}

#[test]
fn default_filter_returns_open_leads_most_recent_first() {
    let seed = seeded();
    let page = seed.store.query_page(FilterStore::new().state(), 1, 25).unwrap();

    assert_eq!(page.total_count, 3);
    let ids: Vec<_> = page.records.iter().map(|record| record.id).collect();
    assert_eq!(ids, vec![seed.ada.id, seed.grace.id, seed.edsger.id]);
}

#[test]
fn facets_or_within_and_and_across_dimensions() {
    let seed = seeded();

    let hot_or_cold =
        filters(FilterPatch::new().lead_quality([LeadQuality::Hot, LeadQuality::Cold]));
    assert_eq!(
        names(&seed, &hot_or_cold),
        vec!["Ada Lovelace", "alan turing", "Edsger Dijkstra"]
    );

    let hot_in_harbor = filters(
        FilterPatch::new()
            .lead_quality([LeadQuality::Hot])
            .area(["harbor"]),
    );
    assert_eq!(names(&seed, &hot_in_harbor), vec!["alan turing"]);

    let intent = filters(FilterPatch::new().intent([LeadIntent::Rent, LeadIntent::Sell]));
    assert_eq!(
        names(&seed, &intent),
        vec!["Grace Hopper", "Edsger Dijkstra"]
    );
}

#[test]
fn empty_facets_place_no_constraint() {
    let seed = seeded();
    let page = seed
        .store
        .query_page(&filters(FilterPatch::new()), 1, 25)
        .unwrap();
    assert_eq!(page.total_count, 4);
}

#[test]
fn tag_facet_matches_any_selected_tag() {
    let seed = seeded();
    let vip = filters(FilterPatch::new().tag(["vip"]));
    assert_eq!(
        names(&seed, &vip),
        vec!["Ada Lovelace", "Edsger Dijkstra"]
    );

    let either = filters(FilterPatch::new().tag(["referral", "repeat"]));
    assert_eq!(names(&seed, &either), vec!["Ada Lovelace", "Grace Hopper"]);
}

#[test]
fn score_range_is_inclusive() {
    let seed = seeded();
    let state = filters(FilterPatch::new().score_range(ScoreRange::new(60, 85).unwrap()));
    assert_eq!(names(&seed, &state), vec!["Ada Lovelace", "Grace Hopper"]);
}

#[test]
fn free_text_matches_all_terms_across_indexed_fields() {
    let seed = seeded();

    let by_name = filters(FilterPatch::new().free_text("  LOVELACE "));
    assert_eq!(names(&seed, &by_name), vec!["Ada Lovelace"]);

    let by_agent = filters(FilterPatch::new().free_text("kim"));
    assert_eq!(names(&seed, &by_agent), vec!["Grace Hopper"]);

    let name_and_area = filters(FilterPatch::new().free_text("edsger town"));
    assert_eq!(names(&seed, &name_and_area), vec!["Edsger Dijkstra"]);

    let no_match = filters(FilterPatch::new().free_text("ada harbor"));
    assert!(names(&seed, &no_match).is_empty());
}

#[test]
fn free_text_with_fts_syntax_is_treated_literally() {
    let seed = seeded();
    for text in ["NEAR(ada", "ada\"", "ada OR grace", "name:ada"] {
        let state = filters(FilterPatch::new().free_text(text));
        let result = seed.store.query_page(&state, 1, 25);
        assert!(result.is_ok(), "query `{text}` failed: {result:?}");
    }
    let or_text = filters(FilterPatch::new().free_text("ada OR grace"));
    assert!(names(&seed, &or_text).is_empty());
}

#[test]
fn sort_orders_break_ties_by_id() {
    let seed = seeded();

    let by_score = filters(FilterPatch::new().sort(SortOrder::ScoreHigh));
    assert_eq!(
        names(&seed, &by_score),
        vec!["alan turing", "Ada Lovelace", "Grace Hopper", "Edsger Dijkstra"]
    );

    let by_name = filters(FilterPatch::new().sort(SortOrder::Name));
    assert_eq!(
        names(&seed, &by_name),
        vec!["Ada Lovelace", "alan turing", "Edsger Dijkstra", "Grace Hopper"]
    );

    let oldest = filters(FilterPatch::new().sort(SortOrder::Oldest));
    assert_eq!(names(&seed, &oldest)[0], "Edsger Dijkstra");

    let store = SqliteLeadStore::open_in_memory().unwrap();
    let mut twins = Vec::new();
    for _ in 0..4 {
        let mut record = LeadRecord::new("Twin", 10);
        record.score = 50;
        store.insert_lead(&record).unwrap();
        twins.push(record.id);
    }
    let state = filters(FilterPatch::new().sort(SortOrder::ScoreLow));
    let ids: Vec<Uuid> = store
        .query_page(&state, 1, 10)
        .unwrap()
        .records
        .into_iter()
        .map(|record| record.id)
        .collect();
    let mut expected_text: Vec<String> = twins.iter().map(Uuid::to_string).collect();
    expected_text.sort();
    let actual_text: Vec<String> = ids.iter().map(Uuid::to_string).collect();
    assert_eq!(actual_text, expected_text);
}

#[test]
fn paging_reports_total_count_and_slices_rows() {
    let seed = seeded();
    let state = filters(FilterPatch::new());

    let first = seed.store.query_page(&state, 1, 3).unwrap();
    let second = seed.store.query_page(&state, 2, 3).unwrap();
    let beyond = seed.store.query_page(&state, 5, 3).unwrap();

    assert_eq!(first.total_count, 4);
    assert_eq!(first.records.len(), 3);
    assert_eq!(second.total_count, 4);
    assert_eq!(second.records.len(), 1);
    assert_eq!(second.records[0].id, seed.edsger.id);
    assert!(beyond.records.is_empty());
    assert_eq!(beyond.total_count, 4);
}

#[test]
fn patch_updates_present_fields_and_bumps_updated_at() {
    let seed = seeded();
    let patch = LeadPatch {
        status: Some(LeadStatus::Lost),
        score: Some(5),
        assigned_agent: Some(Some("lee".to_string())),
        ..LeadPatch::default()
    };

    seed.store.apply_patch(seed.ada.id, &patch).unwrap();
    let loaded = seed.store.get_lead(seed.ada.id).unwrap().unwrap();
    assert_eq!(loaded.status, LeadStatus::Lost);
    assert_eq!(loaded.score, 5);
    assert_eq!(loaded.assigned_agent.as_deref(), Some("lee"));
    assert_eq!(loaded.lead_quality, LeadQuality::Hot);
    assert_eq!(loaded.updated_at, 42_000);

    let unassign = LeadPatch {
        assigned_agent: Some(None),
        ..LeadPatch::default()
    };
    seed.store.apply_patch(seed.ada.id, &unassign).unwrap();
    assert_eq!(seed.store.get_lead(seed.ada.id).unwrap().unwrap().assigned_agent, None);

    let search = filters(FilterPatch::new().free_text("lee"));
    assert!(names(&seed, &search).is_empty());
}

#[test]
fn patch_rejects_out_of_range_score_and_missing_lead() {
    let seed = seeded();
    let bad = LeadPatch {
        score: Some(101),
        ..LeadPatch::default()
    };
    assert!(matches!(
        seed.store.apply_patch(seed.ada.id, &bad),
        Err(StoreError::Validation(_))
    ));

    let missing = Uuid::new_v4();
    let patch = LeadPatch {
        status: Some(LeadStatus::Completed),
        ..LeadPatch::default()
    };
    assert!(matches!(
        seed.store.apply_patch(missing, &patch),
        Err(StoreError::NotFound(id)) if id == missing
    ));
}

#[test]
fn follow_ups_are_listed_by_due_time() {
    let seed = seeded();
    let later = FollowUpTask {
        title: "Send contract".to_string(),
        due_at: 9_000,
    };
    let sooner = FollowUpTask {
        title: "Confirm viewing".to_string(),
        due_at: 5_000,
    };
    seed.store.add_follow_up(seed.grace.id, &later).unwrap();
    seed.store.add_follow_up(seed.grace.id, &sooner).unwrap();

    let detail = seed.store.lead_detail(seed.grace.id).unwrap().unwrap();
    assert_eq!(detail.follow_ups, vec![sooner, later]);
    assert_eq!(detail.record.updated_at, 42_000);
    assert!(seed.store.lead_detail(Uuid::new_v4()).unwrap().is_none());

    let blank = FollowUpTask {
        title: "  ".to_string(),
        due_at: 1,
    };
    assert!(matches!(
        seed.store.add_follow_up(seed.grace.id, &blank),
        Err(StoreError::Validation(_))
    ));
}

#[test]
fn delete_cascades_to_tags_and_search_index() {
    let seed = seeded();
    assert!(seed.store.delete_lead(seed.ada.id).unwrap());
    assert!(!seed.store.delete_lead(seed.ada.id).unwrap());

    let vip = filters(FilterPatch::new().tag(["vip"]));
    assert_eq!(names(&seed, &vip), vec!["Edsger Dijkstra"]);
    let search = filters(FilterPatch::new().free_text("ada"));
    assert!(names(&seed, &search).is_empty());
}

#[tokio::test]
async fn boundary_maps_store_failures_to_transport_errors() {
    let seed = seeded();
    let missing = Uuid::new_v4();

    let err = seed
        .store
        .update_record(
            missing,
            &LeadPatch {
                score: Some(10),
                ..LeadPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.operation, "update_record");
    assert!(!err.retryable);
    assert!(err.message.contains(&missing.to_string()));

    seed.store.assign_agent(seed.alan.id, Some("ray")).await.unwrap();
    let detail = seed.store.fetch_detail(seed.alan.id).await.unwrap().unwrap();
    assert_eq!(detail.record.assigned_agent.as_deref(), Some("ray"));

    let page = seed
        .store
        .fetch_page(&FilterState::default(), 1, 25)
        .await
        .unwrap();
    assert_eq!(page.total_count, 3);
}
