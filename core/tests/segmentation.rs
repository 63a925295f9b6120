use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rfv_core::{
    cancel::CancelSignal,
    config::EngineConfig,
    demo,
    engine::SegmentationEngine,
    filters::SegmentFilters,
    ingest::parse_amount,
    segment::Segment,
    store::{NewDeal, NewLead, SqliteStore},
    types::{CustomerKey, Score},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn make_store() -> SqliteStore {
    init_logging();
    let store = SqliteStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn make_engine(store: SqliteStore) -> SegmentationEngine<SqliteStore> {
    SegmentationEngine::new(store, EngineConfig::default_test()).expect("engine")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()
}

fn lead(id: &str) -> CustomerKey {
    CustomerKey::Lead(id.into())
}

/// Three customers:
///   A: 5 purchases, R$5000, last 2024-01-30
///   B: 1 purchase,  R$50,   last 2023-06-01
///   C: 2 purchases, R$800,  last 2024-01-15
fn three_customer_store() -> SqliteStore {
    let store = make_store();
    store
        .insert_leads(&[NewLead::named("a", "Ana Lima"), NewLead::named("c", "Caio Rocha")])
        .unwrap();
    store
        .insert_deals(&[
            NewDeal::won("d-01", Some("a"), "1000.00", "2024-01-05T00:00:00Z"),
            NewDeal::won("d-02", Some("a"), "1000.00", "2024-01-10T00:00:00Z"),
            NewDeal::won("d-03", Some("a"), "1000.00", "2024-01-15T00:00:00Z"),
            NewDeal::won("d-04", Some("a"), "1000.00", "2024-01-20T00:00:00Z"),
            NewDeal::won("d-05", Some("a"), "1000.00", "2024-01-30T00:00:00Z"),
            NewDeal::won("d-06", Some("b"), "50.00", "2023-06-01T00:00:00Z"),
            NewDeal::won("d-07", Some("c"), "300.00", "2024-01-08T00:00:00Z"),
            NewDeal::won("d-08", Some("c"), "500.00", "2024-01-15T00:00:00Z"),
        ])
        .unwrap();
    store
}

// ── Concrete scenario ────────────────────────────────────────────────────────

#[tokio::test]
async fn three_customer_scenario_scores_and_segments() {
    let engine = make_engine(three_customer_store());

    let analysis = engine
        .analyze(&SegmentFilters::all(), as_of(), &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(analysis.customers.len(), 3);

    let a = analysis.customer(&lead("a")).unwrap();
    assert_eq!(a.profile.frequency, 5);
    assert_eq!(a.profile.recency_days, 1);
    assert_eq!(a.rfv_code(), "5-5-5");
    assert_eq!(a.segment, Segment::Champions);
    assert_eq!(a.customer_name.as_deref(), Some("Ana Lima"));

    let c = analysis.customer(&lead("c")).unwrap();
    assert_eq!(c.profile.recency_days, 16);
    assert_eq!(c.rfv_code(), "4-4-4");
    assert_eq!(c.segment, Segment::Champions);

    let b = analysis.customer(&lead("b")).unwrap();
    assert_eq!(b.profile.recency_days, 244);
    assert_eq!(b.rfv_code(), "2-2-2");
    assert_eq!(b.segment, Segment::Dormant);
    assert_eq!(b.customer_name, None);

    let metrics = analysis.metrics();
    assert_eq!(metrics.total_customers, 3);
    assert!((metrics.revenue - 5850.0).abs() < 1e-9);
    assert!((metrics.average_ticket - 5850.0 / 8.0).abs() < 1e-9);
    assert_eq!(metrics.active_count, 2);
    assert_eq!(metrics.attention_count, 0);
    assert_eq!(metrics.at_risk_count, 0);
    assert_eq!(metrics.new_count, 0);
    assert!(metrics.warnings.is_empty());
}

/// The same customer scores differently in a different window: scores are
/// relative to who else is in the population.
#[tokio::test]
async fn scores_are_relative_to_the_window() {
    let engine = make_engine(three_customer_store());
    let january = SegmentFilters::between(date(2024, 1, 1), date(2024, 1, 31));

    let analysis = engine.analyze(&january, as_of(), &CancelSignal::never()).await.unwrap();

    assert_eq!(analysis.customers.len(), 2, "B's only purchase is outside January");
    let c = analysis.customer(&lead("c")).unwrap();
    assert_eq!(c.rfv_code(), "3-3-3");
    assert_eq!(c.segment, Segment::NeedAttention);
    assert_eq!(analysis.customer(&lead("a")).unwrap().rfv_code(), "5-5-5");
}

#[tokio::test]
async fn single_customer_window_is_best_in_class() {
    let store = make_store();
    store
        .insert_deal(&NewDeal::won("d-1", Some("solo"), "42.00", "2023-01-01T00:00:00Z"))
        .unwrap();
    let engine = make_engine(store);

    let analysis = engine
        .analyze(&SegmentFilters::all(), as_of(), &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(analysis.customers.len(), 1);
    assert_eq!(analysis.customers[0].rfv_code(), "5-5-5");
    assert_eq!(analysis.customers[0].segment, Segment::Champions);
    assert_eq!(analysis.metrics.cohorts.dormant, 1);
}

#[tokio::test]
async fn both_projections_agree() {
    let engine = make_engine(three_customer_store());

    let analysis = engine
        .analyze(&SegmentFilters::all(), as_of(), &CancelSignal::never())
        .await
        .unwrap();
    let report = analysis.report();
    let metrics = analysis.metrics();

    assert_eq!(report.total_customers, metrics.total_customers);
    assert_eq!(report.total_revenue, metrics.revenue);
    assert_eq!(report.cohorts.active, metrics.active_count);
    assert_eq!(report.cohorts.at_risk, metrics.at_risk_count);
    assert_eq!(
        report.customers.iter().filter(|c| c.segment == Segment::AtRisk).count() as u64,
        metrics.at_risk_count
    );

    // The as-of-now entry points run the same pass.
    let live_report = engine.run_segmentation(&SegmentFilters::all()).await.unwrap();
    let live_metrics = engine.get_metrics(&SegmentFilters::all()).await.unwrap();
    assert_eq!(live_report.total_customers, live_metrics.total_customers);
    assert_eq!(live_report.total_revenue, live_metrics.revenue);
}

// ── Source filtering ─────────────────────────────────────────────────────────

#[tokio::test]
async fn only_won_live_deals_in_range_are_counted() {
    let store = make_store();
    let mut deals = vec![
        NewDeal::won("d-01", Some("a"), "10", "2024-01-01T00:00:00Z"),
        NewDeal::won("d-02", Some("a"), "10", "2024-01-31T23:59:59Z"),
        NewDeal::won("d-03", Some("a"), "10", "2024-02-01T00:00:00Z"),
        NewDeal::won("d-04", Some("a"), "10", "2023-12-31T23:59:59Z"),
    ];
    let mut lost = NewDeal::won("d-05", Some("a"), "10", "2024-01-10T00:00:00Z");
    lost.status = "lost".into();
    let mut archived = NewDeal::won("d-06", Some("a"), "10", "2024-01-10T00:00:00Z");
    archived.archived = true;
    let mut deleted = NewDeal::won("d-07", Some("a"), "10", "2024-01-10T00:00:00Z");
    deleted.deleted_at = Some("2024-01-11T00:00:00Z".into());
    deals.extend([lost, archived, deleted]);
    store.insert_deals(&deals).unwrap();

    let january = SegmentFilters::between(date(2024, 1, 1), date(2024, 1, 31));
    assert_eq!(store.won_deal_count(&january).unwrap(), 2);
    assert_eq!(store.won_deal_count(&SegmentFilters::all()).unwrap(), 4);

    let engine = make_engine(store);
    let analysis = engine.analyze(&january, as_of(), &CancelSignal::never()).await.unwrap();
    assert_eq!(analysis.metrics.total_transactions, 2);
}

#[tokio::test]
async fn funnel_seller_and_origin_filters_narrow_the_window() {
    let store = make_store();
    let tagged = |id: &str, lead: &str, funnel: &str, seller: &str, origin: &str| {
        let mut d = NewDeal::won(id, Some(lead), "100", "2024-01-10T00:00:00Z");
        d.funnel_id = Some(funnel.into());
        d.seller_id = Some(seller.into());
        d.origin_id = Some(origin.into());
        d
    };
    store
        .insert_deals(&[
            tagged("d-1", "a", "f1", "s1", "o1"),
            tagged("d-2", "b", "f1", "s2", "o1"),
            tagged("d-3", "c", "f2", "s1", "o2"),
        ])
        .unwrap();
    let engine = make_engine(store);

    let count = |filters: SegmentFilters| {
        let engine = &engine;
        async move {
            engine
                .analyze(&filters, as_of(), &CancelSignal::never())
                .await
                .unwrap()
                .customers
                .len()
        }
    };

    assert_eq!(count(SegmentFilters::all()).await, 3);
    assert_eq!(count(SegmentFilters::all().with_funnel("f1")).await, 2);
    assert_eq!(count(SegmentFilters::all().with_funnel("all")).await, 3);
    assert_eq!(count(SegmentFilters::all().with_seller("s1")).await, 2);
    assert_eq!(count(SegmentFilters::all().with_origin("o2")).await, 1);
    assert_eq!(count(SegmentFilters::all().with_funnel("f1").with_seller("s1")).await, 1);
}

#[tokio::test]
async fn pages_through_the_store() {
    let store = make_store();
    let deals: Vec<NewDeal> = (0..2500)
        .map(|i| NewDeal::won(&format!("d-{i:05}"), Some(&format!("l-{}", i % 300)), "1.00", "2024-01-10T00:00:00Z"))
        .collect();
    store.insert_deals(&deals).unwrap();
    let engine = make_engine(store);

    let analysis = engine
        .analyze(&SegmentFilters::all(), as_of(), &CancelSignal::never())
        .await
        .unwrap();

    assert!(analysis.is_complete());
    assert_eq!(analysis.metrics.total_transactions, 2500);
    assert_eq!(analysis.customers.len(), 300);
}

/// Malformed rows are ingested with defaults and reported, never dropped.
#[tokio::test]
async fn malformed_rows_count_toward_frequency() {
    let store = make_store();
    let mut undated = NewDeal::won("d-2", Some("a"), "20", "2024-01-10T00:00:00Z");
    undated.closed_at = None;
    undated.created_at = None;
    store
        .insert_deals(&[
            NewDeal::won("d-1", Some("a"), "abc", "2024-01-20T00:00:00Z"),
            undated,
            NewDeal::won("d-3", None, "15", "2024-01-25T00:00:00Z"),
        ])
        .unwrap();
    let engine = make_engine(store);

    let analysis = engine
        .analyze(&SegmentFilters::all(), as_of(), &CancelSignal::never())
        .await
        .unwrap();

    let a = analysis.customer(&lead("a")).unwrap();
    assert_eq!(a.profile.frequency, 2);
    assert!((a.profile.total_monetary - 20.0).abs() < 1e-9);
    assert_eq!(a.profile.recency_days, 11);

    let walk_in = analysis.customer(&CustomerKey::Unattributed("d-3".into())).unwrap();
    assert_eq!(walk_in.profile.frequency, 1);

    assert_eq!(analysis.ingest.invalid_amounts, 1);
    assert_eq!(analysis.ingest.undated, 1);
    assert_eq!(analysis.ingest.unattributed, 1);
    assert!(analysis.is_complete(), "malformed fields do not drop customers");
    assert!(!analysis.warnings.is_empty());
}

// ── Population properties ────────────────────────────────────────────────────

async fn demo_analysis(seed: u64, customers: usize) -> (rfv_core::Analysis, demo::DemoPopulation) {
    let store = make_store();
    let anchor = date(2024, 6, 30);
    let population = demo::seed_store(&store, seed, customers, anchor).unwrap();
    let engine = make_engine(store);
    let as_of = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
    let analysis = engine
        .analyze(&SegmentFilters::all(), as_of, &CancelSignal::never())
        .await
        .unwrap();
    (analysis, population)
}

#[tokio::test]
async fn scores_stay_in_range() {
    let (analysis, _) = demo_analysis(17, 400).await;
    assert!(!analysis.is_empty());
    for c in &analysis.customers {
        for score in [c.recency_score, c.frequency_score, c.monetary_score] {
            assert!((Score::MIN..=Score::MAX).contains(&score));
        }
        assert!(c.profile.frequency >= 1);
        assert!(c.profile.total_monetary >= 0.0);
    }
}

#[tokio::test]
async fn scores_are_monotonic_in_raw_values() {
    let (analysis, _) = demo_analysis(23, 300).await;
    let cs = &analysis.customers;
    for a in cs {
        for b in cs {
            if a.profile.total_monetary > b.profile.total_monetary {
                assert!(a.monetary_score >= b.monetary_score, "monetary: {} vs {}", a.profile.customer_key, b.profile.customer_key);
            }
            if a.profile.frequency > b.profile.frequency {
                assert!(a.frequency_score >= b.frequency_score, "frequency: {} vs {}", a.profile.customer_key, b.profile.customer_key);
            }
            if a.profile.recency_days < b.profile.recency_days {
                assert!(a.recency_score >= b.recency_score, "recency: {} vs {}", a.profile.customer_key, b.profile.customer_key);
            }
        }
    }
}

/// Same input, same `as_of`: identical scores, segments and metrics.
#[tokio::test]
async fn pipeline_is_idempotent() {
    let store = make_store();
    demo::seed_store(&store, 31, 250, date(2024, 6, 30)).unwrap();
    let engine = make_engine(store);
    let as_of = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();

    let first = engine.analyze(&SegmentFilters::all(), as_of, &CancelSignal::never()).await.unwrap();
    let second = engine.analyze(&SegmentFilters::all(), as_of, &CancelSignal::never()).await.unwrap();

    assert_eq!(first.customers, second.customers);
    assert_eq!(first.metrics, second.metrics);
    assert_ne!(first.run_id, second.run_id);
}

/// Input amounts = profile totals = reported revenue.
#[tokio::test]
async fn revenue_is_conserved() {
    let (analysis, population) = demo_analysis(41, 350).await;

    let input_total: f64 = population
        .won_deals()
        .map(|d| parse_amount(d.amount.as_deref(), &d.deal_id).into_inner())
        .sum();
    let profile_total: f64 = analysis.customers.iter().map(|c| c.profile.total_monetary).sum();
    let tolerance = 1e-6 * input_total.max(1.0);

    assert!((input_total - profile_total).abs() < tolerance, "{input_total} vs {profile_total}");
    assert!((analysis.metrics.total_revenue - profile_total).abs() < tolerance);
    assert!((analysis.metrics().revenue - input_total).abs() < tolerance);

    let input_count = population.won_deals().count() as u64;
    assert_eq!(analysis.metrics.total_transactions, input_count);
}

#[tokio::test]
async fn cohorts_partition_the_population() {
    let (analysis, _) = demo_analysis(53, 300).await;
    let cohorts = &analysis.metrics.cohorts;
    assert_eq!(
        cohorts.active + cohorts.needs_attention + cohorts.dormant,
        analysis.metrics.total_customers
    );
    let segment_total: u64 = analysis.metrics.segments.iter().map(|s| s.customers).sum();
    assert_eq!(segment_total, analysis.metrics.total_customers);
    for hist in [
        &analysis.metrics.distribution.recency,
        &analysis.metrics.distribution.frequency,
        &analysis.metrics.distribution.monetary,
    ] {
        assert_eq!(hist.total(), analysis.metrics.total_customers);
    }
}

/// Most customers buy once. That floor group must land in the bottom
/// frequency band, which keeps the low-frequency segments reachable.
#[tokio::test]
async fn one_off_buyers_score_low_frequency() {
    let (analysis, _) = demo_analysis(17, 400).await;

    let one_off: Vec<_> = analysis.customers.iter().filter(|c| c.profile.frequency == 1).collect();
    assert!(one_off.len() * 2 > analysis.customers.len(), "demo population should be mostly one-off buyers");
    for c in &one_off {
        assert!(c.frequency_score.get() <= 2, "{} bought once but scored F={}", c.profile.customer_key, c.frequency_score);
        assert!(
            !matches!(c.segment, Segment::Champions | Segment::Loyal),
            "{} bought once but is {}", c.profile.customer_key, c.segment
        );
    }
    assert_eq!(
        analysis.metrics.distribution.frequency.count(Score::MIN),
        one_off.len() as u64
    );
    assert!(analysis.metrics().new_count > 0);
}

#[tokio::test]
async fn segments_spread_across_a_realistic_population() {
    let (analysis, _) = demo_analysis(17, 400).await;
    let count = |segment: Segment| {
        analysis
            .metrics
            .segments
            .iter()
            .find(|s| s.segment == segment)
            .map_or(0, |s| s.customers)
    };

    for segment in [
        Segment::Champions,
        Segment::New,
        Segment::Promising,
        Segment::Lost,
        Segment::Dormant,
        Segment::AboutToSleep,
    ] {
        assert!(count(segment) > 0, "no customers in {segment}");
    }
    let populated = Segment::ALL.iter().filter(|s| count(**s) > 0).count();
    assert!(populated >= 8, "only {populated} segment(s) populated");
}
