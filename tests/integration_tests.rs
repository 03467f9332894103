use chrono::NaiveDate;
use payment_recovery::*;
use std::fs;
use std::path::PathBuf;

const CAPTIRA_EXPORT: &str = "\
Defendant,Date of Birth,Address,City,State,Zip,Mobile Ph #,Last Payment Date,Balance Owed
Jane Roe,01/02/1980,1 Main St,Austin,TX,78701,512-555-0100,,\"$1,200.00\"
John Doe,03/04/1975,2 Oak Ave,Waco,TX,76701,254-555-0101,06/10/2024,$300
Ann Poe,05/06/1990,3 Elm Rd,Austin,TX,78702,512-555-0102,02/01/2024,$4000
Bob Moe,07/08/1985,4 Pine Ln,Dallas,TX,75201,214-555-0103,2023-11-15,$6500.50
";

const SIMPLY_EXPORT: &str = "\
Name,Def. Phone,Outstanding Balance,Total Due
Sam Lee,555-0199,$450,$900
Kim Park,555-0198,,\"$2,000\"
";

const JOINT_EXPORT: &str = "\
Defendant,City,Contact,Current_Balance,Total_Balance
Lou Fox,Houston,555-0170,$800,\"$1,000\"
Max Ray,Houston,555-0171,$0,$250
Zoe Kay,Tyler,555-0172,\"$5,250\",\"$6,000\"
";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn loaded(source: Source, text: &str) -> RecoveryState {
    let mut state = RecoveryState::new(source, today());
    let ticket = state.begin_load(source);
    let dataset = Dataset::from_text(source, text).map_err(anyhow::Error::from);
    let outcome = state.finish_load(ticket, dataset);
    assert!(matches!(outcome, LoadOutcome::Applied { .. }));
    state
}

fn bucket_counts(buckets: &[DistributionBucket]) -> Vec<usize> {
    buckets.iter().map(|b| b.count).collect()
}

/// Scratch data directory unique to one test
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "payment-recovery-{}-{}",
        name,
        std::process::id()
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_captira_record_lands_in_expected_buckets() {
    let state = loaded(Source::Captira, CAPTIRA_EXPORT);
    let jane = state.record(0).unwrap();

    assert_eq!(jane.canonical_balance, 1200.0);
    assert_eq!(jane.last_payment_date, None);
    assert_eq!(jane.location.as_deref(), Some("Austin"));
    assert_eq!(balance_bucket(jane.canonical_balance), 2);

    let dashboard = state.dashboard();
    println!("Captira dashboard: {:#?}", dashboard.summary);

    // 300 | 1200 | 4000 | 6500.50
    assert_eq!(bucket_counts(&dashboard.balance_distribution), vec![1, 0, 1, 1, 1]);

    // Jane has no date: 20 days, ~150 days and ~228 days are counted
    assert_eq!(bucket_counts(&dashboard.payment_aging), vec![1, 0, 0, 2]);

    assert_eq!(dashboard.location_distribution[0].label, "Austin");
    assert_eq!(dashboard.location_distribution[0].count, 2);
    assert_eq!(dashboard.location_distribution.len(), 3);
}

#[test]
fn test_simply_outstanding_and_total_due() {
    let state = loaded(Source::Simply, SIMPLY_EXPORT);

    let sam = state.record(0).unwrap();
    assert_eq!(sam.canonical_balance, 450.0);
    assert_eq!(sam.canonical_total_due, 900.0);
    assert_eq!(balance_bucket(sam.canonical_balance), 0);
    assert_eq!(sam.contact_phone.as_deref(), Some("555-0199"));

    // Blank outstanding balance falls back to Total Due
    let kim = state.record(1).unwrap();
    assert_eq!(kim.canonical_balance, 2000.0);
    assert_eq!(kim.balance_column.as_deref(), Some("Total Due"));

    let dashboard = state.dashboard();
    assert_eq!(dashboard.summary.total_balance, 2900.0);
    assert_eq!(dashboard.summary.current_balance, 2450.0);
    assert!(dashboard.payment_aging.is_empty());
    assert!(dashboard.location_distribution.is_empty());

    assert_eq!(state.visible_columns(), vec!["Name", "Outstanding Balance", "Total Due"]);
}

#[test]
fn test_collecting_moves_record_between_buckets() {
    let mut state = loaded(Source::Captira, CAPTIRA_EXPORT);

    let receipt = state.collect(0, "$200").unwrap();

    assert_eq!(receipt.previous_balance, 1200.0);
    assert_eq!(receipt.new_balance, 1000.0);

    let jane = state.record(0).unwrap();
    assert_eq!(jane.canonical_balance, 1000.0);
    assert_eq!(jane.collected_amount, 200.0);
    assert_eq!(jane.raw.get("Balance Owed"), Some("$1,000.00"));

    assert_eq!(
        bucket_counts(&state.dashboard().balance_distribution),
        vec![1, 1, 0, 1, 1]
    );
}

#[test]
fn test_collections_are_additive() {
    let mut split = loaded(Source::Captira, CAPTIRA_EXPORT);
    split.collect(2, "$1,000").unwrap();
    split.collect(2, "500.25").unwrap();

    let mut single = loaded(Source::Captira, CAPTIRA_EXPORT);
    single.collect(2, "1500.25").unwrap();

    let a = split.record(2).unwrap();
    let b = single.record(2).unwrap();
    assert!((a.canonical_balance - b.canonical_balance).abs() < 1e-9);
    assert!((a.collected_amount - b.collected_amount).abs() < 1e-9);
    assert!((split.dashboard().summary.percentage_paid
        - single.dashboard().summary.percentage_paid)
        .abs()
        < 1e-9);
}

#[test]
fn test_rejected_collection_leaves_state_untouched() {
    let mut state = loaded(Source::Captira, CAPTIRA_EXPORT);
    let version = state.version();
    let before = state.dashboard().clone();

    assert!(matches!(state.collect(0, "abc"), Err(RecoveryError::InvalidAmount(_))));
    assert!(matches!(state.collect(0, "-5"), Err(RecoveryError::InvalidAmount(_))));
    assert!(matches!(state.collect(42, "$10"), Err(RecoveryError::RecordNotFound(42))));

    assert_eq!(state.version(), version);
    assert_eq!(state.dashboard(), &before);
}

#[test]
fn test_joint_ignores_year_filter() {
    let state = loaded(Source::Joint, JOINT_EXPORT);
    let records = state.records();

    let year = filter(records, Source::Joint, YearFilter::Year(2023), BalanceRange::bounds(records));
    assert_eq!(year.len(), records.len());

    let controls = state.filter_controls();
    assert!(!controls.year_filter_enabled);
    assert!(controls.available_years.is_empty());

    // Four zero aging buckets, cities still counted
    assert_eq!(bucket_counts(&state.dashboard().payment_aging), vec![0, 0, 0, 0]);
    assert_eq!(state.dashboard().location_distribution[0].label, "Houston");
    assert_eq!(state.dashboard().location_distribution[0].count, 2);
}

#[test]
fn test_year_filter_on_captira() {
    let mut state = loaded(Source::Captira, CAPTIRA_EXPORT);
    assert_eq!(state.filter_controls().available_years, vec![2024, 2023]);

    state.set_year(YearFilter::Year(2023));
    let view = state.view();

    assert_eq!(view.len(), 1);
    assert_eq!(view[0].raw.get("Defendant"), Some("Bob Moe"));

    // Dashboard stays on the full set
    assert_eq!(state.dashboard().summary.total_records, 4);
}

#[test]
fn test_histogram_counts_every_record() {
    for (source, text) in [
        (Source::Captira, CAPTIRA_EXPORT),
        (Source::Simply, SIMPLY_EXPORT),
        (Source::Joint, JOINT_EXPORT),
    ] {
        let mut state = loaded(source, text);
        state.collect(0, "$5,000").unwrap();

        let dashboard = state.dashboard();
        let total: usize = bucket_counts(&dashboard.balance_distribution).iter().sum();
        assert_eq!(total, dashboard.summary.total_records, "{}", source);
    }
}

#[test]
fn test_filter_is_idempotent_and_non_destructive() {
    let state = loaded(Source::Captira, CAPTIRA_EXPORT);
    let records = state.records();
    let range = BalanceRange::new(250.0, 4000.0).unwrap();

    let once = filter(records, Source::Captira, YearFilter::Year(2024), range);
    let twice = filter(&once, Source::Captira, YearFilter::Year(2024), range);

    assert_eq!(once, twice);
    assert_eq!(once.len(), 2);
    assert_eq!(records.len(), 4);
}

#[test]
fn test_search_narrows_the_view() {
    let mut state = loaded(Source::Joint, JOINT_EXPORT);

    state.set_search("tyler");
    let view = state.view();

    assert_eq!(view.len(), 1);
    assert_eq!(view[0].raw.get("Defendant"), Some("Zoe Kay"));
    assert_eq!(state.filter_controls().record_count, 1);
}

#[test]
fn test_stale_load_never_overwrites_newer_source() {
    let mut state = RecoveryState::new(Source::Captira, today());

    let captira = state.begin_load(Source::Captira);
    let joint = state.begin_load(Source::Joint);

    let joint_data = Dataset::from_text(Source::Joint, JOINT_EXPORT).map_err(anyhow::Error::from);
    assert_eq!(state.finish_load(joint, joint_data), LoadOutcome::Applied { records: 3 });

    // The slow Captira read completes afterwards
    let late = Dataset::from_text(Source::Captira, CAPTIRA_EXPORT).map_err(anyhow::Error::from);
    assert_eq!(state.finish_load(captira, late), LoadOutcome::Stale);

    assert_eq!(state.source(), Source::Joint);
    assert_eq!(state.records().len(), 3);
    assert_eq!(state.dashboard().summary.total_records, 3);
}

#[test]
fn test_load_from_data_directory() {
    let dir = scratch_dir("load");
    fs::write(dir.join(Source::Simply.file_name()), SIMPLY_EXPORT).unwrap();

    let mut state = RecoveryState::new(Source::Simply, today());
    assert_eq!(
        state.load_from_dir(Source::Simply, &dir),
        LoadOutcome::Applied { records: 2 }
    );
    assert_eq!(state.status(), &LoadStatus::Loaded);

    // No Joint export in the directory
    assert_eq!(state.load_from_dir(Source::Joint, &dir), LoadOutcome::NoData);
    assert_eq!(
        state.status(),
        &LoadStatus::NoData { expected: "joint-data.csv".to_string() }
    );
    assert!(state.records().is_empty());
    assert!(matches!(state.collect(0, "$1"), Err(RecoveryError::NotLoaded(_))));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_config_overrides_pick_source_and_data_dir() {
    let config = AppConfig::default()
        .with_overrides(|key| match key {
            "RECOVERY_SOURCE" => Some("joint".to_string()),
            "RECOVERY_DATA_DIR" => Some("/srv/exports".to_string()),
            _ => None,
        })
        .unwrap();

    assert_eq!(config.default_source, Source::Joint);
    assert_eq!(config.data_dir, PathBuf::from("/srv/exports"));
    assert_eq!(config.bind_addr, "0.0.0.0:3000");
}

#[test]
fn test_dashboard_serializes_for_api() {
    let state = loaded(Source::Captira, CAPTIRA_EXPORT);

    let json = serde_json::to_value(state.dashboard()).unwrap();

    assert_eq!(json["summary"]["total_records"], 4);
    assert_eq!(json["balance_distribution"][0]["label"], "0–500");
    assert_eq!(json["payment_aging"][3]["label"], "91+ days");
}

#[test]
fn test_sorted_view_orders_by_column() {
    let mut state = loaded(Source::Captira, CAPTIRA_EXPORT);
    let names = |state: &RecoveryState| -> Vec<String> {
        state
            .view()
            .iter()
            .map(|r| r.display_value("Defendant"))
            .collect()
    };

    state
        .set_sort(Some(SortOrder::new("Balance Owed", SortDirection::Desc)))
        .unwrap();
    assert_eq!(names(&state), vec!["Bob Moe", "Ann Poe", "Jane Roe", "John Doe"]);

    state
        .set_sort(Some(SortOrder::new("Last Payment Date", SortDirection::Asc)))
        .unwrap();
    // Jane has no payment date and sorts first
    assert_eq!(names(&state), vec!["Jane Roe", "Bob Moe", "Ann Poe", "John Doe"]);

    // Filtering narrows first, the sort orders what is left
    state.set_year(YearFilter::Year(2024));
    assert_eq!(names(&state), vec!["Ann Poe", "John Doe"]);
}
