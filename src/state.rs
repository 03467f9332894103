// 🧭 Recovery state - single owner of the active record set
//
// Every load carries a generation token and only the newest one is applied.
// Records are replaced as a whole array (never edited through a shared
// reference) and each replace bumps the version.

use crate::aggregate::{aggregate, Dashboard};
use crate::collection::{collect, parse_collection_amount, CollectionReceipt};
use crate::error::{RecoveryError, Result};
use crate::filter::{
    apply_criteria, available_years, BalanceRange, FilterCriteria, SortOrder, YearFilter,
};
use crate::loader::{load_source, Dataset};
use crate::record::CanonicalRecord;
use crate::schema::{schema_for, visible_columns};
use crate::source::Source;
use chrono::{Local, NaiveDate};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// LOAD LIFECYCLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    /// Load failed or the export was empty; names the file that was expected
    NoData { expected: String },
}

/// Handed out by [`RecoveryState::begin_load`]; a result is applied only if
/// its ticket is still the newest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTicket {
    pub source: Source,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Applied { records: usize },
    NoData,
    Stale,
}

/// Current bounds and selections for the filter controls
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterControls {
    pub min: f64,
    pub max: f64,
    pub available_years: Vec<i32>,
    pub year_filter_enabled: bool,
    pub criteria: FilterCriteria,
    /// Records in the filtered view ("Total records: N")
    pub record_count: usize,
}

// ============================================================================
// STATE CONTAINER
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecoveryState {
    source: Source,
    generation: u64,
    version: u64,
    status: LoadStatus,
    headers: Vec<String>,
    records: Arc<Vec<CanonicalRecord>>,
    dashboard: Dashboard,
    bounds: BalanceRange,
    criteria: FilterCriteria,
    today: NaiveDate,
}

impl RecoveryState {
    /// Create an idle state; `today` anchors the payment aging chart
    pub fn new(source: Source, today: NaiveDate) -> Self {
        let mut state = RecoveryState {
            source,
            generation: 0,
            version: 0,
            status: LoadStatus::Idle,
            headers: Vec::new(),
            records: Arc::new(Vec::new()),
            dashboard: Dashboard::default(),
            bounds: BalanceRange::default(),
            criteria: FilterCriteria::default(),
            today,
        };
        state.recompute();
        state
    }

    pub fn for_today(source: Source) -> Self {
        RecoveryState::new(source, Local::now().date_naive())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    /// Cheap handle on the current array; later collections do not affect it
    pub fn snapshot(&self) -> Arc<Vec<CanonicalRecord>> {
        Arc::clone(&self.records)
    }

    pub fn record(&self, index: usize) -> Option<&CanonicalRecord> {
        self.records.iter().find(|r| r.original_index == index)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn visible_columns(&self) -> Vec<String> {
        visible_columns(self.source, &self.headers)
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn bounds(&self) -> BalanceRange {
        self.bounds
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Switch to `source` and discard the current set. The returned ticket
    /// must accompany the result in [`RecoveryState::finish_load`].
    pub fn begin_load(&mut self, source: Source) -> LoadTicket {
        self.generation += 1;
        self.source = source;
        self.status = LoadStatus::Loading;
        self.headers.clear();
        self.criteria = FilterCriteria::default();
        self.replace_records(Vec::new());

        info!("Loading {} (generation {})", source, self.generation);

        LoadTicket {
            source,
            generation: self.generation,
        }
    }

    /// Apply a finished load if `ticket` is still current. A failed load
    /// leaves an empty set and the "no data" status.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: anyhow::Result<Dataset>) -> LoadOutcome {
        if ticket.generation != self.generation {
            warn!(
                "Discarding stale {} load (generation {}, current {})",
                ticket.source, ticket.generation, self.generation
            );
            return LoadOutcome::Stale;
        }

        let dataset = match result {
            Ok(dataset) if !dataset.records.is_empty() => dataset,
            Ok(_) => {
                warn!("No records found in {}", ticket.source.file_name());
                self.mark_no_data(ticket.source);
                return LoadOutcome::NoData;
            }
            Err(e) => {
                warn!("Error loading {}: {:#}", ticket.source, e);
                self.mark_no_data(ticket.source);
                return LoadOutcome::NoData;
            }
        };

        let count = dataset.records.len();
        self.headers = dataset.headers;
        self.status = LoadStatus::Loaded;
        self.replace_records(dataset.records);

        LoadOutcome::Applied { records: count }
    }

    /// Begin and finish a load from the data directory in one step
    pub fn load_from_dir(&mut self, source: Source, data_dir: &Path) -> LoadOutcome {
        let ticket = self.begin_load(source);
        let result = load_source(source, data_dir);
        self.finish_load(ticket, result)
    }

    fn mark_no_data(&mut self, source: Source) {
        self.headers.clear();
        self.status = LoadStatus::NoData {
            expected: source.file_name().to_string(),
        };
        self.replace_records(Vec::new());
    }

    // ------------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------------

    pub fn set_year(&mut self, year: YearFilter) {
        self.criteria.year = year;
    }

    pub fn set_balance_range(&mut self, min: f64, max: f64) -> Result<()> {
        self.criteria.balance_range = BalanceRange::new(min, max)?;
        Ok(())
    }

    pub fn reset_balance_range(&mut self) {
        self.criteria.balance_range = self.bounds;
    }

    pub fn set_search(&mut self, term: &str) {
        self.criteria.search = term.to_string();
    }

    /// Order the view by a loaded column, or restore export order with `None`
    pub fn set_sort(&mut self, sort: Option<SortOrder>) -> Result<()> {
        if let Some(order) = &sort {
            if !self.headers.iter().any(|h| *h == order.column) {
                return Err(RecoveryError::UnknownColumn(order.column.clone()));
            }
        }
        self.criteria.sort = sort;
        Ok(())
    }

    /// Step the sort through the visible columns, then back to unsorted
    pub fn cycle_sort(&mut self) {
        let columns = self.visible_columns();
        self.criteria.sort = SortOrder::cycle(self.criteria.sort.as_ref(), &columns);
    }

    pub fn flip_sort_direction(&mut self) {
        if let Some(order) = self.criteria.sort.as_mut() {
            order.direction = order.direction.flip();
        }
    }

    /// The record table: the authoritative source of the visible record count
    pub fn view(&self) -> Vec<CanonicalRecord> {
        apply_criteria(&self.records, self.source, &self.criteria)
    }

    pub fn filter_controls(&self) -> FilterControls {
        FilterControls {
            min: self.bounds.min,
            max: self.bounds.max,
            available_years: available_years(&self.records),
            year_filter_enabled: schema_for(self.source).supports_year_filter(),
            criteria: self.criteria.clone(),
            record_count: self.view().len(),
        }
    }

    // ------------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------------

    /// Record a collection typed by the user. Rejected input changes nothing.
    pub fn collect(&mut self, index: usize, input: &str) -> Result<CollectionReceipt> {
        if self.status != LoadStatus::Loaded {
            return Err(RecoveryError::NotLoaded(self.source.name().to_string()));
        }

        let amount = parse_collection_amount(input)?;
        let (updated, receipt) = collect(&self.records, index, amount)?;
        self.replace_records(updated);

        Ok(receipt)
    }

    /// Move the aging anchor (e.g. after midnight) and recompute
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
        self.recompute();
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Swap in a new array, then recompute the dashboard and the balance
    /// bounds. The balance range follows the new bounds.
    fn replace_records(&mut self, records: Vec<CanonicalRecord>) {
        self.records = Arc::new(records);
        self.version += 1;
        self.recompute();
        self.criteria.balance_range = self.bounds;
    }

    fn recompute(&mut self) {
        self.dashboard = aggregate(&self.records, self.source, self.today);
        self.bounds = BalanceRange::bounds(&self.records);
    }
}

// ============================================================================
// TESTS
// ============================================================================
