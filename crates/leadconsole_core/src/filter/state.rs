//! Filter state store and page cursor.
//!
//! # Responsibility
//! - Own the composed filter (facets, free text, score range, sort).
//! - Own the 1-based page cursor and its reset rules.
//!
//! # Invariants
//! - Every filter-mutating operation resets the page cursor to 1.
//! - `set_page` never touches filter state.
//! - No store operation can fail; validation happens when a `ScoreRange` is
//!   built, before it can enter a patch.

use crate::filter::facet::{
    normalize_term, normalize_terms, toggle, Facet, FacetSet, WHITESPACE_RE,
};
use crate::filter::{FilterError, ValidationError};
use crate::model::lead::{LeadIntent, LeadQuality, LeadStatus, MAX_SCORE};
use log::debug;
use serde::{Deserialize, Serialize};

/// Closed score interval `[low, high]` with `0 <= low <= high <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u8; 2]", into = "[u8; 2]")]
pub struct ScoreRange {
    low: u8,
    high: u8,
}

impl ScoreRange {
    /// Builds a validated range.
    ///
    /// # Errors
    /// - `ScoreOutOfBounds` when either bound exceeds 100.
    /// - `InvertedScoreRange` when `low > high`.
    pub fn new(low: u8, high: u8) -> Result<Self, ValidationError> {
        for value in [low, high] {
            if value > MAX_SCORE {
                return Err(ValidationError::ScoreOutOfBounds { value });
            }
        }
        if low > high {
            return Err(ValidationError::InvertedScoreRange { low, high });
        }
        Ok(Self { low, high })
    }

    /// The unrestricted `[0, 100]` range.
    pub const fn full() -> Self {
        Self {
            low: 0,
            high: MAX_SCORE,
        }
    }

    pub fn low(&self) -> u8 {
        self.low
    }

    pub fn high(&self) -> u8 {
        self.high
    }

    pub fn contains(&self, score: u8) -> bool {
        (self.low..=self.high).contains(&score)
    }

    pub fn is_full(&self) -> bool {
        *self == Self::full()
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self::full()
    }
}

impl TryFrom<[u8; 2]> for ScoreRange {
    type Error = ValidationError;

    fn try_from(value: [u8; 2]) -> Result<Self, Self::Error> {
        Self::new(value[0], value[1])
    }
}

impl From<ScoreRange> for [u8; 2] {
    fn from(value: ScoreRange) -> Self {
        [value.low, value.high]
    }
}

/// Result ordering understood by every query executor.
///
/// Executors must break ties by lead id ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Most recently created first.
    #[default]
    Recent,
    /// Oldest created first.
    Oldest,
    ScoreHigh,
    ScoreLow,
    /// Customer name, case-insensitive ascending.
    Name,
}

impl SortOrder {
    pub const ALL: [SortOrder; 5] = [
        SortOrder::Recent,
        SortOrder::Oldest,
        SortOrder::ScoreHigh,
        SortOrder::ScoreLow,
        SortOrder::Name,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Oldest => "oldest",
            Self::ScoreHigh => "score-high",
            Self::ScoreLow => "score-low",
            Self::Name => "name",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sort| sort.as_str() == value.trim())
    }
}

/// Composed console filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub status: FacetSet<LeadStatus>,
    pub lead_quality: FacetSet<LeadQuality>,
    pub intent: FacetSet<LeadIntent>,
    pub area: FacetSet<String>,
    pub tag: FacetSet<String>,
    pub score_range: ScoreRange,
    pub sort: SortOrder,
    pub free_text: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            status: [LeadStatus::New, LeadStatus::InProgress].into(),
            lead_quality: FacetSet::new(),
            intent: FacetSet::new(),
            area: FacetSet::new(),
            tag: FacetSet::new(),
            score_range: ScoreRange::full(),
            sort: SortOrder::Recent,
            free_text: String::new(),
        }
    }
}

impl FilterState {
    /// Returns free text with surrounding whitespace removed and inner runs
    /// collapsed, or `None` when blank.
    pub fn normalized_query(&self) -> Option<String> {
        let trimmed = self.free_text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(WHITESPACE_RE.replace_all(trimmed, " ").into_owned())
    }
}

/// Shallow patch for `FilterStore::update_filters`.
///
/// `None` fields leave the matching filter key untouched; `Some` fields
/// replace it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterPatch {
    pub status: Option<FacetSet<LeadStatus>>,
    pub lead_quality: Option<FacetSet<LeadQuality>>,
    pub intent: Option<FacetSet<LeadIntent>>,
    pub area: Option<FacetSet<String>>,
    pub tag: Option<FacetSet<String>>,
    pub score_range: Option<ScoreRange>,
    pub sort: Option<SortOrder>,
    pub free_text: Option<String>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, values: impl IntoIterator<Item = LeadStatus>) -> Self {
        self.status = Some(values.into_iter().collect());
        self
    }

    pub fn lead_quality(mut self, values: impl IntoIterator<Item = LeadQuality>) -> Self {
        self.lead_quality = Some(values.into_iter().collect());
        self
    }

    pub fn intent(mut self, values: impl IntoIterator<Item = LeadIntent>) -> Self {
        self.intent = Some(values.into_iter().collect());
        self
    }

    pub fn area<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.area = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn tag<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.tag = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn score_range(mut self, range: ScoreRange) -> Self {
        self.score_range = Some(range);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn free_text(mut self, text: impl Into<String>) -> Self {
        self.free_text = Some(text.into());
        self
    }
}

/// Which part of the store a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Filters,
    Page,
}

/// Outcome of one store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterChange {
    pub kind: ChangeKind,
    /// Monotonic store revision after the mutation.
    pub revision: u64,
    /// Page cursor after the mutation.
    pub page: u32,
}

/// Owner of the filter state and the page cursor.
#[derive(Debug, Clone)]
pub struct FilterStore {
    state: FilterState,
    page: u32,
    revision: u64,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self {
            state: FilterState::default(),
            page: 1,
            revision: 0,
        }
    }
}

impl FilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Shallow-merges `patch` into the current filter and resets the page.
    pub fn update_filters(&mut self, patch: &FilterPatch) -> FilterChange {
        if let Some(status) = &patch.status {
            self.state.status = status.clone();
        }
        if let Some(lead_quality) = &patch.lead_quality {
            self.state.lead_quality = lead_quality.clone();
        }
        if let Some(intent) = &patch.intent {
            self.state.intent = intent.clone();
        }
        if let Some(area) = &patch.area {
            self.state.area = normalize_terms(area);
        }
        if let Some(tag) = &patch.tag {
            self.state.tag = normalize_terms(tag);
        }
        if let Some(score_range) = patch.score_range {
            self.state.score_range = score_range;
        }
        if let Some(sort) = patch.sort {
            self.state.sort = sort;
        }
        if let Some(free_text) = &patch.free_text {
            self.state.free_text = free_text.clone();
        }
        self.filters_changed("update_filters")
    }

    /// Restores the initial defaults and resets the page.
    pub fn clear_filters(&mut self) -> FilterChange {
        self.state = FilterState::default();
        self.filters_changed("clear_filters")
    }

    /// Replaces the free-text query and resets the page.
    pub fn set_query(&mut self, text: impl Into<String>) -> FilterChange {
        self.state.free_text = text.into();
        self.filters_changed("set_query")
    }

    /// Moves the page cursor without touching the filter.
    ///
    /// `0` is treated as `1` so the cursor stays 1-based.
    pub fn set_page(&mut self, page: u32) -> FilterChange {
        self.page = page.max(1);
        self.revision += 1;
        debug!(
            "event=page_set module=filter status=ok page={} revision={}",
            self.page, self.revision
        );
        FilterChange {
            kind: ChangeKind::Page,
            revision: self.revision,
            page: self.page,
        }
    }

    pub fn toggle_status(&mut self, status: LeadStatus) -> FilterChange {
        let next = toggle(&self.state.status, status);
        self.update_filters(&FilterPatch {
            status: Some(next),
            ..FilterPatch::default()
        })
    }

    pub fn toggle_lead_quality(&mut self, quality: LeadQuality) -> FilterChange {
        let next = toggle(&self.state.lead_quality, quality);
        self.update_filters(&FilterPatch {
            lead_quality: Some(next),
            ..FilterPatch::default()
        })
    }

    pub fn toggle_intent(&mut self, intent: LeadIntent) -> FilterChange {
        let next = toggle(&self.state.intent, intent);
        self.update_filters(&FilterPatch {
            intent: Some(next),
            ..FilterPatch::default()
        })
    }

    /// Toggles one area term.
    ///
    /// # Errors
    /// - `EmptyFacetValue` when `raw` normalizes to nothing.
    pub fn toggle_area(&mut self, raw: &str) -> Result<FilterChange, FilterError> {
        let term = normalize_term(raw).ok_or(FilterError::EmptyFacetValue(Facet::Area))?;
        let next = toggle(&self.state.area, term);
        Ok(self.update_filters(&FilterPatch {
            area: Some(next),
            ..FilterPatch::default()
        }))
    }

    /// Toggles one tag term.
    ///
    /// # Errors
    /// - `EmptyFacetValue` when `raw` normalizes to nothing.
    pub fn toggle_tag(&mut self, raw: &str) -> Result<FilterChange, FilterError> {
        let term = normalize_term(raw).ok_or(FilterError::EmptyFacetValue(Facet::Tag))?;
        let next = toggle(&self.state.tag, term);
        Ok(self.update_filters(&FilterPatch {
            tag: Some(next),
            ..FilterPatch::default()
        }))
    }

    /// Toggles a facet value given by its wire name.
    ///
    /// Values outside a closed enumeration are rejected; state and page
    /// cursor stay untouched in that case.
    ///
    /// # Errors
    /// - `UnknownFacetValue` for closed facets and unknown names.
    /// - `EmptyFacetValue` for blank open-vocabulary terms.
    pub fn toggle_facet_value(
        &mut self,
        facet: Facet,
        raw: &str,
    ) -> Result<FilterChange, FilterError> {
        let unknown = || FilterError::UnknownFacetValue {
            facet,
            value: raw.trim().to_string(),
        };
        match facet {
            Facet::Status => {
                let status = LeadStatus::parse(raw).ok_or_else(unknown)?;
                Ok(self.toggle_status(status))
            }
            Facet::LeadQuality => {
                let quality = LeadQuality::parse(raw).ok_or_else(unknown)?;
                Ok(self.toggle_lead_quality(quality))
            }
            Facet::Intent => {
                let intent = LeadIntent::parse(raw).ok_or_else(unknown)?;
                Ok(self.toggle_intent(intent))
            }
            Facet::Area => self.toggle_area(raw),
            Facet::Tag => self.toggle_tag(raw),
        }
    }

    fn filters_changed(&mut self, operation: &str) -> FilterChange {
        self.page = 1;
        self.revision += 1;
        debug!(
            "event=filters_changed module=filter status=ok op={} revision={} page=1",
            operation, self.revision
        );
        FilterChange {
            kind: ChangeKind::Filters,
            revision: self.revision,
            page: self.page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterPatch, FilterState, FilterStore, ScoreRange, SortOrder};
    use crate::filter::ValidationError;

    #[test]
    fn score_range_rejects_inverted_and_out_of_bounds() {
        assert_eq!(
            ScoreRange::new(60, 40),
            Err(ValidationError::InvertedScoreRange { low: 60, high: 40 })
        );
        assert_eq!(
            ScoreRange::new(0, 101),
            Err(ValidationError::ScoreOutOfBounds { value: 101 })
        );
        let range = ScoreRange::new(20, 20).unwrap();
        assert!(range.contains(20));
        assert!(!range.contains(21));
    }

    #[test]
    fn score_range_deserialization_validates() {
        let ok: ScoreRange = serde_json::from_str("[10,90]").unwrap();
        assert_eq!((ok.low(), ok.high()), (10, 90));
        assert!(serde_json::from_str::<ScoreRange>("[90,10]").is_err());
    }

    #[test]
    fn sort_order_wire_names() {
        assert_eq!(SortOrder::parse("score-high"), Some(SortOrder::ScoreHigh));
        assert_eq!(
            serde_json::to_string(&SortOrder::ScoreLow).unwrap(),
            "\"score-low\""
        );
        assert_eq!(SortOrder::parse("relevance"), None);
    }

    #[test]
    fn normalized_query_collapses_whitespace() {
        let state = FilterState {
            free_text: "  sea   view \t villa ".to_string(),
            ..FilterState::default()
        };
        assert_eq!(state.normalized_query().as_deref(), Some("sea view villa"));
        assert_eq!(FilterState::default().normalized_query(), None);
    }

    #[test]
    fn set_page_zero_clamps_to_first_page() {
        let mut store = FilterStore::new();
        assert_eq!(store.set_page(0).page, 1);
    }

    #[test]
    fn patch_area_terms_are_normalized_on_apply() {
        let mut store = FilterStore::new();
        store.update_filters(&FilterPatch::new().area(["Downtown", " downtown ", "Old Town"]));
        assert_eq!(
            store.state().area.as_slice(),
            &["downtown".to_string(), "old-town".to_string()]
        );
    }

    #[test]
    fn revision_increases_on_every_mutation() {
        let mut store = FilterStore::new();
        let first = store.set_query("a");
        let second = store.set_page(3);
        assert!(second.revision > first.revision);
        assert_eq!(store.revision(), second.revision);
    }
}
