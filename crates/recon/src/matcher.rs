use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::HashMap;

use log::{debug, error, info, warn};
use ordered_float::OrderedFloat;

use crate::config::MatchingConfig;
use crate::keys::split_composite_id;
use crate::model::MatchResult;
use crate::schema::Field;
use crate::score::{scorer_for, NameNormalizer, Scorer, WRatio};
use crate::store::{ReferenceStore, ReferenceTable};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Minimum score (inclusive) a candidate must reach.
    pub score_cutoff: f64,
    /// Maximum distinct candidate names per query.
    pub limit: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            score_cutoff: 70.0,
            limit: 1,
        }
    }
}

impl From<&MatchingConfig> for MatchOptions {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            score_cutoff: config.score_cutoff,
            limit: config.limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate pool
// ---------------------------------------------------------------------------

/// Unique non-null project names of a reference table, in first-appearance
/// order, with the rows that carry each name.
pub struct CandidatePool<'t> {
    table: &'t ReferenceTable,
    names: Vec<&'t str>,
    keys: Vec<String>,
    rows: Vec<Vec<usize>>,
}

impl<'t> CandidatePool<'t> {
    pub fn new(table: &'t ReferenceTable, normalizer: NameNormalizer) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut names = Vec::new();
        let mut rows: Vec<Vec<usize>> = Vec::new();

        for (i, record) in table.records().iter().enumerate() {
            let Some(name) = record.project_name.as_deref() else {
                continue;
            };
            match index.get(name) {
                Some(&slot) => rows[slot].push(i),
                None => {
                    index.insert(name, names.len());
                    names.push(name);
                    rows.push(vec![i]);
                }
            }
        }

        let keys = names.iter().map(|n| normalizer.apply(n)).collect();
        Self {
            table,
            names,
            keys,
            rows,
        }
    }

    pub fn names(&self) -> &[&'t str] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Name and id matching against a [`ReferenceStore`].
pub struct CoordinateMatcher<'a> {
    store: &'a ReferenceStore,
    scorer: Box<dyn Scorer>,
    normalizer: NameNormalizer,
}

impl<'a> CoordinateMatcher<'a> {
    /// WRatio scoring on raw names.
    pub fn new(store: &'a ReferenceStore) -> Self {
        Self {
            store,
            scorer: Box::new(WRatio),
            normalizer: NameNormalizer::Raw,
        }
    }

    pub fn from_config(store: &'a ReferenceStore, config: &MatchingConfig) -> Self {
        Self {
            store,
            scorer: scorer_for(config.scorer),
            normalizer: NameNormalizer::from_flag(config.normalize_names),
        }
    }

    pub fn with_scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_normalizer(mut self, normalizer: NameNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Fuzzy-match each query against the (optionally country-filtered)
    /// project names. An empty `countries` slice means no filter.
    ///
    /// Every reference row sharing a matched name yields its own result with
    /// the same score.
    pub fn match_plant_names(
        &self,
        names: &[&str],
        countries: &[&str],
        options: &MatchOptions,
    ) -> Vec<MatchResult> {
        let table = self.reference(countries);
        let Some(pool) = self.pool(&table) else {
            return Vec::new();
        };
        let results = self.match_in(&pool, names, options);
        info!(
            "Matched {} plant names from {} queries",
            results.len(),
            names.len()
        );
        results
    }

    /// The reference table, filtered to `countries` unless empty.
    pub fn reference(&self, countries: &[&str]) -> Cow<'a, ReferenceTable> {
        let table = self.store.load();
        if countries.is_empty() {
            Cow::Borrowed(table)
        } else {
            Cow::Owned(table.filter_in(Field::Country, countries))
        }
    }

    /// Candidate pool for `table`, or `None` (logged) when there is nothing
    /// to match against.
    pub fn pool<'t>(&self, table: &'t ReferenceTable) -> Option<CandidatePool<'t>> {
        if table.is_empty() {
            warn!("No GCPT data available for matching");
            return None;
        }
        if let Err(missing) = table.schema().require(&[Field::ProjectName]) {
            error!("{missing} column not found in GCPT data");
            return None;
        }
        Some(CandidatePool::new(table, self.normalizer))
    }

    pub fn match_in(
        &self,
        pool: &CandidatePool<'_>,
        names: &[&str],
        options: &MatchOptions,
    ) -> Vec<MatchResult> {
        let mut results = Vec::new();
        for &query in names {
            if query.trim().is_empty() {
                continue;
            }
            for (candidate, score) in self.rank(pool, query, options) {
                let matched_name = pool.names[candidate];
                for &row in &pool.rows[candidate] {
                    let record = &pool.table.records()[row];
                    results.push(MatchResult::from_record(query, matched_name, score, record));
                }
            }
        }
        results
    }

    /// Candidates scoring at least the cutoff, best first. The sort is
    /// stable, so equal scores keep pool order.
    fn rank(&self, pool: &CandidatePool<'_>, query: &str, options: &MatchOptions) -> Vec<(usize, f64)> {
        let key = self.normalizer.apply(query);
        let mut scored: Vec<(usize, f64)> = pool
            .keys
            .iter()
            .enumerate()
            .map(|(i, candidate)| (i, self.scorer.score(&key, candidate)))
            .filter(|(_, score)| *score >= options.score_cutoff)
            .collect();
        scored.sort_by_key(|&(_, score)| Reverse(OrderedFloat(score)));
        scored.truncate(options.limit);
        scored
    }

    /// Reference rows whose composite id is one of `ids`. No scoring and no
    /// cutoff; ids that do not split into code and generator are ignored.
    pub fn match_ids(&self, ids: &[&str]) -> ReferenceTable {
        let valid: Vec<&str> = ids
            .iter()
            .copied()
            .filter(|id| split_composite_id(id).is_some())
            .collect();
        if valid.len() < ids.len() {
            debug!("Ignoring {} malformed ids", ids.len() - valid.len());
        }

        let matched = self.store.records_for_ids(&valid);
        info!("Matched {} of {} EIA IDs", matched.len(), ids.len());
        matched
    }
}
