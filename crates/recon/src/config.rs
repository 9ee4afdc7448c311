use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Crosswalk build and matching configuration.
///
/// Every key is optional; an empty file yields the defaults below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    /// Directory searched for the GCPT workbook.
    pub data_dir: PathBuf,
    /// Directory crosswalk files are written to and read from.
    pub crosswalk_dir: PathBuf,
    pub matching: MatchingConfig,
    pub regions: RegionsConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/gcpt"),
            crosswalk_dir: PathBuf::from("data/crosswalks"),
            matching: MatchingConfig::default(),
            regions: RegionsConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    pub score_cutoff: f64,
    pub limit: usize,
    pub scorer: ScorerKind,
    /// Lowercase and strip punctuation before scoring.
    pub normalize_names: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            score_cutoff: 70.0,
            limit: 1,
            scorer: ScorerKind::default(),
            normalize_names: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    #[default]
    Wratio,
    JaroWinkler,
}

impl std::fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wratio => write!(f, "wratio"),
            Self::JaroWinkler => write!(f, "jaro_winkler"),
        }
    }
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionsConfig {
    /// Countries covered by the ENTSO-E crosswalk.
    pub entsoe: RegionConfig,
    /// Countries covered by the India NPP crosswalk.
    pub npp: RegionConfig,
}

impl Default for RegionsConfig {
    fn default() -> Self {
        Self {
            entsoe: RegionConfig::new(EUROPEAN_COUNTRIES),
            npp: RegionConfig::new(&["India"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    pub countries: Vec<String>,
}

impl RegionConfig {
    pub fn new(countries: &[&str]) -> Self {
        Self {
            countries: countries.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// GCPT country names of the ENTSO-E member states tracked by default.
pub const EUROPEAN_COUNTRIES: &[&str] = &[
    "Germany",
    "France",
    "Poland",
    "United Kingdom",
    "Italy",
    "Spain",
    "Netherlands",
    "Belgium",
    "Czech Republic",
    "Greece",
    "Romania",
    "Bulgaria",
    "Austria",
    "Hungary",
    "Slovakia",
    "Finland",
    "Denmark",
    "Portugal",
    "Ireland",
    "Slovenia",
    "Croatia",
    "Estonia",
    "Latvia",
    "Lithuania",
    "Luxembourg",
];

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let cutoff = self.matching.score_cutoff;
        if !(0.0..=100.0).contains(&cutoff) {
            return Err(ReconError::ConfigValidation(format!(
                "matching.score_cutoff must be within 0..=100, got {cutoff}"
            )));
        }

        if self.matching.limit == 0 {
            return Err(ReconError::ConfigValidation(
                "matching.limit must be at least 1".into(),
            ));
        }

        for (name, region) in [("entsoe", &self.regions.entsoe), ("npp", &self.regions.npp)] {
            if region.countries.iter().all(|c| c.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "regions.{name}.countries must list at least one country"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
