use std::collections::BTreeSet;
use std::fmt;

use crate::table::Table;

/// Canonical reference columns.
///
/// Each field knows the header GCPT ships it under and the snake_case name
/// the rest of the engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    ProjectName,
    UnitName,
    Country,
    Subnational,
    Latitude,
    Longitude,
    Status,
    CapacityMw,
    ExternalId,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::ProjectName,
        Field::UnitName,
        Field::Country,
        Field::Subnational,
        Field::Latitude,
        Field::Longitude,
        Field::Status,
        Field::CapacityMw,
        Field::ExternalId,
    ];

    pub fn canonical(&self) -> &'static str {
        match self {
            Self::ProjectName => "project_name",
            Self::UnitName => "unit_name",
            Self::Country => "country",
            Self::Subnational => "subnational",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::Status => "status",
            Self::CapacityMw => "capacity_mw",
            Self::ExternalId => "eia_plant_unit_id",
        }
    }

    pub fn source_header(&self) -> &'static str {
        match self {
            Self::ProjectName => "Project Name",
            Self::UnitName => "Unit Name",
            Self::Country => "Country/Area",
            Self::Subnational => "Subnational",
            Self::Latitude => "Latitude",
            Self::Longitude => "Longitude",
            Self::Status => "Status",
            Self::CapacityMw => "Capacity (MW)",
            Self::ExternalId => "EIA plant + unit ID",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Latitude | Self::Longitude | Self::CapacityMw)
    }

    pub fn from_canonical(name: &str) -> Option<Field> {
        Self::ALL.into_iter().find(|f| f.canonical() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Map a known GCPT header to its canonical name; anything else passes through.
pub fn normalize_header(header: &str) -> String {
    let trimmed = header.trim();
    Field::ALL
        .into_iter()
        .find(|f| f.source_header() == trimmed)
        .map(|f| f.canonical().to_string())
        .unwrap_or_else(|| header.to_string())
}

pub fn normalize_columns(table: &mut Table) {
    table.rename_columns(normalize_header);
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Which canonical fields a loaded table actually carries.
///
/// Builders and the matcher check [`Schema::has`] or [`Schema::require`]
/// before reading a canonical field; an absent column means "missing data",
/// not a panic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: BTreeSet<Field>,
}

impl Schema {
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            fields: columns
                .iter()
                .filter_map(|c| Field::from_canonical(c.as_ref()))
                .collect(),
        }
    }

    pub fn has(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// First missing field among `required`, if any.
    pub fn require(&self, required: &[Field]) -> Result<(), Field> {
        match required.iter().find(|f| !self.has(**f)) {
            Some(missing) => Err(*missing),
            None => Ok(()),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().copied()
    }
}
