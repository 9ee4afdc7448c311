use std::collections::BTreeMap;

use serde::Serialize;

use crate::coords::validate_coordinates;
use crate::schema::Field;
use crate::table::Value;

// ---------------------------------------------------------------------------
// Reference rows
// ---------------------------------------------------------------------------

/// One normalized row of the reference (GCPT) table.
///
/// Every field is optional: a column can be absent from the source file and a
/// cell can be blank. Columns the engine does not know about are kept in
/// `extra` under their original header.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlantRecord {
    pub project_name: Option<String>,
    pub unit_name: Option<String>,
    pub country: Option<String>,
    pub subnational: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<String>,
    pub capacity_mw: Option<f64>,
    pub eia_plant_unit_id: Option<String>,
    #[serde(skip)]
    pub extra: BTreeMap<String, Value>,
}

impl PlantRecord {
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::ProjectName => self.project_name.as_deref(),
            Field::UnitName => self.unit_name.as_deref(),
            Field::Country => self.country.as_deref(),
            Field::Subnational => self.subnational.as_deref(),
            Field::Status => self.status.as_deref(),
            Field::ExternalId => self.eia_plant_unit_id.as_deref(),
            Field::Latitude | Field::Longitude | Field::CapacityMw => None,
        }
    }

    pub fn value(&self, field: Field) -> Value {
        match field {
            Field::Latitude => Value::from_opt_f64(self.latitude),
            Field::Longitude => Value::from_opt_f64(self.longitude),
            Field::CapacityMw => Value::from_opt_f64(self.capacity_mw),
            _ => Value::from_opt_str(self.text(field)),
        }
    }

    pub fn set(&mut self, field: Field, value: &Value) {
        match field {
            Field::ProjectName => self.project_name = value.to_text(),
            Field::UnitName => self.unit_name = value.to_text(),
            Field::Country => self.country = value.to_text(),
            Field::Subnational => self.subnational = value.to_text(),
            Field::Status => self.status = value.to_text(),
            Field::ExternalId => self.eia_plant_unit_id = value.to_text(),
            Field::Latitude => self.latitude = value.as_f64(),
            Field::Longitude => self.longitude = value.as_f64(),
            Field::CapacityMw => self.capacity_mw = value.as_f64(),
        }
    }

    pub fn has_valid_coordinates(&self) -> bool {
        validate_coordinates(self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// Match output
// ---------------------------------------------------------------------------

/// One (query, reference row) pair that cleared the score cutoff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub query_name: String,
    pub matched_name: String,
    pub score: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: Option<String>,
    pub unit_name: Option<String>,
}

impl MatchResult {
    pub fn from_record(query: &str, matched_name: &str, score: f64, record: &PlantRecord) -> Self {
        Self {
            query_name: query.to_string(),
            matched_name: matched_name.to_string(),
            score,
            latitude: record.latitude,
            longitude: record.longitude,
            country: record.country.clone(),
            unit_name: record.unit_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_coerces_numeric_fields() {
        let mut r = PlantRecord::default();
        r.set(Field::Latitude, &Value::text("45.88"));
        r.set(Field::Longitude, &Value::text("not a number"));
        r.set(Field::UnitName, &Value::Number(1.0));
        assert_eq!(r.latitude, Some(45.88));
        assert_eq!(r.longitude, None);
        assert_eq!(r.unit_name.as_deref(), Some("1"));
        assert!(!r.has_valid_coordinates());
    }

    #[test]
    fn value_roundtrips_through_field() {
        let mut r = PlantRecord::default();
        r.set(Field::ExternalId, &Value::text("6076|1"));
        assert_eq!(r.value(Field::ExternalId), Value::text("6076|1"));
        assert_eq!(r.value(Field::CapacityMw), Value::Null);
    }
}
