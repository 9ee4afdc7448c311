// SQLite export of crosswalks and the raw GCPT table

use std::collections::HashSet;
use std::path::Path;

use log::{info, warn};
use once_cell::sync::Lazy;
use plantgeo_recon::crosswalk::dedup_by_columns;
use plantgeo_recon::keys::is_strict_composite_id;
use plantgeo_recon::{CrosswalkKey, CrosswalkSource, Table, Value};
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;

use crate::error::IoError;

pub const GCPT_GLOBAL_TABLE: &str = "gcpt_global";
const GCPT_GLOBAL_KEY: &str = "unit_id";

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static regex"));

/// Columns stored as TEXT regardless of how their values look.
const TEXT_COLUMNS: [&str; 4] = ["eia_plant_unit_id", "plant_code", "generator_id", "unit_name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    fn sql(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

/// One table written by `load-db`.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub rows: usize,
    /// Rows removed before insert (malformed keys, duplicate keys).
    pub dropped: usize,
    pub primary_key: Vec<String>,
}

pub fn open(path: &Path) -> Result<Connection, IoError> {
    Ok(Connection::open(path)?)
}

/// Clean a spreadsheet header into a snake_case SQL column name.
///
/// "Country/Area" -> "country_area", "H2 ready turbine (%)?" -> "h2_ready_turbine_pct".
pub fn sanitize_column_name(name: &str) -> String {
    let s = name.trim().replace("(%)", "pct");
    let s = NON_ALPHANUMERIC.replace_all(&s, "_");
    s.trim_matches('_').to_lowercase()
}

/// Narrowest type every non-null value fits. All-null columns are TEXT.
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnType {
    let mut seen = false;
    let mut all_integer = true;
    for value in values {
        let integer = match value {
            Value::Null => continue,
            Value::Bool(_) => true,
            Value::Number(n) => n.fract() == 0.0 && n.abs() < 9.0e15,
            Value::Text(s) => {
                let s = s.trim();
                if s.parse::<i64>().is_ok() {
                    true
                } else if s.parse::<f64>().is_ok_and(|n| n.is_finite()) {
                    false
                } else {
                    return ColumnType::Text;
                }
            }
        };
        seen = true;
        all_integer &= integer;
    }
    match (seen, all_integer) {
        (false, _) => ColumnType::Text,
        (true, true) => ColumnType::Integer,
        (true, false) => ColumnType::Real,
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Number(n) => SqlValue::Real(*n),
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    }
}

/// Drop `name` if it exists and recreate it from `table` in one transaction.
///
/// Column types are inferred from the data; columns in `text_columns` and the
/// primary key are always TEXT.
pub fn load_table(
    conn: &mut Connection,
    name: &str,
    table: &Table,
    primary_key: &[&str],
    text_columns: &[&str],
) -> Result<usize, IoError> {
    let mut definitions: Vec<String> = Vec::with_capacity(table.width());
    for (i, column) in table.columns().iter().enumerate() {
        let forced_text = primary_key.contains(&column.as_str()) || text_columns.contains(&column.as_str());
        let column_type = if forced_text {
            ColumnType::Text
        } else {
            infer_column_type(table.rows().iter().map(|r| &r[i]))
        };
        definitions.push(format!("{} {}", quote_ident(column), column_type.sql()));
    }
    if !primary_key.is_empty() {
        let key: Vec<String> = primary_key.iter().map(|c| quote_ident(c)).collect();
        definitions.push(format!("PRIMARY KEY ({})", key.join(", ")));
    }

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table_name}; CREATE TABLE {table_name} ({defs});",
        table_name = quote_ident(name),
        defs = definitions.join(", ")
    ))?;
    {
        let placeholders: Vec<String> = (1..=table.width()).map(|i| format!("?{i}")).collect();
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({})",
            quote_ident(name),
            placeholders.join(", ")
        ))?;
        for row in table.rows() {
            stmt.execute(params_from_iter(row.iter().map(sql_value)))?;
        }
    }
    tx.commit()?;

    info!("Loaded {name}: {} rows", table.len());
    Ok(table.len())
}

/// Load one crosswalk into `plant_coordinates_<source>` with its primary key.
///
/// The exact-id crosswalk is restricted to strict `"<digits>|<generator>"`
/// ids; every crosswalk keeps the first row of each key.
pub fn load_crosswalk_table(
    conn: &mut Connection,
    source: CrosswalkSource,
    table: &Table,
) -> Result<LoadReport, IoError> {
    let name = source.table_name();
    let key = source.key_columns();
    if let Some(missing) = key.iter().find(|c| !table.has_column(c)) {
        return Err(IoError::MissingColumn {
            table: name,
            column: missing.to_string(),
        });
    }

    let mut filtered = table.clone();
    if source.key() == CrosswalkKey::CompositeId {
        let id_col = table.column_index(key[0]).unwrap_or_default();
        let keep: Vec<usize> = table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| row[id_col].as_str().is_some_and(|id| is_strict_composite_id(id.trim())))
            .map(|(i, _)| i)
            .collect();
        let invalid = table.len() - keep.len();
        if invalid > 0 {
            info!("Dropping {invalid} rows with invalid {}", key[0]);
        }
        filtered = table.select_rows(&keep);
    }
    let deduped = dedup_by_columns(&filtered, key);

    let rows = load_table(conn, &name, &deduped, key, &TEXT_COLUMNS)?;
    Ok(LoadReport {
        table: name,
        rows,
        dropped: table.len() - rows,
        primary_key: key.iter().map(|c| c.to_string()).collect(),
    })
}

/// Load the raw tracker export into `gcpt_global` with sanitized headers.
///
/// `unit_id` becomes the primary key when present, non-null and unique.
pub fn load_gcpt_global(conn: &mut Connection, table: &Table) -> Result<LoadReport, IoError> {
    let mut sanitized = table.clone();
    let mut used: HashSet<String> = HashSet::new();
    let mut index = 0usize;
    sanitized.rename_columns(|c| {
        index += 1;
        let mut name = sanitize_column_name(c);
        if name.is_empty() {
            name = format!("column_{index}");
        }
        let base = name.clone();
        let mut n = 2;
        while !used.insert(name.clone()) {
            name = format!("{base}_{n}");
            n += 1;
        }
        name
    });

    let primary_key: Vec<&str> = match sanitized.column(GCPT_GLOBAL_KEY) {
        Some(values) => {
            let mut seen = HashSet::new();
            let unique = values
                .iter()
                .all(|v| v.to_text().is_some_and(|id| seen.insert(id)));
            if unique {
                vec![GCPT_GLOBAL_KEY]
            } else {
                warn!("{GCPT_GLOBAL_KEY} has blank or duplicate values; {GCPT_GLOBAL_TABLE} loaded without primary key");
                Vec::new()
            }
        }
        None => {
            warn!("{GCPT_GLOBAL_KEY} column not found; {GCPT_GLOBAL_TABLE} loaded without primary key");
            Vec::new()
        }
    };

    let rows = load_table(conn, GCPT_GLOBAL_TABLE, &sanitized, &primary_key, &[])?;
    Ok(LoadReport {
        table: GCPT_GLOBAL_TABLE.to_string(),
        rows,
        dropped: 0,
        primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
    })
}
