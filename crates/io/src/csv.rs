// CSV/TSV table import/export

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use plantgeo_recon::{Table, Value};

use crate::error::IoError;

/// Read a delimited file with a header row. The delimiter is sniffed.
pub fn read_table(path: &Path) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    read_table_from_str(&content)
}

pub fn read_table_from_str(content: &str) -> Result<Table, IoError> {
    let delimiter = sniff_delimiter(content);
    parse_table(content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins. Pipe is not a
/// candidate: composite plant ids use it inside values.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b','];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with the header's field count, weighted by that count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |source| IoError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel-exported CSVs are usually Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn parse_table(content: &str, delimiter: u8) -> Result<Table, IoError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = Table::new(headers);
    for result in reader.records() {
        let record = result?;
        table.push_row(record.iter().map(Value::text).collect());
    }
    Ok(table)
}

/// Write `table` as comma-separated values with a header row. Nulls are empty fields.
pub fn write_table(table: &Table, path: &Path) -> Result<(), IoError> {
    let file = std::fs::File::create(path).map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_table_to(table, file).map_err(|e| match e {
        IoError::Write { source, .. } => IoError::Write {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

pub fn write_table_to<W: Write>(table: &Table, out: W) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush().map_err(|source| IoError::Write {
        path: PathBuf::from("-"),
        source,
    })?;
    Ok(())
}
