use std::path::Path;

use serde_json::{Number, Value};

use crate::record::CircuitRecord;

/// Cell texts read as missing values
const NA_TOKENS: [&str; 7] = ["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Read a local sample CSV into records.
///
/// Cells are typed the way a dataframe reader would type them: blank or NA
/// cells are left out, numeric text becomes a number, true/false become
/// booleans and everything else stays a string.
pub fn read_csv(path: impl AsRef<Path>) -> anyhow::Result<Vec<CircuitRecord>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| anyhow::anyhow!("Failed to open '{}': {}", path.display(), e))?;

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| anyhow::anyhow!("Bad row in '{}': {}", path.display(), e))?;
        let mut record = CircuitRecord::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if let Some(value) = typed_cell(cell) {
                record.set(header, value);
            }
        }
        rows.push(record);
    }
    Ok(rows)
}

fn typed_cell(cell: &str) -> Option<Value> {
    if cell.is_empty() || NA_TOKENS.contains(&cell) {
        return None;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Some(Value::from(i));
    }
    if let Ok(f) = cell.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Some(Value::Number(n));
        }
    }
    match cell.to_ascii_lowercase().as_str() {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => Some(Value::String(cell.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldAccess;
    use serde_json::json;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_cells_are_typed() {
        let file = write_csv(
            "circuit_id,region,bandwidth_mbps,jitter_ms,redundancy,is_redundant,notes\n\
             C-1001,West,1000,4.5,TRUE,1,\n\
             C-1002, East ,100,NA,false,0,reroute pending\n",
        );
        let rows = read_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.field("circuit_id"), Some(&json!("C-1001")));
        assert_eq!(first.field("bandwidth_mbps"), Some(&json!(1000)));
        assert_eq!(first.field("jitter_ms"), Some(&json!(4.5)));
        assert_eq!(first.field("redundancy"), Some(&json!(true)));
        assert_eq!(first.field("is_redundant"), Some(&json!(1)));
        assert_eq!(first.field("notes"), None);

        let second = &rows[1];
        assert_eq!(second.region().as_deref(), Some("East"));
        assert_eq!(second.field("jitter_ms"), None);
        assert_eq!(second.field("redundancy"), Some(&json!(false)));
        assert_eq!(second.field("notes"), Some(&json!("reroute pending")));
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let file = write_csv("circuit_id,region,sla_tier\nC-1,West\n");
        let rows = read_csv(file.path()).unwrap();
        assert_eq!(rows[0].sla_tier(), None);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_csv("no/such/file.csv").is_err());
    }

    #[test]
    fn test_bundled_samples_parse() {
        let circuits = read_csv(concat!(env!("CARGO_MANIFEST_DIR"), "/data/circuits_sample.csv")).unwrap();
        assert!(!circuits.is_empty());
        assert!(circuits.iter().all(|c| c.circuit_id().is_some()));

        let kpis = read_csv(concat!(env!("CARGO_MANIFEST_DIR"), "/data/kpis_sample.csv")).unwrap();
        assert!(!kpis.is_empty());
    }
}
