//! CSV reading and writing.
//!
//! Reads are eager: a stage loads whole tables into memory. Any failure to
//! open or parse an input is reported as [`TableError::InputFormat`].
//! Writes go to a temporary sibling file that is renamed into place only
//! once the table has been fully serialized, so an aborted stage never
//! leaves a truncated output behind.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::TableError;

/// Reads a comma-separated file with a header row into typed records.
///
/// # Errors
///
/// Returns [`TableError::InputFormat`] if the file is missing or any row
/// fails to deserialize.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, TableError> {
    read_csv_with_delimiter(path, b',')
}

/// Reads a delimited file with a header row into typed records.
///
/// # Errors
///
/// Returns [`TableError::InputFormat`] if the file is missing or any row
/// fails to deserialize.
pub fn read_csv_with_delimiter<T: DeserializeOwned>(
    path: &Path,
    delimiter: u8,
) -> Result<Vec<T>, TableError> {
    let file = File::open(path).map_err(|e| TableError::InputFormat {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let rows = read_csv_from(file, delimiter).map_err(|e| TableError::InputFormat {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    log::info!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Deserializes every record from a delimited reader.
///
/// # Errors
///
/// Returns the first CSV or deserialization error encountered.
pub fn read_csv_from<R: Read, T: DeserializeOwned>(
    reader: R,
    delimiter: u8,
) -> Result<Vec<T>, csv::Error> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader)
        .deserialize()
        .collect()
}

/// Serializes typed rows to a CSV file, header derived from the row type.
///
/// # Errors
///
/// Returns an error if the file cannot be created, serialized or renamed.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), TableError> {
    write_atomically(path, |out| {
        write_csv_to(out, rows)?;
        Ok(())
    })?;

    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Serializes typed rows to any writer.
///
/// # Errors
///
/// Returns the first serialization error.
pub fn write_csv_to<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes a table whose columns are only known at runtime.
///
/// # Errors
///
/// Returns an error if the file cannot be created, written or renamed.
pub fn write_records(
    path: &Path,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<(), TableError> {
    write_atomically(path, |out| {
        let mut csv_writer = csv::Writer::from_writer(out);
        csv_writer.write_record(headers)?;
        for row in rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush().map_err(csv::Error::from)?;
        Ok(())
    })?;

    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Formats an optional float for a runtime-typed CSV cell (empty when absent).
#[must_use]
pub fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_atomically<F>(path: &Path, write: F) -> Result<(), TableError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), TableError>,
{
    let write_err = |source| TableError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp = temp_path(path);
    let result = File::create(&tmp)
        .map_err(write_err)
        .and_then(|file| {
            let mut out = BufWriter::new(file);
            write(&mut out)?;
            out.flush().map_err(write_err)
        })
        .and_then(|()| fs::rename(&tmp, path).map_err(write_err));

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        name: String,
        value: Option<f64>,
    }

    #[test]
    fn reads_semicolon_delimited_rows() {
        let data = "name;value\na;1.5\nb;\n";
        let rows: Vec<Row> = read_csv_from(data.as_bytes(), b';').unwrap();
        assert_eq!(
            rows,
            vec![
                Row {
                    name: "a".into(),
                    value: Some(1.5)
                },
                Row {
                    name: "b".into(),
                    value: None
                },
            ]
        );
    }

    #[test]
    fn writes_missing_values_as_empty_fields() {
        let mut out = Vec::new();
        write_csv_to(
            &mut out,
            &[Row {
                name: "a".into(),
                value: None,
            }],
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "name,value\na,\n");
    }

    #[test]
    fn missing_file_is_an_input_format_error() {
        let err = read_csv::<Row>(Path::new("/nonexistent/ub_table/input.csv")).unwrap_err();
        assert!(
            matches!(err, TableError::InputFormat { .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn temp_path_is_a_sibling() {
        assert_eq!(
            temp_path(Path::new("outputs/table.csv")),
            PathBuf::from("outputs/table.csv.tmp")
        );
    }

    #[test]
    fn write_then_read_leaves_no_temp_file() {
        let dir = std::env::temp_dir().join(format!("ub_table_io_{}", std::process::id()));
        let path = dir.join("rows.csv");
        let rows = vec![Row {
            name: "x".into(),
            value: Some(2.0),
        }];

        write_csv(&path, &rows).unwrap();
        let read: Vec<Row> = read_csv(&path).unwrap();

        assert_eq!(read, rows);
        assert!(!temp_path(&path).exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
