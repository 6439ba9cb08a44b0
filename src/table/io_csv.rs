//! CSV reader and writer for [`Table`].
//!
//! The writer produces what the Vena file importer expects:
//! - A header row with the column names
//! - Every field quoted, with embedded quotes doubled (RFC 4180)
//! - `Null` cells written as empty strings
//!
//! The reader is the inverse. Every cell comes back as [`Scalar::Text`],
//! because CSV carries no type information.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::model::{Scalar, Table};
use crate::error::VenaError;

/// Reads a table from a CSV file with a header row.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use vepi::table::read_csv;
///
/// let table = read_csv(Path::new("actuals.csv"))?;
/// # Ok::<(), vepi::VenaError>(())
/// ```
pub fn read_csv(path: &Path) -> Result<Table, VenaError> {
    let file = File::open(path).map_err(VenaError::Io)?;
    read_from(BufReader::new(file), path)
}

/// Writes a table to a CSV file.
pub fn write_csv(path: &Path, table: &Table) -> Result<(), VenaError> {
    let file = File::create(path).map_err(VenaError::Io)?;
    let writer = write_into(BufWriter::new(file), table, path)?;
    writer
        .into_inner()
        .map_err(|e| VenaError::Io(e.into_error()))?
        .flush()
        .map_err(VenaError::Io)
}

/// Reads a table from a CSV string.
pub fn from_csv_str(csv_str: &str) -> Result<Table, VenaError> {
    from_csv_slice(csv_str.as_bytes())
}

/// Reads a table from CSV bytes.
///
/// Useful for fuzzing and for inspecting upload bodies.
pub fn from_csv_slice(bytes: &[u8]) -> Result<Table, VenaError> {
    read_from(bytes, Path::new("<bytes>"))
}

/// Writes a table to CSV bytes.
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>, VenaError> {
    let writer = write_into(Vec::new(), table, Path::new("<bytes>"))?;
    writer
        .into_inner()
        .map_err(|e| VenaError::Io(e.into_error()))
}

/// Writes a table to a CSV string.
pub fn to_csv_string(table: &Table) -> Result<String, VenaError> {
    let bytes = to_csv_bytes(table)?;
    String::from_utf8(bytes).map_err(|e| {
        VenaError::InvalidTable(format!("CSV output is not valid UTF-8: {e}"))
    })
}

fn read_from<R: Read>(reader: R, path: &Path) -> Result<Table, VenaError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let parse_err = |source| VenaError::CsvParse {
        path: path.to_path_buf(),
        source,
    };

    let names: Vec<String> = csv_reader
        .headers()
        .map_err(parse_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = Table::with_columns(names)?;
    for result in csv_reader.records() {
        let record = result.map_err(parse_err)?;
        table.push_row(record.iter().map(Scalar::from).collect())?;
    }

    Ok(table)
}

fn write_into<W: Write>(
    writer: W,
    table: &Table,
    path: &Path,
) -> Result<csv::Writer<W>, VenaError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);

    let write_err = |source| VenaError::CsvWrite {
        path: path.to_path_buf(),
        source,
    };

    csv_writer
        .write_record(table.column_names())
        .map_err(write_err)?;
    for row in table.rows() {
        csv_writer
            .write_record(row.iter().map(|cell| cell.to_string()))
            .map_err(write_err)?;
    }

    Ok(csv_writer)
}
