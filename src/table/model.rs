//! Column-oriented table used for every import and export.

use std::collections::HashSet;
use std::fmt;

use crate::error::VenaError;

/// A single cell value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Borrow the text content, if this is a `Text` cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the cell the way it is written to CSV; `Null` renders empty.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// An ordered set of uniquely named, equal-length columns.
///
/// Construction checks both invariants, so a `Table` value is always
/// rectangular and never has two columns with the same name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<Scalar>>,
}

impl Table {
    /// Builds a table from `(name, values)` pairs.
    pub fn new<N: Into<String>>(columns: Vec<(N, Vec<Scalar>)>) -> Result<Self, VenaError> {
        let (names, columns): (Vec<String>, Vec<Vec<Scalar>>) = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .unzip();

        check_unique(&names)?;

        if let Some(first) = columns.first() {
            let expected = first.len();
            for (name, values) in names.iter().zip(&columns) {
                if values.len() != expected {
                    return Err(VenaError::InvalidTable(format!(
                        "column '{}' has {} values, expected {}",
                        name,
                        values.len(),
                        expected
                    )));
                }
            }
        }

        Ok(Self { names, columns })
    }

    /// Creates a table with the given columns and no rows.
    pub fn with_columns<N: Into<String>>(names: Vec<N>) -> Result<Self, VenaError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        check_unique(&names)?;
        let columns = vec![Vec::new(); names.len()];
        Ok(Self { names, columns })
    }

    /// Builds a table from a header and row-major values.
    pub fn from_rows<N: Into<String>>(
        names: Vec<N>,
        rows: impl IntoIterator<Item = Vec<Scalar>>,
    ) -> Result<Self, VenaError> {
        let mut table = Self::with_columns(names)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Appends one row; its length must match the column count.
    pub fn push_row(&mut self, row: Vec<Scalar>) -> Result<(), VenaError> {
        if row.len() != self.names.len() {
            return Err(VenaError::InvalidTable(format!(
                "row {} has {} values, expected {}",
                self.num_rows(),
                row.len(),
                self.names.len()
            )));
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(value);
        }
        Ok(())
    }

    /// Appends every row of `other`, which must have identical column names.
    pub fn append(&mut self, other: Table) -> Result<(), VenaError> {
        if other.names != self.names {
            return Err(VenaError::InvalidTable(format!(
                "cannot append table with columns {:?} to table with columns {:?}",
                other.names, self.names
            )));
        }
        for (column, values) in self.columns.iter_mut().zip(other.columns) {
            column.extend(values);
        }
        Ok(())
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[Scalar]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    /// True when the table has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0 || self.num_columns() == 0
    }

    /// Returns row `index` as cell references in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Scalar>> {
        if index >= self.num_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c[index]).collect())
    }

    /// Iterates rows in order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Scalar>> + '_ {
        (0..self.num_rows()).map(move |idx| self.columns.iter().map(|c| &c[idx]).collect())
    }

    /// Fails with the list of `required` columns this table lacks.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), VenaError> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| !self.names.iter().any(|n| n == name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(VenaError::InvalidTable(format!(
                "missing required columns: {}",
                missing.join(", ")
            )))
        }
    }
}

fn check_unique(names: &[String]) -> Result<(), VenaError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(VenaError::InvalidTable(format!(
                "duplicate column name '{name}'"
            )));
        }
    }
    Ok(())
}
