//! The tabular payload exchanged with Vena.
//!
//! A [`Table`] is an ordered set of named columns of equal length. Imports
//! serialize it to CSV (file upload) or JSON rows (direct data); exports and
//! hierarchy reads build one from the API's responses.
//!
//! # Example
//!
//! ```
//! use vepi::table::{Scalar, Table};
//!
//! let table = Table::new(vec![
//!     ("Account", vec![Scalar::from("3910"), Scalar::from("3910")]),
//!     ("Value", vec![Scalar::Int(1000), Scalar::Int(2000)]),
//! ])?;
//! assert_eq!(table.num_rows(), 2);
//! # Ok::<(), vepi::VenaError>(())
//! ```

mod io_csv;
mod io_json;
mod model;

pub use io_csv::{
    from_csv_slice, from_csv_str, read_csv, to_csv_bytes, to_csv_string, write_csv,
};
pub use io_json::{arrays_json, records_json, rows_to_json};
pub use model::{Scalar, Table};
