//! Fuzz target for CSV table parsing.
//!
//! Any table with at least one column that parses must encode again and
//! parse back unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vepi::table::{from_csv_slice, to_csv_bytes};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(table) = from_csv_slice(data) {
        if table.num_columns() == 0 {
            return;
        }
        if let Ok(encoded) = to_csv_bytes(&table) {
            let reparsed = from_csv_slice(&encoded).expect("encoded table reparses");
            assert_eq!(reparsed, table);
        }
    }
});
