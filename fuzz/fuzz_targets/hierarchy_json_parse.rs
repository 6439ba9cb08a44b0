//! Fuzz target for hierarchy flattening.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vepi::hierarchy::Hierarchy;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(hierarchy) = Hierarchy::from_json_slice(data) {
        let table = hierarchy.to_table();
        assert_eq!(table.num_rows(), hierarchy.len());
    }
});
