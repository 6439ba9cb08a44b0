//! Fuzz target for export page parsing.
//!
//! Feeds arbitrary bytes to the intersection page parser and the
//! continuation rules, checking for panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vepi::export::ExportPage;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(page) = ExportPage::from_json_slice(data) {
        let _ = page.next(1);
        let _ = page.next(50_000);
    }
});
