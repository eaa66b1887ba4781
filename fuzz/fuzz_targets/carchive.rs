#![no_main]

use libfuzzer_sys::fuzz_target;
use pyscope::archive::CArchive;

fuzz_target!(|data: &[u8]| {
    if let Ok(archive) = CArchive::parse(data) {
        for entry in archive.entries() {
            let _ = archive.read_entry(entry);
        }
    }
});
