#![no_main]
use gocov_cobertura::scan::{GoScanner, SourceScanner};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(decls) = GoScanner.scan(data) {
        for decl in decls {
            assert!(decl.start <= decl.end);
        }
    }
});
