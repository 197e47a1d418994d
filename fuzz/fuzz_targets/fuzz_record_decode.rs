//! Fuzz target: `ConfigRecord::decode`
//!
//! Feeds arbitrary blobs to the persisted-record decoder and asserts that
//! it never panics and that anything it accepts re-encodes to a blob it
//! accepts again with identical fields.
//!
//! cargo fuzz run fuzz_record_decode

#![no_main]

use fieldnode::store::record::ConfigRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(record) = ConfigRecord::decode(data) else {
        return;
    };
    assert!(record.is_sealed(), "decoded record must be sealed");

    let again = ConfigRecord::decode(&record.encode()).expect("canonical encoding decodes");
    assert_eq!(again, record);
});
