#![no_main]

use std::sync::OnceLock;

use classdex_index::Indexer;
use classdex_storage::{IndexReader, IndexWriter};
use libfuzzer_sys::fuzz_target;

mod utils;

use utils::Runner;

fn run_one(input: &[u8]) {
    let mut indexer = Indexer::new();
    if indexer.index_bytes(input).is_err() {
        return;
    }
    let index = indexer.complete();

    // Whatever parses must also survive storage.
    let bytes = IndexWriter::new()
        .write(&index)
        .expect("indexed classes should always be writable");
    let read = IndexReader::read(&bytes).expect("written index should read back");
    assert_eq!(read.len(), index.len());
}

fuzz_target!(|data: &[u8]| {
    static RUNNER: OnceLock<Runner> = OnceLock::new();
    Runner::get(&RUNNER, "fuzz_parse_class", run_one).run(data);
});
