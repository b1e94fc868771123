#![no_main]

use std::sync::OnceLock;

use classdex_storage::{IndexReader, IndexWriter, WriteOptions};
use libfuzzer_sys::fuzz_target;

mod utils;

use utils::Runner;

fn run_one(input: &[u8]) {
    let Ok(header) = IndexReader::header(input) else {
        return;
    };
    let Ok(index) = IndexReader::read(input) else {
        return;
    };

    let rewritten = IndexWriter::with_options(WriteOptions::version(header.version))
        .write(&index)
        .expect("a decoded index should always be writable");
    let reread = IndexReader::read(&rewritten).expect("rewritten index should read back");
    assert_eq!(reread.len(), index.len());
}

fuzz_target!(|data: &[u8]| {
    static RUNNER: OnceLock<Runner> = OnceLock::new();
    Runner::get(&RUNNER, "fuzz_read_index", run_one).run(data);
});
