use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

pub const MAX_INPUT_SIZE: usize = 256 * 1024;

const TIMEOUT: Duration = Duration::from_secs(1);

/// Runs each input on a dedicated worker thread so that a hang is reported
/// as a failure instead of stalling the fuzzer.
pub struct Runner {
    name: &'static str,
    input_tx: mpsc::SyncSender<Vec<u8>>,
    output_rx: Mutex<mpsc::Receiver<()>>,
}

impl Runner {
    pub fn get(cell: &'static OnceLock<Runner>, name: &'static str, run_one: fn(&[u8])) -> &'static Runner {
        cell.get_or_init(|| {
            let (input_tx, input_rx) = mpsc::sync_channel::<Vec<u8>>(0);
            let (output_tx, output_rx) = mpsc::sync_channel::<()>(0);

            std::thread::spawn(move || {
                for input in input_rx {
                    run_one(&input);
                    let _ = output_tx.send(());
                }
            });

            Runner {
                name,
                input_tx,
                output_rx: Mutex::new(output_rx),
            }
        })
    }

    pub fn run(&self, data: &[u8]) {
        let cap = data.len().min(MAX_INPUT_SIZE);
        self.input_tx
            .send(data[..cap].to_vec())
            .unwrap_or_else(|_| panic!("{} worker thread exited", self.name));

        let output_rx = self
            .output_rx
            .lock()
            .unwrap_or_else(|_| panic!("{} worker receiver poisoned", self.name));
        match output_rx.recv_timeout(TIMEOUT) {
            Ok(()) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => panic!("{} fuzz target timed out", self.name),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                panic!("{} worker thread panicked", self.name)
            }
        }
    }
}
