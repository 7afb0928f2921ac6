//! Test logger: forwards to `env_logger` and keeps the records of the
//! calling thread so tests can assert on emitted warnings.

use std::cell::RefCell;

use log::{Level, Log, Metadata, Record};

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

struct CaptureLogger {
    inner: env_logger::Logger,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.with(|captured| {
            captured
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

pub fn init_logger() {
    let inner = env_logger::builder().is_test(true).build();
    if log::set_boxed_logger(Box::new(CaptureLogger { inner })).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}

/// Drain the records logged so far on this thread.
pub fn take_logs() -> Vec<(Level, String)> {
    CAPTURED.with(|captured| captured.borrow_mut().drain(..).collect())
}

/// Messages logged at `level` on this thread since the last drain.
pub fn take_messages(level: Level) -> Vec<String> {
    take_logs()
        .into_iter()
        .filter(|(logged, _)| *logged == level)
        .map(|(_, message)| message)
        .collect()
}
