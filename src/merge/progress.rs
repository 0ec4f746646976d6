use std::time::Instant;
use tracing::{debug, info};

use crate::capture::Encapsulation;
use crate::merge::input::{InputFile, InputState};
use crate::utils::{format_bytes, format_duration};

/// Lifecycle points reported during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEvent {
    InputsOpened,
    FrameTypeSelected(Encapsulation),
    ReadyToMerge,
    /// Running count of records scheduled so far.
    RecordScheduled(u64),
    /// Final count of records scheduled.
    Done(u64),
}

/// Caller hook invoked in-line at every [`MergeEvent`] with the current
/// state of all inputs. Returning `true` after `RecordScheduled` aborts.
pub type ProgressCallback = Box<dyn FnMut(MergeEvent, &[InputFile]) -> bool + Send>;

pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    interval_records: u64,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(interval_records: u64) -> Self {
        Self {
            callback: None,
            interval_records: interval_records.max(1),
            started: Instant::now(),
        }
    }

    pub fn set_callback(&mut self, callback: ProgressCallback) {
        self.callback = Some(callback);
    }

    /// Reports an event; true means the caller requested an abort.
    pub fn report(&mut self, event: MergeEvent, files: &[InputFile]) -> bool {
        self.log(event, files);

        let abort = match self.callback.as_mut() {
            Some(callback) => callback(event, files),
            None => false,
        };
        matches!(event, MergeEvent::RecordScheduled(_)) && abort
    }

    fn log(&mut self, event: MergeEvent, files: &[InputFile]) {
        match event {
            MergeEvent::InputsOpened => {
                self.started = Instant::now();
                let total: u64 = files.iter().map(|f| f.size()).sum();
                debug!("Opened {} input files ({})", files.len(), format_bytes(total));
            }
            MergeEvent::FrameTypeSelected(encapsulation) => {
                debug!("Output encapsulation: {}", encapsulation);
            }
            MergeEvent::ReadyToMerge => debug!("Ready to merge"),
            MergeEvent::RecordScheduled(count) if count % self.interval_records == 0 => {
                let exhausted = files.iter().filter(|f| f.state() == InputState::AtEof).count();
                info!(
                    "Merge progress: {} records, {}/{} inputs exhausted",
                    count,
                    exhausted,
                    files.len()
                );
            }
            MergeEvent::RecordScheduled(_) => {}
            MergeEvent::Done(count) => {
                info!(
                    "Merge finished: {} records in {}",
                    count,
                    format_duration(self.started.elapsed().as_secs_f64())
                );
            }
        }
    }
}
