use crate::capture::{Record, Timestamp};
use crate::merge::error::MergeError;
use crate::merge::input::{InputFile, InputState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Interleave all inputs by timestamp.
    Chronological,
    /// Concatenate inputs in the order given.
    Append,
}

/// Decides which input supplies the next output record.
pub struct RecordScheduler {
    mode: MergeMode,
}

impl RecordScheduler {
    pub fn new(mode: MergeMode) -> Self {
        Self { mode }
    }

    /// Next record together with the index of its input, or `None` once every
    /// input is exhausted. A read error ends the merge.
    pub fn next_record(&mut self, files: &mut [InputFile]) -> Result<Option<(usize, Record)>, MergeError> {
        match self.mode {
            MergeMode::Chronological => Self::next_chronological(files),
            MergeMode::Append => Self::next_appended(files),
        }
    }

    fn next_chronological(files: &mut [InputFile]) -> Result<Option<(usize, Record)>, MergeError> {
        for (index, file) in files.iter_mut().enumerate() {
            if file.state() == InputState::NotPresent {
                file.fill(index)?;
            }
        }

        // Strictly-earlier comparison in index order: ties go to the lower index.
        let mut earliest: Option<(usize, Timestamp)> = None;
        for (index, file) in files.iter().enumerate() {
            let ts = match file.pending_timestamp() {
                Some(ts) => ts,
                None => continue,
            };
            match earliest {
                Some((_, best)) if !ts.is_earlier_than(&best) => {}
                _ => earliest = Some((index, ts)),
            }
        }

        Ok(earliest.and_then(|(index, _)| files[index].take().map(|record| (index, record))))
    }

    fn next_appended(files: &mut [InputFile]) -> Result<Option<(usize, Record)>, MergeError> {
        for (index, file) in files.iter_mut().enumerate() {
            if file.state() == InputState::AtEof {
                continue;
            }
            if let Some(record) = file.read_direct(index)? {
                return Ok(Some((index, record)));
            }
        }
        Ok(None)
    }
}
