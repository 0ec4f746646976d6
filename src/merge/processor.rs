use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::capture::{CaptureFormat, FormatRegistry, InterfaceDescriptor, OutputParams, SectionInfo};
use crate::merge::config::MergeConfig;
use crate::merge::constants::MERGED_SECTION_COMMENT;
use crate::merge::error::{MergeError, MergeStatus};
use crate::merge::frame_type::select_frame_type;
use crate::merge::input::{InputFile, InputFileSet};
use crate::merge::interfaces::merge_interfaces;
use crate::merge::progress::{MergeEvent, ProgressReporter};
use crate::merge::scheduler::RecordScheduler;
use crate::merge::writer::OutputWriter;
use crate::merge::MergeStats;

/// How a merge that did not fail ended.
#[derive(Debug, Clone)]
pub enum MergeOutcome {
    Completed(MergeStats),
    Aborted(MergeStats),
}

impl MergeOutcome {
    pub fn stats(&self) -> &MergeStats {
        match self {
            MergeOutcome::Completed(stats) | MergeOutcome::Aborted(stats) => stats,
        }
    }

    pub fn status(&self) -> MergeStatus {
        match self {
            MergeOutcome::Completed(_) => MergeStatus::Ok,
            MergeOutcome::Aborted(_) => MergeStatus::UserAborted,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, MergeOutcome::Aborted(_))
    }
}

pub struct MergeProcessor {
    config: MergeConfig,
    registry: FormatRegistry,
    output_format: Arc<dyn CaptureFormat>,
    progress: ProgressReporter,
    shutdown_flag: Arc<AtomicBool>,
}

impl MergeProcessor {
    pub fn new(config: MergeConfig, registry: FormatRegistry) -> Result<Self> {
        config.validate()?;

        let output_format = registry.by_name(&config.output_format).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown output format \"{}\" (available: {})",
                config.output_format,
                registry.names().join(", ")
            )
        })?;
        let progress = ProgressReporter::new(config.progress_interval_records);

        Ok(Self {
            config,
            registry,
            output_format,
            progress,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(MergeEvent, &[InputFile]) -> bool + Send + 'static,
    {
        self.progress.set_callback(Box::new(callback));
        self
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = shutdown_flag;
        self
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merges `input_files` into `output_file`. Every input and the output are
    /// closed before this returns, whatever the outcome.
    pub fn process(&mut self, input_files: &[PathBuf], output_file: &Path) -> Result<MergeOutcome, MergeError> {
        let start_time = Instant::now();
        if input_files.is_empty() {
            return Err(MergeError::NoInputFiles);
        }

        let mut inputs = InputFileSet::open(input_files, &self.registry)?;
        self.progress.report(MergeEvent::InputsOpened, inputs.files());

        let encapsulation = select_frame_type(inputs.files().iter().map(InputFile::file_encapsulation));
        self.progress
            .report(MergeEvent::FrameTypeSelected(encapsulation), inputs.files());

        let snaplen = if self.config.snaplen == 0 {
            inputs.max_snapshot_length()
        } else {
            self.config.snaplen
        };

        let lists: Vec<&[InterfaceDescriptor]> = inputs.files().iter().map(InputFile::interfaces).collect();
        let merged = merge_interfaces(&lists, self.config.dedup_mode);
        debug!(
            "Merged {} input interfaces into {} ({:?})",
            lists.iter().map(|l| l.len()).sum::<usize>(),
            merged.interfaces.len(),
            self.config.dedup_mode
        );
        inputs.assign_interface_maps(merged.maps);

        let section = merged_section(inputs.files(), &self.config.app_name);
        let params = OutputParams {
            encapsulation,
            snaplen,
            section: &section,
            interfaces: &merged.interfaces,
        };
        let mut writer = OutputWriter::open(self.output_format.as_ref(), output_file, &params, self.config.snaplen)?;
        self.progress.report(MergeEvent::ReadyToMerge, inputs.files());

        let mut scheduler = RecordScheduler::new(self.config.merge_mode());
        let result = self.run(&mut scheduler, &mut inputs, &mut writer);

        let scheduled = match &result {
            Ok((count, _)) => *count,
            Err(_) => inputs.files().iter().map(InputFile::record_num).sum(),
        };
        self.progress.report(MergeEvent::Done(scheduled), inputs.files());

        let aborted = match result {
            Ok((_, aborted)) => aborted,
            Err(e) => {
                writer.abandon();
                return Err(e);
            }
        };

        let records_written = writer.close()?;
        let stats = MergeStats {
            input_files: inputs.len(),
            input_bytes: inputs.total_size(),
            records_written,
            merged_interfaces: merged.interfaces.len(),
            output_encapsulation: encapsulation,
            output_snaplen: snaplen,
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        };
        drop(inputs);

        if aborted {
            info!("Merge aborted after {} records", stats.records_written);
            Ok(MergeOutcome::Aborted(stats))
        } else {
            Ok(MergeOutcome::Completed(stats))
        }
    }

    /// Drives the scheduling loop; returns the scheduled count and whether
    /// the merge was aborted.
    fn run(
        &mut self,
        scheduler: &mut RecordScheduler,
        inputs: &mut InputFileSet,
        writer: &mut OutputWriter,
    ) -> Result<(u64, bool), MergeError> {
        let mut count = 0u64;

        while let Some((index, record)) = scheduler.next_record(inputs.files_mut())? {
            count += 1;
            if self.progress.report(MergeEvent::RecordScheduled(count), inputs.files()) || self.shutdown_requested() {
                return Ok((count, true));
            }
            writer.write(index, &inputs.files()[index], record)?;
        }

        Ok((count, false))
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }
}

/// Section metadata for the output: the first input's section, stamped with
/// the application name and a comment listing the merged files.
fn merged_section(files: &[InputFile], app_name: &str) -> SectionInfo {
    let mut section = files
        .first()
        .and_then(|f| f.section())
        .cloned()
        .unwrap_or_default();

    let mut comment = MERGED_SECTION_COMMENT.to_string();
    for (index, file) in files.iter().enumerate() {
        comment.push_str(&format!("\nFile{}: {}", index + 1, file.file_name()));
    }
    section.comments.push(comment);
    section.user_application = Some(app_name.to_string());
    section
}
