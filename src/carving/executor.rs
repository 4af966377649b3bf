use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::buffer::CarveBuffer;
use super::output::OutputLayout;
use super::plan::{CarveFileInfo, CarvePlan, ChunkCarveType};
use crate::config::OutputConfig;
use crate::error::{Result, ScoopError};
use crate::formats;
use crate::io::ChunkSource;
use crate::report::{CarveFailure, CarveReport, CarvedFile};
use crate::types::{AnalysisFileInfo, AnalysisResult, MatchPair, Offset};

/// Carves every candidate in `pairs` out of `source` into the configured
/// output tree. Directory creation failures abort the pass; a failure to
/// write one file is recorded in the report and the pass continues.
pub fn carve_phase<S: ChunkSource + ?Sized>(
    source: &mut S,
    chunk_size: usize,
    pairs: &[MatchPair],
    config: &OutputConfig,
) -> Result<CarveReport> {
    let layout = OutputLayout::new(config);
    carve_with_layout(source, chunk_size, pairs, config, &layout)
}

pub fn carve_with_layout<S: ChunkSource + ?Sized>(
    source: &mut S,
    chunk_size: usize,
    pairs: &[MatchPair],
    config: &OutputConfig,
    layout: &OutputLayout,
) -> Result<CarveReport> {
    if chunk_size == 0 {
        return Err(ScoopError::InvalidChunkSize(chunk_size));
    }

    let plan = CarvePlan::build(pairs, chunk_size, source.size());
    let mut carver = Carver {
        source,
        plan: &plan,
        buffer: CarveBuffer::new(chunk_size),
        sink: Sink {
            layout,
            write_unrecognised: config.unrecognised_output,
            streams: HashMap::new(),
            report: CarveReport::default(),
        },
    };

    let outcome = carver.run();
    carver.sink.cleanup();
    outcome?;

    let report = carver.sink.report;
    info!(
        carved = report.carved.len(),
        failed = report.failures.len(),
        skipped = report.skipped_unrecognised,
        "Carve pass complete"
    );
    Ok(report)
}

struct Carver<'a, S: ?Sized> {
    source: &'a mut S,
    plan: &'a CarvePlan,
    buffer: CarveBuffer,
    sink: Sink<'a>,
}

impl<S: ChunkSource + ?Sized> Carver<'_, S> {
    fn run(&mut self) -> Result<()> {
        let plan = self.plan;
        let Some(last) = plan.last_important_chunk() else {
            return Ok(());
        };

        let mut keep = false;
        let mut carried: HashMap<usize, Offset> = HashMap::new();

        for chunk in 0..=last {
            let work = plan.work(chunk);
            if work.is_empty() {
                keep = false;
                carried.clear();
                continue;
            }

            self.buffer.load(&mut *self.source, chunk as u64, keep)?;
            keep = false;
            let mut carry_next = HashMap::new();

            for item in work {
                let file = plan.file(item.file_id);
                match item.carve_type {
                    ChunkCarveType::StartStopCarve => {
                        let data = self.buffer.fetch(item.start, item.stop);
                        self.sink.write_whole(item.file_id, file, data)?;
                    }
                    ChunkCarveType::StartNextStopCarve => {
                        carry_next.insert(item.file_id, item.start);
                        keep = true;
                    }
                    ChunkCarveType::StartCarve => {
                        let data = self.buffer.fetch(item.start, item.stop);
                        self.sink.open_staged(item.file_id, file, data)?;
                    }
                    ChunkCarveType::ContinueCarve => {
                        let data = self.buffer.fetch(item.start, item.stop);
                        self.sink.append(item.file_id, file, data);
                    }
                    ChunkCarveType::StopCarve => match carried.remove(&item.file_id) {
                        Some(start) => {
                            let data = self.buffer.get_with_last(start, item.stop);
                            self.sink.write_whole(item.file_id, file, data)?;
                        }
                        None => {
                            let data = self.buffer.fetch(item.start, item.stop);
                            self.sink.finish_staged(item.file_id, file, data)?;
                        }
                    },
                    ChunkCarveType::SkipCarve => {}
                }
            }

            carried = carry_next;
        }

        Ok(())
    }
}

struct Staged {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Output side of the carve pass: validation, placement and bookkeeping.
struct Sink<'a> {
    layout: &'a OutputLayout,
    write_unrecognised: bool,
    streams: HashMap<usize, Staged>,
    report: CarveReport,
}

impl Sink<'_> {
    fn write_whole(&mut self, file_id: usize, file: &CarveFileInfo, data: &[u8]) -> Result<()> {
        let (verdict, info) = formats::validate(file.file_type, data);
        if self.skip(file_id, verdict) {
            return Ok(());
        }

        let path = self.layout.path_for(verdict, file.file_type, &file.filename)?;
        match fs::write(&path, data) {
            Ok(()) => self.record(file_id, file, path, verdict, info),
            Err(e) => self.fail(file_id, file, ScoopError::file_write(path, e)),
        }
        Ok(())
    }

    fn open_staged(&mut self, file_id: usize, file: &CarveFileInfo, data: &[u8]) -> Result<()> {
        let path = self.layout.staging_path(file_id, &file.filename)?;
        let mut writer = match File::create(&path) {
            Ok(f) => BufWriter::new(f),
            Err(e) => {
                self.fail(file_id, file, ScoopError::file_write(path, e));
                return Ok(());
            }
        };

        if let Err(e) = writer.write_all(data) {
            drop(writer);
            let _ = fs::remove_file(&path);
            self.fail(file_id, file, ScoopError::file_write(path, e));
            return Ok(());
        }

        debug!(file_id, path = ?path, "Staging multi-chunk file");
        self.streams.insert(file_id, Staged { path, writer });
        Ok(())
    }

    /// Appends to an open staging file. Files whose staging already failed
    /// are ignored.
    fn append(&mut self, file_id: usize, file: &CarveFileInfo, data: &[u8]) {
        let Some(staged) = self.streams.get_mut(&file_id) else {
            return;
        };
        if let Err(e) = staged.writer.write_all(data) {
            if let Some(staged) = self.streams.remove(&file_id) {
                let path = staged.path.clone();
                drop(staged);
                let _ = fs::remove_file(&path);
                self.fail(file_id, file, ScoopError::file_write(path, e));
            }
        }
    }

    /// Closes a staging file, validates its complete contents, and moves it
    /// to the directory for its verdict.
    fn finish_staged(&mut self, file_id: usize, file: &CarveFileInfo, data: &[u8]) -> Result<()> {
        self.append(file_id, file, data);
        let Some(Staged { path: staged, mut writer }) = self.streams.remove(&file_id) else {
            return Ok(());
        };

        let flushed = writer.flush();
        drop(writer);
        let contents = flushed.and_then(|()| fs::read(&staged));
        let contents = match contents {
            Ok(c) => c,
            Err(e) => {
                let _ = fs::remove_file(&staged);
                self.fail(file_id, file, ScoopError::file_write(staged, e));
                return Ok(());
            }
        };

        let (verdict, info) = formats::validate(file.file_type, &contents);
        drop(contents);
        if self.skip(file_id, verdict) {
            let _ = fs::remove_file(&staged);
            return Ok(());
        }

        let path = match self.layout.path_for(verdict, file.file_type, &file.filename) {
            Ok(p) => p,
            Err(e) => {
                let _ = fs::remove_file(&staged);
                return Err(e);
            }
        };
        match fs::rename(&staged, &path) {
            Ok(()) => self.record(file_id, file, path, verdict, info),
            Err(e) => {
                let _ = fs::remove_file(&staged);
                self.fail(file_id, file, ScoopError::file_write(path, e));
            }
        }
        Ok(())
    }

    fn skip(&mut self, file_id: usize, verdict: AnalysisResult) -> bool {
        if verdict == AnalysisResult::Unrecognised && !self.write_unrecognised {
            debug!(file_id, "Dropping unrecognised candidate");
            self.report.skipped_unrecognised += 1;
            return true;
        }
        false
    }

    fn record(
        &mut self,
        file_id: usize,
        file: &CarveFileInfo,
        path: PathBuf,
        verdict: AnalysisResult,
        info: AnalysisFileInfo,
    ) {
        debug!(file_id, path = ?path, %verdict, "Carved file");
        self.report.carved.push(CarvedFile {
            file_id,
            path,
            file_type: file.file_type,
            verdict,
            start: file.start,
            stop: file.stop,
            info,
        });
    }

    fn fail(&mut self, file_id: usize, file: &CarveFileInfo, error: ScoopError) {
        warn!(file_id, filename = %file.filename, error = %error, "Failed to write carved file");
        self.report.failures.push(CarveFailure {
            file_id,
            filename: file.filename.clone(),
            file_type: file.file_type,
            error: error.to_string(),
        });
    }

    /// Removes staging files left behind by an aborted pass, then the staging
    /// directory if it is empty.
    fn cleanup(&mut self) {
        for (_, staged) in self.streams.drain() {
            let Staged { path, writer } = staged;
            drop(writer);
            let _ = fs::remove_file(path);
        }
        let _ = fs::remove_dir(self.layout.staging_dir());
    }
}
