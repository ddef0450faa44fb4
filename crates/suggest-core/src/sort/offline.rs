//! Out-of-core merge sort over length-prefixed record files.
//!
//! Input is read into partitions bounded by the RAM budget, each partition
//! sorted in memory and written to a temporary file. Whenever the number of
//! partitions reaches `max_temp_files` they are merged into one intermediate
//! file; the survivors are k-way merged into the output at the end.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tracing::{debug, debug_span};

use super::sequences::{ByteSequencesReader, ByteSequencesWriter};
use super::SortError;
use crate::settings::settings;

pub const MB: usize = 1024 * 1024;

/// Default RAM budget when nothing better is known.
pub const DEFAULT_BUFFER_SIZE_MB: usize = 32;

/// Smallest RAM budget accepted.
pub const ABSOLUTE_MIN_SORT_BUFFER_SIZE: usize = MB / 2;

/// Default cap on simultaneously open partitions.
pub const MAX_TEMP_FILES: usize = 128;

/// Bookkeeping charged per buffered entry on top of its bytes.
const ENTRY_OVERHEAD: usize = std::mem::size_of::<Vec<u8>>();

/// RAM budget for one in-memory partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSize(usize);

impl BufferSize {
    pub fn bytes(bytes: usize) -> Result<Self, SortError> {
        if bytes < ABSOLUTE_MIN_SORT_BUFFER_SIZE {
            return Err(SortError::BufferTooSmall(bytes));
        }
        Ok(Self(bytes))
    }

    pub fn megabytes(mb: usize) -> Result<Self, SortError> {
        if mb == 0 || mb > 2048 {
            return Err(SortError::InvalidConfig(format!(
                "buffer of {mb} MB must be in 1..=2048"
            )));
        }
        Self::bytes(mb * MB)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for BufferSize {
    fn default() -> Self {
        Self(DEFAULT_BUFFER_SIZE_MB * MB)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOptions {
    pub buffer: BufferSize,
    pub max_temp_files: usize,
    /// Directory for partitions and spill files; the system temp dir if unset.
    pub temp_dir: Option<PathBuf>,
}

impl Default for SortOptions {
    /// Values from the `[sort]` settings section.
    fn default() -> Self {
        let s = &settings().sort;
        Self {
            buffer: BufferSize::megabytes(s.ram_buffer_mb).unwrap_or_default(),
            max_temp_files: s.max_temp_files,
            temp_dir: s.temp_dir.clone(),
        }
    }
}

/// Statistics of one `OfflineSorter::sort` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortInfo {
    pub lines: usize,
    /// Partitions and intermediate files created.
    pub temp_merge_files: usize,
    pub merge_rounds: usize,
    pub read_time: Duration,
    pub sort_time: Duration,
    pub merge_time: Duration,
    pub total_time: Duration,
    pub buffer_size: usize,
}

impl fmt::Display for SortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time={:.2} sec. total ({:.2} reading, {:.2} sorting, {:.2} merging), \
             lines={}, temp files={}, merges={}, soft ram limit={:.2} MB",
            self.total_time.as_secs_f64(),
            self.read_time.as_secs_f64(),
            self.sort_time.as_secs_f64(),
            self.merge_time.as_secs_f64(),
            self.lines,
            self.temp_merge_files,
            self.merge_rounds,
            self.buffer_size as f64 / MB as f64,
        )
    }
}

#[derive(Debug, Clone)]
pub struct OfflineSorter {
    options: SortOptions,
}

impl OfflineSorter {
    pub fn new(options: SortOptions) -> Result<Self, SortError> {
        if options.max_temp_files < 2 {
            return Err(SortError::InvalidConfig(format!(
                "max_temp_files must be at least 2, got {}",
                options.max_temp_files
            )));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &SortOptions {
        &self.options
    }

    /// Sort the records of `input` into `output`. The input file is left in
    /// place; on failure the output is removed.
    pub fn sort(&self, input: &Path, output: &Path) -> Result<SortInfo, SortError> {
        let _span = debug_span!("offline_sort", input = %input.display()).entered();
        let result = self.sort_inner(input, output);
        if result.is_err() {
            let _ = fs::remove_file(output);
        }
        result
    }

    fn sort_inner(&self, input: &Path, output: &Path) -> Result<SortInfo, SortError> {
        let start = Instant::now();
        let mut info = SortInfo {
            buffer_size: self.options.buffer.get(),
            ..SortInfo::default()
        };

        let mut reader = ByteSequencesReader::new(BufReader::new(File::open(input)?));
        let mut partitions: Vec<NamedTempFile> = Vec::new();
        let mut buffer: Vec<Vec<u8>> = Vec::new();

        loop {
            let lines = self.read_partition(&mut reader, &mut buffer, &mut info)?;
            if lines == 0 {
                break;
            }
            info.lines += lines;
            partitions.push(self.sort_partition(&mut buffer, &mut info)?);
            info.temp_merge_files += 1;

            if partitions.len() == self.options.max_temp_files {
                let intermediate = self.temp_file("intermediate")?;
                self.merge_partitions(
                    &partitions,
                    BufWriter::new(intermediate.reopen()?),
                    &mut info,
                )?;
                partitions.clear();
                partitions.push(intermediate);
                info.temp_merge_files += 1;
            }
        }

        match partitions.len() {
            0 => {
                File::create(output)?;
            }
            1 => {
                let single = partitions.remove(0);
                if let Err(e) = single.persist(output) {
                    // Rename fails across filesystems; fall back to a copy.
                    debug!(error = %e.error, "rename of sorted partition failed, copying");
                    let mut src = e.file.reopen()?;
                    let mut dst = File::create(output)?;
                    io::copy(&mut src, &mut dst)?;
                    dst.flush()?;
                }
            }
            _ => {
                let out = BufWriter::new(File::create(output)?);
                self.merge_partitions(&partitions, out, &mut info)?;
            }
        }

        info.total_time = start.elapsed();
        debug!(%info, "offline sort finished");
        Ok(info)
    }

    /// Create a spill file in the configured temp directory.
    pub(crate) fn temp_file(&self, kind: &str) -> Result<NamedTempFile, SortError> {
        let suffix = format!(".{kind}");
        let mut builder = tempfile::Builder::new();
        builder.prefix("sort-").suffix(&suffix);
        let file = match &self.options.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }

    fn read_partition<R: Read>(
        &self,
        reader: &mut ByteSequencesReader<R>,
        buffer: &mut Vec<Vec<u8>>,
        info: &mut SortInfo,
    ) -> Result<usize, SortError> {
        let start = Instant::now();
        let mut used = 0;
        while let Some(entry) = reader.read()? {
            used += entry.len() + ENTRY_OVERHEAD;
            buffer.push(entry);
            if used >= self.options.buffer.get() {
                break;
            }
        }
        info.read_time += start.elapsed();
        Ok(buffer.len())
    }

    fn sort_partition(
        &self,
        buffer: &mut Vec<Vec<u8>>,
        info: &mut SortInfo,
    ) -> Result<NamedTempFile, SortError> {
        let start = Instant::now();
        buffer.sort_unstable();
        info.sort_time += start.elapsed();

        let file = self.temp_file("partition")?;
        let mut out = ByteSequencesWriter::new(BufWriter::new(file.reopen()?));
        for entry in buffer.drain(..) {
            out.write(&entry)?;
        }
        out.finish()?;
        Ok(file)
    }

    fn merge_partitions<W: Write>(
        &self,
        partitions: &[NamedTempFile],
        out: W,
        info: &mut SortInfo,
    ) -> Result<(), SortError> {
        let start = Instant::now();
        let mut out = ByteSequencesWriter::new(out);

        let mut readers = Vec::with_capacity(partitions.len());
        for partition in partitions {
            readers.push(ByteSequencesReader::new(BufReader::new(partition.reopen()?)));
        }

        let mut queue = BinaryHeap::with_capacity(readers.len());
        for (index, reader) in readers.iter_mut().enumerate() {
            if let Some(head) = reader.read()? {
                queue.push(Reverse((head, index)));
            }
        }
        while let Some(Reverse((head, index))) = queue.pop() {
            out.write(&head)?;
            if let Some(next) = readers[index].read()? {
                queue.push(Reverse((next, index)));
            }
        }
        out.finish()?;

        info.merge_time += start.elapsed();
        info.merge_rounds += 1;
        debug!(partitions = partitions.len(), "merged sort partitions");
        Ok(())
    }
}
