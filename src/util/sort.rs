//! External sorting for newline-delimited byte records.
//!
//! Dictionary files can be arbitrarily large, so the word-index builder must
//! not hold every entry in memory at once. [`LineSorter`] splits its input
//! into bounded in-memory runs, sorts each run, spills it to an unlinked
//! temporary file, and merges the runs into the output. Because the run
//! files are unlinked on creation, the operating system reclaims them when
//! the handles drop, on success and failure alike.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};

use crate::error::Result;

/// Default number of lines held in memory before a run is spilled.
pub const DEFAULT_RUN_CAPACITY: usize = 64 * 1024;

/// Sorts newline-delimited byte records with a caller-supplied comparator.
///
/// Input that fits in a single run is sorted entirely in memory; larger
/// input goes through the spill-and-merge path. Both paths produce the same
/// output.
pub struct LineSorter<C>
where
    C: Fn(&[u8], &[u8]) -> Ordering,
{
    comparator: C,
    run_capacity: usize,
}

impl<C> LineSorter<C>
where
    C: Fn(&[u8], &[u8]) -> Ordering,
{
    /// Create a sorter with the default run capacity.
    pub fn new(comparator: C) -> Self {
        LineSorter {
            comparator,
            run_capacity: DEFAULT_RUN_CAPACITY,
        }
    }

    /// Create a sorter that spills after `run_capacity` lines.
    pub fn with_run_capacity(comparator: C, run_capacity: usize) -> Self {
        LineSorter {
            comparator,
            run_capacity: run_capacity.max(1),
        }
    }

    /// Sort all lines from `input` into `output`.
    pub fn sort<R: BufRead, W: Write>(&self, mut input: R, output: &mut W) -> Result<()> {
        let mut runs: Vec<BufReader<File>> = Vec::new();
        let mut buffer: Vec<Vec<u8>> = Vec::new();

        loop {
            let mut line = Vec::new();
            if input.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            trim_newline(&mut line);
            buffer.push(line);
            if buffer.len() >= self.run_capacity {
                runs.push(self.spill_run(&mut buffer)?);
            }
        }

        if runs.is_empty() {
            buffer.sort_by(|a, b| (self.comparator)(a, b));
            for line in &buffer {
                output.write_all(line)?;
                output.write_all(b"\n")?;
            }
            output.flush()?;
            return Ok(());
        }

        if !buffer.is_empty() {
            runs.push(self.spill_run(&mut buffer)?);
        }
        self.merge_runs(runs, output)
    }

    fn spill_run(&self, buffer: &mut Vec<Vec<u8>>) -> Result<BufReader<File>> {
        buffer.sort_by(|a, b| (self.comparator)(a, b));

        let mut writer = BufWriter::new(tempfile::tempfile()?);
        for line in buffer.iter() {
            writer.write_all(line)?;
            writer.write_all(b"\n")?;
        }
        buffer.clear();

        let mut file = writer.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;
        Ok(BufReader::new(file))
    }

    fn merge_runs<W: Write>(&self, mut runs: Vec<BufReader<File>>, output: &mut W) -> Result<()> {
        let mut heads: Vec<Option<Vec<u8>>> = Vec::with_capacity(runs.len());
        for run in &mut runs {
            heads.push(read_line(run)?);
        }

        loop {
            let mut min: Option<usize> = None;
            for i in 0..heads.len() {
                if heads[i].is_none() {
                    continue;
                }
                min = match min {
                    None => Some(i),
                    Some(m) => match (heads[i].as_deref(), heads[m].as_deref()) {
                        (Some(a), Some(b)) if (self.comparator)(a, b) == Ordering::Less => Some(i),
                        _ => Some(m),
                    },
                };
            }
            let Some(m) = min else { break };
            if let Some(line) = heads[m].take() {
                output.write_all(&line)?;
                output.write_all(b"\n")?;
            }
            heads[m] = read_line(&mut runs[m])?;
        }

        output.flush()?;
        Ok(())
    }
}

fn read_line(reader: &mut impl BufRead) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    trim_newline(&mut line);
    Ok(Some(line))
}

fn trim_newline(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}
