//! Ordered output stage.
//!
//! Reassembles out-of-order results from the executor into a sequential
//! stream and clamps the final page to the plaintext size.

use std::io::{BufWriter, Write};

use flume::Receiver;

use crate::config::PAGE_SIZE;
use crate::error::{Error, Result};
use crate::types::TaskResult;
use crate::worker::Report;
use crate::worker::buffer::Buffer;

pub struct Writer {
    buffer: Buffer,

    /// Plaintext bytes still owed to the output.
    remaining: u64,

    report: Report,
}

impl Writer {
    #[inline]
    pub fn new(remaining: u64) -> Self {
        Self { buffer: Buffer::new(0), remaining, report: Report::default() }
    }

    /// Consumes results until the channel closes and writes them in task order.
    ///
    /// Returns as soon as a task reports an error.
    pub fn write_all<W: Write>(mut self, output: W, receiver: Receiver<TaskResult>, progress: Option<&dyn Fn(u64)>) -> Result<Report> {
        let mut writer = BufWriter::new(output);

        while let Ok(result) = receiver.recv() {
            let ready = self.buffer.add(result);
            self.write_batch(&mut writer, ready, progress)?;
        }

        if !self.buffer.is_empty() {
            return Err(Error::TruncatedInput(format!("{} page batches arrived after a missing batch {}", self.buffer.len(), self.buffer.next_index())));
        }

        writer.flush()?;
        Ok(self.report)
    }

    fn write_batch<W: Write>(&mut self, writer: &mut W, results: Vec<TaskResult>, progress: Option<&dyn Fn(u64)>) -> Result<()> {
        for r in results {
            if let Some(err) = r.error {
                return Err(err);
            }

            let n = usize::try_from(self.remaining).map_or(r.data.len(), |rem| rem.min(r.data.len()));
            writer.write_all(&r.data[..n])?;

            self.remaining -= n as u64;
            self.report.written += n as u64;
            self.report.pages += (r.data.len() / PAGE_SIZE) as u64;

            if let Some(report) = progress {
                report(r.size as u64);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use flume::unbounded;

    use super::*;

    fn page(fill: u8) -> Vec<u8> {
        vec![fill; PAGE_SIZE]
    }

    #[test]
    fn test_reorders() {
        let (tx, rx) = unbounded();
        tx.send(TaskResult::ok(1, page(2), PAGE_SIZE)).unwrap();
        tx.send(TaskResult::ok(0, page(1), PAGE_SIZE)).unwrap();
        drop(tx);

        let mut output = Vec::new();
        let report = Writer::new(u64::MAX).write_all(&mut output, rx, None).unwrap();

        assert_eq!(report, Report { pages: 2, written: 2 * PAGE_SIZE as u64 });
        assert!(output[..PAGE_SIZE].iter().all(|&b| b == 1));
        assert!(output[PAGE_SIZE..].iter().all(|&b| b == 2));
    }

    #[test]
    fn test_clamps_to_remaining() {
        let (tx, rx) = unbounded();
        tx.send(TaskResult::ok(0, [page(1), page(2)].concat(), 2 * PAGE_SIZE)).unwrap();
        drop(tx);

        let mut output = Vec::new();
        let report = Writer::new(100).write_all(&mut output, rx, None).unwrap();
        assert_eq!(output, vec![1u8; 100]);
        assert_eq!(report.pages, 2);
        assert_eq!(report.written, 100);
    }

    #[test]
    fn test_reports_progress() {
        let (tx, rx) = unbounded();
        tx.send(TaskResult::ok(0, page(0), PAGE_SIZE)).unwrap();
        tx.send(TaskResult::ok(1, page(0), PAGE_SIZE)).unwrap();
        drop(tx);

        let seen = Cell::new(0u64);
        let progress = |n: u64| seen.set(seen.get() + n);
        Writer::new(u64::MAX).write_all(Vec::new(), rx, Some(&progress)).unwrap();
        assert_eq!(seen.get(), 2 * PAGE_SIZE as u64);
    }

    #[test]
    fn test_task_error() {
        let (tx, rx) = unbounded();
        tx.send(TaskResult::ok(0, page(0), PAGE_SIZE)).unwrap();
        tx.send(TaskResult::err(1, Error::InvalidInput("bad".into()))).unwrap();
        drop(tx);

        assert!(matches!(Writer::new(u64::MAX).write_all(Vec::new(), rx, None), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_missing_task() {
        let (tx, rx) = unbounded();
        tx.send(TaskResult::ok(1, page(0), PAGE_SIZE)).unwrap();
        drop(tx);

        assert!(matches!(Writer::new(u64::MAX).write_all(Vec::new(), rx, None), Err(Error::TruncatedInput(_))));
    }
}
