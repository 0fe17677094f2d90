use std::io::{Read, Write};
use std::panic;
use std::thread;

use flume::bounded;
use tracing::debug;

use crate::config::PAGES_PER_TASK;
use crate::error::Result;
use crate::file::PageCipher;
use crate::worker::executor::Executor;
use crate::worker::reader::Reader;
use crate::worker::writer::Writer;

pub mod buffer;
pub mod executor;
pub mod reader;
pub mod writer;

/// Totals from one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Ciphertext pages decrypted.
    pub pages: u64,

    /// Plaintext bytes written.
    pub written: u64,
}

/// Parallel page decryption.
///
/// Runs three stages on scoped threads connected by bounded channels:
/// - a reader that splits the body into page batches
/// - an executor that decrypts batches on the Rayon pool
/// - a writer (the calling thread) that restores order
pub struct Worker<'a> {
    pages: &'a PageCipher,

    concurrency: usize,
}

impl<'a> Worker<'a> {
    pub fn new(pages: &'a PageCipher) -> Self {
        let concurrency = thread::available_parallelism().map(|p| p.get()).unwrap_or(4);
        Self { pages, concurrency }
    }

    /// Decrypts the pages remaining in `input` into `output`.
    ///
    /// `start_page` is the index of the next page in `input`; `remaining` is
    /// the plaintext still owed, so padding past it is dropped.
    pub fn process<R, W>(&self, input: &mut R, output: W, start_page: u64, remaining: u64, progress: Option<&dyn Fn(u64)>) -> Result<Report>
    where
        R: Read + Send,
        W: Write,
    {
        let channel_size = self.concurrency * 2;
        let (task_sender, task_receiver) = bounded(channel_size);
        let (result_sender, result_receiver) = bounded(channel_size);

        let reader = Reader::new(PAGES_PER_TASK)?;
        let executor = Executor::new(self.pages, start_page, PAGES_PER_TASK as u64);
        let writer = Writer::new(remaining);

        let (read_result, write_result) = thread::scope(|s| {
            let reader_handle = s.spawn(move || reader.read_all(input, &task_sender));
            let executor_handle = s.spawn(move || executor.process(&task_receiver, result_sender));

            let write_result = writer.write_all(output, result_receiver, progress);

            let read_result = reader_handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload));
            executor_handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload));

            (read_result, write_result)
        });

        let report = write_result?;
        let tasks = read_result?;
        debug!(tasks, pages = report.pages, bytes = report.written, "parallel decryption finished");

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::cipher::{CipherFamily, CipherSpec};
    use crate::config::PAGE_SIZE;
    use crate::error::Error;

    fn setup(page_count: usize, first_page: u64) -> (PageCipher, Vec<u8>, Vec<u8>) {
        let cipher = PageCipher::new(CipherSpec::new(CipherFamily::Blowfish, 16).unwrap(), &[5u8; 16]).unwrap();
        let plain: Vec<u8> = (0..page_count * PAGE_SIZE).map(|i| (i / PAGE_SIZE) as u8 ^ (i % 13) as u8).collect();
        let mut body = plain.clone();
        for (page, n) in body.chunks_exact_mut(PAGE_SIZE).zip(first_page..) {
            cipher.encrypt_page(n, page).unwrap();
        }
        (cipher, plain, body)
    }

    #[test]
    fn test_many_tasks_in_order() {
        let count = PAGES_PER_TASK * 3 + 7;
        let (cipher, plain, body) = setup(count, 0);

        let mut output = Vec::new();
        let report = Worker::new(&cipher).process(&mut Cursor::new(body), &mut output, 0, u64::MAX, None).unwrap();

        assert_eq!(report.pages, count as u64);
        assert_eq!(output, plain);
    }

    #[test]
    fn test_start_page_and_clamp() {
        let (cipher, plain, body) = setup(10, 3);

        let mut output = Vec::new();
        let report = Worker::new(&cipher).process(&mut Cursor::new(body), &mut output, 3, 5000, None).unwrap();

        assert_eq!(report.written, 5000);
        assert_eq!(output, &plain[..5000]);
    }

    #[test]
    fn test_partial_page_fails() {
        let (cipher, _, mut body) = setup(PAGES_PER_TASK + 1, 0);
        body.truncate(body.len() - 1);

        let err = Worker::new(&cipher).process(&mut Cursor::new(body), Vec::new(), 0, u64::MAX, None).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput(_)));
    }
}
