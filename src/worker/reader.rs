//! Input stage of the decryption pipeline.
//!
//! Reads the ciphertext body in batches of whole pages and hands each batch
//! to the executor as a numbered [`Task`]. Every batch except the last holds
//! exactly `pages_per_task` pages, so a task's first page index is
//! `start + index * pages_per_task`.

use std::io::{ErrorKind, Read};

use flume::Sender;
use tracing::debug;

use crate::config::PAGE_SIZE;
use crate::error::{Error, Result};
use crate::types::Task;

/// Splits a ciphertext body into page-aligned tasks.
pub struct Reader {
    batch_size: usize,
}

impl Reader {
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if `pages_per_task` is zero.
    pub fn new(pages_per_task: usize) -> Result<Self> {
        if pages_per_task == 0 {
            return Err(Error::InvalidInput("a task needs at least one page".into()));
        }
        Ok(Self { batch_size: pages_per_task * PAGE_SIZE })
    }

    /// Reads `input` to the end, sending one task per batch.
    ///
    /// Stops early without error if the executor hangs up. Returns the number
    /// of tasks sent.
    ///
    /// # Errors
    ///
    /// [`Error::TruncatedInput`] if the input ends partway through a page.
    pub fn read_all<R: Read>(&self, input: &mut R, sender: &Sender<Task>) -> Result<u64> {
        let mut index = 0u64;

        loop {
            let mut data = vec![0u8; self.batch_size];
            let filled = read_full(input, &mut data)?;
            if filled == 0 {
                break;
            }
            if !filled.is_multiple_of(PAGE_SIZE) {
                return Err(Error::TruncatedInput(format!("ciphertext ends {} bytes into a page", filled % PAGE_SIZE)));
            }

            data.truncate(filled);
            if sender.send(Task { data, index }).is_err() {
                debug!(index, "executor closed, reader stopping");
                break;
            }
            index += 1;

            if filled < self.batch_size {
                break;
            }
        }

        Ok(index)
    }
}

/// Reads until `buf` is full or the stream ends; returns the bytes filled.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use flume::unbounded;

    use super::*;

    #[test]
    fn test_batches_pages() {
        let reader = Reader::new(2).unwrap();
        let mut input = Cursor::new(vec![1u8; PAGE_SIZE * 5]);
        let (tx, rx) = unbounded();

        assert_eq!(reader.read_all(&mut input, &tx).unwrap(), 3);
        drop(tx);

        let tasks: Vec<Task> = rx.iter().collect();
        assert_eq!(tasks.iter().map(|t| t.index).collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(tasks.iter().map(|t| t.data.len()).collect::<Vec<_>>(), [PAGE_SIZE * 2, PAGE_SIZE * 2, PAGE_SIZE]);
    }

    #[test]
    fn test_exact_batch_boundary() {
        let reader = Reader::new(2).unwrap();
        let mut input = Cursor::new(vec![1u8; PAGE_SIZE * 4]);
        let (tx, rx) = unbounded();

        assert_eq!(reader.read_all(&mut input, &tx).unwrap(), 2);
        drop(tx);
        assert_eq!(rx.iter().count(), 2);
    }

    #[test]
    fn test_empty_input() {
        let reader = Reader::new(4).unwrap();
        let (tx, rx) = unbounded();
        assert_eq!(reader.read_all(&mut Cursor::new(Vec::new()), &tx).unwrap(), 0);
        drop(tx);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_partial_page() {
        let reader = Reader::new(4).unwrap();
        let (tx, _rx) = unbounded();
        let mut input = Cursor::new(vec![0u8; PAGE_SIZE + 10]);
        assert!(matches!(reader.read_all(&mut input, &tx), Err(Error::TruncatedInput(_))));
    }

    #[test]
    fn test_stops_when_receiver_dropped() {
        let reader = Reader::new(1).unwrap();
        let (tx, rx) = unbounded();
        drop(rx);
        assert_eq!(reader.read_all(&mut Cursor::new(vec![0u8; PAGE_SIZE * 3]), &tx).unwrap(), 0);
    }

    #[test]
    fn test_zero_pages_per_task() {
        assert!(matches!(Reader::new(0), Err(Error::InvalidInput(_))));
    }
}
