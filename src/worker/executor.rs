//! Parallel page decryption using Rayon.
//!
//! Tasks arrive in order from the reader; `par_bridge` spreads them over
//! Rayon's work-stealing pool and results leave in completion order.

use flume::{Receiver, Sender};
use rayon::prelude::*;

use crate::file::PageCipher;
use crate::types::{Task, TaskResult};

pub struct Executor<'a> {
    pages: &'a PageCipher,

    /// Page index of the first page of task 0.
    start_page: u64,

    pages_per_task: u64,
}

impl<'a> Executor<'a> {
    #[inline]
    pub const fn new(pages: &'a PageCipher, start_page: u64, pages_per_task: u64) -> Self {
        Self { pages, start_page, pages_per_task }
    }

    /// Decrypts every task from `tasks`, sending one result per task.
    ///
    /// Returns once the task channel is drained, or as soon as the writer
    /// stops listening.
    pub fn process(&self, tasks: &Receiver<Task>, results: Sender<TaskResult>) {
        let _ = tasks.iter().par_bridge().try_for_each(|task| results.send(self.run(task)).map_err(|_| ()));
    }

    fn run(&self, mut task: Task) -> TaskResult {
        let first_page = self.start_page + task.index * self.pages_per_task;
        let size = task.data.len();

        match self.pages.decrypt_pages(first_page, &mut task.data) {
            Ok(()) => TaskResult::ok(task.index, task.data, size),
            Err(e) => TaskResult::err(task.index, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use flume::unbounded;

    use super::*;
    use crate::cipher::{CipherFamily, CipherSpec};
    use crate::config::PAGE_SIZE;
    use crate::error::Error;

    fn pages() -> PageCipher {
        PageCipher::new(CipherSpec::new(CipherFamily::Aes, 16).unwrap(), &[9u8; 16]).unwrap()
    }

    fn encrypted_task(cipher: &PageCipher, index: u64, first_page: u64, count: usize) -> Task {
        let mut data = vec![index as u8; PAGE_SIZE * count];
        for (page, n) in data.chunks_exact_mut(PAGE_SIZE).zip(first_page..) {
            cipher.encrypt_page(n, page).unwrap();
        }
        Task { data, index }
    }

    #[test]
    fn test_decrypts_with_page_offsets() {
        let cipher = pages();
        let executor = Executor::new(&cipher, 5, 2);
        let (task_tx, task_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();

        for index in 0..4 {
            task_tx.send(encrypted_task(&cipher, index, 5 + index * 2, 2)).unwrap();
        }
        drop(task_tx);

        executor.process(&task_rx, result_tx);

        let mut results: Vec<TaskResult> = result_rx.iter().collect();
        results.sort_by_key(|r| r.index);
        assert_eq!(results.len(), 4);
        for r in results {
            assert!(r.error.is_none());
            assert_eq!(r.size, PAGE_SIZE * 2);
            assert!(r.data.iter().all(|&b| b == r.index as u8));
        }
    }

    #[test]
    fn test_reports_task_errors() {
        let cipher = pages();
        let executor = Executor::new(&cipher, 0, 1);
        let (task_tx, task_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();

        task_tx.send(Task { data: vec![0u8; 100], index: 0 }).unwrap();
        drop(task_tx);
        executor.process(&task_rx, result_tx);

        let result = result_rx.recv().unwrap();
        assert!(matches!(result.error, Some(Error::TruncatedInput(_))));
        assert!(result.data.is_empty());
    }
}
