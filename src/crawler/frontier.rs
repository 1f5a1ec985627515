//! Breadth-first work queue for a single crawl run
//!
//! The frontier owns the FIFO of pending tasks and the run's visited set.
//! A URL is marked visited when it is enqueued, so the first page to link to
//! it wins and later pages cannot queue it again.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// A unit of work: fetch `url` at `depth`, recording `parent_id` as its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: u32,
    pub parent_id: Option<i64>,
}

impl CrawlTask {
    /// The root task of a run
    pub fn root(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            parent_id: None,
        }
    }

    /// A task for a link found on this task's page
    pub fn child(&self, url: Url, parent_id: i64) -> Self {
        Self {
            url,
            depth: self.depth + 1,
            parent_id: Some(parent_id),
        }
    }
}

/// Why a URL was not enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AlreadyVisited,
    QueueFull,
}

/// FIFO queue plus run-scoped visited set
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<CrawlTask>,
    visited: HashSet<String>,
    max_queue_size: Option<usize>,
}

impl Frontier {
    /// Creates a frontier seeded with the root task
    pub fn new(root: CrawlTask, max_queue_size: Option<usize>) -> Self {
        let mut visited = HashSet::new();
        visited.insert(root.url.as_str().to_string());

        let mut queue = VecDeque::new();
        queue.push_back(root);

        Self {
            queue,
            visited,
            max_queue_size,
        }
    }

    /// Returns true if the URL was enqueued during this run
    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Enqueues a task and marks its URL visited
    pub fn push(&mut self, task: CrawlTask) -> Result<(), Rejection> {
        if self.is_visited(&task.url) {
            return Err(Rejection::AlreadyVisited);
        }
        if self
            .max_queue_size
            .is_some_and(|cap| self.queue.len() >= cap)
        {
            return Err(Rejection::QueueFull);
        }

        self.visited.insert(task.url.as_str().to_string());
        self.queue.push_back(task);
        Ok(())
    }

    /// Takes the oldest pending task
    pub fn pop(&mut self) -> Option<CrawlTask> {
        self.queue.pop_front()
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of URLs seen this run
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
