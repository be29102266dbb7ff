//! Console capability: line-oriented input (stream 0) and raw output (stream 1).

use alloc::{string::String, vec::Vec};
use crossbeam_queue::ArrayQueue;

pub trait Console: Send {
    /// Next line of interactive input without its newline, or `None` once
    /// input is exhausted.
    fn read_line(&mut self) -> Option<String>;

    fn write(&mut self, bytes: &[u8]);
}

/// Console fed by the host: pending input lines wait in a bounded queue and
/// output accumulates in memory.
pub struct BufferedConsole {
    input: ArrayQueue<String>,
    output: Vec<u8>,
}

impl BufferedConsole {
    pub fn new(input_capacity: usize) -> Self {
        Self {
            input: ArrayQueue::new(input_capacity),
            output: Vec::new(),
        }
    }

    /// Queues a line of input; hands it back if the queue is full.
    pub fn feed_line(&self, line: &str) -> Result<(), String> {
        self.input.push(String::from(line))
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.output)
    }
}

impl Console for BufferedConsole {
    fn read_line(&mut self) -> Option<String> {
        self.input.pop()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }
}
