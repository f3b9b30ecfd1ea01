//! Fan-out of one byte source to several analyses running in parallel.
//!
//! The calling thread reads the source in chunks and hands every chunk to
//! each worker through its own bounded pipe, so all workers see the same
//! bytes in the same order while the source is read once. Workers run on
//! named scoped threads and may borrow from the caller.

use std::any::Any;
use std::io::{self, Read};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, warn};

use crate::error::{Result, SnifferError, WorkerFailure};

/// Default pipe capacity, in chunks.
pub const DEFAULT_PIPE_CAPACITY: usize = 16;

/// Default chunk size, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

type Chunk = Arc<[u8]>;

/// The reading end of a worker's pipe.
///
/// Reads block until the producer has sent the next chunk and return 0
/// once the producer is done.
#[derive(Debug)]
pub struct PipeReader {
    rx: Receiver<Chunk>,
    chunk: Option<Chunk>,
    pos: usize,
}

impl PipeReader {
    fn new(rx: Receiver<Chunk>) -> Self {
        Self {
            rx,
            chunk: None,
            pos: 0,
        }
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if let Some(chunk) = &self.chunk
                && self.pos < chunk.len()
            {
                let n = buf.len().min(chunk.len() - self.pos);
                buf[..n].copy_from_slice(&chunk[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunk = Some(chunk);
                    self.pos = 0;
                }
                Err(_) => {
                    self.chunk = None;
                    return Ok(0);
                }
            }
        }
    }
}

type Job<'env, T> = Box<dyn FnOnce(&mut PipeReader) -> Result<T> + Send + 'env>;

/// What one worker produced.
#[derive(Debug)]
pub struct WorkerOutcome<T> {
    pub name: String,
    pub result: Result<T>,
}

/// Outcomes of a fan-out run, in registration order.
#[derive(Debug)]
pub struct FanOutReport<T> {
    pub outcomes: Vec<WorkerOutcome<T>>,
    /// Bytes read from the source.
    pub bytes_read: u64,
}

impl<T> FanOutReport<T> {
    /// Every worker's value, or [`SnifferError::Workers`] naming each
    /// failed worker.
    pub fn into_results(self) -> Result<Vec<T>> {
        let mut values = Vec::with_capacity(self.outcomes.len());
        let mut failures = Vec::new();
        for outcome in self.outcomes {
            match outcome.result {
                Ok(value) => values.push(value),
                Err(SnifferError::Worker { name, message }) => {
                    failures.push(WorkerFailure { name, message });
                }
                Err(e) => failures.push(WorkerFailure {
                    name: outcome.name,
                    message: e.to_string(),
                }),
            }
        }
        if failures.is_empty() {
            Ok(values)
        } else {
            Err(SnifferError::Workers(failures))
        }
    }
}

/// A set of named workers fed from one source.
///
/// # Example
///
/// ```
/// use std::io::Read;
/// use csv_whiff::fanout::FanOut;
///
/// let report = FanOut::new()
///     .worker("bytes", |pipe| {
///         let mut buf = Vec::new();
///         pipe.read_to_end(&mut buf)?;
///         Ok(buf.len())
///     })
///     .worker("lines", |pipe| {
///         let mut buf = Vec::new();
///         pipe.read_to_end(&mut buf)?;
///         Ok(buf.iter().filter(|&&b| b == b'\n').count())
///     })
///     .run(&b"a,b\n1,2\n"[..])
///     .unwrap();
/// assert_eq!(report.into_results().unwrap(), vec![8, 2]);
/// ```
pub struct FanOut<'env, T> {
    workers: Vec<(String, Job<'env, T>)>,
    capacity: usize,
    chunk_size: usize,
}

impl<T> Default for FanOut<'_, T> {
    fn default() -> Self {
        Self {
            workers: Vec::new(),
            capacity: DEFAULT_PIPE_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl<'env, T: Send + 'env> FanOut<'env, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipe capacity in chunks. A full pipe blocks the producer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Register a worker. Workers run in parallel; outcomes are reported in
    /// registration order.
    pub fn worker<F>(mut self, name: impl Into<String>, job: F) -> Self
    where
        F: FnOnce(&mut PipeReader) -> Result<T> + Send + 'env,
    {
        self.workers.push((name.into(), Box::new(job)));
        self
    }

    /// Feed `source` to every worker and wait for all of them.
    ///
    /// A worker that stops reading early is dropped from the fan-out; the
    /// others keep receiving. Worker errors and panics are reported per
    /// worker. A source read error is returned once every worker has been
    /// joined.
    pub fn run<R: Read>(self, mut source: R) -> Result<FanOutReport<T>> {
        let Self {
            workers,
            capacity,
            chunk_size,
        } = self;

        thread::scope(|scope| {
            let mut pipes = Vec::with_capacity(workers.len());
            let mut handles = Vec::with_capacity(workers.len());
            for (name, job) in workers {
                let (tx, rx) = bounded::<Chunk>(capacity);
                let handle = thread::Builder::new()
                    .name(format!("sniff-{name}"))
                    .spawn_scoped(scope, move || {
                        let mut pipe = PipeReader::new(rx);
                        job(&mut pipe)
                    })?;
                pipes.push(Some(tx));
                handles.push((name, handle));
            }

            let pumped = pump(&mut source, &mut pipes, chunk_size);
            drop(pipes);

            let outcomes = handles
                .into_iter()
                .map(|(name, handle)| {
                    let result = match handle.join() {
                        Ok(result) => result,
                        Err(panic) => Err(SnifferError::Worker {
                            name: name.clone(),
                            message: panic_message(panic.as_ref()),
                        }),
                    };
                    if let Err(e) = &result {
                        warn!("worker '{name}' failed: {e}");
                    }
                    WorkerOutcome { name, result }
                })
                .collect();

            let bytes_read = pumped?;
            Ok(FanOutReport {
                outcomes,
                bytes_read,
            })
        })
    }
}

/// Copy `source` into every open pipe, chunk by chunk.
fn pump<R: Read>(
    source: &mut R,
    pipes: &mut [Option<Sender<Chunk>>],
    chunk_size: usize,
) -> io::Result<u64> {
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;
    loop {
        if pipes.iter().all(Option::is_none) {
            debug!("every worker finished early after {total} bytes");
            break;
        }
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        total += n as u64;

        let chunk: Chunk = Arc::from(&buf[..n]);
        for pipe in pipes.iter_mut() {
            let closed = match pipe {
                Some(tx) => tx.send(Arc::clone(&chunk)).is_err(),
                None => false,
            };
            if closed {
                *pipe = None;
            }
        }
    }
    Ok(total)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
