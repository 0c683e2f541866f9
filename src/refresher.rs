use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::backend::AudioBackend;
use crate::stream::StreamInner;

/// How often the background cadence tops up stream buffers.
pub(crate) const STREAM_REFRESH_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) type StreamRef<B> = Arc<Mutex<StreamInner<B>>>;

/// Registry of live streaming voices, shared between the refresher's worker
/// and the caller-side handles. A voice appears at most once; removal is by
/// identity and safe concurrently with the wake cycle.
pub(crate) struct StreamRegistry<B: AudioBackend> {
    streams: Arc<Mutex<Vec<StreamRef<B>>>>,
}

impl<B: AudioBackend> Clone for StreamRegistry<B> {
    fn clone(&self) -> Self {
        Self {
            streams: Arc::clone(&self.streams),
        }
    }
}

impl<B: AudioBackend> StreamRegistry<B> {
    pub(crate) fn new() -> Self {
        Self {
            streams: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn add(&self, stream: &StreamRef<B>) {
        let mut streams = self.streams.lock().unwrap();
        if !streams.iter().any(|s| Arc::ptr_eq(s, stream)) {
            streams.push(Arc::clone(stream));
        }
    }

    pub(crate) fn remove(&self, stream: &StreamRef<B>) {
        self.streams
            .lock()
            .unwrap()
            .retain(|s| !Arc::ptr_eq(s, stream));
    }

    pub(crate) fn remove_all(&self) {
        self.streams.lock().unwrap().clear();
    }

    /// One refresh pass: process every registered voice under a single
    /// critical section, dropping those that report inactive. A voice whose
    /// refill faults is dropped from the cadence; its owner still holds it.
    pub(crate) fn process_all(&self) {
        let mut streams = self.streams.lock().unwrap();
        streams.retain(|stream| {
            let mut voice = stream.lock().unwrap();
            match voice.process() {
                Ok(active) => active,
                Err(e) => {
                    log::warn!("removing stream from refresh cycle after fault: {e}");
                    false
                }
            }
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.streams.lock().unwrap().len()
    }
}

/// Background cadence that keeps every registered streaming voice's buffer
/// ring topped up, waking on a fixed interval for the lifetime of the output
/// device. Shutdown is cooperative so the worker never touches hardware state
/// that is being torn down.
pub(crate) struct StreamRefresher<B: AudioBackend + Send + 'static> {
    registry: StreamRegistry<B>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl<B: AudioBackend + Send + 'static> StreamRefresher<B> {
    pub(crate) fn new() -> Self {
        let registry = StreamRegistry::new();
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let registry = registry.clone();
            let running = Arc::clone(&running);
            std::thread::spawn(move || {
                while running.load(Ordering::Acquire) {
                    registry.process_all();
                    std::thread::sleep(STREAM_REFRESH_INTERVAL);
                }
                log::debug!("stream refresher stopped");
            })
        };

        Self {
            registry,
            running,
            worker: Some(worker),
        }
    }

    pub(crate) fn registry(&self) -> StreamRegistry<B> {
        self.registry.clone()
    }

    pub(crate) fn add(&self, stream: &StreamRef<B>) {
        self.registry.add(stream);
    }

    pub(crate) fn remove_all(&self) {
        self.registry.remove_all();
    }

    pub(crate) fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl<B: AudioBackend + Send + 'static> Drop for StreamRefresher<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
