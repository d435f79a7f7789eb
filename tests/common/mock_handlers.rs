use async_trait::async_trait;
use fanout_core::dispatch::{HandlerError, MetricsSink, RequestHandler};
use fanout_core::messaging::{DispatchContext, Message, MessageError};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tracks how many handlers sharing it run at once, and the peak
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Sleeps, then replies `<name>:<request>`
#[derive(Debug)]
pub struct SleepingHandler {
    name: String,
    delay: Duration,
    probe: Option<Arc<ConcurrencyProbe>>,
    calls: AtomicUsize,
}

impl SleepingHandler {
    pub fn new(name: &str, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            delay: Duration::from_millis(delay_ms),
            probe: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn probed(name: &str, delay_ms: u64, probe: Arc<ConcurrencyProbe>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            delay: Duration::from_millis(delay_ms),
            probe: Some(probe),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestHandler for SleepingHandler {
    async fn handle(&self, request: &Message, _context: &DispatchContext) -> Result<Message, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(probe) = &self.probe {
            probe.enter();
        }
        tokio::time::sleep(self.delay).await;
        if let Some(probe) = &self.probe {
            probe.exit();
        }
        Ok(Message::text(format!("{}:{}", self.name, request)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Always fails with [`HandlerError::Failed`]
#[derive(Debug)]
pub struct FailingHandler {
    name: String,
}

impl FailingHandler {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl RequestHandler for FailingHandler {
    async fn handle(&self, _request: &Message, _context: &DispatchContext) -> Result<Message, HandlerError> {
        Err(HandlerError::failed(&self.name, "configured to fail"))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Panics on every call
#[derive(Debug)]
pub struct PanickingHandler {
    name: String,
}

impl PanickingHandler {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl RequestHandler for PanickingHandler {
    async fn handle(&self, _request: &Message, _context: &DispatchContext) -> Result<Message, HandlerError> {
        panic!("{} exploded", self.name);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Replies with a streaming body built from `chunks`, optionally failing at the end
#[derive(Debug)]
pub struct StreamingHandler {
    name: String,
    chunks: Vec<String>,
    fail_at_end: bool,
}

impl StreamingHandler {
    pub fn new(name: &str, chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail_at_end: false,
        })
    }

    pub fn broken(name: &str, chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail_at_end: true,
        })
    }
}

#[async_trait]
impl RequestHandler for StreamingHandler {
    async fn handle(&self, _request: &Message, _context: &DispatchContext) -> Result<Message, HandlerError> {
        let mut chunks: Vec<Result<String, MessageError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        if self.fail_at_end {
            chunks.push(Err(MessageError::StreamFailed {
                bytes_read: 0,
                message: "connection reset".to_string(),
            }));
        }
        Ok(Message::streaming(futures::stream::iter(chunks).boxed()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Replies with the dispatch context's correlation id
#[derive(Debug)]
pub struct CorrelationEcho;

#[async_trait]
impl RequestHandler for CorrelationEcho {
    async fn handle(&self, _request: &Message, context: &DispatchContext) -> Result<Message, HandlerError> {
        Ok(Message::text(context.correlation_id()))
    }

    fn name(&self) -> &str {
        "correlation_echo"
    }
}

/// Metrics sink keeping every sample
#[derive(Debug, Default)]
pub struct RecordingSink {
    samples: Mutex<Vec<Duration>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn samples(&self) -> Vec<Duration> {
        self.samples.lock().clone()
    }
}

impl MetricsSink for RecordingSink {
    fn record_sample(&self, elapsed: Duration) {
        self.samples.lock().push(elapsed);
    }
}
