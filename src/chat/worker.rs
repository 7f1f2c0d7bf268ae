//! Reply worker - runs each request on its own thread

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use flume::{Receiver, Sender};
use log::{debug, error};

use super::client::ReplyTransport;
use super::reply::{ChatRequest, ReplyOutcome, RequestId};

#[derive(Debug)]
pub struct ReplyCompletion {
    pub id: RequestId,
    pub outcome: ReplyOutcome,
}

/// Shared flag a worker thread checks before delivering its result
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ReplyWorker {
    transport: Arc<dyn ReplyTransport>,
    response_tx: Sender<ReplyCompletion>,
    response_rx: Receiver<ReplyCompletion>,
    in_flight: HashMap<RequestId, CancelToken>,
}

impl ReplyWorker {
    pub fn new(transport: Arc<dyn ReplyTransport>) -> Self {
        let (response_tx, response_rx) = flume::unbounded();
        Self {
            transport,
            response_tx,
            response_rx,
            in_flight: HashMap::new(),
        }
    }

    pub fn dispatch(&mut self, id: RequestId, request: ChatRequest) {
        let token = CancelToken::default();
        self.in_flight.insert(id, token.clone());

        let transport = Arc::clone(&self.transport);
        let tx = self.response_tx.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("reply-{}", id.0))
            .spawn(move || {
                let outcome = transport.send(&request);
                if token.is_cancelled() {
                    debug!("Discarding reply for cancelled request {}", id.0);
                    return;
                }
                let _ = tx.send(ReplyCompletion { id, outcome });
            });

        if let Err(e) = spawned {
            error!("Failed to spawn reply worker: {e}");
            let _ = self.response_tx.send(ReplyCompletion {
                id,
                outcome: Err(super::reply::ReplyError::Other(e.to_string())),
            });
        }
    }

    pub fn cancel(&mut self, id: RequestId) {
        if let Some(token) = self.in_flight.remove(&id) {
            debug!("Cancelling reply request {}", id.0);
            token.cancel();
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, token) in self.in_flight.drain() {
            token.cancel();
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Drain completed replies without blocking
    pub fn poll(&mut self) -> Vec<ReplyCompletion> {
        let mut completions = vec![];
        while let Ok(completion) = self.response_rx.try_recv() {
            if let Some(completion) = self.accept(completion) {
                completions.push(completion);
            }
        }
        completions
    }

    /// Block until the next live completion arrives or `timeout` elapses
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<ReplyCompletion> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            let completion = self.response_rx.recv_timeout(remaining).ok()?;
            if let Some(completion) = self.accept(completion) {
                return Some(completion);
            }
        }
    }

    fn accept(&mut self, completion: ReplyCompletion) -> Option<ReplyCompletion> {
        match self.in_flight.remove(&completion.id) {
            Some(token) if !token.is_cancelled() => Some(completion),
            _ => None,
        }
    }
}

impl Drop for ReplyWorker {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
