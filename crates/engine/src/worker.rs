use crate::{Engine, EngineError, Result};
use chunk_protocol::{Request, Response};
use log::{debug, error};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

enum WorkerCommand {
    Request(Request),
    Shutdown,
}

/// Runs an [`Engine`] on its own task so loads and queries never block the
/// caller. Requests are answered strictly in order; each produces zero or
/// more `progress` messages followed by exactly one terminal response.
#[derive(Clone)]
pub struct EngineWorker {
    inner: Arc<EngineWorkerInner>,
}

struct EngineWorkerInner {
    command_tx: mpsc::Sender<WorkerCommand>,
}

/// Receiving side of a worker's responses
pub struct ResponseStream {
    rx: mpsc::UnboundedReceiver<Response>,
}

impl ResponseStream {
    /// Next message, progress included; `None` once the worker is gone
    pub async fn next(&mut self) -> Option<Response> {
        self.rx.recv().await
    }

    /// Skip progress and return the next terminal response
    pub async fn next_terminal(&mut self) -> Option<Response> {
        while let Some(response) = self.rx.recv().await {
            if response.is_terminal() {
                return Some(response);
            }
        }
        None
    }
}

impl EngineWorker {
    /// Must be called from within a tokio runtime
    pub fn start(engine: Engine) -> (Self, ResponseStream) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_worker_loop(engine, command_rx, response_tx));

        (
            Self {
                inner: Arc::new(EngineWorkerInner { command_tx }),
            },
            ResponseStream { rx: response_rx },
        )
    }

    pub async fn send(&self, request: Request) -> Result<()> {
        self.inner
            .command_tx
            .send(WorkerCommand::Request(request))
            .await
            .map_err(|e| EngineError::Other(format!("failed to send request: {e}")))?;
        Ok(())
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(WorkerCommand::Shutdown);
        }
    }
}

async fn run_worker_loop(
    engine: Engine,
    mut command_rx: mpsc::Receiver<WorkerCommand>,
    response_tx: mpsc::UnboundedSender<Response>,
) {
    // A panic mid-load poisons the lock but cannot leave a half-built graph
    // published, so the engine stays usable after recovery.
    let engine = Arc::new(Mutex::new(engine));

    while let Some(command) = command_rx.recv().await {
        let request = match command {
            WorkerCommand::Request(request) => request,
            WorkerCommand::Shutdown => break,
        };
        let kind = request.kind();
        debug!("Worker handling {kind}");

        let engine = engine.clone();
        let progress_tx = response_tx.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let mut guard = engine.lock().unwrap_or_else(PoisonError::into_inner);
            guard.handle(request, &mut |pct, msg| {
                let _ = progress_tx.send(Response::progress(pct, msg));
            })
        })
        .await;

        let response = joined.unwrap_or_else(|err| {
            error!("Worker task for {kind} failed: {err}");
            let err = EngineError::Internal(err.to_string());
            Response::error(err.code(), err.to_string())
        });

        if response_tx.send(response).is_err() {
            debug!("Response receiver dropped; stopping worker");
            break;
        }
    }
    debug!("Engine worker stopped");
}
