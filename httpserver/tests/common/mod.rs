//! Shared fakes and helpers for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use httpserver::{BoxFuture, CancellationToken, Error, Listener, Logger, ShutdownContext};
use tokio::net::TcpStream;

/// Ordered log of observable side effects.
#[derive(Debug, Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == event)
    }
}

/// In-memory [`Listener`] with scriptable failures and drain latency.
#[derive(Debug)]
pub struct FakeListener {
    events: Events,
    serve_error: Mutex<Option<Error>>,
    drain_error: Mutex<Option<Error>>,
    drain_delay: Duration,
    stopped: CancellationToken,
}

impl FakeListener {
    pub fn new(events: &Events) -> Self {
        Self {
            events: events.clone(),
            serve_error: Mutex::new(None),
            drain_error: Mutex::new(None),
            drain_delay: Duration::ZERO,
            stopped: CancellationToken::new(),
        }
    }

    /// `listen_and_serve` returns `err` right away.
    pub fn failing_serve(self, err: Error) -> Self {
        *self.serve_error.lock().unwrap() = Some(err);
        self
    }

    /// `shutdown` takes `delay` before the connections are gone.
    pub fn slow_drain(mut self, delay: Duration) -> Self {
        self.drain_delay = delay;
        self
    }

    /// `shutdown` reports `err` after draining.
    pub fn failing_drain(self, err: Error) -> Self {
        *self.drain_error.lock().unwrap() = Some(err);
        self
    }
}

impl Listener for FakeListener {
    fn listen_and_serve(&self, _base: CancellationToken) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            self.events.push("serve");
            let failure = self.serve_error.lock().unwrap().take();
            if let Some(err) = failure {
                return Err(err);
            }
            self.stopped.cancelled().await;
            Err(Error::ServerClosed)
        })
    }

    fn set_keep_alives_enabled(&self, enabled: bool) {
        if !enabled {
            self.events.push("keep-alives off");
        }
    }

    fn shutdown(&self, _ctx: ShutdownContext) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            self.events.push("drain started");
            tokio::time::sleep(self.drain_delay).await;
            self.stopped.cancel();
            self.events.push("drained");
            let failure = self.drain_error.lock().unwrap().take();
            failure.map_or(Ok(()), Err)
        })
    }
}

/// [`Logger`] keeping every info message.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_owned());
    }
}

/// Finds a currently unused local port.
pub fn free_addr() -> SocketAddr {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap()
}

/// Waits until something accepts connections on `addr`.
pub async fn wait_until_listening(addr: SocketAddr) {
    for _ in 0..200 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("nothing listening on {addr}");
}

/// HTTP client that never goes through a system proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
