//! Shutdown driven by a real SIGINT.
//!
//! Kept in its own test binary: the signal is delivered to the whole process.
//! Tests here take [`SIGNALS`] so only one of them raises at a time.

#![cfg(unix)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use httpserver::{Server, SigDown};
use nix::sys::signal::{Signal, raise};
use tokio::sync::Mutex;

mod common;

use common::{free_addr, wait_until_listening};

static SIGNALS: Mutex<()> = Mutex::const_new(());

fn build(port: u16) -> Server {
    let router = Router::new().route("/", get(|| async { "Ok" }));
    Server::builder("127.0.0.1", port, router)
        .with_shutdown_timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

#[tokio::test]
async fn interrupt_signal_triggers_graceful_shutdown() {
    let _serial = SIGNALS.lock().await;
    let addr = free_addr();
    let mut server = build(addr.port());

    let hook_ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&hook_ran);
    server.add_shutdown_hook(move |_ctx| async move {
        flag.store(true, Ordering::SeqCst);
        Ok::<_, std::io::Error>(())
    });

    let token = server.context();
    let running = tokio::spawn(server.run());
    wait_until_listening(addr).await;

    raise(Signal::SIGINT).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(3), running)
        .await
        .expect("run returned after SIGINT")
        .unwrap();
    assert!(result.is_ok(), "unexpected result: {result:?}");
    assert!(token.is_cancelled());
    assert!(hook_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn dropped_watcher_leaves_interrupt_to_its_successor() {
    let _serial = SIGNALS.lock().await;
    drop(SigDown::try_new().unwrap());
    let second = SigDown::try_new().unwrap();

    raise(Signal::SIGINT).unwrap();

    tokio::time::timeout(Duration::from_secs(2), second.recv())
        .await
        .expect("live watcher received the interrupt");
    assert!(second.is_armed());
}

#[tokio::test]
async fn restarted_server_shuts_down_on_interrupt() {
    let _serial = SIGNALS.lock().await;

    let addr = free_addr();
    let first = build(addr.port());
    let token = first.context();
    let running = tokio::spawn(first.run());
    wait_until_listening(addr).await;
    token.cancel();
    running.await.unwrap().unwrap();

    let addr = free_addr();
    let second = build(addr.port());
    let token = second.context();
    let running = tokio::spawn(second.run());
    wait_until_listening(addr).await;

    raise(Signal::SIGINT).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(3), running)
        .await
        .expect("restarted server returned after SIGINT")
        .unwrap();
    assert!(result.is_ok(), "unexpected result: {result:?}");
    assert!(token.is_cancelled());
}
