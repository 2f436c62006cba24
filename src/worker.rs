//! Mining coordinator
//!
//! The worker owns two long-lived loops sharing one shutdown signal: a
//! peer-sync loop driven by a fixed-period ticker, and a mining loop driven
//! by debounced start signals. A mining attempt races the block-production
//! primitive against a cancel signal; whichever side finishes first cancels
//! the other, and the attempt only returns once both are done.
//!
//! Lifecycle: created by [`Worker::start`] (which also runs one synchronous
//! peer-sync pass and waits for both loops to report in), running until
//! [`Worker::shutdown`], which is guarded so a second call is a no-op.

use crate::config::Config;
use crate::error::{ChainError, Result};
use crate::events::Events;
use crate::node::NodeClient;
use crate::sync::PeerSync;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Coordinates peer synchronization and mining for a node.
pub struct Worker<N: NodeClient> {
    node: Arc<N>,
    events: Events,
    start_mining: mpsc::Sender<()>,
    cancel_mining: mpsc::Sender<()>,
    shutdown: watch::Sender<bool>,
    loops: parking_lot::Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
    shut_once: AtomicBool,
}

impl<N: NodeClient> Worker<N> {
    /// Runs an initial peer-sync pass, then spawns the peer-sync and mining
    /// loops. Does not return until both loops have reported started.
    pub async fn start(node: Arc<N>, config: &Config, events: Events) -> Result<Worker<N>> {
        let sync = PeerSync::new(Arc::clone(&node), &config.sync, events.clone())?;

        // Catch up with the network before the loops take over.
        sync.run_peer_operation().await;

        // Capacity-one channels give the start/cancel signals their
        // drop-when-full debounce semantics.
        let (start_tx, start_rx) = mpsc::channel::<()>(1);
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (started_tx, mut started_rx) = mpsc::channel::<()>(2);

        let peer_handle = tokio::spawn(Self::peer_loop(
            sync,
            config.sync.interval(),
            events.clone(),
            shutdown_rx.clone(),
            started_tx.clone(),
        ));
        let mining_handle = tokio::spawn(Self::mining_loop(
            Arc::clone(&node),
            events.clone(),
            start_rx,
            cancel_rx,
            shutdown_rx,
            started_tx,
        ));

        // Both loops report in before the worker is considered running.
        for _ in 0..2 {
            let _ = started_rx.recv().await;
        }

        Ok(Worker {
            node,
            events,
            start_mining: start_tx,
            cancel_mining: cancel_tx,
            shutdown: shutdown_tx,
            loops: parking_lot::Mutex::new(Some((peer_handle, mining_handle))),
            shut_once: AtomicBool::new(false),
        })
    }

    pub fn node(&self) -> &Arc<N> {
        &self.node
    }

    /// Requests a mining attempt. Non-blocking; if a start signal is already
    /// pending the new one is dropped.
    pub fn signal_start_mining(&self) {
        let _ = self.start_mining.try_send(());
        self.events.emit("worker: signal_start_mining: mining signaled");
    }

    /// Requests cancellation of the in-flight mining attempt. Non-blocking;
    /// if a cancel signal is already pending the new one is dropped.
    pub fn signal_cancel_mining(&self) {
        let _ = self.cancel_mining.try_send(());
        self.events.emit("worker: signal_cancel_mining: cancel signaled");
    }

    /// Stops both loops and waits for them to exit. Safe to call more than
    /// once; only the first call performs the shutdown.
    pub async fn shutdown(&self) {
        if self.shut_once.swap(true, Ordering::SeqCst) {
            self.events.emit("worker: shutdown: already shut down");
            return;
        }

        self.events.emit("worker: shutdown: started");

        // Best effort: release a mining attempt that may be in flight.
        self.signal_cancel_mining();

        self.events.emit("worker: shutdown: terminate loops");
        let _ = self.shutdown.send(true);

        let handles = self.loops.lock().take();
        if let Some((peer_handle, mining_handle)) = handles {
            let _ = peer_handle.await;
            let _ = mining_handle.await;
        }

        self.events.emit("worker: shutdown: completed");
    }

    async fn peer_loop(
        sync: PeerSync<N>,
        interval: std::time::Duration,
        events: Events,
        mut shutdown: watch::Receiver<bool>,
        started: mpsc::Sender<()>,
    ) {
        events.emit("worker: peer loop: started");
        let _ = started.send(()).await;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately and the initial pass already ran.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => sync.run_peer_operation().await,
                _ = shutdown.changed() => {
                    events.emit("worker: peer loop: received shutdown signal");
                    break;
                }
            }
        }

        events.emit("worker: peer loop: completed");
    }

    async fn mining_loop(
        node: Arc<N>,
        events: Events,
        mut start: mpsc::Receiver<()>,
        cancel: mpsc::Receiver<()>,
        mut shutdown: watch::Receiver<bool>,
        started: mpsc::Sender<()>,
    ) {
        events.emit("worker: mining loop: started");
        let _ = started.send(()).await;

        // Shared with the canceller task of the active attempt; attempts are
        // strictly sequential so the lock is never contended.
        let cancel = Arc::new(AsyncMutex::new(cancel));

        loop {
            tokio::select! {
                Some(()) = start.recv() => {
                    Self::run_mining_operation(&node, &events, &cancel).await;
                }
                _ = shutdown.changed() => {
                    events.emit("worker: mining loop: received shutdown signal");
                    break;
                }
            }
        }

        events.emit("worker: mining loop: completed");
    }

    /// One mining attempt over the current mempool contents.
    async fn run_mining_operation(
        node: &Arc<N>,
        events: &Events,
        cancel: &Arc<AsyncMutex<mpsc::Receiver<()>>>,
    ) {
        events.emit("worker: run_mining_operation: mining started");

        // A cancel signaled before this attempt began must not abort it.
        if cancel.lock().await.try_recv().is_ok() {
            events.emit("worker: run_mining_operation: drained stale cancel signal");
        }

        let length = node.query_mempool_length();
        if length < 2 {
            events.emit(&format!(
                "worker: run_mining_operation: not enough transactions to mine: {}",
                length
            ));
            return;
        }

        let token = CancellationToken::new();

        // Waits for a cancel signal or for the attempt itself to finish,
        // then makes sure the token is cancelled either way.
        let canceller = tokio::spawn({
            let token = token.clone();
            let events = events.clone();
            let cancel = Arc::clone(cancel);
            async move {
                let mut cancel = cancel.lock().await;
                tokio::select! {
                    _ = cancel.recv() => {
                        events.emit("worker: run_mining_operation: cancel mining requested");
                    }
                    _ = token.cancelled() => {
                        events.emit("worker: run_mining_operation: attempt finished");
                    }
                }
                token.cancel();
            }
        });

        // The mining primitive is a long blocking computation that polls the
        // token at its own safe points.
        let miner = tokio::task::spawn_blocking({
            let token = token.clone();
            let node = Arc::clone(node);
            move || {
                let result = node.mine_new_block(&token);
                let was_cancelled = token.is_cancelled();
                token.cancel();
                (result, was_cancelled)
            }
        });

        // The attempt is not over until both sides have wound down.
        let (mined, _) = tokio::join!(miner, canceller);

        match mined {
            Ok((Ok(block), _)) => {
                events.emit(&format!(
                    "worker: run_mining_operation: mined block {}: prev[{}] new[{}] txs[{}]",
                    block.header.number,
                    block.header.previous_block_hash,
                    block.header.this_block_hash,
                    block.transactions.len()
                ));
                // Broadcasting the block to peers hangs off this point; peers
                // currently pick it up through their own sync passes.
            }
            Ok((Err(ChainError::NotEnoughTransactions), _)) => {
                events.emit("worker: run_mining_operation: not enough transactions in mempool");
            }
            Ok((Err(ChainError::MiningCancelled), _)) | Ok((Err(_), true)) => {
                events.emit("worker: run_mining_operation: mining cancelled");
            }
            Ok((Err(err), false)) => {
                events.emit(&format!("worker: run_mining_operation: ERROR: {}", err));
            }
            Err(err) => {
                events.emit(&format!(
                    "worker: run_mining_operation: mining task failed: {}",
                    err
                ));
            }
        }

        events.emit("worker: run_mining_operation: mining completed");
    }
}
