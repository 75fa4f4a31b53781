//! Viewer driver.
//!
//! Owns the [`Session`], the frame buffer and a [`Transport`], and runs
//! a single task that interleaves inbound messages with local input:
//!
//! ```text
//!  Transport::recv ──► Session::handle_message ──► FrameBuffer
//!  InputHandle ──► HostEvent (mpsc) ──► InputTranslator ──► Session::encode_input ──► Transport::send
//! ```
//!
//! Input comes from the host windowing layer through the
//! [`InputHandle`](crate::InputHandle) half of [`input_channel`](crate::input_channel).
//!
//! One inbound message is dispatched to completion before the next is
//! read. Malformed messages are logged and skipped; only a transport
//! error or close ends the run.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use webrdp_core::{Dispatch, Result, Session};

use crate::connection::Transport;
use crate::display::FrameBuffer;
use crate::input::{HostEvent, InputTranslator};

// ── ClientStats ──────────────────────────────────────────────────

/// Counters exposed to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Inbound messages received.
    pub messages: u64,
    /// Rectangles painted.
    pub paints: u64,
    /// Messages dropped because they failed to decode or arrived while
    /// disconnected.
    pub dropped: u64,
    /// Input events sent to the server.
    pub inputs_sent: u64,
}

// ── StopHandle ───────────────────────────────────────────────────

/// Cloneable handle that ends [`ViewerClient::run`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

// ── ViewerClient ─────────────────────────────────────────────────

pub struct ViewerClient<T> {
    transport: T,
    session: Session,
    surface: FrameBuffer,
    translator: InputTranslator,
    stats: ClientStats,
    stats_tx: watch::Sender<ClientStats>,
    stats_rx: watch::Receiver<ClientStats>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl<T: Transport> ViewerClient<T> {
    pub fn new(transport: T, surface: FrameBuffer, translator: InputTranslator) -> Self {
        let (stats_tx, stats_rx) = watch::channel(ClientStats::default());
        let (stop_tx, _) = watch::channel(false);
        Self {
            transport,
            session: Session::new(),
            surface,
            translator,
            stats: ClientStats::default(),
            stats_tx,
            stats_rx,
            stop_tx: Arc::new(stop_tx),
        }
    }

    /// Obtain a `watch::Receiver` for client statistics.
    pub fn stats_receiver(&self) -> watch::Receiver<ClientStats> {
        self.stats_rx.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    pub fn surface(&self) -> &FrameBuffer {
        &self.surface
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stats(&self) -> &ClientStats {
        &self.stats
    }

    /// Open the session and run until the transport closes, the
    /// transport fails, or [`StopHandle::stop`] is called.
    ///
    /// Input keeps flowing until `input_rx` closes; after that only
    /// inbound messages are processed.
    pub async fn run(&mut self, mut input_rx: mpsc::Receiver<HostEvent>) -> Result<()> {
        let mut stop_rx = self.stop_tx.subscribe();
        if *stop_rx.borrow_and_update() {
            return Ok(());
        }

        if let Some(handshake) = self.session.open(&self.surface) {
            self.transport.send(handshake).await?;
        }

        let mut input_open = true;
        let result = loop {
            tokio::select! {
                inbound = self.transport.recv() => match inbound {
                    Some(Ok(frame)) => self.on_message(frame),
                    Some(Err(e)) => break Err(e),
                    None => {
                        info!("server closed the connection");
                        break Ok(());
                    }
                },
                event = input_rx.recv(), if input_open => match event {
                    Some(event) => {
                        if let Err(e) = self.on_input(&event).await {
                            break Err(e);
                        }
                    }
                    None => {
                        debug!("input channel closed");
                        input_open = false;
                    }
                },
                _ = stop_rx.changed() => {
                    info!("stop requested");
                    break Ok(());
                }
            }
        };

        self.session.close();
        result
    }

    fn on_message(&mut self, frame: bytes::Bytes) {
        self.stats.messages += 1;
        match self.session.handle_message(frame, &mut self.surface) {
            Ok(Dispatch::Painted(n)) => self.stats.paints += n as u64,
            Ok(Dispatch::Dropped) => self.stats.dropped += 1,
            Ok(Dispatch::Acknowledged | Dispatch::Ignored) => {}
            Err(e) => {
                warn!("dropping message: {e}");
                self.stats.dropped += 1;
            }
        }
        self.publish();
    }

    async fn on_input(&mut self, event: &HostEvent) -> Result<()> {
        let Some(input) = self.translator.translate(event) else {
            return Ok(());
        };
        let Some(bytes) = self.session.encode_input(&input) else {
            debug!(?event, "input not sent");
            return Ok(());
        };
        self.transport.send(bytes).await?;
        self.stats.inputs_sent += 1;
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        self.stats_tx.send_replace(self.stats.clone());
    }
}
