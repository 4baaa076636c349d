// MIT License - Copyright (c) 2026 ialarm-mk-core contributors
// Push notification listener

use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::event::{CoreEvent, EventSender};
use crate::panel::Update;

/// One decoded push notification from the panel.
///
/// `Cid` is the vendor's field name for the Contact-ID style event code
/// carried by every push frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "Cid")]
    pub cid: u32,
}

/// Turns raw bytes from the push socket into event records.
///
/// The panel's push framing is proprietary, so hosts supply the decoder.
/// Implementations may buffer across reads: `feed` is called once per
/// socket read and returns every record the new bytes completed.
pub trait EventDecoder: Send {
    fn feed(&mut self, bytes: &[u8]) -> Vec<EventRecord>;
}

/// Why a single push connection ended.
enum LoopExit {
    LifetimeExpired,
    Eof,
    Shutdown,
    Error(CoreError),
}

impl LoopExit {
    fn reason(&self) -> String {
        match self {
            LoopExit::LifetimeExpired => "subscription lifetime reached".to_string(),
            LoopExit::Eof => "connection closed by panel".to_string(),
            LoopExit::Shutdown => "shutdown".to_string(),
            LoopExit::Error(e) => e.to_string(),
        }
    }
}

/// Spawn the task that keeps a push subscription alive until shutdown.
///
/// Each connection is recycled once `lifetime` elapses; the panel stops
/// pushing to stale subscribers, so old sessions are never reused. Lost or
/// refused connections are retried after `backoff`.
pub(crate) fn spawn_push_listener(
    addr: String,
    lifetime: Duration,
    backoff: Duration,
    mut decoder: Box<dyn EventDecoder>,
    update_tx: mpsc::UnboundedSender<Update>,
    event_tx: EventSender,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            match TcpStream::connect(&addr).await {
                Ok(stream) => {
                    debug!("Push channel connected to {}", addr);
                    let _ = event_tx.send(CoreEvent::PushConnected);
                    let exit = run_connection(
                        stream,
                        lifetime,
                        decoder.as_mut(),
                        &update_tx,
                        &mut shutdown_rx,
                    )
                    .await;
                    let _ = event_tx.send(CoreEvent::PushDisconnected {
                        reason: exit.reason(),
                    });
                    match exit {
                        LoopExit::Shutdown => break,
                        LoopExit::LifetimeExpired => {
                            debug!("Push subscription lifetime reached, resubscribing");
                        }
                        LoopExit::Eof => debug!("Push channel closed by panel"),
                        LoopExit::Error(e) => warn!("Push channel error: {}", e),
                    }
                }
                Err(e) => {
                    warn!("Push channel connect to {} failed: {}", addr, e);
                }
            }

            // Pause before the next attempt, but leave immediately on shutdown
            tokio::select! {
                _ = sleep(backoff) => {}
                _ = shutdown_rx.changed() => {}
            }
        }
        debug!("Push listener stopped");
    })
}

/// Drive one push connection until it ends for any reason.
async fn run_connection(
    mut stream: TcpStream,
    lifetime: Duration,
    decoder: &mut dyn EventDecoder,
    update_tx: &mpsc::UnboundedSender<Update>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> LoopExit {
    let mut buf = vec![0u8; 4096];
    let deadline = sleep(lifetime);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return LoopExit::LifetimeExpired,
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    return LoopExit::Shutdown;
                }
            }
            read = stream.read(&mut buf) => match read {
                Ok(0) => return LoopExit::Eof,
                Ok(n) => {
                    for record in decoder.feed(&buf[..n]) {
                        debug!("Push event cid={}", record.cid);
                        if update_tx.send(Update::PushEvent { cid: record.cid }).is_err() {
                            return LoopExit::Shutdown;
                        }
                    }
                }
                Err(e) => return LoopExit::Error(e.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_record_wire_field() {
        let record: EventRecord = serde_json::from_str(r#"{"Cid":3401}"#).unwrap();
        assert_eq!(record.cid, 3401);
    }

    #[test]
    fn test_exit_reasons() {
        assert_eq!(
            LoopExit::LifetimeExpired.reason(),
            "subscription lifetime reached"
        );
        assert_eq!(LoopExit::Eof.reason(), "connection closed by panel");
        assert_eq!(
            LoopExit::Error(CoreError::ChannelClosed).reason(),
            "Channel closed"
        );
    }
}
