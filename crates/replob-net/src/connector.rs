use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use replob_types::{Endpoint, NodeId};
use replob_wire::{write_message, Message};

use crate::error::NetError;

const INITIAL_RETRY: Duration = Duration::from_millis(100);
const MAX_RETRY: Duration = Duration::from_secs(5);

/// Caps the backoff between reconnect attempts, doubling each failure —
/// the source's `networkRetry` loop just slept a fixed interval, but nothing
/// in §4 depends on the exact retry cadence so this crate backs off instead
/// of hammering a peer that's down for a while.
struct RetryPolicy {
    next: Duration,
}

impl RetryPolicy {
    fn new() -> Self {
        Self { next: INITIAL_RETRY }
    }

    fn delay(&mut self) -> Duration {
        let current = self.next;
        self.next = (self.next * 2).min(MAX_RETRY);
        current
    }
}

/// One outbound connection to a peer.
///
/// Every write is serialized through `stream`'s mutex, matching
/// `Connector::write`'s own internal lock in the source — two journeys
/// racing to send to the same peer interleave whole frames, never bytes
/// within a frame. [`Connector::disconnect`] is permanent: once called
/// (typically because the node was removed by the failure detector, §4.4),
/// the connector refuses to reconnect.
pub struct Connector {
    node: NodeId,
    endpoint: Endpoint,
    stream: Mutex<Option<OwnedWriteHalf>>,
    disconnected: AtomicBool,
}

impl Connector {
    pub fn new(node: NodeId, endpoint: Endpoint) -> Self {
        Self {
            node,
            endpoint,
            stream: Mutex::new(None),
            disconnected: AtomicBool::new(false),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Sends `message`, connecting (or reconnecting) first if necessary.
    pub async fn send(&self, message: &Message) -> Result<(), NetError> {
        if self.disconnected.load(Ordering::Acquire) {
            return Err(NetError::Disconnected(self.node));
        }
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect_with_retry().await?);
        }
        let writer = guard.as_mut().expect("just connected");
        if let Err(e) = write_message(writer, message).await {
            *guard = None;
            return Err(e.into());
        }
        Ok(())
    }

    async fn connect_with_retry(&self) -> Result<OwnedWriteHalf, NetError> {
        let mut retry = RetryPolicy::new();
        loop {
            if self.disconnected.load(Ordering::Acquire) {
                return Err(NetError::Disconnected(self.node));
            }
            match TcpStream::connect(self.endpoint.socket_addr_string()).await {
                Ok(stream) => {
                    let (_read_half, write_half) = stream.into_split();
                    return Ok(write_half);
                }
                Err(error) => {
                    let delay = retry.delay();
                    tracing::warn!(node = %self.node, %error, ?delay, "connect failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Tears down the connection for good; subsequent [`Connector::send`]
    /// calls fail immediately instead of reconnecting.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::Release);
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_doubles_until_capped() {
        let mut retry = RetryPolicy::new();
        assert_eq!(retry.delay(), INITIAL_RETRY);
        assert_eq!(retry.delay(), INITIAL_RETRY * 2);
        for _ in 0..10 {
            retry.delay();
        }
        assert_eq!(retry.delay(), MAX_RETRY);
    }

    #[tokio::test]
    async fn disconnect_makes_send_fail_without_connecting() {
        let connector = Connector::new(NodeId::new(1), Endpoint::loopback(1));
        connector.disconnect();
        let err = connector
            .send(&Message::Heartbeat {
                from: NodeId::new(2),
                sequence: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NetError::Disconnected(_)));
    }
}
