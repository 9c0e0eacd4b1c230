use std::sync::Arc;

use tokio::net::TcpListener;

use replob_journey::Scheduler;
use replob_types::Endpoint;
use replob_wire::{read_message, Message};

use crate::error::NetError;

/// Accepts connections on `endpoint` and, for each one, spawns a journey
/// that reads [`Message`]s off it and hands each to `on_message` until the
/// peer disconnects. Corresponds to `MsgListener::listen` in the source,
/// minus its closure-pointer dispatch (see `replob-wire`'s module docs).
pub async fn serve<H>(
    endpoint: &Endpoint,
    scheduler: &Scheduler,
    on_message: H,
) -> Result<(), NetError>
where
    H: Fn(Message) + Send + Sync + 'static,
{
    let listener = TcpListener::bind(endpoint.socket_addr_string()).await?;
    let on_message = Arc::new(on_message);
    tracing::info!(endpoint = %endpoint.socket_addr_string(), "listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        let on_message = on_message.clone();
        replob_journey::spawn(scheduler, move || async move {
            let (mut read_half, _write_half) = stream.into_split();
            loop {
                match read_message(&mut read_half).await {
                    Ok(message) => on_message(message),
                    Err(replob_wire::WireError::ConnectionClosed) => {
                        tracing::debug!(%peer, "peer disconnected");
                        break;
                    }
                    Err(error) => {
                        tracing::warn!(%peer, %error, "read failed, closing connection");
                        break;
                    }
                }
            }
        });
    }
}
