use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WireError;
use crate::message::Message;

/// Upper bound on a single frame's payload, matching `MsgListener::listen`'s
/// `10 * 1024 * 1024` guard in the source — a node that asks for more is
/// assumed to be sending garbage rather than a legitimately large batch.
pub const MAX_FRAME_BYTES: u64 = 10 * 1024 * 1024;

/// Serializes `message` and writes it as `[8-byte little-endian length][bytes]`.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = postcard::to_allocvec(message).map_err(WireError::Encode)?;
    let len = bytes.len() as u64;
    if len > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge {
            len,
            max: MAX_FRAME_BYTES,
        });
    }
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame and decodes it as a [`Message`].
///
/// Returns [`WireError::ConnectionClosed`] if the peer closes before a single
/// byte of a new frame arrives (a clean disconnect); any other short read is
/// an `Io` error.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 8];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(WireError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }
    let len = u64::from_le_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge {
            len,
            max: MAX_FRAME_BYTES,
        });
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    postcard::from_bytes(&payload).map_err(WireError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use replob_types::{MessageId, NodeId, StepId};
    use crate::message::{CarryEntry, Command};

    #[tokio::test]
    async fn round_trips_a_commit_message() {
        let mut buf = Vec::new();
        let message = Message::Commit {
            step: StepId::new(7),
            carries: vec![CarryEntry {
                id: MessageId::new(NodeId::new(1), 0),
                command: Command::RemoveNode { node: NodeId::new(9) },
            }],
        };
        write_message(&mut std::io::Cursor::new(&mut buf), &message)
            .await
            .unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_message(&mut cursor).await.unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn rejects_a_frame_claiming_to_exceed_the_limit() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_le_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_message(&mut cursor).await.unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn empty_stream_reports_connection_closed() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let err = read_message(&mut cursor).await.unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
        let _ = NodeId::new(1);
    }
}
