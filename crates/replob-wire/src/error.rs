/// Errors from encoding, decoding or framing a [`crate::Message`].
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("failed to encode message")]
    Encode(#[source] postcard::Error),

    #[error("failed to decode message")]
    Decode(#[source] postcard::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: u64, max: u64 },

    #[error("connection closed mid-frame")]
    ConnectionClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
