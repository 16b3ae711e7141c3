//! RelayFrame - the line written to the SMS device
//!
//! Layout: `::<destination>::<message>::\n`

use bytes::{BufMut, Bytes, BytesMut};

/// Field separator, also the start and end marker
pub const FRAME_DELIMITER: &[u8] = b"::";

/// Frame terminator
pub const FRAME_TERMINATOR: u8 = b'\n';

/// Encoded relay frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayFrame(Bytes);

impl RelayFrame {
    /// Encode a destination and message
    pub fn encode(destination: &str, message: &str) -> Self {
        let mut buf = BytesMut::with_capacity(
            destination.len() + message.len() + 3 * FRAME_DELIMITER.len() + 1,
        );
        buf.put_slice(FRAME_DELIMITER);
        buf.put_slice(destination.as_bytes());
        buf.put_slice(FRAME_DELIMITER);
        buf.put_slice(message.as_bytes());
        buf.put_slice(FRAME_DELIMITER);
        buf.put_u8(FRAME_TERMINATOR);
        Self(buf.freeze())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl AsRef<[u8]> for RelayFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
