//! Event payloads and their text-event-stream framing.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Conventional notification payload: a single human-readable message.
///
/// The broadcaster accepts any `Serialize` value; this type only fixes the
/// field name callers agreed on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Text shown to the user.
    pub message: String,
}

impl Notification {
    /// Wrap an arbitrary message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Notice sent after a post was created.
    pub fn post_created(title: &str, author: &str) -> Self {
        Self::new(format!("New post \"{title}\" by {author}"))
    }
}

/// One encoded frame, shared by every write of a publish.
///
/// Data frames are `data: <json>\n\n`. `serde_json` escapes control
/// characters inside strings, so the JSON never spans more than one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    /// Encode `event` as a `data:` frame.
    pub fn encode<T: Serialize + ?Sized>(event: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(event)?;
        Ok(Self(Bytes::from(format!("data: {json}\n\n"))))
    }

    /// An empty comment frame. Clients ignore it; writing it detects dead peers.
    pub fn keep_alive() -> Self {
        Self(Bytes::from_static(b":\n\n"))
    }

    /// Raw bytes as written to the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Frame text. Frames are always built from UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Whether this is a comment rather than an event.
    pub fn is_comment(&self) -> bool {
        self.0.starts_with(b":")
    }

    /// Consume into the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}
