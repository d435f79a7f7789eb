//! # Message Payloads
//!
//! Request and response payloads exchanged with downstream handlers.
//!
//! A message body is either already in memory (`Text`) or still attached to the
//! transport that produced it (`Streaming`). Streaming bodies hold on to whatever
//! resource backs the stream (a connection, a file handle) until they are drained,
//! so consumers that keep a reply around should call [`Message::preserve`] first.

use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use std::fmt;
use thiserror::Error;

/// Errors raised while reading a message body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The underlying stream yielded an error before it was fully drained
    #[error("Message stream failed after {bytes_read} bytes: {message}")]
    StreamFailed { bytes_read: usize, message: String },
}

/// Chunk type yielded by a streaming message body
pub type MessageChunk = Result<String, MessageError>;

enum MessageBody {
    Text(String),
    // Wrapped only so `Message` is `Sync`; drained through `into_inner`, never locked.
    Streaming(Mutex<BoxStream<'static, MessageChunk>>),
}

/// A request or response payload
pub struct Message {
    body: MessageBody,
}

impl Message {
    /// Create an in-memory message
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            body: MessageBody::Text(value.into()),
        }
    }

    /// Create an empty in-memory message
    pub fn empty() -> Self {
        Self::text(String::new())
    }

    /// Create a message whose body is still being produced by a transport
    pub fn streaming(stream: BoxStream<'static, MessageChunk>) -> Self {
        Self {
            body: MessageBody::Streaming(Mutex::new(stream)),
        }
    }

    /// Whether the body is held in memory
    pub fn is_preserved(&self) -> bool {
        matches!(self.body, MessageBody::Text(_))
    }

    /// Whether the body is known to be empty
    ///
    /// A streaming body is never reported empty; preserve it first.
    pub fn is_empty(&self) -> bool {
        match &self.body {
            MessageBody::Text(text) => text.is_empty(),
            MessageBody::Streaming(_) => false,
        }
    }

    /// Borrow the body if it is held in memory
    pub fn as_str(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text(text) => Some(text.as_str()),
            MessageBody::Streaming(_) => None,
        }
    }

    /// Drain a streaming body into memory, releasing the stream
    ///
    /// Calling this on an in-memory message is a no-op. If the stream fails,
    /// the message is left holding an empty body and the stream is dropped.
    pub async fn preserve(&mut self) -> Result<(), MessageError> {
        let stream = match std::mem::replace(&mut self.body, MessageBody::Text(String::new())) {
            MessageBody::Text(text) => {
                self.body = MessageBody::Text(text);
                return Ok(());
            }
            MessageBody::Streaming(stream) => stream.into_inner(),
        };

        let text = collect_stream(stream).await?;
        self.body = MessageBody::Text(text);
        Ok(())
    }

    /// Consume the message, returning its full body
    pub async fn into_text(self) -> Result<String, MessageError> {
        match self.body {
            MessageBody::Text(text) => Ok(text),
            MessageBody::Streaming(stream) => collect_stream(stream.into_inner()).await,
        }
    }
}

async fn collect_stream(mut stream: BoxStream<'static, MessageChunk>) -> Result<String, MessageError> {
    let mut buffer = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(part) => buffer.push_str(&part),
            Err(MessageError::StreamFailed { message, .. }) => {
                return Err(MessageError::StreamFailed {
                    bytes_read: buffer.len(),
                    message,
                });
            }
        }
    }
    Ok(buffer)
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            MessageBody::Text(text) => f.debug_tuple("Message::Text").field(text).finish(),
            MessageBody::Streaming(_) => f.write_str("Message::Streaming(..)"),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            MessageBody::Text(text) => f.write_str(text),
            MessageBody::Streaming(_) => f.write_str("[streaming message]"),
        }
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_preserve_drains_stream() {
        let chunks = vec![Ok("hello ".to_string()), Ok("world".to_string())];
        let mut message = Message::streaming(stream::iter(chunks).boxed());

        assert!(!message.is_preserved());
        assert_eq!(message.as_str(), None);

        message.preserve().await.unwrap();

        assert!(message.is_preserved());
        assert_eq!(message.as_str(), Some("hello world"));
    }

    #[tokio::test]
    async fn test_preserve_reports_stream_failure() {
        let chunks = vec![
            Ok("abc".to_string()),
            Err(MessageError::StreamFailed {
                bytes_read: 0,
                message: "connection reset".to_string(),
            }),
        ];
        let mut message = Message::streaming(stream::iter(chunks).boxed());

        let err = message.preserve().await.unwrap_err();
        assert_eq!(
            err,
            MessageError::StreamFailed {
                bytes_read: 3,
                message: "connection reset".to_string()
            }
        );
        assert!(message.is_preserved());
        assert!(message.is_empty());
    }

    #[tokio::test]
    async fn test_preserve_is_noop_for_text() {
        let mut message = Message::text("payload");
        message.preserve().await.unwrap();
        assert_eq!(message.as_str(), Some("payload"));
    }

    #[test]
    fn test_streaming_is_never_empty() {
        let message = Message::streaming(stream::empty().boxed());
        assert!(!message.is_empty());
        assert!(Message::empty().is_empty());
    }
}
