//! Message definitions for the broker.
//!
//! A `Message` is owned by its topic's queue from publish until it is pulled
//! or deleted. The body is opaque; the broker never inspects it.

/// A published message.
///
/// - `id`: unique within the topic instance, assigned at publish
/// - `topic`: name of the topic the message was published to
/// - `body`: opaque payload bytes
/// - `published_at`: milliseconds since UNIX epoch, set by the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub topic: String,
    pub body: Vec<u8>,
    pub published_at: i64,
}

/// Identifier returned by a successful publish.
pub type MessageId = String;
