//! Wire protocol of the WebSocket edge.
//!
//! Requests are a closed set tagged by `command`; every request gets exactly
//! one `Reply` carrying an HTTP-style `status` and a `type`-tagged body.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(
    tag = "command",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientRequest {
    ListTopics,
    DescribeTopic {
        topic: String,
    },
    CreateTopic {
        name: String,
    },
    DeleteTopic {
        topic: String,
    },
    Send {
        topic: String,
        message: String,
    },
    Receive {
        topic: String,
    },
    Delete {
        topic: String,
        message_id: String,
    },
    CreateSubscriber {
        subscriber: String,
        endpoint: String,
        topics: Vec<String>,
    },
    GetSubscriber {
        subscriber_id: String,
    },
    DeleteSubscriber {
        subscriber_id: String,
    },
    Subscribe {
        subscriber_id: String,
        topics: Vec<String>,
    },
    Unsubscribe {
        subscriber_id: String,
        topics: Vec<String>,
    },
}

impl ClientRequest {
    /// Wire name of the command, as used in the `command` tag.
    pub fn command(&self) -> &'static str {
        match self {
            ClientRequest::ListTopics => "list_topics",
            ClientRequest::DescribeTopic { .. } => "describe_topic",
            ClientRequest::CreateTopic { .. } => "create_topic",
            ClientRequest::DeleteTopic { .. } => "delete_topic",
            ClientRequest::Send { .. } => "send",
            ClientRequest::Receive { .. } => "receive",
            ClientRequest::Delete { .. } => "delete",
            ClientRequest::CreateSubscriber { .. } => "create_subscriber",
            ClientRequest::GetSubscriber { .. } => "get_subscriber",
            ClientRequest::DeleteSubscriber { .. } => "delete_subscriber",
            ClientRequest::Subscribe { .. } => "subscribe",
            ClientRequest::Unsubscribe { .. } => "unsubscribe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Reply {
    pub status: u16,
    #[serde(flatten)]
    pub body: ReplyBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ReplyBody {
    Topics {
        topics: Vec<String>,
    },
    TopicInfo {
        topic: String,
        subscribers: Vec<String>,
    },
    Topic {
        topic: String,
    },
    MessageId {
        message_id: String,
    },
    Message {
        message_id: String,
        topic_name: String,
        message: String,
        published_at: i64,
    },
    NoContent,
    Subscriber {
        subscriber_id: String,
        subscribed_to: Vec<String>,
    },
    SubscriberInfo {
        id: String,
        name: String,
        endpoint: String,
        subscribed_to: Vec<String>,
    },
    SubscriberId {
        subscriber_id: String,
    },
    Subscriptions {
        subscribed_to: Vec<String>,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}
