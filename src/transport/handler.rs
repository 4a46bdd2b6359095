//! Maps decoded requests onto dispatcher calls and renders the results.
//!
//! Status convention: not-found 404, name conflict 409, invalid input 400,
//! capacity 503, empty pull 204, anything else 500. 401 belongs to the
//! authentication layer in front of the gateway and is never produced here.

use std::time::{Duration, Instant};

use tracing::error;
use uuid::Uuid;

use crate::broker::{Dispatcher, Subscriber};
use crate::metrics;
use crate::transport::message::{ClientRequest, Reply, ReplyBody};
use crate::utils::BrokerError;

pub const OK: u16 = 200;
pub const NO_CONTENT: u16 = 204;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const CONFLICT: u16 = 409;
pub const INTERNAL_SERVER_ERROR: u16 = 500;
pub const SERVICE_UNAVAILABLE: u16 = 503;

/// Metrics label for frames that did not decode into a request.
pub const MALFORMED: &str = "malformed";

/// Run one request for `tenant` against the dispatcher. Every call is
/// counted and timed per command and status.
pub fn handle_request(dispatcher: &Dispatcher, tenant: &str, request: ClientRequest) -> Reply {
    let started = Instant::now();
    let command = request.command();
    let reply = match execute(dispatcher, tenant, request) {
        Ok(reply) => reply,
        Err(err) => error_reply(&err),
    };
    metrics::record_request(command, reply.status, started.elapsed());
    reply
}

/// Decode a raw text frame and run it. Undecodable input is a 400.
pub fn handle_text(dispatcher: &Dispatcher, tenant: &str, text: &str) -> Reply {
    match serde_json::from_str::<ClientRequest>(text) {
        Ok(request) => handle_request(dispatcher, tenant, request),
        Err(err) => {
            metrics::record_request(MALFORMED, BAD_REQUEST, Duration::ZERO);
            Reply {
                status: BAD_REQUEST,
                body: ReplyBody::Error {
                    message: format!("malformed request: {err}"),
                    details: None,
                },
            }
        }
    }
}

fn execute(
    dispatcher: &Dispatcher,
    tenant: &str,
    request: ClientRequest,
) -> Result<Reply, BrokerError> {
    let body = match request {
        ClientRequest::ListTopics => ReplyBody::Topics {
            topics: dispatcher.list_topics(tenant),
        },
        ClientRequest::DescribeTopic { topic } => {
            let subscribers = dispatcher.describe_topic(tenant, &topic)?;
            ReplyBody::TopicInfo { topic, subscribers }
        }
        ClientRequest::CreateTopic { name } => ReplyBody::Topic {
            topic: dispatcher.create_topic(tenant, &name)?,
        },
        ClientRequest::DeleteTopic { topic } => ReplyBody::Topic {
            topic: dispatcher.delete_topic(tenant, &topic)?,
        },
        ClientRequest::Send { topic, message } => ReplyBody::MessageId {
            message_id: dispatcher.send_message(tenant, &topic, message.into_bytes())?,
        },
        ClientRequest::Receive { topic } => match dispatcher.pull_message(tenant, &topic)? {
            Some(msg) => ReplyBody::Message {
                message_id: msg.id,
                topic_name: msg.topic,
                message: String::from_utf8_lossy(&msg.body).into_owned(),
                published_at: msg.published_at,
            },
            None => {
                return Ok(Reply {
                    status: NO_CONTENT,
                    body: ReplyBody::NoContent,
                });
            }
        },
        ClientRequest::Delete { topic, message_id } => ReplyBody::MessageId {
            message_id: dispatcher.delete_message(tenant, &topic, &message_id)?,
        },
        ClientRequest::CreateSubscriber {
            subscriber,
            endpoint,
            topics,
        } => {
            let created = dispatcher.create_subscriber(tenant, &subscriber, &endpoint, &topics)?;
            ReplyBody::Subscriber {
                subscriber_id: created.id,
                subscribed_to: created.topics.into_iter().collect(),
            }
        }
        ClientRequest::GetSubscriber { subscriber_id } => {
            subscriber_info(dispatcher.get_subscriber_info(tenant, &subscriber_id)?)
        }
        ClientRequest::DeleteSubscriber { subscriber_id } => ReplyBody::SubscriberId {
            subscriber_id: dispatcher.delete_subscriber(tenant, &subscriber_id)?,
        },
        ClientRequest::Subscribe {
            subscriber_id,
            topics,
        } => ReplyBody::Subscriptions {
            subscribed_to: dispatcher.subscribe_topic(tenant, &subscriber_id, &topics)?,
        },
        ClientRequest::Unsubscribe {
            subscriber_id,
            topics,
        } => ReplyBody::Subscriptions {
            subscribed_to: dispatcher.unsubscribe_topic(tenant, &subscriber_id, &topics)?,
        },
    };

    Ok(Reply { status: OK, body })
}

fn subscriber_info(subscriber: Subscriber) -> ReplyBody {
    ReplyBody::SubscriberInfo {
        id: subscriber.id,
        name: subscriber.name,
        endpoint: subscriber.endpoint,
        subscribed_to: subscriber.topics.into_iter().collect(),
    }
}

pub fn status_for(err: &BrokerError) -> u16 {
    match err {
        BrokerError::TopicNotFound(_)
        | BrokerError::MessageNotFound(_)
        | BrokerError::SubscriberNotFound(_) => NOT_FOUND,
        BrokerError::TopicExists(_) => CONFLICT,
        BrokerError::InvalidArgument(_) => BAD_REQUEST,
        BrokerError::CapacityExceeded(_) => SERVICE_UNAVAILABLE,
        BrokerError::Internal(_) => INTERNAL_SERVER_ERROR,
    }
}

/// Render an error. Internal failures get an opaque incident id in place of
/// their cause, which only goes to the log.
pub fn error_reply(err: &BrokerError) -> Reply {
    let status = status_for(err);
    let body = match err {
        BrokerError::Internal(cause) => {
            let incident = Uuid::new_v4();
            error!(%incident, cause = %cause, "internal error while handling request");
            ReplyBody::Error {
                message: "internal error".to_string(),
                details: Some(format!("incident {incident}")),
            }
        }
        other => ReplyBody::Error {
            message: other.to_string(),
            details: None,
        },
    };
    Reply { status, body }
}
