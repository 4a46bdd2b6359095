use super::Dispatcher;
use super::notifier::{Delivery, HttpDelivery, Notifier, PushEvent};
use super::queue::{MessageQueue, QueueLimits};
use super::subscriber::SubscriberRegistry;
use super::topic::TopicRegistry;
use crate::config::BrokerSettings;
use crate::utils::{BrokerError, DeliveryError};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

const LIMITS: QueueLimits = QueueLimits {
    max_depth: 100,
    max_message_bytes: 1024,
};

struct RecordingDelivery {
    tx: mpsc::UnboundedSender<(String, PushEvent)>,
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn deliver(&self, endpoint: &str, event: &PushEvent) -> Result<(), DeliveryError> {
        let _ = self.tx.send((endpoint.to_string(), event.clone()));
        Ok(())
    }
}

struct FailingDelivery;

#[async_trait]
impl Delivery for FailingDelivery {
    async fn deliver(&self, endpoint: &str, _event: &PushEvent) -> Result<(), DeliveryError> {
        Err(DeliveryError::Rejected {
            endpoint: endpoint.to_string(),
            status: 503,
        })
    }
}

fn topics(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Dispatcher whose notifier worker is never run.
fn dispatcher() -> Dispatcher {
    let (notifier, _worker) = Notifier::new(Arc::new(FailingDelivery), 4);
    Dispatcher::new(&BrokerSettings::default(), notifier)
}

#[test]
fn test_queue_is_fifo() {
    let queue = MessageQueue::new("orders", LIMITS);
    let ids: Vec<_> = (0..5)
        .map(|i| queue.publish(format!("m{i}").into_bytes()).unwrap())
        .collect();

    for (i, id) in ids.iter().enumerate() {
        let msg = queue.pull().expect("message expected");
        assert_eq!(&msg.id, id);
        assert_eq!(msg.topic, "orders");
        assert_eq!(msg.body, format!("m{i}").into_bytes());
    }
    assert!(queue.pull().is_none());
}

#[test]
fn test_queue_delete_from_middle_keeps_order() {
    let queue = MessageQueue::new("orders", LIMITS);
    let a = queue.publish(b"a".to_vec()).unwrap();
    let b = queue.publish(b"b".to_vec()).unwrap();
    let c = queue.publish(b"c".to_vec()).unwrap();

    assert!(queue.delete_by_id(&b));
    assert!(!queue.delete_by_id(&b));
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pull().unwrap().id, a);
    assert_eq!(queue.pull().unwrap().id, c);
}

#[test]
fn test_queue_delete_unknown_ids() {
    let queue = MessageQueue::new("orders", LIMITS);
    queue.publish(b"a".to_vec()).unwrap();

    assert!(!queue.delete_by_id("42"));
    assert!(!queue.delete_by_id("not-a-number"));
    assert!(!queue.delete_by_id("01"));
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_queue_ids_not_reused_after_consumption() {
    let queue = MessageQueue::new("orders", LIMITS);
    let first = queue.publish(b"a".to_vec()).unwrap();
    queue.pull().unwrap();
    let second = queue.publish(b"b".to_vec()).unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_queue_capacity_limits() {
    let queue = MessageQueue::new(
        "small",
        QueueLimits {
            max_depth: 2,
            max_message_bytes: 4,
        },
    );

    assert!(matches!(
        queue.publish(b"too long".to_vec()),
        Err(BrokerError::CapacityExceeded(_))
    ));
    queue.publish(b"a".to_vec()).unwrap();
    queue.publish(b"b".to_vec()).unwrap();
    assert!(matches!(
        queue.publish(b"c".to_vec()),
        Err(BrokerError::CapacityExceeded(_))
    ));

    // the failed calls did not disturb what was queued
    assert_eq!(queue.pull().unwrap().body, b"a".to_vec());
    queue.publish(b"c".to_vec()).unwrap();
}

#[test]
fn test_closed_queue_rejects_publish() {
    let queue = MessageQueue::new("gone", LIMITS);
    queue.publish(b"a".to_vec()).unwrap();

    assert_eq!(queue.close(), 1);
    assert!(queue.is_closed());
    assert!(queue.pull().is_none());
    assert_eq!(
        queue.publish(b"b".to_vec()),
        Err(BrokerError::TopicNotFound("gone".to_string()))
    );
}

#[test]
fn test_concurrent_pullers_never_share_a_message() {
    let queue = Arc::new(MessageQueue::new(
        "busy",
        QueueLimits {
            max_depth: 10_000,
            max_message_bytes: 16,
        },
    ));
    for i in 0..2_000 {
        queue.publish(i.to_string().into_bytes()).unwrap();
    }

    let pulled: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                scope.spawn(move || {
                    let mut ids = Vec::new();
                    while let Some(msg) = queue.pull() {
                        ids.push(msg.id);
                    }
                    ids
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = pulled.iter().collect();
    assert_eq!(pulled.len(), 2_000);
    assert_eq!(unique.len(), 2_000);
}

#[test]
fn test_concurrent_publishers_never_lose_or_duplicate() {
    let queue = MessageQueue::new(
        "fan-in",
        QueueLimits {
            max_depth: 10_000,
            max_message_bytes: 16,
        },
    );

    let ids: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|p| {
                let queue = &queue;
                scope.spawn(move || {
                    (0..1_000)
                        .map(|i| queue.publish(format!("{p}-{i}").into_bytes()).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(ids.len(), 8_000);
    assert_eq!(unique.len(), 8_000);
    assert_eq!(queue.len(), 8_000);

    // each publisher's messages come out in the order it sent them
    let mut last_seen: HashMap<String, u32> = HashMap::new();
    while let Some(msg) = queue.pull() {
        let body = String::from_utf8(msg.body).unwrap();
        let (publisher, seq) = body.split_once('-').unwrap();
        let seq: u32 = seq.parse().unwrap();
        if let Some(prev) = last_seen.insert(publisher.to_string(), seq) {
            assert!(prev < seq, "publisher {publisher} reordered: {prev} before {seq}");
        }
    }
    assert_eq!(last_seen.len(), 8);
}

#[test]
fn test_delete_racing_pull_has_one_winner() {
    for _ in 0..500 {
        let queue = MessageQueue::new("race", LIMITS);
        let id = queue.publish(b"x".to_vec()).unwrap();

        let (pulled, deleted) = std::thread::scope(|scope| {
            let puller = scope.spawn(|| queue.pull().is_some());
            let deleter = scope.spawn(|| queue.delete_by_id(&id));
            (puller.join().unwrap(), deleter.join().unwrap())
        });

        assert!(pulled ^ deleted, "pulled={pulled} deleted={deleted}");
        assert!(queue.is_empty());
    }
}

#[test]
fn test_registry_rejects_duplicate_topic() {
    let registry = TopicRegistry::new(LIMITS, 10);
    registry.create("t1", "orders").unwrap();
    registry.get("t1", "orders").unwrap().queue.publish(b"x".to_vec()).unwrap();

    assert_eq!(
        registry.create("t1", "orders"),
        Err(BrokerError::TopicExists("orders".to_string()))
    );
    // the existing topic keeps its queue
    assert_eq!(registry.get("t1", "orders").unwrap().queue.len(), 1);
}

#[test]
fn test_registry_lists_in_creation_order_per_tenant() {
    let registry = TopicRegistry::new(LIMITS, 10);
    for name in ["zeta", "alpha", "mid"] {
        registry.create("t1", name).unwrap();
    }
    registry.create("t2", "other").unwrap();

    assert_eq!(registry.list("t1"), vec!["zeta", "alpha", "mid"]);
    assert_eq!(registry.list("t2"), vec!["other"]);
    assert!(registry.list("t3").is_empty());
}

#[test]
fn test_registry_validates_names_and_caps() {
    let registry = TopicRegistry::new(LIMITS, 2);
    assert!(matches!(
        registry.create("t1", ""),
        Err(BrokerError::InvalidArgument(_))
    ));

    registry.create("t1", "a").unwrap();
    registry.create("t1", "b").unwrap();
    assert!(matches!(
        registry.create("t1", "c"),
        Err(BrokerError::CapacityExceeded(_))
    ));
    // the cap is per tenant
    registry.create("t2", "c").unwrap();
}

#[test]
fn test_registry_delete_closes_queue() {
    let registry = TopicRegistry::new(LIMITS, 10);
    registry.create("t1", "orders").unwrap();
    let handle = registry.get("t1", "orders").unwrap();

    registry.delete("t1", "orders").unwrap();
    assert!(handle.queue.is_closed());
    assert_eq!(
        registry.delete("t1", "orders"),
        Err(BrokerError::TopicNotFound("orders".to_string()))
    );
}

#[test]
fn test_concurrent_create_has_one_winner() {
    let registry = Arc::new(TopicRegistry::new(LIMITS, 10));

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                scope.spawn(move || registry.create("t1", "race"))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(BrokerError::TopicExists(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 7);
}

#[test]
fn test_subscriber_requires_topics() {
    let registry = SubscriberRegistry::new();
    assert!(matches!(
        registry.create("t1", "s1", "http://x", &[]),
        Err(BrokerError::InvalidArgument(_))
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_subscribe_reports_only_new_topics() {
    let registry = SubscriberRegistry::new();
    let sub = registry
        .create("t1", "s1", "http://x", &topics(&["orders"]))
        .unwrap();

    let added = registry
        .subscribe("t1", &sub.id, &topics(&["orders", "shipping", "shipping"]))
        .unwrap();
    assert_eq!(added, vec!["shipping"]);

    let again = registry.subscribe("t1", &sub.id, &topics(&["orders"])).unwrap();
    assert!(again.is_empty());

    let record = registry.get("t1", &sub.id).unwrap();
    assert_eq!(record.topics.len(), 2);
}

#[test]
fn test_unsubscribe_reports_only_removed_topics() {
    let registry = SubscriberRegistry::new();
    let sub = registry
        .create("t1", "s1", "http://x", &topics(&["a", "b"]))
        .unwrap();

    let removed = registry
        .unsubscribe("t1", &sub.id, &topics(&["b", "c"]))
        .unwrap();
    assert_eq!(removed, vec!["b"]);
    assert!(registry.watchers_of("t1", "b").is_empty());
    assert_eq!(registry.watchers_of("t1", "a").len(), 1);
}

#[test]
fn test_subscribe_racing_delete_leaves_no_index_entries() {
    let registry = SubscriberRegistry::new();

    for round in 0..200 {
        let sub = registry
            .create("t1", "racer", "http://hook", &topics(&["base"]))
            .unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..20 {
                    let name = format!("r{round}-{i}");
                    if registry.subscribe("t1", &sub.id, &[name]).is_err() {
                        break;
                    }
                }
            });
            scope.spawn(|| {
                let _ = registry.unsubscribe("t1", &sub.id, &topics(&["base"]));
            });
            scope.spawn(|| registry.delete("t1", &sub.id).unwrap());
        });

        assert!(matches!(
            registry.subscribe("t1", &sub.id, &topics(&["late"])),
            Err(BrokerError::SubscriberNotFound(_))
        ));
    }

    assert!(registry.is_empty());
    assert_eq!(registry.indexed_topics(), 0);
    assert!(registry.watchers_of("t1", "base").is_empty());
}

#[test]
fn test_subscribers_are_tenant_scoped() {
    let registry = SubscriberRegistry::new();
    let sub = registry
        .create("t1", "s1", "http://x", &topics(&["orders"]))
        .unwrap();

    let missing = BrokerError::SubscriberNotFound(sub.id.clone());
    assert_eq!(registry.get("t2", &sub.id), Err(missing.clone()));
    assert_eq!(registry.delete("t2", &sub.id), Err(missing.clone()));
    assert_eq!(
        registry.subscribe("t2", &sub.id, &topics(&["x"])),
        Err(missing)
    );
    assert!(registry.watchers_of("t2", "orders").is_empty());
    assert!(registry.get("t1", &sub.id).is_ok());
}

#[test]
fn test_deleted_subscriber_is_gone() {
    let registry = SubscriberRegistry::new();
    let sub = registry
        .create("t1", "s1", "http://x", &topics(&["orders"]))
        .unwrap();

    registry.delete("t1", &sub.id).unwrap();
    assert!(matches!(
        registry.delete("t1", &sub.id),
        Err(BrokerError::SubscriberNotFound(_))
    ));
    assert!(matches!(
        registry.unsubscribe("t1", &sub.id, &topics(&["orders"])),
        Err(BrokerError::SubscriberNotFound(_))
    ));
    assert!(registry.watchers_of("t1", "orders").is_empty());
}

#[test]
fn test_send_then_pull_scenario() {
    let dispatcher = dispatcher();
    assert_eq!(dispatcher.create_topic("t1", "orders").unwrap(), "orders");

    let id = dispatcher.send_message("t1", "orders", b"hello".to_vec()).unwrap();
    let msg = dispatcher.pull_message("t1", "orders").unwrap().unwrap();
    assert_eq!(msg.id, id);
    assert_eq!(msg.body, b"hello".to_vec());

    assert_eq!(dispatcher.pull_message("t1", "orders").unwrap(), None);
}

#[test]
fn test_topics_are_invisible_across_tenants() {
    let dispatcher = dispatcher();
    dispatcher.create_topic("t1", "orders").unwrap();

    assert!(dispatcher.list_topics("t2").is_empty());
    assert_eq!(
        dispatcher.describe_topic("t2", "orders"),
        Err(BrokerError::TopicNotFound("orders".to_string()))
    );
    assert!(matches!(
        dispatcher.send_message("t2", "orders", b"x".to_vec()),
        Err(BrokerError::TopicNotFound(_))
    ));
    // same name is free under another tenant
    dispatcher.create_topic("t2", "orders").unwrap();
}

#[test]
fn test_operations_on_missing_topic() {
    let dispatcher = dispatcher();
    let missing = BrokerError::TopicNotFound("nope".to_string());

    assert_eq!(dispatcher.delete_topic("t1", "nope"), Err(missing.clone()));
    assert_eq!(dispatcher.pull_message("t1", "nope"), Err(missing.clone()));
    assert_eq!(
        dispatcher.delete_message("t1", "nope", "1"),
        Err(missing.clone())
    );
    assert_eq!(
        dispatcher.send_message("t1", "nope", b"x".to_vec()),
        Err(missing)
    );
}

#[test]
fn test_delete_message_reports_missing_id() {
    let dispatcher = dispatcher();
    dispatcher.create_topic("t1", "orders").unwrap();
    let first = dispatcher.send_message("t1", "orders", b"1".to_vec()).unwrap();
    let second = dispatcher.send_message("t1", "orders", b"2".to_vec()).unwrap();

    assert_eq!(
        dispatcher.delete_message("t1", "orders", "999"),
        Err(BrokerError::MessageNotFound("999".to_string()))
    );
    assert_eq!(
        dispatcher.delete_message("t1", "orders", &first).unwrap(),
        first
    );
    assert_eq!(
        dispatcher.pull_message("t1", "orders").unwrap().unwrap().id,
        second
    );
}

#[test]
fn test_delete_topic_leaves_subscribers_alone() {
    let dispatcher = dispatcher();
    dispatcher.create_topic("t1", "orders").unwrap();
    let sub = dispatcher
        .create_subscriber("t1", "s1", "http://x", &topics(&["orders"]))
        .unwrap();
    assert_eq!(
        dispatcher.describe_topic("t1", "orders").unwrap(),
        vec![sub.id.clone()]
    );

    dispatcher.delete_topic("t1", "orders").unwrap();
    assert_eq!(
        dispatcher.describe_topic("t1", "orders"),
        Err(BrokerError::TopicNotFound("orders".to_string()))
    );
    let info = dispatcher.get_subscriber_info("t1", &sub.id).unwrap();
    assert!(info.topics.contains("orders"));
}

#[test]
fn test_recreated_topic_starts_fresh() {
    let dispatcher = dispatcher();
    dispatcher.create_topic("t1", "orders").unwrap();
    let old = dispatcher.send_message("t1", "orders", b"old".to_vec()).unwrap();
    dispatcher.delete_topic("t1", "orders").unwrap();

    dispatcher.create_topic("t1", "orders").unwrap();
    assert_eq!(dispatcher.pull_message("t1", "orders").unwrap(), None);
    let new = dispatcher.send_message("t1", "orders", b"new".to_vec()).unwrap();
    assert_eq!(old, new);
}

#[test]
fn test_subscriber_scenario_through_dispatcher() {
    let dispatcher = dispatcher();
    let sub = dispatcher
        .create_subscriber("t1", "s1", "http://x", &topics(&["orders"]))
        .unwrap();

    let added = dispatcher
        .subscribe_topic("t1", &sub.id, &topics(&["orders", "shipping"]))
        .unwrap();
    assert_eq!(added, vec!["shipping"]);

    let removed = dispatcher
        .unsubscribe_topic("t1", &sub.id, &topics(&["orders"]))
        .unwrap();
    assert_eq!(removed, vec!["orders"]);

    assert_eq!(dispatcher.delete_subscriber("t1", &sub.id).unwrap(), sub.id);
    assert!(matches!(
        dispatcher.get_subscriber_info("t1", &sub.id),
        Err(BrokerError::SubscriberNotFound(_))
    ));
}

#[tokio::test]
async fn test_publish_pushes_to_watchers() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (notifier, worker) = Notifier::new(Arc::new(RecordingDelivery { tx }), 4);
    tokio::spawn(worker.run());
    let dispatcher = Dispatcher::new(&BrokerSettings::default(), notifier);

    dispatcher.create_topic("t1", "orders").unwrap();
    dispatcher.create_topic("t1", "quiet").unwrap();
    let sub = dispatcher
        .create_subscriber("t1", "s1", "http://hook/orders", &topics(&["orders"]))
        .unwrap();

    dispatcher.send_message("t1", "quiet", b"nobody".to_vec()).unwrap();
    let id = dispatcher.send_message("t1", "orders", b"hi".to_vec()).unwrap();

    let (endpoint, event) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("push not delivered in time")
        .expect("channel closed");
    assert_eq!(endpoint, "http://hook/orders");
    assert_eq!(
        event,
        PushEvent {
            tenant: "t1".to_string(),
            topic: "orders".to_string(),
            message_id: id,
            subscriber_id: sub.id,
        }
    );

    // nothing was pushed for the unwatched topic
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());

    // the pull side is unaffected by push delivery
    assert!(dispatcher.pull_message("t1", "orders").unwrap().is_some());
}

#[tokio::test]
async fn test_failed_push_does_not_fail_publish() {
    let (notifier, worker) = Notifier::new(Arc::new(FailingDelivery), 4);
    tokio::spawn(worker.run());
    let dispatcher = Dispatcher::new(&BrokerSettings::default(), notifier);

    dispatcher.create_topic("t1", "orders").unwrap();
    dispatcher
        .create_subscriber("t1", "s1", "http://unreachable", &topics(&["orders"]))
        .unwrap();

    let id = dispatcher.send_message("t1", "orders", b"x".to_vec()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(dispatcher.pull_message("t1", "orders").unwrap().unwrap().id, id);
}

/// Records every in-flight delivery and holds each one briefly.
struct SlowDelivery {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    done: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Delivery for SlowDelivery {
    async fn deliver(&self, _endpoint: &str, event: &PushEvent) -> Result<(), DeliveryError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _ = self.done.send(event.message_id.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_notifier_caps_deliveries_in_flight() {
    let (done, mut delivered) = mpsc::unbounded_channel();
    let delivery = Arc::new(SlowDelivery {
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
        done,
    });
    let (notifier, worker) = Notifier::new(delivery.clone(), 2);
    tokio::spawn(worker.run());
    let dispatcher = Dispatcher::new(&BrokerSettings::default(), notifier);

    dispatcher.create_topic("t1", "orders").unwrap();
    dispatcher
        .create_subscriber("t1", "s1", "http://hook", &topics(&["orders"]))
        .unwrap();
    for i in 0..6 {
        dispatcher
            .send_message("t1", "orders", format!("m{i}").into_bytes())
            .unwrap();
    }

    let mut ids = HashSet::new();
    for _ in 0..6 {
        let id = tokio::time::timeout(Duration::from_secs(2), delivered.recv())
            .await
            .expect("push not delivered in time")
            .expect("channel closed");
        ids.insert(id);
    }
    assert_eq!(ids.len(), 6);
    assert_eq!(delivery.peak.load(Ordering::SeqCst), 2);
}

type Hook = (String, serde_json::Value);

/// Accepts push events: `/ok` answers 200, any other path 500.
async fn hook(
    req: Request<Incoming>,
    seen: mpsc::UnboundedSender<Hook>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };
    let event = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    let _ = seen.send((path.clone(), event));

    let mut res = Response::new(Full::new(Bytes::new()));
    if path != "/ok" {
        *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    }
    Ok(res)
}

async fn start_hook_server() -> (String, mpsc::UnboundedReceiver<Hook>) {
    let port = portpicker::pick_unused_port().expect("No free ports");
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .expect("bind hook server");
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req| hook(req, tx.clone()));
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (format!("http://127.0.0.1:{port}"), rx)
}

#[tokio::test]
async fn test_http_delivery_posts_json_and_maps_failures() {
    let (base, mut seen) = start_hook_server().await;
    let delivery = HttpDelivery::new(Duration::from_secs(2)).expect("build http client");
    let event = PushEvent {
        tenant: "t1".to_string(),
        topic: "orders".to_string(),
        message_id: "7".to_string(),
        subscriber_id: "sub-1".to_string(),
    };

    delivery
        .deliver(&format!("{base}/ok"), &event)
        .await
        .expect("accepted push");
    let (path, body) = seen.recv().await.expect("hook saw the push");
    assert_eq!(path, "/ok");
    assert_eq!(
        body,
        json!({
            "tenant": "t1",
            "topic": "orders",
            "messageId": "7",
            "subscriberId": "sub-1"
        })
    );

    let rejected = format!("{base}/broken");
    match delivery.deliver(&rejected, &event).await {
        Err(DeliveryError::Rejected { endpoint, status }) => {
            assert_eq!(endpoint, rejected);
            assert_eq!(status, 500);
        }
        other => panic!("Expected a rejection, got {other:?}"),
    }

    let closed_port = portpicker::pick_unused_port().expect("No free ports");
    let unreachable = format!("http://127.0.0.1:{closed_port}/hook");
    match delivery.deliver(&unreachable, &event).await {
        Err(DeliveryError::Transport { endpoint, .. }) => assert_eq!(endpoint, unreachable),
        other => panic!("Expected a transport failure, got {other:?}"),
    }
}
