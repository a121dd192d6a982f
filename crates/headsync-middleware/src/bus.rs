//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.  Publishing never needs a running runtime, so the
//! single-threaded frame loop can publish directly; subscribers may poll with
//! [`TopicReceiver::try_recv`] or await [`TopicReceiver::recv`].
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::HeadPose`] | One `FrameReport` per reconciled frame |
//! | [`Topic::Aim`] | Gaze ray results |
//! | [`Topic::Props`] | Barrel hits, detonations, blasts |
//! | [`Topic::SystemAlerts`] | Rig sync lost / restored |

use headsync_types::{Event, SyncError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Enumeration of all routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    HeadPose,
    Aim,
    Props,
    SystemAlerts,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    head_pose: broadcast::Sender<Event>,
    aim: broadcast::Sender<Event>,
    props: broadcast::Sender<Event>,
    system_alerts: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently and
    /// must be greater than zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (head_pose, _) = broadcast::channel(capacity);
        let (aim, _) = broadcast::channel(capacity);
        let (props, _) = broadcast::channel(capacity);
        let (system_alerts, _) = broadcast::channel(capacity);
        Self {
            head_pose,
            aim,
            props,
            system_alerts,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Channel`] when nobody is subscribed to the topic.
    /// Fire-and-forget publishers are expected to ignore this.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, SyncError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| SyncError::Channel(format!("No subscribers for topic {topic:?}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::HeadPose => &self.head_pose,
            Topic::Aim => &self.aim,
            Topic::Props => &self.props,
            Topic::SystemAlerts => &self.system_alerts,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Take the next buffered event without waiting.
    ///
    /// Lag is logged and skipped over; `None` means nothing is buffered (or
    /// the bus is gone).
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// Take every buffered event.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use headsync_types::{AimResult, EventPayload};

    fn make_event(source: &str) -> Event {
        Event::new(
            source,
            EventPayload::Aim {
                frame: 1,
                aim: AimResult {
                    hit: false,
                    point: Vec3::new(0.0, 0.0, 100.0),
                    distance: 100.0,
                    collider: None,
                },
            },
        )
    }

    #[test]
    fn publish_no_subscribers_returns_error() {
        let bus = EventBus::default();
        let result = bus.publish_to(Topic::Aim, make_event("test"));
        assert!(matches!(result, Err(SyncError::Channel(_))));
    }

    #[test]
    fn try_recv_returns_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Aim);
        let event = make_event("headsync-runtime::head");
        assert_eq!(bus.publish_to(Topic::Aim, event.clone()).unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap().id, event.id);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn drain_skips_lagged_events() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe_to(Topic::HeadPose);
        for _ in 0..10 {
            bus.publish_to(Topic::HeadPose, make_event("flood")).unwrap();
        }
        // Only the newest `capacity` events survive.
        assert_eq!(rx.drain().len(), 4);
    }

    #[test]
    fn subscriber_count_tracks_receivers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(Topic::Props), 0);
        let rx = bus.subscribe_to(Topic::Props);
        assert_eq!(bus.subscriber_count(Topic::Props), 1);
        assert_eq!(rx.topic(), Topic::Props);
        drop(rx);
        assert_eq!(bus.subscriber_count(Topic::Props), 0);
    }

    #[tokio::test]
    async fn topic_multiple_subscribers_receive_same_event() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut subscriber1 = bus.subscribe_to(Topic::Props);
        let mut subscriber2 = bus.subscribe_to(Topic::Props);

        let event = make_event("headsync-props::barrel");
        bus.publish_to(Topic::Props, event.clone())?;

        assert_eq!(subscriber1.recv().await?.id, event.id);
        assert_eq!(subscriber2.recv().await?.id, event.id);
        Ok(())
    }

    /// A subscriber on `SystemAlerts` must not receive events published to
    /// `Aim` because they are routed through separate channels.
    #[tokio::test]
    async fn topic_subscriber_does_not_receive_other_topic_events() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut alerts_sub = bus.subscribe_to(Topic::SystemAlerts);
        let _aim_sub = bus.subscribe_to(Topic::Aim);

        bus.publish_to(Topic::Aim, make_event("headsync-runtime::head"))?;

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            alerts_sub.recv(),
        )
        .await;
        assert!(result.is_err(), "SystemAlerts subscriber must not receive an Aim event");
        Ok(())
    }
}
