//! Topic fan-out and point-to-point endpoints

use crossbeam::channel::{self, TrySendError};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};
use ustr::Ustr;

use crate::{
    channel::Receiver,
    error::{BusError, BusResult},
};

/// Anything that can travel over the bus. Topic fan-out clones the message once per
/// subscriber.
pub trait Message: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Message for T {}

/// Identifies one subscription to a topic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription<M> {
    id: SubscriptionId,
    tx: channel::Sender<M>,
}

struct Registry<M> {
    topics: FxHashMap<Ustr, Vec<Subscription<M>>>,
    endpoints: FxHashMap<Ustr, channel::Sender<M>>,
    next_subscription: u64,
}

/// Message bus with exact-match topics and named endpoints.
///
/// Topics deliver each published message to every live subscriber in subscription
/// order. Endpoints deliver to exactly one registered receiver. The bus is meant to be
/// created once by the process, shared by reference (usually behind an `Arc`) and
/// torn down with [`MessageBus::clear`].
pub struct MessageBus<M> {
    registry: RwLock<Registry<M>>,
}

impl<M> std::fmt::Debug for MessageBus<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("MessageBus")
            .field("topics", &registry.topics.len())
            .field("endpoints", &registry.endpoints.len())
            .finish()
    }
}

impl<M: Message> Default for MessageBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> MessageBus<M> {
    /// Creates an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry {
                topics: FxHashMap::default(),
                endpoints: FxHashMap::default(),
                next_subscription: 0,
            }),
        }
    }

    // -- TOPICS ----------------------------------------------------------------------------------

    /// Subscribes to `topic` with an unbounded queue
    pub fn subscribe(&self, topic: &str) -> (SubscriptionId, Receiver<M>) {
        let (tx, rx) = channel::unbounded();
        (self.add_subscription(topic, tx), Receiver::new(rx))
    }

    /// Subscribes to `topic` with a queue of `capacity` messages. Messages published
    /// while the queue is full are dropped for this subscriber.
    pub fn subscribe_bounded(&self, topic: &str, capacity: usize) -> (SubscriptionId, Receiver<M>) {
        let (tx, rx) = channel::bounded(capacity);
        (self.add_subscription(topic, tx), Receiver::new(rx))
    }

    fn add_subscription(&self, topic: &str, tx: channel::Sender<M>) -> SubscriptionId {
        let topic = Ustr::from(topic);
        let mut registry = self.registry.write();
        let id = SubscriptionId(registry.next_subscription);
        registry.next_subscription += 1;
        registry
            .topics
            .entry(topic)
            .or_default()
            .push(Subscription { id, tx });
        debug!(%topic, subscription = id.0, "Subscribed");
        id
    }

    /// Removes one subscription, returning whether it existed
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let topic = Ustr::from(topic);
        let mut registry = self.registry.write();
        let Some(subscriptions) = registry.topics.get_mut(&topic) else {
            return false;
        };
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        let removed = subscriptions.len() != before;
        if subscriptions.is_empty() {
            registry.topics.remove(&topic);
        }
        if removed {
            debug!(%topic, subscription = id.0, "Unsubscribed");
        }
        removed
    }

    /// Publishes `message` to every live subscriber of `topic` and returns how many
    /// received it. Subscribers whose receiver was dropped are removed.
    pub fn publish(&self, topic: &str, message: M) -> usize {
        let topic = Ustr::from(topic);
        let mut registry = self.registry.write();
        let Some(subscriptions) = registry.topics.get_mut(&topic) else {
            trace!(%topic, "No subscribers");
            return 0;
        };

        let mut delivered = 0;
        subscriptions.retain(|subscription| match subscription.tx.try_send(message.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(%topic, subscription = subscription.id.0, "Subscriber queue full, message dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!(%topic, subscription = subscription.id.0, "Removing closed subscription");
                false
            }
        });
        if subscriptions.is_empty() {
            registry.topics.remove(&topic);
        }
        delivered
    }

    /// Whether `topic` has at least one subscription
    #[must_use]
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.subscriber_count(topic) > 0
    }

    /// Number of subscriptions on `topic`, including ones not yet found to be closed
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry
            .read()
            .topics
            .get(&Ustr::from(topic))
            .map_or(0, Vec::len)
    }

    /// Topics with at least one subscription, sorted
    #[must_use]
    pub fn topics(&self) -> Vec<Ustr> {
        let mut topics: Vec<Ustr> = self.registry.read().topics.keys().copied().collect();
        topics.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        topics
    }

    // -- ENDPOINTS -------------------------------------------------------------------------------

    /// Registers an endpoint with an unbounded queue
    ///
    /// # Errors
    ///
    /// Returns [`BusError::DuplicateEndpoint`] if the name is taken.
    pub fn register_endpoint(&self, endpoint: &str) -> BusResult<Receiver<M>> {
        let (tx, rx) = channel::unbounded();
        self.add_endpoint(endpoint, tx)?;
        Ok(Receiver::new(rx))
    }

    /// Registers an endpoint whose queue holds at most `capacity` messages
    ///
    /// # Errors
    ///
    /// Returns [`BusError::DuplicateEndpoint`] if the name is taken.
    pub fn register_endpoint_bounded(
        &self,
        endpoint: &str,
        capacity: usize,
    ) -> BusResult<Receiver<M>> {
        let (tx, rx) = channel::bounded(capacity);
        self.add_endpoint(endpoint, tx)?;
        Ok(Receiver::new(rx))
    }

    fn add_endpoint(&self, endpoint: &str, tx: channel::Sender<M>) -> BusResult<()> {
        let endpoint = Ustr::from(endpoint);
        let mut registry = self.registry.write();
        if registry.endpoints.contains_key(&endpoint) {
            return Err(BusError::DuplicateEndpoint { endpoint });
        }
        registry.endpoints.insert(endpoint, tx);
        debug!(%endpoint, "Registered endpoint");
        Ok(())
    }

    /// Removes an endpoint, returning whether it existed
    pub fn deregister_endpoint(&self, endpoint: &str) -> bool {
        let endpoint = Ustr::from(endpoint);
        let removed = self.registry.write().endpoints.remove(&endpoint).is_some();
        if removed {
            debug!(%endpoint, "Deregistered endpoint");
        }
        removed
    }

    /// Sends `message` to the endpoint's receiver without blocking
    ///
    /// # Errors
    ///
    /// Returns an error if no endpoint is registered, its receiver was dropped or its
    /// bounded queue is full.
    pub fn send(&self, endpoint: &str, message: M) -> BusResult<()> {
        let endpoint = Ustr::from(endpoint);
        let registry = self.registry.read();
        let tx = registry
            .endpoints
            .get(&endpoint)
            .ok_or(BusError::NoEndpoint { endpoint })?;
        tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => BusError::Full { endpoint },
            TrySendError::Disconnected(_) => BusError::Disconnected { endpoint },
        })
    }

    /// Whether an endpoint is registered under the name
    #[must_use]
    pub fn is_registered(&self, endpoint: &str) -> bool {
        self.registry
            .read()
            .endpoints
            .contains_key(&Ustr::from(endpoint))
    }

    /// Registered endpoint names, sorted
    #[must_use]
    pub fn endpoints(&self) -> Vec<Ustr> {
        let mut endpoints: Vec<Ustr> = self.registry.read().endpoints.keys().copied().collect();
        endpoints.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        endpoints
    }

    /// Drops every subscription and endpoint. Receivers drain what was already queued
    /// and then report disconnection.
    pub fn clear(&self) {
        let mut registry = self.registry.write();
        registry.topics.clear();
        registry.endpoints.clear();
        debug!("Cleared message bus");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn bus() -> MessageBus<String> {
        MessageBus::new()
    }

    #[rstest]
    fn test_publish_reaches_every_subscriber(bus: MessageBus<String>) {
        let (_, rx1) = bus.subscribe("events.data.quote.SIM.AUD/USD");
        let (_, rx2) = bus.subscribe("events.data.quote.SIM.AUD/USD");

        let delivered = bus.publish("events.data.quote.SIM.AUD/USD", "q1".to_string());

        assert_eq!(delivered, 2);
        assert_eq!(rx1.try_recv(), Some("q1".to_string()));
        assert_eq!(rx2.try_recv(), Some("q1".to_string()));
    }

    #[rstest]
    fn test_topics_match_exactly(bus: MessageBus<String>) {
        let (_, rx) = bus.subscribe("events.data.quote.SIM.AUD/USD");

        assert_eq!(bus.publish("events.data.quote.SIM", "x".to_string()), 0);
        assert_eq!(bus.publish("events.data.quote.SIM.AUD/USD.extra", "y".to_string()), 0);
        assert!(rx.is_empty());
    }

    #[rstest]
    fn test_dropped_receiver_is_pruned(bus: MessageBus<String>) {
        let (_, rx) = bus.subscribe("t");
        drop(rx);
        assert_eq!(bus.subscriber_count("t"), 1);

        assert_eq!(bus.publish("t", "m".to_string()), 0);
        assert!(!bus.has_subscribers("t"));
        assert!(bus.topics().is_empty());
    }

    #[rstest]
    fn test_unsubscribe(bus: MessageBus<String>) {
        let (id, rx) = bus.subscribe("t");
        let (_, other) = bus.subscribe("t");

        assert!(bus.unsubscribe("t", id));
        assert!(!bus.unsubscribe("t", id));
        bus.publish("t", "m".to_string());

        assert!(rx.is_empty());
        assert_eq!(other.drain(), vec!["m".to_string()]);
    }

    #[rstest]
    fn test_full_subscriber_does_not_block_others(bus: MessageBus<String>) {
        let (_, slow) = bus.subscribe_bounded("t", 1);
        let (_, fast) = bus.subscribe("t");

        assert_eq!(bus.publish("t", "1".to_string()), 2);
        assert_eq!(bus.publish("t", "2".to_string()), 1);

        assert_eq!(slow.drain(), vec!["1".to_string()]);
        assert_eq!(fast.drain(), vec!["1".to_string(), "2".to_string()]);
    }

    #[rstest]
    fn test_endpoint_send(bus: MessageBus<String>) {
        let rx = bus.register_endpoint("data_engine_execute").unwrap();

        bus.send("data_engine_execute", "cmd".to_string()).unwrap();

        assert_eq!(rx.try_recv(), Some("cmd".to_string()));
        assert!(bus.is_registered("data_engine_execute"));
    }

    #[rstest]
    fn test_endpoint_errors(bus: MessageBus<String>) {
        assert_eq!(
            bus.send("missing", "m".to_string()),
            Err(BusError::NoEndpoint {
                endpoint: Ustr::from("missing")
            })
        );

        let rx = bus.register_endpoint_bounded("ep", 1).unwrap();
        assert!(matches!(
            bus.register_endpoint("ep"),
            Err(BusError::DuplicateEndpoint { .. })
        ));
        bus.send("ep", "1".to_string()).unwrap();
        assert!(matches!(bus.send("ep", "2".to_string()), Err(BusError::Full { .. })));

        drop(rx);
        assert!(matches!(
            bus.send("ep", "3".to_string()),
            Err(BusError::Disconnected { .. })
        ));

        assert!(bus.deregister_endpoint("ep"));
        assert!(!bus.is_registered("ep"));
    }

    #[rstest]
    fn test_clear_disconnects_receivers(bus: MessageBus<String>) {
        let (_, rx) = bus.subscribe("t");
        let endpoint = bus.register_endpoint("ep").unwrap();
        bus.publish("t", "queued".to_string());

        bus.clear();

        assert_eq!(rx.recv(), Some("queued".to_string()));
        assert_eq!(rx.recv(), None);
        assert_eq!(endpoint.recv(), None);
        assert!(bus.endpoints().is_empty());
    }
}
