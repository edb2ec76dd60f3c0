//! Publisher registry: named publishers, uuid-tagged subscriptions.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::event::AlertEvent;

/// Receiver of bus events.
///
/// Delivery happens synchronously on the publishing thread, which is
/// usually not the table's owner thread; implementations are expected to
/// bounce work there themselves.
pub trait BusConsumer: Send + Sync {
    fn event_received(&self, event: &AlertEvent);
}

/// In-process publish/subscribe bus with named publishers.
///
/// The registry lives behind a single lock; deliveries snapshot the
/// consumer list first and run outside it, so a consumer may unsubscribe
/// (or publish) from within its own delivery without deadlocking.
#[derive(Default)]
pub struct AlertBus {
    consumers: Mutex<HashMap<String, Vec<(Uuid, Arc<dyn BusConsumer>)>>>,
}

impl AlertBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer with the named publisher.
    ///
    /// The returned guard unregisters on drop; events are no longer
    /// delivered to the consumer afterwards.
    pub fn subscribe(
        self: &Arc<Self>,
        publisher: &str,
        consumer: Arc<dyn BusConsumer>,
    ) -> SubscriptionGuard {
        let id = Uuid::new_v4();
        self.consumers
            .lock()
            .entry(publisher.to_string())
            .or_default()
            .push((id, consumer));

        log::debug!("subscribed {} to publisher '{}'", id, publisher);
        SubscriptionGuard {
            bus: Arc::clone(self),
            publisher: publisher.to_string(),
            id,
        }
    }

    /// Delivers the event to every consumer of the named publisher, on the
    /// calling thread.
    pub fn publish(&self, publisher: &str, event: &AlertEvent) {
        let targets: Vec<Arc<dyn BusConsumer>> = {
            let consumers = self.consumers.lock();
            match consumers.get(publisher) {
                Some(list) => list.iter().map(|(_, c)| Arc::clone(c)).collect(),
                None => Vec::new(),
            }
        };

        for consumer in targets {
            consumer.event_received(event);
        }
    }

    /// Number of live subscriptions on the named publisher.
    pub fn consumer_count(&self, publisher: &str) -> usize {
        self.consumers
            .lock()
            .get(publisher)
            .map_or(0, |list| list.len())
    }

    fn unsubscribe(&self, publisher: &str, id: Uuid) {
        let mut consumers = self.consumers.lock();
        if let Some(list) = consumers.get_mut(publisher) {
            list.retain(|(sub_id, _)| *sub_id != id);
            if list.is_empty() {
                consumers.remove(publisher);
            }
        }
        log::debug!("unsubscribed {} from publisher '{}'", id, publisher);
    }
}

/// Live subscription to one publisher; dropping it unregisters the
/// consumer.
pub struct SubscriptionGuard {
    bus: Arc<AlertBus>,
    publisher: String,
    id: Uuid,
}

impl SubscriptionGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.publisher, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    /// Collects received events for assertions.
    struct Recording {
        seen: PlMutex<Vec<AlertEvent>>,
    }

    impl Recording {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: PlMutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.seen.lock().len()
        }
    }

    impl BusConsumer for Recording {
        fn event_received(&self, event: &AlertEvent) {
            self.seen.lock().push(event.clone());
        }
    }

    #[test]
    fn publish_reaches_only_matching_publisher() {
        let bus = Arc::new(AlertBus::new());
        let findings = Recording::new();
        let other = Recording::new();

        let _g1 = bus.subscribe("findings", findings.clone());
        let _g2 = bus.subscribe("scans", other.clone());

        bus.publish("findings", &AlertEvent::all_findings_removed());

        assert_eq!(findings.count(), 1);
        assert_eq!(other.count(), 0);
    }

    #[test]
    fn dropping_guard_stops_delivery() {
        let bus = Arc::new(AlertBus::new());
        let consumer = Recording::new();

        let guard = bus.subscribe("findings", consumer.clone());
        bus.publish("findings", &AlertEvent::finding_removed(1));
        assert_eq!(consumer.count(), 1);
        assert_eq!(bus.consumer_count("findings"), 1);

        drop(guard);
        bus.publish("findings", &AlertEvent::finding_removed(2));
        assert_eq!(consumer.count(), 1);
        assert_eq!(bus.consumer_count("findings"), 0);
    }

    #[test]
    fn multiple_consumers_each_receive_events() {
        let bus = Arc::new(AlertBus::new());
        let first = Recording::new();
        let second = Recording::new();

        let _g1 = bus.subscribe("findings", first.clone());
        let _g2 = bus.subscribe("findings", second.clone());

        bus.publish("findings", &AlertEvent::all_findings_removed());
        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn publish_to_unknown_publisher_is_a_no_op() {
        let bus = Arc::new(AlertBus::new());
        bus.publish("nobody", &AlertEvent::all_findings_removed());
        assert_eq!(bus.consumer_count("nobody"), 0);
    }
}
