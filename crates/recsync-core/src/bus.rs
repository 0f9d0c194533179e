//! In-process change notifications.
//!
//! A registry of handlers keyed by collection name. Publishing carries no
//! payload: a handler learns only that the collection changed and is expected
//! to re-read it from the remote.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Handler = Arc<dyn Fn() + Send + Sync>;

/// Identity of one subscription, used to skip the publisher's own handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    channels: Mutex<HashMap<String, Vec<(SubscriberId, Handler)>>>,
}

/// Shared publish/subscribe registry; clones refer to the same registry.
#[derive(Clone, Default)]
pub struct ChangeBus {
    registry: Arc<Registry>,
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.lock_channels();
        formatter
            .debug_struct("ChangeBus")
            .field(
                "channels",
                &channels
                    .iter()
                    .map(|(name, handlers)| (name.clone(), handlers.len()))
                    .collect::<HashMap<_, _>>(),
            )
            .finish()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel name for a collection, e.g. `"magazines-updated"`.
    pub fn channel_name(kind: &str) -> String {
        format!("{kind}-updated")
    }

    /// Register `handler` for changes to `kind`.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, kind: &str, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = SubscriberId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let channel = Self::channel_name(kind);
        self.lock_channels()
            .entry(channel.clone())
            .or_default()
            .push((id, Arc::new(handler)));
        tracing::debug!("Subscribed {:?} to {}", id, channel);

        Subscription {
            bus: self.clone(),
            channel,
            id,
            active: true,
        }
    }

    /// Fire every handler registered for `kind`. Returns how many ran.
    pub fn publish(&self, kind: &str) -> usize {
        self.publish_except(kind, None)
    }

    /// Fire every handler for `kind` except the one registered as `origin`.
    ///
    /// Handlers run synchronously on the caller, outside the registry lock,
    /// so a handler may itself subscribe or unsubscribe.
    pub fn publish_except(&self, kind: &str, origin: Option<SubscriberId>) -> usize {
        let channel = Self::channel_name(kind);
        let handlers: Vec<Handler> = self
            .lock_channels()
            .get(&channel)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(id, _)| Some(*id) != origin)
                    .map(|(_, handler)| Arc::clone(handler))
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!("Publishing {} to {} subscriber(s)", channel, handlers.len());
        for handler in &handlers {
            handler();
        }
        handlers.len()
    }

    /// Number of live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: &str) -> usize {
        self.lock_channels()
            .get(&Self::channel_name(kind))
            .map_or(0, Vec::len)
    }

    fn remove(&self, channel: &str, id: SubscriberId) {
        let mut channels = self.lock_channels();
        if let Some(entries) = channels.get_mut(channel) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                channels.remove(channel);
            }
        }
    }

    fn lock_channels(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, Vec<(SubscriberId, Handler)>>> {
        self.registry
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Unsubscribe capability returned by [`ChangeBus::subscribe`].
pub struct Subscription {
    bus: ChangeBus,
    channel: String,
    id: SubscriberId,
    active: bool,
}

impl Subscription {
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the handler; it will not fire again.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if self.active {
            self.active = false;
            self.bus.remove(&self.channel, self.id);
            tracing::debug!("Unsubscribed {:?} from {}", self.id, self.channel);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn channel_name_appends_updated_suffix() {
        assert_eq!(ChangeBus::channel_name("magazines"), "magazines-updated");
    }

    #[test]
    fn publish_fires_only_matching_kind() {
        let bus = ChangeBus::new();
        let (magazines, on_magazines) = counter();
        let (sessions, on_sessions) = counter();
        let _m = bus.subscribe("magazines", on_magazines);
        let _s = bus.subscribe("sessions", on_sessions);

        assert_eq!(bus.publish("magazines"), 1);

        assert_eq!(magazines.load(Ordering::SeqCst), 1);
        assert_eq!(sessions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = ChangeBus::new();
        let (count, handler) = counter();
        let subscription = bus.subscribe("magazines", handler);

        bus.publish("magazines");
        subscription.unsubscribe();
        bus.publish("magazines");

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count("magazines"), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let bus = ChangeBus::new();
        let (count, handler) = counter();
        {
            let _subscription = bus.subscribe("sessions", handler);
            assert_eq!(bus.subscriber_count("sessions"), 1);
        }
        assert_eq!(bus.publish("sessions"), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn publish_except_skips_origin() {
        let bus = ChangeBus::new();
        let (mine, on_mine) = counter();
        let (theirs, on_theirs) = counter();
        let own = bus.subscribe("magazines", on_mine);
        let _other = bus.subscribe("magazines", on_theirs);

        assert_eq!(bus.publish_except("magazines", Some(own.id())), 1);

        assert_eq!(mine.load(Ordering::SeqCst), 0);
        assert_eq!(theirs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_may_unsubscribe_reentrantly() {
        let bus = ChangeBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let inner_slot = Arc::clone(&slot);
        let subscription = bus.subscribe("magazines", move || {
            if let Some(subscription) = inner_slot.lock().unwrap().take() {
                subscription.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(subscription);

        assert_eq!(bus.publish("magazines"), 1);
        assert_eq!(bus.subscriber_count("magazines"), 0);
    }
}
