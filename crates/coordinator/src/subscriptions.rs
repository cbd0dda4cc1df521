//! Per-agent filtered subscriptions over the event bus.
//!
//! One consumer task drains the bus and sorts matched events into
//! per-subscriber pending queues; subscribers poll with
//! [`SubscriptionService::drain_pending_events`]. Filters support exact
//! types, `"prefix:*"` wildcards, and `"*"`; a subscription can exclude the
//! subscriber's own actions and can be one-shot.

use crate::bus::BusReceiver;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;
use troika_common::{new_id, now_millis, AgentEvent};

/// A registered subscription.
#[derive(Debug, Clone)]
pub struct EventSubscription {
    pub id: String,
    /// Subscriber agent
    pub agent_id: String,
    /// Subscriber display name
    pub agent_name: String,
    /// Event-type patterns this subscription matches
    pub event_types: Vec<String>,
    /// Skip events whose actor is the subscriber itself
    pub exclude_self: bool,
    /// Remove the subscription after its first matched delivery
    pub one_shot: bool,
    pub created_at: u64,
}

/// An event queued for a subscriber since its last drain.
#[derive(Debug, Clone)]
pub struct DeliveredEvent {
    pub subscription_id: String,
    pub event: AgentEvent,
    pub delivered_at: u64,
}

/// `"*"` matches all; `"prefix:*"` matches by prefix; anything else is exact.
pub fn matches_event_type(pattern: &str, event_type: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(":*") {
        return event_type
            .strip_prefix(prefix)
            .map(|rest| rest.starts_with(':'))
            .unwrap_or(false);
    }
    pattern == event_type
}

#[derive(Default)]
struct Inner {
    subscriptions: HashMap<String, EventSubscription>,
    pending: HashMap<String, Vec<DeliveredEvent>>,
}

/// Routes bus events into per-subscriber pending queues.
pub struct SubscriptionService {
    inner: Mutex<Inner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionService {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            listener: Mutex::new(None),
        }
    }

    /// Consume the bus forever on a background task. Call once per session.
    pub fn start_listening(self: &Arc<Self>, mut receiver: BusReceiver) {
        let service = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                service.dispatch(&event);
            }
        });
        if let Some(previous) = self.listener.lock().unwrap().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the consumer task. Pending queues and subscriptions survive.
    pub fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().unwrap().take() {
            handle.abort();
        }
    }

    pub fn subscribe(
        &self,
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        event_types: Vec<String>,
        exclude_self: bool,
        one_shot: bool,
    ) -> String {
        let subscription = EventSubscription {
            id: new_id("sub"),
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            event_types,
            exclude_self,
            one_shot,
            created_at: now_millis(),
        };
        let id = subscription.id.clone();
        debug!(
            subscription_id = %id,
            agent_id = %subscription.agent_id,
            patterns = ?subscription.event_types,
            "Subscription created"
        );
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(id.clone(), subscription);
        id
    }

    /// One-shot, self-excluding subscription on agent completion events; the
    /// caller filters by `target` when draining.
    pub fn subscribe_to_agent_completion(
        &self,
        caller_id: impl Into<String>,
        target_id: &str,
    ) -> String {
        self.subscribe(
            caller_id,
            format!("await-{target_id}"),
            vec![
                "agent:completed".to_string(),
                "agent:status_changed".to_string(),
            ],
            true,
            true,
        )
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, subscription_id: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .remove(subscription_id)
            .is_some()
    }

    /// Remove every subscription owned by the agent. Returns how many.
    pub fn unsubscribe_all(&self, agent_id: &str) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.subscriptions.len();
        inner.subscriptions.retain(|_, s| s.agent_id != agent_id);
        before - inner.subscriptions.len()
    }

    /// Match one event against every subscription, queueing deliveries and
    /// sweeping one-shot subscriptions that fired.
    pub fn dispatch(&self, event: &AgentEvent) {
        let event_type = event.event_type();
        let actor = event.actor();

        let mut inner = self.inner.lock().unwrap();
        let mut fired_one_shots: Vec<String> = Vec::new();

        let matched: Vec<(String, String, bool)> = inner
            .subscriptions
            .values()
            .filter(|s| s.event_types.iter().any(|p| matches_event_type(p, event_type)))
            .filter(|s| !(s.exclude_self && actor == Some(s.agent_id.as_str())))
            .map(|s| (s.id.clone(), s.agent_id.clone(), s.one_shot))
            .collect();

        for (subscription_id, agent_id, one_shot) in matched {
            inner.pending.entry(agent_id).or_default().push(DeliveredEvent {
                subscription_id: subscription_id.clone(),
                event: event.clone(),
                delivered_at: now_millis(),
            });
            if one_shot {
                fired_one_shots.push(subscription_id);
            }
        }

        for id in fired_one_shots {
            inner.subscriptions.remove(&id);
        }
    }

    /// Take and clear the subscriber's pending queue. A second drain with no
    /// intervening events returns empty.
    pub fn drain_pending_events(&self, agent_id: &str) -> Vec<DeliveredEvent> {
        self.inner
            .lock()
            .unwrap()
            .pending
            .remove(agent_id)
            .unwrap_or_default()
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.lock().unwrap().subscriptions.len()
    }

    pub fn pending_count(&self, agent_id: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .pending
            .get(agent_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for SubscriptionService {
    fn default() -> Self {
        Self::new()
    }
}
