//! Observer plumbing for global bound changes.
//!
//! While the search has not started branching, global bound reductions (for
//! instance those found by the root propagation loop) are broadcast to
//! subscribers so that they can keep a cache of the global bounds. A
//! subscription is scoped: dropping the [`ScopedBoundSubscription`] guard
//! removes the subscriber, on every exit path.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use enumset::EnumSet;
use enumset::EnumSetType;

use crate::containers::HashSet;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;
use crate::engine::VariableId;

/// The kind of bound affected by a global bound change.
#[derive(EnumSetType, Debug)]
pub enum BoundChangeType {
    LowerBound,
    UpperBound,
}

/// A global bound change of a single variable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalBoundChange {
    pub variable: VariableId,
    pub bound: BoundChangeType,
    pub old_bound: f64,
    pub new_bound: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SubscriberId {
    id: u32,
}

impl StorageKey for SubscriberId {
    fn index(&self) -> usize {
        self.id as usize
    }

    fn create_from_index(index: usize) -> Self {
        SubscriberId { id: index as u32 }
    }
}

#[derive(Debug)]
struct Subscriber {
    watched_variables: HashSet<VariableId>,
    events: EnumSet<BoundChangeType>,
    pending: VecDeque<GlobalBoundChange>,
}

#[derive(Debug, Default)]
struct SubscriptionStore {
    subscribers: KeyedVec<SubscriberId, Option<Subscriber>>,
}

impl SubscriptionStore {
    fn subscriber_mut(&mut self, id: SubscriberId) -> &mut Subscriber {
        self.subscribers[id]
            .as_mut()
            .expect("a subscription is live for as long as its guard exists")
    }
}

/// The registry of global bound change subscribers. [`Domains`] owns one
/// handle and publishes into it; every subscriber holds a guard onto the same
/// shared store.
///
/// [`Domains`]: crate::engine::Domains
#[derive(Clone, Debug, Default)]
pub struct GlobalBoundSubscriptions {
    store: Rc<RefCell<SubscriptionStore>>,
}

impl GlobalBoundSubscriptions {
    /// Registers a subscriber for the given events on the given variables.
    ///
    /// Published events queue up in the subscription until they are drained
    /// with [`ScopedBoundSubscription::drain`].
    pub fn subscribe(
        &self,
        variables: impl IntoIterator<Item = VariableId>,
        events: EnumSet<BoundChangeType>,
    ) -> ScopedBoundSubscription {
        let subscriber = Subscriber {
            watched_variables: variables.into_iter().collect(),
            events,
            pending: VecDeque::new(),
        };

        let id = self
            .store
            .borrow_mut()
            .subscribers
            .push(Some(subscriber));

        ScopedBoundSubscription {
            store: Rc::clone(&self.store),
            id,
        }
    }

    /// Hands the event to every subscriber watching the variable.
    pub(crate) fn publish(&self, event: GlobalBoundChange) {
        let mut store = self.store.borrow_mut();
        for subscriber in store.subscribers.iter_mut() {
            let Some(subscriber) = subscriber else {
                continue;
            };
            if subscriber.events.contains(event.bound)
                && subscriber.watched_variables.contains(&event.variable)
            {
                subscriber.pending.push_back(event);
            }
        }
    }
}

/// A scoped registration for global bound change events; the subscriber is
/// removed when this guard is dropped.
#[derive(Debug)]
pub struct ScopedBoundSubscription {
    store: Rc<RefCell<SubscriptionStore>>,
    id: SubscriberId,
}

impl ScopedBoundSubscription {
    /// Removes and returns the events published since the last drain, in
    /// publication order.
    pub fn drain(&mut self) -> Vec<GlobalBoundChange> {
        let mut store = self.store.borrow_mut();
        store.subscriber_mut(self.id).pending.drain(..).collect()
    }
}

impl Drop for ScopedBoundSubscription {
    fn drop(&mut self) {
        self.store.borrow_mut().subscribers[self.id] = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower_change(variable: VariableId, old_bound: f64, new_bound: f64) -> GlobalBoundChange {
        GlobalBoundChange {
            variable,
            bound: BoundChangeType::LowerBound,
            old_bound,
            new_bound,
        }
    }

    #[test]
    fn events_are_delivered_to_watching_subscribers_only() {
        let subscriptions = GlobalBoundSubscriptions::default();
        let x0 = VariableId::new(0);
        let x1 = VariableId::new(1);

        let mut watching_x0 = subscriptions.subscribe([x0], EnumSet::all());
        let mut watching_x1 = subscriptions.subscribe([x1], EnumSet::all());

        subscriptions.publish(lower_change(x0, 0.0, 1.0));

        assert_eq!(watching_x0.drain(), vec![lower_change(x0, 0.0, 1.0)]);
        assert_eq!(watching_x1.drain(), vec![]);
    }

    #[test]
    fn event_mask_filters_bound_types() {
        let subscriptions = GlobalBoundSubscriptions::default();
        let x0 = VariableId::new(0);

        let mut upper_only =
            subscriptions.subscribe([x0], EnumSet::only(BoundChangeType::UpperBound));

        subscriptions.publish(lower_change(x0, 0.0, 1.0));
        assert_eq!(upper_only.drain(), vec![]);

        let upper_change = GlobalBoundChange {
            variable: x0,
            bound: BoundChangeType::UpperBound,
            old_bound: 5.0,
            new_bound: 4.0,
        };
        subscriptions.publish(upper_change);
        assert_eq!(upper_only.drain(), vec![upper_change]);
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let subscriptions = GlobalBoundSubscriptions::default();
        let x0 = VariableId::new(0);

        let subscription = subscriptions.subscribe([x0], EnumSet::all());
        drop(subscription);

        // Publishing into an empty store must not panic nor leak events to
        // later subscribers.
        subscriptions.publish(lower_change(x0, 0.0, 1.0));

        let mut late = subscriptions.subscribe([x0], EnumSet::all());
        assert_eq!(late.drain(), vec![]);
    }

    #[test]
    fn drain_empties_the_queue() {
        let subscriptions = GlobalBoundSubscriptions::default();
        let x0 = VariableId::new(0);

        let mut subscription = subscriptions.subscribe([x0], EnumSet::all());
        subscriptions.publish(lower_change(x0, 0.0, 1.0));

        assert_eq!(subscription.drain().len(), 1);
        assert_eq!(subscription.drain(), vec![]);
    }
}
