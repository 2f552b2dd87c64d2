use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// An event payload published through an [`EventHub`].
///
/// `Kind` is the closed set of event names for one component; handlers subscribe per kind.
pub trait HubEvent {
    type Kind: Copy + Eq + Hash + Debug;

    fn kind(&self) -> Self::Kind;
}

/// Handle returned by [`EventHub::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Rc<RefCell<dyn FnMut(&E) -> anyhow::Result<()>>>;

/// Single-threaded typed publish/subscribe channel.
///
/// All methods take `&self` so a component can publish while other components, reached from
/// inside handlers, hold shared references to it.
///
/// A publish made while the hub is already delivering is queued and delivered, in order, once
/// the running delivery finishes. Handlers are therefore never re-entered.
pub struct EventHub<E: HubEvent> {
    next_id: Cell<u64>,
    handlers: RefCell<HashMap<E::Kind, Vec<(SubscriptionId, Handler<E>)>>>,
    pending: RefCell<VecDeque<E>>,
    delivering: Cell<bool>,
}

/// Clears the delivering flag even if a handler panics.
struct Delivering<'a>(&'a Cell<bool>);

impl Drop for Delivering<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<E: HubEvent> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: HubEvent> EventHub<E> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            handlers: RefCell::new(HashMap::new()),
            pending: RefCell::new(VecDeque::new()),
            delivering: Cell::new(false),
        }
    }

    /// Register `handler` for `kind`. Handlers run in subscription order.
    pub fn subscribe<F>(&self, kind: E::Kind, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) -> anyhow::Result<()> + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let handler: Handler<E> = Rc::new(RefCell::new(handler));
        self.handlers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove a handler. Returns `false` when `id` was not registered for `kind`.
    pub fn unsubscribe(&self, kind: E::Kind, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        list.len() != before
    }

    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.handlers.borrow().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every handler registered for its kind.
    ///
    /// Returns `false` when nobody is subscribed. A failing handler is logged and does not stop
    /// delivery to the handlers after it. Called from inside a handler, the event is queued behind
    /// the one being delivered and the call returns before it is delivered.
    pub fn publish(&self, event: E) -> bool {
        let subscribed = self.subscriber_count(event.kind()) > 0;
        self.pending.borrow_mut().push_back(event);
        if self.delivering.replace(true) {
            return subscribed;
        }

        let _guard = Delivering(&self.delivering);
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(event) = next else { break };
            self.deliver(&event);
        }
        subscribed
    }

    fn deliver(&self, event: &E) {
        let kind = event.kind();
        // Snapshot so handlers may (un)subscribe while we iterate.
        let snapshot: Vec<(SubscriptionId, Handler<E>)> = match self.handlers.borrow().get(&kind)
        {
            Some(list) => list.clone(),
            None => return,
        };

        for (id, handler) in snapshot {
            if let Err(err) = (&mut *handler.borrow_mut())(event) {
                tracing::warn!(?kind, ?id, error = %err, "event handler failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/events/hub.rs"]
mod tests;
