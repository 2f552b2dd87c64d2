use std::cell::RefCell;
use std::rc::Rc;

use crate::events::hub::{EventHub, HubEvent};
use crate::timeline::element::{Element, ElementHandle, ElementId, ElementPatch};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreEventKind {
    Add,
    Remove,
    Update,
}

/// Change notifications published by [`ElementStore`].
#[derive(Clone, Debug)]
pub enum StoreEvent {
    Added(ElementId),
    /// Published for every `remove` call, including ids that were not present.
    Removed(ElementId),
    /// Carries the patch exactly as it was passed to `update`.
    Updated { id: ElementId, patch: ElementPatch },
}

impl HubEvent for StoreEvent {
    type Kind = StoreEventKind;

    fn kind(&self) -> StoreEventKind {
        match self {
            StoreEvent::Added(_) => StoreEventKind::Add,
            StoreEvent::Removed(_) => StoreEventKind::Remove,
            StoreEvent::Updated { .. } => StoreEventKind::Update,
        }
    }
}

/// Canonical, z-ordered list of timeline elements.
///
/// Iteration order is non-decreasing by `z_index`, ties in insertion order. The store never
/// recomputes anything on change; it only notifies.
#[derive(Default)]
pub struct ElementStore {
    elements: RefCell<Vec<ElementHandle>>,
    events: EventHub<StoreEvent>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &EventHub<StoreEvent> {
        &self.events
    }

    /// Append `element`, re-sort by z-index and publish `Added`. Returns the live handle.
    pub fn add(&self, element: Element) -> ElementHandle {
        let id = element.id().clone();
        let handle: ElementHandle = Rc::new(RefCell::new(element));
        {
            let mut elements = self.elements.borrow_mut();
            elements.push(handle.clone());
            sort_by_z(&mut elements);
        }
        tracing::debug!(%id, "element added");
        self.events.publish(StoreEvent::Added(id));
        handle
    }

    /// Drop the element with `id`. Unknown ids are not an error; `Removed` is published either way.
    pub fn remove(&self, id: &ElementId) -> bool {
        let removed = {
            let mut elements = self.elements.borrow_mut();
            let before = elements.len();
            elements.retain(|el| el.borrow().id() != id);
            elements.len() != before
        };
        if !removed {
            tracing::debug!(%id, "remove of unknown element");
        }
        self.events.publish(StoreEvent::Removed(id.clone()));
        removed
    }

    /// Merge `patch` into the element in place and publish `Updated`.
    ///
    /// Unknown ids are a silent no-op: nothing is published and `false` is returned.
    pub fn update(&self, id: &ElementId, patch: ElementPatch) -> bool {
        let Some(handle) = self.get(id) else {
            tracing::debug!(%id, "update of unknown element");
            return false;
        };
        let z_changed = handle.borrow_mut().apply(&patch);
        if z_changed {
            sort_by_z(&mut self.elements.borrow_mut());
        }
        self.events.publish(StoreEvent::Updated {
            id: id.clone(),
            patch,
        });
        true
    }

    pub fn get(&self, id: &ElementId) -> Option<ElementHandle> {
        self.elements
            .borrow()
            .iter()
            .find(|el| el.borrow().id() == id)
            .cloned()
    }

    /// Live handles in z order.
    pub fn elements(&self) -> Vec<ElementHandle> {
        self.elements.borrow().clone()
    }

    pub fn ids(&self) -> Vec<ElementId> {
        self.elements
            .borrow()
            .iter()
            .map(|el| el.borrow().id().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    /// Largest end time across all elements, 0 for an empty store.
    ///
    /// Negative ends are taken as they are: a store whose elements all end before 0 reports the
    /// latest of those ends.
    pub fn max_end_time(&self) -> f64 {
        self.elements
            .borrow()
            .iter()
            .map(|el| el.borrow().time_range.end)
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    /// Elements whose visibility window contains `time_ms`, in z order.
    pub fn visible_at(&self, time_ms: f64) -> Vec<ElementHandle> {
        self.elements
            .borrow()
            .iter()
            .filter(|el| el.borrow().time_range.is_visible_at(time_ms))
            .cloned()
            .collect()
    }
}

fn sort_by_z(elements: &mut [ElementHandle]) {
    // `sort_by_key` is stable, which keeps insertion order among equal z-indices.
    elements.sort_by_key(|el| el.borrow().z_index);
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/store.rs"]
mod tests;
