use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::events::hub::{EventHub, HubEvent, SubscriptionId};
use crate::foundation::color::Color;
use crate::foundation::config::EngineOpts;
use crate::foundation::core::{ElementRect, Point, Vec2};
use crate::foundation::error::DeckResult;
use crate::render::backend::Surface;
use crate::timeline::element::{ElementHandle, ElementId, ElementPatch};
use crate::timeline::store::{ElementStore, StoreEvent, StoreEventKind};

/// Part of the selected element a drag acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// Whole-element move.
    Body,
}

impl Handle {
    /// Classify a press at `p` against corner squares of side `handle_size` centred on the
    /// corners of `rect`. Corners win over the body and are checked TL, TR, BL, BR.
    pub fn classify(rect: &ElementRect, p: Point, handle_size: f64) -> Self {
        let corners = [
            (Handle::TopLeft, rect.top_left()),
            (Handle::TopRight, rect.top_right()),
            (Handle::BottomLeft, rect.bottom_left()),
            (Handle::BottomRight, rect.bottom_right()),
        ];
        corners
            .into_iter()
            .find(|(_, corner)| ElementRect::centered_square(*corner, handle_size).contains(p))
            .map_or(Handle::Body, |(handle, _)| handle)
    }

    /// Geometry after dragging this handle by `delta` from `original`. Sizes are not clamped.
    pub fn apply(self, original: ElementRect, delta: Vec2) -> ElementRect {
        let ElementRect {
            x,
            y,
            width,
            height,
        } = original;
        let (dx, dy) = (delta.x, delta.y);
        match self {
            Handle::TopLeft => ElementRect::new(x + dx, y + dy, width - dx, height - dy),
            Handle::TopRight => ElementRect::new(x, y + dy, width + dx, height - dy),
            Handle::BottomLeft => ElementRect::new(x + dx, y, width - dx, height + dy),
            Handle::BottomRight => ElementRect::new(x, y, width + dx, height + dy),
            Handle::Body => original.translate(delta),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformPhase {
    Idle,
    /// Pressed on an element, not moved yet.
    Selecting,
    Dragging,
}

/// State of one press-move-release gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformSession {
    pub element_id: ElementId,
    pub handle: Handle,
    /// Press position in surface-local coordinates.
    pub drag_origin: Point,
    /// Element geometry at press time; every move is applied relative to it.
    pub original_rect: ElementRect,
    pub moved: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformEventKind {
    Transform,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransformEvent {
    /// Published on every pointer move of an active drag, with the live geometry.
    Transform { id: ElementId, rect: ElementRect },
}

impl HubEvent for TransformEvent {
    type Kind = TransformEventKind;

    fn kind(&self) -> TransformEventKind {
        match self {
            TransformEvent::Transform { .. } => TransformEventKind::Transform,
        }
    }
}

/// Pointer-driven move/resize of store elements.
///
/// Drags write straight through the selected element's live handle so the next render shows the
/// new geometry; the final rect is committed through [`ElementStore::update`] on release.
pub struct TransformController {
    store: Rc<ElementStore>,
    handle_size: f64,
    selection_color: Color,
    selection_line_width: f64,
    surface_origin: Cell<Point>,
    selected: RefCell<Option<ElementHandle>>,
    session: RefCell<Option<TransformSession>>,
    events: EventHub<TransformEvent>,
    store_sub: Cell<Option<SubscriptionId>>,
}

impl TransformController {
    pub fn new(store: Rc<ElementStore>, opts: &EngineOpts) -> Rc<Self> {
        let controller = Rc::new(Self {
            store,
            handle_size: opts.handle_size,
            selection_color: opts.selection_color,
            selection_line_width: opts.selection_line_width,
            surface_origin: Cell::new(Point::ZERO),
            selected: RefCell::new(None),
            session: RefCell::new(None),
            events: EventHub::new(),
            store_sub: Cell::new(None),
        });

        let weak: Weak<Self> = Rc::downgrade(&controller);
        let id = controller
            .store
            .events()
            .subscribe(StoreEventKind::Remove, move |ev| {
                let (StoreEvent::Removed(id), Some(controller)) = (ev, weak.upgrade()) else {
                    return Ok(());
                };
                if controller.selected_id().as_ref() == Some(id) {
                    tracing::debug!(%id, "selected element removed");
                    controller.clear_selection();
                }
                Ok(())
            });
        controller.store_sub.set(Some(id));
        controller
    }

    pub fn events(&self) -> &EventHub<TransformEvent> {
        &self.events
    }

    /// Client-space position of the surface's top-left corner.
    pub fn set_surface_origin(&self, origin: Point) {
        self.surface_origin.set(origin);
    }

    pub fn surface_origin(&self) -> Point {
        self.surface_origin.get()
    }

    pub fn selected(&self) -> Option<ElementHandle> {
        self.selected.borrow().clone()
    }

    pub fn selected_id(&self) -> Option<ElementId> {
        self.selected
            .borrow()
            .as_ref()
            .map(|h| h.borrow().id().clone())
    }

    pub fn session(&self) -> Option<TransformSession> {
        self.session.borrow().clone()
    }

    pub fn phase(&self) -> TransformPhase {
        match &*self.session.borrow() {
            None => TransformPhase::Idle,
            Some(s) if s.moved => TransformPhase::Dragging,
            Some(_) => TransformPhase::Selecting,
        }
    }

    pub fn clear_selection(&self) {
        self.session.replace(None);
        self.selected.replace(None);
    }

    /// Select the topmost element under `client` and start a gesture on it.
    ///
    /// Pressing empty space clears the selection. Returns the selected id.
    pub fn pointer_down(&self, client: Point) -> Option<ElementId> {
        let local = self.to_local(client);
        let hit = self
            .store
            .elements()
            .into_iter()
            .rev()
            .find(|el| el.borrow().rect.contains(local));

        let Some(handle) = hit else {
            self.clear_selection();
            return None;
        };

        let (element_id, original_rect) = {
            let el = handle.borrow();
            (el.id().clone(), el.rect)
        };
        let grabbed = Handle::classify(&original_rect, local, self.handle_size);
        tracing::debug!(id = %element_id, handle = ?grabbed, "pointer down");

        self.session.replace(Some(TransformSession {
            element_id: element_id.clone(),
            handle: grabbed,
            drag_origin: local,
            original_rect,
            moved: false,
        }));
        self.selected.replace(Some(handle));
        Some(element_id)
    }

    /// Apply the drag to the selected element. Returns `false` without an active gesture.
    pub fn pointer_move(&self, client: Point) -> bool {
        let local = self.to_local(client);
        let (id, rect) = {
            let mut guard = self.session.borrow_mut();
            let Some(session) = guard.as_mut() else {
                return false;
            };
            let selected = self.selected.borrow();
            let Some(handle) = selected.as_ref() else {
                return false;
            };
            let rect = session
                .handle
                .apply(session.original_rect, local - session.drag_origin);
            session.moved = true;
            handle.borrow_mut().rect = rect;
            (session.element_id.clone(), rect)
        };
        self.events.publish(TransformEvent::Transform { id, rect });
        true
    }

    /// End the gesture, committing the selected element's current rect through the store.
    ///
    /// The commit happens even when the pointer never moved. The selection survives.
    pub fn pointer_up(&self) -> bool {
        let Some(handle) = self.selected() else {
            self.session.replace(None);
            return false;
        };
        let (id, rect) = {
            let el = handle.borrow();
            (el.id().clone(), el.rect)
        };
        self.store.update(&id, ElementPatch::rect(rect));
        self.session.replace(None);
        true
    }

    /// Outline the selected element and mark its four corner handles.
    pub fn draw_selection(&self, surface: &mut dyn Surface) -> DeckResult<()> {
        let Some(handle) = self.selected() else {
            return Ok(());
        };
        let rect = handle.borrow().rect;
        surface.stroke_rect(rect, self.selection_color, self.selection_line_width)?;
        for corner in [
            rect.top_left(),
            rect.top_right(),
            rect.bottom_left(),
            rect.bottom_right(),
        ] {
            surface.fill_rect(
                ElementRect::centered_square(corner, self.handle_size),
                self.selection_color,
            )?;
        }
        Ok(())
    }

    fn to_local(&self, client: Point) -> Point {
        let origin = self.surface_origin.get();
        Point::new(client.x - origin.x, client.y - origin.y)
    }
}

impl Drop for TransformController {
    fn drop(&mut self) {
        if let Some(id) = self.store_sub.take() {
            self.store.events().unsubscribe(StoreEventKind::Remove, id);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/interact/transform.rs"]
mod tests;
