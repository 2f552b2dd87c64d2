use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::assets::extract::{
    ExtractionJob, ExtractionQueue, ExtractionUpdate, FfmpegFrameExtractor, FrameExtractor,
};
use crate::engine::events::{EngineEvent, EngineEventKind};
use crate::events::hub::{EventHub, SubscriptionId};
use crate::foundation::config::EngineOpts;
use crate::foundation::core::Point;
use crate::foundation::error::DeckResult;
use crate::interact::transform::{TransformController, TransformEventKind};
use crate::playback::clock::{ClockEventKind, PlaybackClock, PlaybackState};
use crate::playback::ticker::{FrameQueue, FrameScheduler, MonotonicTime, TickToken, TimeSource};
use crate::render::backend::{FrameRGBA, Surface};
use crate::render::cpu::CpuSurface;
use crate::render::renderer::{RenderStats, Renderer};
use crate::timeline::element::{Element, ElementHandle, ElementId, ElementKind, ElementPatch};
use crate::timeline::store::{ElementStore, StoreEvent, StoreEventKind};

/// Assembles an [`Engine`] from its collaborators.
///
/// Anything not supplied gets a default: a [`CpuSurface`] of `opts.canvas` size, wall-clock
/// time, a [`FrameQueue`] reachable through [`Engine::frame_queue`], and the ffmpeg extractor.
pub struct EngineBuilder {
    opts: EngineOpts,
    surface: Option<Box<dyn Surface>>,
    time: Option<Rc<dyn TimeSource>>,
    scheduler: Option<Rc<dyn FrameScheduler>>,
    extractor: Option<Arc<dyn FrameExtractor>>,
}

impl EngineBuilder {
    pub fn new(opts: EngineOpts) -> Self {
        Self {
            opts,
            surface: None,
            time: None,
            scheduler: None,
            extractor: None,
        }
    }

    pub fn surface(mut self, surface: impl Surface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    pub fn time_source(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Some(Rc::new(time));
        self
    }

    pub fn scheduler(mut self, scheduler: impl FrameScheduler + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    pub fn extractor(mut self, extractor: impl FrameExtractor + 'static) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    /// Validate options, create missing collaborators and wire the components together.
    ///
    /// Fails with a config error when the options are invalid or the default surface cannot be
    /// created.
    pub fn build(self) -> DeckResult<Engine> {
        let opts = self.opts.validated()?;
        let surface = match self.surface {
            Some(surface) => surface,
            None => Box::new(CpuSurface::new(&opts)?),
        };
        let time = self
            .time
            .unwrap_or_else(|| Rc::new(MonotonicTime::new()));
        let (scheduler, frame_queue): (Rc<dyn FrameScheduler>, _) = match self.scheduler {
            Some(scheduler) => (scheduler, None),
            None => {
                let queue = FrameQueue::new();
                (Rc::new(queue.clone()), Some(queue))
            }
        };
        let extractor = self
            .extractor
            .unwrap_or_else(|| Arc::new(FfmpegFrameExtractor::new()));

        let store = Rc::new(ElementStore::new());
        let clock = PlaybackClock::new(store.clone(), time, scheduler);
        let transform = TransformController::new(store.clone(), &opts);
        let renderer = Rc::new(Renderer::new(
            store.clone(),
            clock.clone(),
            transform.clone(),
            surface,
            &opts,
        )?);

        let engine = Engine {
            opts,
            store,
            clock,
            transform,
            renderer,
            extraction: Rc::new(ExtractionQueue::new(extractor)),
            events: Rc::new(EventHub::new()),
            frame_queue,
        };
        engine.wire();
        tracing::debug!(canvas = ?engine.opts.canvas, "engine built");
        Ok(engine)
    }
}

/// Timeline compositing engine: element store, playback clock, pointer transforms and renderer
/// behind one API.
///
/// Every method runs on the thread that owns the engine. Only frame extraction runs elsewhere;
/// its results are applied by [`Engine::poll_extractions`] (also called by
/// [`Engine::drive_frame`]).
pub struct Engine {
    opts: EngineOpts,
    store: Rc<ElementStore>,
    clock: Rc<PlaybackClock>,
    transform: Rc<TransformController>,
    renderer: Rc<Renderer>,
    extraction: Rc<ExtractionQueue>,
    events: Rc<EventHub<EngineEvent>>,
    frame_queue: Option<FrameQueue>,
}

impl Engine {
    pub fn builder(opts: EngineOpts) -> EngineBuilder {
        EngineBuilder::new(opts)
    }

    fn wire(&self) {
        // Every tick re-renders, then observers hear about the new time.
        let renderer = Rc::downgrade(&self.renderer);
        self.clock
            .events()
            .subscribe(ClockEventKind::TimeUpdate, move |_| {
                render_if_alive(&renderer);
                Ok(())
            });

        for kind in [
            ClockEventKind::Play,
            ClockEventKind::Pause,
            ClockEventKind::TimeUpdate,
            ClockEventKind::Seek,
            ClockEventKind::Ended,
            ClockEventKind::DurationUpdate,
        ] {
            let events = Rc::downgrade(&self.events);
            self.clock.events().subscribe(kind, move |ev| {
                if let Some(events) = events.upgrade() {
                    events.publish(EngineEvent::from(*ev));
                }
                Ok(())
            });
        }

        let renderer = Rc::downgrade(&self.renderer);
        self.transform
            .events()
            .subscribe(TransformEventKind::Transform, move |_| {
                render_if_alive(&renderer);
                Ok(())
            });

        let store = Rc::downgrade(&self.store);
        let extraction = Rc::downgrade(&self.extraction);
        let events = Rc::downgrade(&self.events);
        let default_rate = self.opts.sample_rate_hz;
        self.store
            .events()
            .subscribe(StoreEventKind::Add, move |ev| {
                let StoreEvent::Added(id) = ev else {
                    return Ok(());
                };
                let (Some(store), Some(extraction), Some(events)) =
                    (store.upgrade(), extraction.upgrade(), events.upgrade())
                else {
                    return Ok(());
                };
                let Some(job) = store.get(id).and_then(|h| extraction_job(&h, default_rate))
                else {
                    return Ok(());
                };
                extraction.submit(job)?;
                events.publish(EngineEvent::Loading);
                Ok(())
            });
    }

    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    pub fn store(&self) -> &Rc<ElementStore> {
        &self.store
    }

    pub fn clock(&self) -> &Rc<PlaybackClock> {
        &self.clock
    }

    pub fn transform(&self) -> &Rc<TransformController> {
        &self.transform
    }

    /// The default tick queue, present only when the builder was given no scheduler.
    ///
    /// Pop tokens from it and pass them to [`Engine::drive_frame`] to advance playback.
    pub fn frame_queue(&self) -> Option<&FrameQueue> {
        self.frame_queue.as_ref()
    }

    /// Load the frame extractor, publishing `Loading` before and `Ready` after.
    #[tracing::instrument(skip(self))]
    pub fn start(&self) -> DeckResult<()> {
        self.events.publish(EngineEvent::Loading);
        self.extraction.load()?;
        tracing::info!("frame extractor ready");
        self.events.publish(EngineEvent::Ready);
        Ok(())
    }

    /// Add an element. A video with a source and no frames starts a background extraction.
    pub fn add_element(&self, element: Element) -> ElementHandle {
        self.store.add(element)
    }

    pub fn remove_element(&self, id: &ElementId) -> bool {
        self.store.remove(id)
    }

    pub fn update_element(&self, id: &ElementId, patch: ElementPatch) -> bool {
        self.store.update(id, patch)
    }

    pub fn play(&self) {
        self.clock.play();
    }

    pub fn pause(&self) {
        self.clock.pause();
    }

    pub fn toggle_play(&self) {
        self.clock.toggle_play();
    }

    pub fn seek(&self, time_ms: f64) {
        self.clock.seek(time_ms);
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    pub fn total_duration(&self) -> f64 {
        self.clock.total_duration()
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    /// Render the current time once, outside the tick loop.
    pub fn render_once(&self) -> DeckResult<RenderStats> {
        self.renderer.render_frame()
    }

    /// Host refresh callback: apply finished extraction work, then deliver the tick.
    ///
    /// Returns `false` when the token was stale.
    pub fn drive_frame(&self, token: TickToken) -> bool {
        self.poll_extractions();
        self.clock.on_frame(token)
    }

    /// Apply every extraction update that has arrived. Returns how many were applied.
    pub fn poll_extractions(&self) -> usize {
        let updates = self.extraction.poll();
        let n = updates.len();
        for update in updates {
            self.apply_extraction(update);
        }
        n
    }

    /// Block until every extraction in flight has finished or failed.
    pub fn wait_for_extractions(&self) -> usize {
        let mut n = 0;
        while let Some(update) = self.extraction.wait_next() {
            self.apply_extraction(update);
            n += 1;
        }
        n
    }

    pub fn extractions_in_flight(&self) -> usize {
        self.extraction.in_flight()
    }

    fn apply_extraction(&self, update: ExtractionUpdate) {
        match update {
            ExtractionUpdate::Listed { element_id, slots } => {
                tracing::debug!(id = %element_id, frames = slots.len(), "frames listed");
                self.store
                    .update(&element_id, ElementPatch::frames(slots));
            }
            ExtractionUpdate::Progress {
                element_id,
                progress,
                time_ms,
                ..
            } => {
                self.events.publish(EngineEvent::Progress {
                    id: element_id,
                    progress,
                    time_ms,
                });
            }
            ExtractionUpdate::Finished { element_id, frames } => {
                tracing::info!(id = %element_id, frames, "extraction finished");
            }
            ExtractionUpdate::Failed { element_id, error } => {
                tracing::error!(id = %element_id, %error, "extraction failed");
            }
        }
    }

    /// Press at client coordinates; re-renders so the selection change is visible.
    pub fn pointer_down(&self, client: Point) -> Option<ElementId> {
        let hit = self.transform.pointer_down(client);
        render_if_alive(&Rc::downgrade(&self.renderer));
        hit
    }

    pub fn pointer_move(&self, client: Point) -> bool {
        self.transform.pointer_move(client)
    }

    /// Release; commits the dragged rect through the store and re-renders.
    pub fn pointer_up(&self) -> bool {
        let committed = self.transform.pointer_up();
        render_if_alive(&Rc::downgrade(&self.renderer));
        committed
    }

    pub fn set_surface_origin(&self, origin: Point) {
        self.transform.set_surface_origin(origin);
    }

    pub fn selected_id(&self) -> Option<ElementId> {
        self.transform.selected_id()
    }

    pub fn subscribe<F>(&self, kind: EngineEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&EngineEvent) -> anyhow::Result<()> + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    pub fn unsubscribe(&self, kind: EngineEventKind, id: SubscriptionId) -> bool {
        self.events.unsubscribe(kind, id)
    }

    /// Pixels of the last presented frame, if the surface can read back.
    pub fn snapshot(&self) -> Option<FrameRGBA> {
        self.renderer.snapshot()
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.renderer.surface_size()
    }
}

fn render_if_alive(renderer: &Weak<Renderer>) {
    let Some(renderer) = renderer.upgrade() else {
        return;
    };
    if let Err(err) = renderer.render_frame() {
        tracing::warn!(error = %err, "render failed");
    }
}

fn extraction_job(handle: &ElementHandle, default_rate: f64) -> Option<ExtractionJob> {
    let el = handle.borrow();
    let ElementKind::VideoFrames(video) = &el.kind else {
        return None;
    };
    if !video.needs_extraction() {
        return None;
    }
    let source = video.source.clone()?;
    let sample_rate_hz = if video.sample_rate_hz.is_finite() && video.sample_rate_hz > 0.0 {
        video.sample_rate_hz
    } else {
        default_rate
    };
    Some(ExtractionJob {
        element_id: el.id().clone(),
        source,
        sample_rate_hz,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/engine/session.rs"]
mod tests;
