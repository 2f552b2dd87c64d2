use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use crate::assets::decode::decode_image;
use crate::assets::raster::FrameSlot;
use crate::foundation::error::{DeckError, DeckResult};
use crate::timeline::element::ElementId;

/// Turns a media file into an ordered list of encoded still images.
///
/// Implementations run on extraction worker threads.
pub trait FrameExtractor: Send + Sync {
    /// Make the extractor ready (locate tools, warm up). Called once by `Engine::start`.
    fn load(&self) -> DeckResult<()>;

    /// Sample `source` at `sample_rate_hz` frames per second. Each item is one encoded image.
    fn extract(&self, source: &Path, sample_rate_hz: f64) -> DeckResult<Vec<Vec<u8>>>;
}

/// [`FrameExtractor`] backed by the system `ffmpeg` binary.
///
/// Requires the `media-ffmpeg` feature; without it every call fails with an extraction error.
#[derive(Clone, Debug)]
pub struct FfmpegFrameExtractor {
    ffmpeg: PathBuf,
    scratch_root: PathBuf,
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegFrameExtractor {
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            scratch_root: std::env::temp_dir(),
        }
    }

    /// Use a specific ffmpeg executable instead of the one on `PATH`.
    pub fn with_binary(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    /// Directory under which per-extraction scratch directories are created.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }
}

#[cfg(feature = "media-ffmpeg")]
impl FrameExtractor for FfmpegFrameExtractor {
    fn load(&self) -> DeckResult<()> {
        let out = std::process::Command::new(&self.ffmpeg)
            .arg("-version")
            .output()
            .map_err(|e| DeckError::extraction(format!("failed to run ffmpeg: {e}")))?;
        if !out.status.success() {
            return Err(DeckError::extraction("ffmpeg -version exited with an error"));
        }
        Ok(())
    }

    fn extract(&self, source: &Path, sample_rate_hz: f64) -> DeckResult<Vec<Vec<u8>>> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(DeckError::extraction("sample rate must be finite and > 0"));
        }
        let scratch = ScratchDir::create(&self.scratch_root)?;
        let out = std::process::Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(source)
            .args(["-vf", &format!("fps={sample_rate_hz}")])
            .arg(scratch.path().join("frame_%d.png"))
            .output()
            .map_err(|e| DeckError::extraction(format!("failed to run ffmpeg: {e}")))?;
        if !out.status.success() {
            return Err(DeckError::extraction(format!(
                "ffmpeg frame extraction failed for '{}': {}",
                source.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        read_numbered_frames(scratch.path())
    }
}

#[cfg(not(feature = "media-ffmpeg"))]
impl FrameExtractor for FfmpegFrameExtractor {
    fn load(&self) -> DeckResult<()> {
        Err(DeckError::extraction(
            "frame extraction requires the 'media-ffmpeg' feature",
        ))
    }

    fn extract(&self, _source: &Path, _sample_rate_hz: f64) -> DeckResult<Vec<Vec<u8>>> {
        Err(DeckError::extraction(
            "frame extraction requires the 'media-ffmpeg' feature",
        ))
    }
}

/// Temporary directory removed on drop.
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
struct ScratchDir(PathBuf);

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
impl ScratchDir {
    fn create(root: &Path) -> DeckResult<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(0);

        let dir = root.join(format!(
            "framedeck-extract-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).map_err(|e| {
            DeckError::extraction(format!("create scratch dir '{}': {e}", dir.display()))
        })?;
        Ok(Self(dir))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_dir_all(&self.0) {
            tracing::warn!(dir = %self.0.display(), error = %err, "failed to remove scratch dir");
        }
    }
}

/// Read `frame_<n>.png` files from `dir`, ordered by `n` numerically.
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn read_numbered_frames(dir: &Path) -> DeckResult<Vec<Vec<u8>>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| DeckError::extraction(format!("read '{}': {e}", dir.display())))?;
    let mut numbered = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DeckError::extraction(e.to_string()))?;
        let name = entry.file_name();
        if let Some(n) = name.to_str().and_then(frame_number) {
            numbered.push((n, entry.path()));
        }
    }
    numbered.sort_by_key(|(n, _)| *n);

    numbered
        .into_iter()
        .map(|(_, path)| {
            std::fs::read(&path)
                .map_err(|e| DeckError::extraction(format!("read '{}': {e}", path.display())))
        })
        .collect()
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn frame_number(name: &str) -> Option<u64> {
    name.strip_prefix("frame_")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// One video element waiting for its frames.
#[derive(Clone, Debug)]
pub struct ExtractionJob {
    pub element_id: ElementId,
    pub source: PathBuf,
    pub sample_rate_hz: f64,
}

/// Messages sent from extraction workers back to the control thread.
#[derive(Clone, Debug)]
pub enum ExtractionUpdate {
    /// Frame count is known; `slots` fill in as frames decode.
    Listed {
        element_id: ElementId,
        slots: Vec<Arc<FrameSlot>>,
    },
    /// Frame `index` decoded. `progress` is in `0..=1`; `time_ms` is the frame's offset into the
    /// element.
    Progress {
        element_id: ElementId,
        index: usize,
        progress: f64,
        time_ms: f64,
    },
    Finished {
        element_id: ElementId,
        frames: usize,
    },
    Failed {
        element_id: ElementId,
        error: String,
    },
}

impl ExtractionUpdate {
    pub fn element_id(&self) -> &ElementId {
        match self {
            ExtractionUpdate::Listed { element_id, .. }
            | ExtractionUpdate::Progress { element_id, .. }
            | ExtractionUpdate::Finished { element_id, .. }
            | ExtractionUpdate::Failed { element_id, .. } => element_id,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExtractionUpdate::Finished { .. } | ExtractionUpdate::Failed { .. }
        )
    }
}

/// Runs extraction jobs on worker threads and hands their updates to the control thread.
///
/// Updates are only observed when polled, so every state change they cause happens on the
/// thread that owns the engine.
pub struct ExtractionQueue {
    extractor: Arc<dyn FrameExtractor>,
    tx: Sender<ExtractionUpdate>,
    rx: Receiver<ExtractionUpdate>,
    in_flight: Cell<usize>,
    workers: RefCell<Vec<JoinHandle<()>>>,
}

impl ExtractionQueue {
    pub fn new(extractor: Arc<dyn FrameExtractor>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            extractor,
            tx,
            rx,
            in_flight: Cell::new(0),
            workers: RefCell::new(Vec::new()),
        }
    }

    pub fn load(&self) -> DeckResult<()> {
        self.extractor.load()
    }

    /// Jobs submitted whose `Finished`/`Failed` update has not been polled yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    pub fn submit(&self, job: ExtractionJob) -> DeckResult<()> {
        let extractor = self.extractor.clone();
        let tx = self.tx.clone();
        let name = format!("framedeck-extract-{}", job.element_id);
        tracing::info!(id = %job.element_id, source = %job.source.display(), "extraction started");

        let handle = std::thread::Builder::new()
            .name(name)
            .spawn(move || {
                // A panicking extractor still has to end the job, or it stays in flight forever.
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_job(extractor.as_ref(), &job, &tx)
                }));
                let update = match outcome {
                    Ok(Ok(frames)) => ExtractionUpdate::Finished {
                        element_id: job.element_id,
                        frames,
                    },
                    Ok(Err(err)) => ExtractionUpdate::Failed {
                        element_id: job.element_id,
                        error: err.to_string(),
                    },
                    Err(payload) => {
                        let error =
                            format!("extraction worker panicked: {}", panic_message(&*payload));
                        tracing::error!(id = %job.element_id, %error, "extraction worker panicked");
                        ExtractionUpdate::Failed {
                            element_id: job.element_id,
                            error,
                        }
                    }
                };
                let _ = tx.send(update);
            })
            .map_err(|e| DeckError::extraction(format!("spawn extraction worker: {e}")))?;

        let mut workers = self.workers.borrow_mut();
        workers.retain(|w| !w.is_finished());
        workers.push(handle);
        self.in_flight.set(self.in_flight.get() + 1);
        Ok(())
    }

    /// Drain every update that has arrived, without blocking.
    pub fn poll(&self) -> Vec<ExtractionUpdate> {
        let updates: Vec<_> = self.rx.try_iter().collect();
        for update in &updates {
            self.observe(update);
        }
        updates
    }

    /// Block for the next update. Returns `None` when no job is in flight.
    pub fn wait_next(&self) -> Option<ExtractionUpdate> {
        if self.in_flight.get() == 0 {
            return None;
        }
        let update = self.rx.recv().ok()?;
        self.observe(&update);
        Some(update)
    }

    fn observe(&self, update: &ExtractionUpdate) {
        if update.is_terminal() {
            self.in_flight.set(self.in_flight.get().saturating_sub(1));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

fn run_job(
    extractor: &dyn FrameExtractor,
    job: &ExtractionJob,
    tx: &Sender<ExtractionUpdate>,
) -> DeckResult<usize> {
    if !job.sample_rate_hz.is_finite() || job.sample_rate_hz <= 0.0 {
        return Err(DeckError::extraction("sample rate must be finite and > 0"));
    }
    let encoded = extractor.extract(&job.source, job.sample_rate_hz)?;
    let total = encoded.len();
    let slots: Vec<Arc<FrameSlot>> = (0..total).map(|_| Arc::new(FrameSlot::pending())).collect();
    let _ = tx.send(ExtractionUpdate::Listed {
        element_id: job.element_id.clone(),
        slots: slots.clone(),
    });

    let mut decoded = 0usize;
    for (index, (bytes, slot)) in encoded.iter().zip(&slots).enumerate() {
        match decode_image(bytes) {
            Ok(image) => {
                slot.fill(image);
                decoded += 1;
            }
            Err(err) => {
                tracing::warn!(id = %job.element_id, index, error = %err, "frame decode failed");
                continue;
            }
        }
        let _ = tx.send(ExtractionUpdate::Progress {
            element_id: job.element_id.clone(),
            index,
            progress: decoded as f64 / total as f64,
            time_ms: index as f64 / job.sample_rate_hz * 1000.0,
        });
    }
    Ok(decoded)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/extract.rs"]
mod tests;
