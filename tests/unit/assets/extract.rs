use std::io::Cursor;
use std::time::Duration;

use super::*;

fn png(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(1, 1, rgba.to_vec()).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

struct StubExtractor {
    frames: Vec<Vec<u8>>,
}

impl FrameExtractor for StubExtractor {
    fn load(&self) -> DeckResult<()> {
        Ok(())
    }

    fn extract(&self, _source: &Path, _sample_rate_hz: f64) -> DeckResult<Vec<Vec<u8>>> {
        Ok(self.frames.clone())
    }
}

struct BrokenExtractor;

impl FrameExtractor for BrokenExtractor {
    fn load(&self) -> DeckResult<()> {
        Err(DeckError::extraction("no tool"))
    }

    fn extract(&self, source: &Path, _sample_rate_hz: f64) -> DeckResult<Vec<Vec<u8>>> {
        Err(DeckError::extraction(format!("cannot open {}", source.display())))
    }
}

struct PanickingExtractor;

impl FrameExtractor for PanickingExtractor {
    fn load(&self) -> DeckResult<()> {
        Ok(())
    }

    fn extract(&self, source: &Path, _sample_rate_hz: f64) -> DeckResult<Vec<Vec<u8>>> {
        panic!("decoder blew up on {}", source.display());
    }
}

fn job(id: &str, rate: f64) -> ExtractionJob {
    ExtractionJob {
        element_id: ElementId::new(id),
        source: PathBuf::from("clip.mp4"),
        sample_rate_hz: rate,
    }
}

fn drain(queue: &ExtractionQueue) -> Vec<ExtractionUpdate> {
    let mut out = Vec::new();
    while let Some(update) = queue.wait_next() {
        out.push(update);
    }
    out
}

#[test]
fn frame_numbers_parse_only_the_expected_pattern() {
    assert_eq!(frame_number("frame_1.png"), Some(1));
    assert_eq!(frame_number("frame_120.png"), Some(120));
    assert_eq!(frame_number("frame_.png"), None);
    assert_eq!(frame_number("frame_3.jpg"), None);
    assert_eq!(frame_number("thumb_3.png"), None);
}

#[test]
fn numbered_frames_are_read_in_numeric_order() {
    let dir = std::env::temp_dir().join(format!("framedeck-test-frames-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    for n in [10u8, 2, 1] {
        std::fs::write(dir.join(format!("frame_{n}.png")), [n]).unwrap();
    }
    std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

    let frames = read_numbered_frames(&dir).unwrap();
    std::fs::remove_dir_all(&dir).unwrap();
    assert_eq!(frames, vec![vec![1u8], vec![2], vec![10]]);
}

#[test]
fn scratch_dir_is_removed_on_drop() {
    let scratch = ScratchDir::create(&std::env::temp_dir()).unwrap();
    let path = scratch.path().to_path_buf();
    assert!(path.is_dir());
    drop(scratch);
    assert!(!path.exists());
}

#[test]
fn job_lists_slots_reports_progress_and_finishes() {
    let queue = ExtractionQueue::new(Arc::new(StubExtractor {
        frames: vec![png([255, 0, 0, 255]), png([0, 255, 0, 255])],
    }));
    queue.submit(job("v", 4.0)).unwrap();
    assert_eq!(queue.in_flight(), 1);

    let updates = drain(&queue);
    assert_eq!(queue.in_flight(), 0);
    assert_eq!(updates.len(), 4);

    let ExtractionUpdate::Listed { element_id, slots } = &updates[0] else {
        panic!("expected Listed first, got {:?}", updates[0]);
    };
    assert_eq!(element_id.as_str(), "v");
    assert_eq!(slots.len(), 2);
    assert!(slots.iter().all(|s| s.is_loaded()));

    let ExtractionUpdate::Progress {
        progress, time_ms, ..
    } = &updates[2]
    else {
        panic!("expected Progress, got {:?}", updates[2]);
    };
    assert_eq!(*progress, 1.0);
    assert_eq!(*time_ms, 250.0);
    assert!(matches!(
        updates[3],
        ExtractionUpdate::Finished { frames: 2, .. }
    ));
}

#[test]
fn undecodable_frames_stay_unloaded() {
    let queue = ExtractionQueue::new(Arc::new(StubExtractor {
        frames: vec![b"junk".to_vec(), png([1, 2, 3, 255])],
    }));
    queue.submit(job("v", 1.0)).unwrap();
    let updates = drain(&queue);

    let ExtractionUpdate::Listed { slots, .. } = &updates[0] else {
        panic!("expected Listed first");
    };
    assert!(!slots[0].is_loaded());
    assert!(slots[1].is_loaded());
    assert!(matches!(
        updates.last(),
        Some(ExtractionUpdate::Finished { frames: 1, .. })
    ));
}

#[test]
fn extractor_errors_surface_as_failed() {
    let queue = ExtractionQueue::new(Arc::new(BrokenExtractor));
    assert!(queue.load().is_err());
    queue.submit(job("v", 30.0)).unwrap();
    let updates = drain(&queue);
    assert_eq!(updates.len(), 1);
    let ExtractionUpdate::Failed { element_id, error } = &updates[0] else {
        panic!("expected Failed");
    };
    assert_eq!(element_id.as_str(), "v");
    assert!(error.contains("clip.mp4"));
}

#[test]
fn panicking_extractor_ends_the_job_as_failed() {
    let queue = ExtractionQueue::new(Arc::new(PanickingExtractor));
    queue.submit(job("v", 30.0)).unwrap();
    let updates = drain(&queue);
    assert_eq!(queue.in_flight(), 0);
    let [ExtractionUpdate::Failed { element_id, error }] = &updates[..] else {
        panic!("expected a single Failed, got {updates:?}");
    };
    assert_eq!(element_id.as_str(), "v");
    assert!(error.contains("panicked"), "{error}");
    assert!(error.contains("decoder blew up on clip.mp4"), "{error}");

    // The queue keeps working after a worker panic.
    queue.submit(job("v", 30.0)).unwrap();
    assert_eq!(drain(&queue).len(), 1);
    assert_eq!(queue.in_flight(), 0);
}

#[test]
fn invalid_rate_fails_without_extracting() {
    let queue = ExtractionQueue::new(Arc::new(StubExtractor { frames: vec![] }));
    queue.submit(job("v", 0.0)).unwrap();
    let updates = drain(&queue);
    assert!(matches!(updates[..], [ExtractionUpdate::Failed { .. }]));
}

#[test]
fn poll_never_blocks() {
    let queue = ExtractionQueue::new(Arc::new(StubExtractor {
        frames: vec![png([0, 0, 0, 255])],
    }));
    assert!(queue.poll().is_empty());
    assert!(queue.wait_next().is_none());

    queue.submit(job("v", 1.0)).unwrap();
    let mut seen = Vec::new();
    for _ in 0..500 {
        seen.extend(queue.poll());
        if queue.in_flight() == 0 {
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(queue.in_flight(), 0);
    assert!(matches!(seen.last(), Some(ExtractionUpdate::Finished { .. })));
}

#[cfg(not(feature = "media-ffmpeg"))]
#[test]
fn ffmpeg_extractor_requires_feature() {
    let ffmpeg = FfmpegFrameExtractor::new();
    assert!(matches!(ffmpeg.load(), Err(DeckError::Extraction(_))));
    assert!(ffmpeg.extract(Path::new("a.mp4"), 30.0).is_err());
}
