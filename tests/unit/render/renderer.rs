use std::sync::Arc;

use super::*;
use crate::assets::raster::{FrameSlot, RasterImage};
use crate::foundation::core::ElementRect;
use crate::playback::ticker::{FrameQueue, ManualTime};
use crate::render::recording::{DrawCommand, RecordingSurface};
use crate::timeline::element::{TextContent, VideoFrames};

struct Rig {
    store: Rc<ElementStore>,
    clock: Rc<PlaybackClock>,
    transform: Rc<TransformController>,
    surface: RecordingSurface,
    renderer: Renderer,
}

fn rig_with(surface: RecordingSurface) -> Rig {
    let opts = EngineOpts::default();
    let store = Rc::new(ElementStore::new());
    let clock = PlaybackClock::new(
        store.clone(),
        Rc::new(ManualTime::default()),
        Rc::new(FrameQueue::new()),
    );
    let transform = TransformController::new(store.clone(), &opts);
    let renderer = Renderer::new(
        store.clone(),
        clock.clone(),
        transform.clone(),
        Box::new(surface.clone()),
        &opts,
    )
    .unwrap();
    Rig {
        store,
        clock,
        transform,
        surface,
        renderer,
    }
}

fn rig() -> Rig {
    rig_with(RecordingSurface::new(200, 200))
}

fn range(start: f64, end: f64) -> TimeRange {
    TimeRange::new(start, end).unwrap()
}

fn rect() -> ElementRect {
    ElementRect::new(10.0, 20.0, 30.0, 40.0)
}

fn image_element(id: &str, z: i32, image: &RasterImage) -> Element {
    Element::new(
        id,
        rect(),
        range(0.0, 1000.0),
        ElementKind::Image {
            source: image.clone(),
        },
    )
    .with_z_index(z)
}

fn drawn_images(cmds: &[DrawCommand]) -> Vec<crate::assets::raster::ImageId> {
    cmds.iter()
        .filter_map(|c| match c {
            DrawCommand::Image { image, .. } => Some(*image),
            _ => None,
        })
        .collect()
}

#[test]
fn sampling_maps_time_to_frame_index() {
    let r = range(0.0, 2000.0);
    assert_eq!(sample_frame_index(r, 10, 5.0, 0.0), Some(0));
    assert_eq!(sample_frame_index(r, 10, 5.0, 1000.0), Some(5));
    assert_eq!(sample_frame_index(r, 10, 5.0, 2000.0), Some(9));
    assert_eq!(sample_frame_index(r, 10, 5.0, 1999.0), Some(9));
    assert_eq!(sample_frame_index(r, 4, 5.0, 1500.0), Some(3));
    assert_eq!(sample_frame_index(r, 0, 5.0, 500.0), None);
}

#[test]
fn sampling_is_relative_to_element_start() {
    let r = range(1000.0, 3000.0);
    assert_eq!(sample_frame_index(r, 60, 30.0, 1000.0), Some(0));
    assert_eq!(sample_frame_index(r, 60, 30.0, 1500.0), Some(15));
    assert_eq!(sample_frame_index(r, 60, 30.0, 500.0), Some(0));
}

#[test]
fn frame_is_cleared_drawn_in_z_order_and_presented() {
    let rig = rig();
    let a = RasterImage::solid(1, 1, [255, 0, 0, 255]).unwrap();
    let b = RasterImage::solid(1, 1, [0, 255, 0, 255]).unwrap();
    let c = RasterImage::solid(1, 1, [0, 0, 255, 255]).unwrap();
    rig.store.add(image_element("a", 2, &a));
    rig.store.add(image_element("b", 0, &b));
    rig.store.add(image_element("c", 1, &c));

    let stats = rig.renderer.render_frame().unwrap();
    assert_eq!(stats.drawn, 3);
    let cmds = rig.surface.commands();
    assert_eq!(cmds.first(), Some(&DrawCommand::Clear));
    assert_eq!(cmds.last(), Some(&DrawCommand::Present));
    assert_eq!(drawn_images(&cmds), [b.id(), c.id(), a.id()]);
}

#[test]
fn only_visible_elements_are_drawn() {
    let rig = rig();
    let img = RasterImage::solid(1, 1, [255, 0, 0, 255]).unwrap();
    rig.store.add(image_element("now", 0, &img));
    rig.store.add(Element::new(
        "later",
        rect(),
        range(1500.0, 2500.0),
        ElementKind::Image {
            source: img.clone(),
        },
    ));
    rig.clock.seek(1200.0);

    let stats = rig.renderer.render_frame().unwrap();
    assert_eq!(stats.visible, 0);
    assert_eq!(rig.surface.commands(), [DrawCommand::Clear, DrawCommand::Present]);
}

#[test]
fn text_uses_defaults_and_baseline_origin() {
    let rig = rig();
    rig.store.add(Element::new(
        "t",
        rect(),
        range(0.0, 1000.0),
        ElementKind::Text(TextContent::new("hello")),
    ));
    rig.renderer.render_frame().unwrap();
    assert!(rig.surface.commands().contains(&DrawCommand::Text {
        text: "hello".to_owned(),
        origin: Point::new(10.0, 20.0),
        font: FontSpec::new(30.0, "Arial"),
        color: Color::BLACK,
    }));
}

#[test]
fn text_overrides_are_honoured() {
    let rig = rig();
    let red = Color::rgba(1.0, 0.0, 0.0, 1.0);
    rig.store.add(Element::new(
        "t",
        rect(),
        range(0.0, 1000.0),
        ElementKind::Text(
            TextContent::new("hi")
                .with_font(FontSpec::new(12.0, "Mono"))
                .with_color(red),
        ),
    ));
    rig.renderer.render_frame().unwrap();
    let text = rig
        .surface
        .commands()
        .into_iter()
        .find(|c| matches!(c, DrawCommand::Text { .. }))
        .unwrap();
    assert_eq!(
        text,
        DrawCommand::Text {
            text: "hi".to_owned(),
            origin: Point::new(10.0, 20.0),
            font: FontSpec::new(12.0, "Mono"),
            color: red,
        }
    );
}

#[test]
fn video_draws_sampled_frame() {
    let rig = rig();
    let frames: Vec<RasterImage> = (0..10)
        .map(|_| RasterImage::solid(1, 1, [9, 9, 9, 255]).unwrap())
        .collect();
    rig.store.add(Element::new(
        "v",
        rect(),
        range(0.0, 2000.0),
        ElementKind::VideoFrames(VideoFrames::from_images(frames.clone(), 5.0)),
    ));

    rig.clock.seek(1000.0);
    rig.renderer.render_frame().unwrap();
    assert_eq!(drawn_images(&rig.surface.last_frame()), [frames[5].id()]);

    rig.clock.seek(2000.0);
    rig.renderer.render_frame().unwrap();
    assert_eq!(drawn_images(&rig.surface.last_frame()), [frames[9].id()]);
}

#[test]
fn unloaded_frames_are_skipped_silently() {
    let rig = rig();
    let ready = RasterImage::solid(1, 1, [1, 1, 1, 255]).unwrap();
    let slots = vec![
        Arc::new(FrameSlot::pending()),
        Arc::new(FrameSlot::ready(ready.clone())),
    ];
    rig.store.add(Element::new(
        "v",
        rect(),
        range(0.0, 2000.0),
        ElementKind::VideoFrames(VideoFrames {
            frames: slots.clone(),
            sample_rate_hz: 1.0,
            source: None,
        }),
    ));

    let stats = rig.renderer.render_frame().unwrap();
    assert_eq!(stats.skipped_unloaded, 1);
    assert_eq!(stats.failed, 0);
    assert!(drawn_images(&rig.surface.commands()).is_empty());

    // The slot is shared with the element, so filling it shows up on the next frame.
    let late = RasterImage::solid(1, 1, [2, 2, 2, 255]).unwrap();
    assert!(slots[0].fill(late.clone()));
    let stats = rig.renderer.render_frame().unwrap();
    assert_eq!(stats.drawn, 1);
    assert_eq!(drawn_images(&rig.surface.last_frame()), [late.id()]);
}

#[test]
fn empty_video_draws_nothing() {
    let rig = rig();
    rig.store.add(Element::new(
        "v",
        rect(),
        range(0.0, 1000.0),
        ElementKind::VideoFrames(VideoFrames::from_source("clip.mp4", 30.0)),
    ));
    let stats = rig.renderer.render_frame().unwrap();
    assert_eq!(stats.visible, 1);
    assert_eq!(stats.drawn, 0);
    assert_eq!(stats.skipped_unloaded, 0);
}

#[test]
fn failing_draw_is_counted_and_rendering_continues() {
    let rig = rig_with(RecordingSurface::new(100, 100).failing_text());
    let img = RasterImage::solid(1, 1, [255, 0, 0, 255]).unwrap();
    rig.store.add(Element::new(
        "t",
        rect(),
        range(0.0, 1000.0),
        ElementKind::Text(TextContent::new("boom")),
    ));
    rig.store.add(image_element("after", 1, &img));

    let stats = rig.renderer.render_frame().unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.drawn, 1);
    assert_eq!(drawn_images(&rig.surface.commands()), [img.id()]);
    assert_eq!(rig.surface.commands().last(), Some(&DrawCommand::Present));
}

#[test]
fn selection_overlay_is_drawn_after_elements() {
    let rig = rig();
    let img = RasterImage::solid(1, 1, [255, 0, 0, 255]).unwrap();
    rig.store.add(image_element("a", 0, &img));
    rig.transform.pointer_down(Point::new(25.0, 40.0));

    rig.renderer.render_frame().unwrap();
    let cmds = rig.surface.commands();
    let image_at = cmds
        .iter()
        .position(|c| matches!(c, DrawCommand::Image { .. }))
        .unwrap();
    let stroke_at = cmds
        .iter()
        .position(|c| matches!(c, DrawCommand::StrokeRect { .. }))
        .unwrap();
    assert!(image_at < stroke_at);
    assert_eq!(cmds.len(), 1 + 1 + 5 + 1);
}

#[test]
fn bad_default_font_is_a_config_error() {
    let store = Rc::new(ElementStore::new());
    let clock = PlaybackClock::new(
        store.clone(),
        Rc::new(ManualTime::default()),
        Rc::new(FrameQueue::new()),
    );
    let opts = EngineOpts {
        default_font: "Arial".to_owned(),
        ..EngineOpts::default()
    };
    let transform = TransformController::new(store.clone(), &opts);
    let err = Renderer::new(
        store,
        clock,
        transform,
        Box::new(RecordingSurface::new(1, 1)),
        &opts,
    )
    .err()
    .unwrap();
    assert!(matches!(err, DeckError::Config(_)));
}
