use super::*;
use crate::foundation::core::Canvas;

fn opts(width: u32, height: u32) -> EngineOpts {
    EngineOpts {
        canvas: Canvas { width, height },
        ..EngineOpts::default()
    }
}

fn close(px: [u8; 4], expected: [u8; 4]) -> bool {
    px.iter()
        .zip(expected.iter())
        .all(|(a, b)| (i16::from(*a) - i16::from(*b)).abs() <= 1)
}

#[test]
fn rejects_unusable_sizes() {
    assert!(matches!(
        CpuSurface::new(&opts(0, 10)),
        Err(DeckError::Config(_))
    ));
    assert!(matches!(
        CpuSurface::new(&opts(70_000, 10)),
        Err(DeckError::Config(_))
    ));
}

#[test]
fn missing_font_file_fails_construction() {
    let o = EngineOpts {
        font_paths: vec!["/nonexistent/font.ttf".into()],
        ..opts(4, 4)
    };
    assert!(CpuSurface::new(&o).is_err());
}

#[test]
fn snapshot_before_present_is_transparent() {
    let s = CpuSurface::new(&opts(4, 4)).unwrap();
    let frame = s.snapshot().unwrap();
    assert_eq!((frame.width, frame.height), (4, 4));
    assert!(frame.premultiplied);
    assert!(frame.data.iter().all(|b| *b == 0));
}

#[test]
fn clear_color_fills_the_frame() {
    let mut s = CpuSurface::new(&EngineOpts {
        clear_rgba: Some([0, 0, 255, 255]),
        ..opts(8, 8)
    })
    .unwrap();
    s.clear().unwrap();
    s.present().unwrap();
    let frame = s.snapshot().unwrap();
    assert!(close(frame.pixel(0, 0).unwrap(), [0, 0, 255, 255]));
    assert!(close(frame.pixel(7, 7).unwrap(), [0, 0, 255, 255]));
}

#[test]
fn fill_rect_covers_only_its_area() {
    let mut s = CpuSurface::new(&opts(16, 16)).unwrap();
    s.clear().unwrap();
    s.fill_rect(ElementRect::new(4.0, 4.0, 8.0, 8.0), Color::rgba(1.0, 0.0, 0.0, 1.0))
        .unwrap();
    s.present().unwrap();
    let frame = s.snapshot().unwrap();
    assert!(close(frame.pixel(8, 8).unwrap(), [255, 0, 0, 255]));
    assert_eq!(frame.pixel(1, 1).unwrap(), [0, 0, 0, 0]);
    assert_eq!(frame.pixel(14, 14).unwrap(), [0, 0, 0, 0]);
}

#[test]
fn clear_discards_undrawn_commands() {
    let mut s = CpuSurface::new(&opts(8, 8)).unwrap();
    s.fill_rect(ElementRect::new(0.0, 0.0, 8.0, 8.0), Color::WHITE)
        .unwrap();
    s.clear().unwrap();
    s.present().unwrap();
    assert_eq!(s.snapshot().unwrap().pixel(4, 4).unwrap(), [0, 0, 0, 0]);
}

#[test]
fn draw_image_stretches_into_dest() {
    let mut s = CpuSurface::new(&opts(20, 20)).unwrap();
    let green = RasterImage::solid(2, 2, [0, 255, 0, 255]).unwrap();
    s.clear().unwrap();
    s.draw_image(&green, ElementRect::new(0.0, 0.0, 10.0, 20.0))
        .unwrap();
    s.present().unwrap();
    let frame = s.snapshot().unwrap();
    assert!(close(frame.pixel(5, 15).unwrap(), [0, 255, 0, 255]));
    assert_eq!(frame.pixel(15, 5).unwrap(), [0, 0, 0, 0]);
}

#[test]
fn stroke_rect_leaves_interior_empty() {
    let mut s = CpuSurface::new(&opts(20, 20)).unwrap();
    s.clear().unwrap();
    s.stroke_rect(ElementRect::new(2.0, 2.0, 16.0, 16.0), Color::BLACK, 2.0)
        .unwrap();
    s.present().unwrap();
    let frame = s.snapshot().unwrap();
    assert!(close(frame.pixel(2, 10).unwrap(), [0, 0, 0, 255]));
    assert_eq!(frame.pixel(10, 10).unwrap(), [0, 0, 0, 0]);
}

#[test]
fn text_without_fonts_is_a_render_error() {
    let mut s = CpuSurface::new(&opts(20, 20)).unwrap();
    assert!(!s.has_fonts());
    let err = s
        .fill_text("hi", Point::new(0.0, 10.0), &FontSpec::new(10.0, "Arial"), Color::BLACK)
        .unwrap_err();
    assert!(matches!(err, DeckError::Render(_)));
}

#[test]
fn image_paint_cache_is_bounded() {
    let mut s = CpuSurface::new(&EngineOpts {
        image_cache_capacity: 2,
        ..opts(4, 4)
    })
    .unwrap();
    let images: Vec<_> = (0..3)
        .map(|_| RasterImage::solid(1, 1, [1, 2, 3, 255]).unwrap())
        .collect();
    for img in &images {
        s.draw_image(img, ElementRect::new(0.0, 0.0, 1.0, 1.0))
            .unwrap();
    }
    assert_eq!(s.image_cache.len(), 2);
    assert!(!s.image_cache.contains_key(&images[0].id()));

    // Touching keeps an entry alive.
    s.draw_image(&images[1], ElementRect::new(0.0, 0.0, 1.0, 1.0))
        .unwrap();
    let fresh = RasterImage::solid(1, 1, [0, 0, 0, 255]).unwrap();
    s.draw_image(&fresh, ElementRect::new(0.0, 0.0, 1.0, 1.0))
        .unwrap();
    assert!(s.image_cache.contains_key(&images[1].id()));
    assert!(!s.image_cache.contains_key(&images[2].id()));
}
