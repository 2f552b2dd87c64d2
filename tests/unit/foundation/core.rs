use super::*;

#[test]
fn time_range_rejects_inverted_and_non_finite() {
    assert!(TimeRange::new(10.0, 5.0).is_err());
    assert!(TimeRange::new(f64::NAN, 5.0).is_err());
    assert!(TimeRange::new(0.0, f64::INFINITY).is_err());
    assert!(TimeRange::new(5.0, 5.0).is_ok());
}

#[test]
fn visibility_boundaries() {
    let r = TimeRange::new(1000.0, 3000.0).unwrap();
    assert!(!r.is_visible_at(999.9));
    assert!(r.is_visible_at(1000.0));
    assert!(r.is_visible_at(2999.0));
    assert!(r.is_visible_at(3000.0));
    assert!(!r.is_visible_at(3000.001));
}

#[test]
fn zero_length_window_is_never_visible() {
    let r = TimeRange::new(500.0, 500.0).unwrap();
    assert!(r.is_empty());
    for t in [0.0, 499.0, 500.0, 501.0] {
        assert!(!r.is_visible_at(t), "visible at {t}");
    }
}

#[test]
fn rect_contains_is_inclusive_and_literal() {
    let r = ElementRect::new(10.0, 10.0, 20.0, 10.0);
    assert!(r.contains(Point::new(10.0, 10.0)));
    assert!(r.contains(Point::new(30.0, 20.0)));
    assert!(!r.contains(Point::new(30.1, 20.0)));

    let flipped = ElementRect::new(10.0, 10.0, -20.0, 10.0);
    assert!(!flipped.contains(Point::new(0.0, 15.0)));
}

#[test]
fn rect_corners_and_kurbo_conversion() {
    let r = ElementRect::new(1.0, 2.0, 3.0, 4.0);
    assert_eq!(r.top_right(), Point::new(4.0, 2.0));
    assert_eq!(r.bottom_left(), Point::new(1.0, 6.0));
    assert_eq!(r.to_kurbo(), kurbo::Rect::new(1.0, 2.0, 4.0, 6.0));
    assert_eq!(
        ElementRect::centered_square(Point::new(0.0, 0.0), 10.0),
        ElementRect::new(-5.0, -5.0, 10.0, 10.0)
    );
}

#[test]
fn premultiply_rounds() {
    let p = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(p.to_array(), [128, 64, 0, 128]);
}
