use std::io::Cursor;

use super::*;

fn png_bytes(w: u32, h: u32, rgba: Vec<u8>) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(w, h, rgba).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let buf = png_bytes(1, 1, vec![100, 50, 200, 128]);
    let img = decode_image(&buf).unwrap();
    assert_eq!(img.width(), 1);
    assert_eq!(img.height(), 1);
    assert_eq!(
        img.rgba8_premul(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_rejects_garbage() {
    assert!(decode_image(b"definitely not an image").is_err());
}

#[test]
fn load_image_reports_missing_file() {
    let err = load_image(Path::new("/nonexistent/framedeck.png")).unwrap_err();
    assert!(err.to_string().contains("framedeck.png"));
}

#[test]
fn unpremultiply_restores_straight_alpha_approximately() {
    let mut px = vec![50u8, 25, 100, 128, 7, 7, 7, 0, 10, 20, 30, 255];
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[0..4], &[100, 50, 199, 128]);
    assert_eq!(&px[4..8], &[7, 7, 7, 0]);
    assert_eq!(&px[8..12], &[10, 20, 30, 255]);
}
