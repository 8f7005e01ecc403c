mod common;

use bubblecard::detection::rectifier::{rectified_size, warp_card};
use bubblecard::SheetError;
use common::*;
use image::{imageops, Rgb, RgbImage};
use imageproc::point::Point;

fn assert_near(actual: u32, expected: u32, tolerance: u32) {
    assert!(
        actual.abs_diff(expected) <= tolerance,
        "expected {} ± {}, got {}",
        expected,
        tolerance,
        actual
    );
}

#[test]
fn test_axis_aligned_card_keeps_its_size() {
    let photo = quad_photo(420, 540, [(50, 60), (349, 60), (349, 459), (50, 459)]);
    let card = CardRectifier::default().rectify(&photo).expect("card should be found");

    assert_near(card.width(), 300, 4);
    assert_near(card.height(), 400, 4);

    let [tl, tr, br, bl] = card.corners;
    assert!(tl.x < tr.x && bl.x < br.x);
    assert!(tl.y < bl.y && tr.y < br.y);
    assert!((tl.x - 50.0).abs() <= 3.0 && (tl.y - 60.0).abs() <= 3.0);
}

#[test]
fn test_rectified_card_has_no_background_frame() {
    let card = CardRectifier::default()
        .rectify(&card_photo(&pattern_marks()))
        .expect("card should be found");
    let (w, h) = card.image.dimensions();

    let mean = |pixels: Vec<u8>| pixels.iter().map(|&p| p as u32).sum::<u32>() / pixels.len() as u32;
    let top = mean((0..w).map(|x| card.image.get_pixel(x, 0)[0]).collect());
    let bottom = mean((0..w).map(|x| card.image.get_pixel(x, h - 1)[0]).collect());
    let left = mean((0..h).map(|y| card.image.get_pixel(0, y)[0]).collect());
    let right = mean((0..h).map(|y| card.image.get_pixel(w - 1, y)[0]).collect());

    for (side, value) in [("top", top), ("bottom", bottom), ("left", left), ("right", right)] {
        assert!(value >= 200, "{} border averages {}", side, value);
    }
}

#[test]
fn test_rerectifying_is_stable() {
    let rectifier = CardRectifier::default();
    let photo = quad_photo(420, 540, [(50, 60), (349, 60), (349, 459), (50, 459)]);
    let first = rectifier.rectify(&photo).expect("card should be found");

    // Lay the rectified card back on the table and rectify it again
    let mut table = RgbImage::from_pixel(first.width() + 120, first.height() + 140, Rgb([TABLE, TABLE, TABLE]));
    let flat = image::DynamicImage::ImageLuma8(first.image.clone()).to_rgb8();
    imageops::replace(&mut table, &flat, 60, 70);
    let second = rectifier.rectify(&table).expect("card should be found again");

    assert_near(second.width(), first.width(), 4);
    assert_near(second.height(), first.height(), 4);

    let [tl, tr, br, bl] = second.corners;
    assert!(tl.x < tr.x && bl.x < br.x);
    assert!(tl.y < bl.y && tr.y < br.y);
}

#[test]
fn test_tilted_card_is_straightened() {
    let corners = [(120, 80), (520, 110), (540, 640), (90, 610)];
    let photo = quad_photo(640, 720, corners);
    let card = CardRectifier::default().rectify(&photo).expect("card should be found");

    // Longer of the opposite edges: bottom about 451, left about 530
    assert_near(card.width(), 451, 6);
    assert_near(card.height(), 530, 6);

    // The interior of the card is white once straightened
    let center = card.image.get_pixel(card.width() / 2, card.height() / 2)[0];
    assert!(center >= 250, "center pixel is {}", center);
}

#[test]
fn test_featureless_image_has_no_card() {
    let photo = uniform_photo(300, 300, 128);
    let err = CardRectifier::default().rectify(&photo).unwrap_err();
    assert!(matches!(err, SheetError::CardNotFound));
}

#[test]
fn test_bubbles_alone_are_not_a_card() {
    let page = bubble_page(400, 400, &[(60, 5)]);
    let err = CardRectifier::default().rectify(&page).unwrap_err();
    assert!(matches!(err, SheetError::CardNotFound));
}

#[test]
fn test_rectified_size_uses_longer_edges() {
    let corners = [
        Point::new(0.0, 0.0),
        Point::new(100.0, 0.0),
        Point::new(120.5, 80.0),
        Point::new(-10.0, 80.0),
    ];
    let (w, h) = rectified_size(&corners);
    assert_eq!(w, 130); // bottom edge: 130.5 -> floored
    assert_eq!(h, 82); // right edge: sqrt(20.5^2 + 80^2) = 82.58
}

#[test]
fn test_degenerate_corners_are_rejected() {
    let gray = image::GrayImage::new(50, 50);
    let point = Point::new(10.0, 10.0);
    assert_eq!(rectified_size(&[point; 4]), (1, 1));

    let err = warp_card(&gray, [point; 4]).unwrap_err();
    assert!(matches!(err, SheetError::CardNotFound));
}
