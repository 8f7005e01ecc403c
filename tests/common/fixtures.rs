use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use bubblecard::SheetUpload;
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_polygon_mut, Canvas};
use imageproc::point::Point;
use imageproc::rect::Rect;

pub const INK: u8 = 0;
pub const PAPER: u8 = 255;
pub const TABLE: u8 = 40;

/// Bubble radius used on synthetic cards (23 px bounding box)
pub const BUBBLE_RADIUS: i32 = 11;
pub const ROW_PITCH: i32 = 45;
pub const COLUMN_PITCH: i32 = 60;

/// Letter marked on question `q` (1-based) in the default test pattern
pub fn pattern_letter(question: usize) -> char {
    (b'A' + ((question - 1) % 5) as u8) as char
}

/// Default pattern: question q marks choice (q - 1) % 5
pub fn pattern_marks() -> Vec<Vec<usize>> {
    (0..10).map(|row| vec![row % 5]).collect()
}

fn draw_bubble<C: Canvas>(canvas: &mut C, center: (i32, i32), filled: bool, color: C::Pixel) {
    if filled {
        draw_filled_circle_mut(canvas, center, BUBBLE_RADIUS, color);
    } else {
        draw_hollow_circle_mut(canvas, center, BUBBLE_RADIUS, color);
        draw_hollow_circle_mut(canvas, center, BUBBLE_RADIUS - 1, color);
    }
}

/// Draw a header row of five empty bubbles and an answer grid of
/// `marks.len()` rows by five choices. `marks[r]` lists the filled choices
/// of row r. Coordinates are relative to `origin`.
pub fn draw_card_content<C: Canvas>(canvas: &mut C, origin: (i32, i32), marks: &[Vec<usize>], ink: C::Pixel) {
    let (ox, oy) = origin;
    let column_x = |c: i32| ox + 70 + c * COLUMN_PITCH;

    // Identification strip above the answers
    for c in 0..5 {
        draw_bubble(canvas, (column_x(c), oy + 60), false, ink);
    }

    for (r, filled) in marks.iter().enumerate() {
        let y = oy + 160 + r as i32 * ROW_PITCH;
        for c in 0..5 {
            draw_bubble(canvas, (column_x(c), y), filled.contains(&(c as usize)), ink);
        }
    }
}

/// A rectified card: white page with header and answer grid
pub fn rectified_card(marks: &[Vec<usize>]) -> GrayImage {
    let mut card = GrayImage::from_pixel(420, 680, Luma([PAPER]));
    draw_card_content(&mut card, (0, 0), marks, Luma([INK]));
    card
}

/// A photo of one card lying flat on a dark table
pub fn card_photo(marks: &[Vec<usize>]) -> RgbImage {
    let mut photo = RgbImage::from_pixel(800, 900, Rgb([TABLE, TABLE, TABLE]));
    let (x0, y0, x1, y1) = (150, 90, 150 + 459, 90 + 719);
    let outline = [
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
    ];
    draw_polygon_mut(&mut photo, &outline, Rgb([PAPER, PAPER, PAPER]));
    draw_card_content(&mut photo, (x0 + 20, y0 + 20), marks, Rgb([INK, INK, INK]));
    photo
}

/// Printed card border: a 5 px black frame of `size` at `origin`, broken by
/// a 2 px gap in the middle of its top edge
fn draw_broken_frame(photo: &mut RgbImage, origin: (i32, i32), size: (u32, u32)) {
    let (ox, oy) = origin;
    let (w, h) = size;
    let black = Rgb([INK, INK, INK]);
    draw_filled_rect_mut(photo, Rect::at(ox, oy).of_size(w, 5), black);
    draw_filled_rect_mut(photo, Rect::at(ox, oy + h as i32 - 5).of_size(w, 5), black);
    draw_filled_rect_mut(photo, Rect::at(ox, oy).of_size(5, h), black);
    draw_filled_rect_mut(photo, Rect::at(ox + w as i32 - 5, oy).of_size(5, h), black);
    draw_filled_rect_mut(photo, Rect::at(ox + w as i32 / 2, oy).of_size(2, 5), Rgb([PAPER, PAPER, PAPER]));
}

/// Two bordered cards printed one above the other on a 440x1360 white
/// sheet, one per half
pub fn stacked_cards_photo(top: &[Vec<usize>], bottom: &[Vec<usize>]) -> RgbImage {
    let mut photo = RgbImage::from_pixel(440, 1360, Rgb([PAPER, PAPER, PAPER]));
    for (marks, oy) in [(top, 30), (bottom, 710)] {
        draw_broken_frame(&mut photo, (30, oy), (380, 620));
        draw_card_content(&mut photo, (30, oy), marks, Rgb([INK, INK, INK]));
    }
    photo
}

/// Dark table with a white quadrilateral, corners clockwise from top-left
pub fn quad_photo(width: u32, height: u32, corners: [(i32, i32); 4]) -> RgbImage {
    let mut photo = RgbImage::from_pixel(width, height, Rgb([TABLE, TABLE, TABLE]));
    let outline = corners.map(|(x, y)| Point::new(x, y));
    draw_polygon_mut(&mut photo, &outline, Rgb([PAPER, PAPER, PAPER]));
    photo
}

/// White page with bands of small empty bubbles, five per row.
/// Each band is `(top, rows)`.
pub fn bubble_page(width: u32, height: u32, bands: &[(i32, usize)]) -> RgbImage {
    let mut page = RgbImage::from_pixel(width, height, Rgb([PAPER, PAPER, PAPER]));
    for &(top, rows) in bands {
        for r in 0..rows as i32 {
            for c in 0..5 {
                draw_hollow_circle_mut(&mut page, (60 + c * 60, top + r * 50), 10, Rgb([INK, INK, INK]));
            }
        }
    }
    page
}

pub fn uniform_photo(width: u32, height: u32, level: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([level, level, level]))
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

pub fn upload(name: &str, img: &RgbImage) -> SheetUpload {
    SheetUpload::new(name, png_bytes(img))
}
