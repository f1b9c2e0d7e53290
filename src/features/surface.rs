use crate::features::stroke::{Point, Stroke};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

// Spacing between stamped discs along a segment, in surface units.
const STAMP_STEP: f32 = 0.5;

/// Scratch raster the signature is drawn on.
///
/// Paths are stroked by stamping round discs along every segment, which gives
/// round caps and joins without a separate join pass.
#[derive(Debug, Clone)]
pub struct CaptureSurface {
    image: RgbaImage,
    line_width: f32,
}

impl CaptureSurface {
    pub fn new(width: u32, height: u32, line_width: f32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            line_width,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    pub fn snapshot(&self) -> RgbaImage {
        self.image.clone()
    }

    /// Puts a snapshot back. Snapshots of another size are ignored.
    pub fn restore(&mut self, snapshot: &RgbaImage) {
        if snapshot.dimensions() == self.image.dimensions() {
            self.image.copy_from_slice(snapshot.as_raw());
        }
    }

    /// Strokes the stroke's full path. Strokes with fewer than two points
    /// paint nothing.
    pub fn draw_stroke(&mut self, stroke: &Stroke) {
        if stroke.points.len() < 2 {
            return;
        }
        let color = stroke.color.to_rgba();
        let radius = self.stamp_radius();
        let reach = radius as f64;
        let bounds = (
            (-reach, -reach),
            (
                f64::from(self.width()) - 1.0 + reach,
                f64::from(self.height()) - 1.0 + reach,
            ),
        );
        let mut last_stamp: Option<(i32, i32)> = None;
        for segment in stroke.points.windows(2) {
            let Some((from, to)) = clip_segment(segment[0], segment[1], bounds) else {
                continue;
            };
            for center in segment_stamps(from, to) {
                if last_stamp == Some(center) {
                    continue;
                }
                draw_filled_circle_mut(&mut self.image, center, radius, color);
                last_stamp = Some(center);
            }
        }
    }

    /// Disc radius for the configured line width. A disc of radius `r` covers
    /// `2r + 1` pixels, so even widths come out one pixel wider than the
    /// nominal width (2 paints 3).
    fn stamp_radius(&self) -> i32 {
        ((self.line_width / 2.0).round() as i32).max(1)
    }
}

type Bounds = ((f64, f64), (f64, f64));

/// Clips a segment to `bounds` (Liang-Barsky). Segments with a non-finite
/// endpoint or lying entirely outside are dropped.
fn clip_segment(from: Point, to: Point, bounds: Bounds) -> Option<(Point, Point)> {
    if ![from.x, from.y, to.x, to.y].iter().all(|v| v.is_finite()) {
        return None;
    }
    let ((min_x, min_y), (max_x, max_y)) = bounds;
    let (x0, y0) = (f64::from(from.x), f64::from(from.y));
    let dx = f64::from(to.x) - x0;
    let dy = f64::from(to.y) - y0;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [
        (-dx, x0 - min_x),
        (dx, max_x - x0),
        (-dy, y0 - min_y),
        (dy, max_y - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    let at = |t: f64| Point::new((x0 + dx * t) as f32, (y0 + dy * t) as f32);
    let start = if t0 > 0.0 { at(t0) } else { from };
    let end = if t1 < 1.0 { at(t1) } else { to };
    Some((start, end))
}

fn segment_stamps(from: Point, to: Point) -> impl Iterator<Item = (i32, i32)> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let length = (dx * dx + dy * dy).sqrt();
    let steps = ((length / STAMP_STEP).ceil() as u32).max(1);
    (0..=steps).map(move |i| {
        let t = i as f32 / steps as f32;
        (
            (from.x + dx * t).round() as i32,
            (from.y + dy * t).round() as i32,
        )
    })
}
