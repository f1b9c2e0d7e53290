use crate::features::color::Rgb;
use crate::features::surface::CaptureSurface;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One continuous pointer drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Rgb,
    pub points: Vec<Point>,
}

/// Records pointer strokes onto a capture surface.
///
/// Committed strokes plus the active stroke always describe the surface
/// pixels exactly; [`StrokeRecorder::redraw`] rebuilds the raster from them.
#[derive(Debug, Clone)]
pub struct StrokeRecorder {
    surface: CaptureSurface,
    strokes: Vec<Stroke>,
    active: Option<Stroke>,
    snapshot: Option<RgbaImage>,
    color: Rgb,
}

impl StrokeRecorder {
    pub fn new(surface: CaptureSurface, color: Rgb) -> Self {
        Self {
            surface,
            strokes: Vec::new(),
            active: None,
            snapshot: None,
            color,
        }
    }

    pub fn surface(&self) -> &CaptureSurface {
        &self.surface
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn active_stroke(&self) -> Option<&Stroke> {
        self.active.as_ref()
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Affects strokes begun after the call.
    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    /// Returns false when a stroke is already in progress; the second
    /// pointer-down is ignored.
    pub fn begin(&mut self, point: Point) -> bool {
        if self.active.is_some() {
            log::debug!("pointer down while drawing ignored");
            return false;
        }
        self.active = Some(Stroke {
            color: self.color,
            points: vec![point],
        });
        self.snapshot = Some(self.surface.snapshot());
        true
    }

    pub fn extend(&mut self, point: Point) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.points.push(point);
        if let Some(snapshot) = &self.snapshot {
            self.surface.restore(snapshot);
        }
        self.surface.draw_stroke(active);
    }

    /// Returns true when the active stroke was committed.
    pub fn end(&mut self) -> bool {
        self.snapshot = None;
        match self.active.take() {
            Some(stroke) if stroke.points.len() > 1 => {
                log::debug!("stroke committed with {} points", stroke.points.len());
                self.strokes.push(stroke);
                true
            }
            _ => false,
        }
    }

    pub fn undo(&mut self) -> Option<Stroke> {
        let removed = self.strokes.pop()?;
        self.redraw();
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = None;
        self.snapshot = None;
        self.surface.clear();
    }

    pub fn redraw(&mut self) {
        self.surface.clear();
        for stroke in &self.strokes {
            self.surface.draw_stroke(stroke);
        }
        if let Some(active) = &self.active {
            self.snapshot = Some(self.surface.snapshot());
            self.surface.draw_stroke(active);
        }
    }
}
