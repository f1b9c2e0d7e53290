use crate::config::SignatureConfig;
use crate::features::color::Rgb;
use crate::features::stroke::{Point, StrokeRecorder};
use crate::features::surface::CaptureSurface;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CaptureState {
    Closed,
    Idle,
    Drawing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DialogTab {
    Draw,
    Saved,
}

/// Stroke state between opening and closing/committing the capture surface.
#[derive(Debug, Clone)]
pub struct SignatureSession {
    pub target: Point,
    pub recorder: StrokeRecorder,
}

impl SignatureSession {
    pub fn new(config: &SignatureConfig, target: Point, color: Rgb) -> Self {
        let surface = CaptureSurface::new(
            config.surface_width,
            config.surface_height,
            config.line_width,
        );
        Self {
            target,
            recorder: StrokeRecorder::new(surface, color),
        }
    }

    pub fn capture_state(&self) -> CaptureState {
        if self.recorder.is_drawing() {
            CaptureState::Drawing
        } else {
            CaptureState::Idle
        }
    }

    pub fn has_strokes(&self) -> bool {
        !self.recorder.strokes().is_empty()
    }
}
