//! Signature capture and placement for the PDF editor.
//!
//! A [`SignatureDialog`] owns one capture session at a time: pointer strokes
//! are recorded onto a scratch raster, cropped to their content, and placed as
//! a signature annotation through the host's factory, undo log and redraw
//! hooks. Saved signatures live in a small bounded list behind a
//! [`KeyValueStore`].

pub mod config;
pub mod error;
pub mod features;
pub mod router;
pub mod state;
pub mod ui;

pub use config::SignatureConfig;
pub use error::{Result, SignatureError};
pub use features::color::Rgb;
pub use features::dialog::{KeyInput, SignatureDialog};
pub use features::placement::{
    Annotation, AnnotationFactory, AnnotationFields, AnnotationKind, DefaultAnnotationFactory,
    PlacementContext, Redraw, UndoLog, ViewMode,
};
pub use features::store::{FileStore, KeyValueStore, MemoryStore, SavedSignature, SignatureStore};
pub use features::stroke::{Point, Stroke, StrokeRecorder};
pub use router::dispatch;
pub use state::{CaptureState, DialogTab, SignatureSession};
