use crate::error::Result;
use crate::features::color::Rgb;
use crate::features::crop::decode_data_url;
use crate::features::stroke::Point;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Signature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    SinglePage,
    Continuous,
}

/// Fields the placement step decides; the factory adds the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationFields {
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub image_id: String,
    pub image_data: String,
    pub original_width: u32,
    pub original_height: u32,
    pub color: Rgb,
    pub rotation: f64,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    #[serde(flatten)]
    pub fields: AnnotationFields,
    pub opacity: f64,
    pub author: String,
    pub created_at: String,
    pub modified_at: String,
}

pub trait AnnotationFactory {
    fn create(&mut self, fields: AnnotationFields) -> Annotation;
}

pub trait UndoLog {
    fn record_creation(&mut self, annotation: &Annotation);
}

pub trait Redraw {
    fn refresh(&mut self, mode: ViewMode);
}

/// Factory with UUID ids and UTC timestamps.
#[derive(Debug, Clone)]
pub struct DefaultAnnotationFactory {
    pub author: String,
}

impl DefaultAnnotationFactory {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
        }
    }
}

impl AnnotationFactory for DefaultAnnotationFactory {
    fn create(&mut self, fields: AnnotationFields) -> Annotation {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Annotation {
            id: Uuid::new_v4().to_string(),
            fields,
            opacity: 1.0,
            author: self.author.clone(),
            created_at: now.clone(),
            modified_at: now,
        }
    }
}

/// The host collaborators a placement talks to.
pub struct PlacementContext<'a> {
    pub page: u32,
    pub view_mode: ViewMode,
    pub factory: &'a mut dyn AnnotationFactory,
    pub undo_log: &'a mut dyn UndoLog,
    pub redraw: &'a mut dyn Redraw,
}

/// Natural size scaled down, never up, to fit `max_width`.
pub fn placement_size(natural_width: u32, natural_height: u32, max_width: f64) -> (f64, f64) {
    let width = natural_width as f64;
    let height = natural_height as f64;
    if width > max_width {
        let ratio = max_width / width;
        (width * ratio, height * ratio)
    } else {
        (width, height)
    }
}

/// Raster dimensions of a data URL, failing on anything that does not decode.
pub fn measure(data_url: &str) -> Result<(u32, u32)> {
    let image = decode_data_url(data_url)?;
    Ok((image.width(), image.height()))
}

/// Centres the raster on `target`, creates the annotation and notifies the host.
pub fn place_signature(
    data_url: &str,
    target: Point,
    color: Rgb,
    max_width: f64,
    ctx: &mut PlacementContext<'_>,
) -> Result<Annotation> {
    let natural = measure(data_url)?;
    Ok(place_measured(data_url, natural, target, color, max_width, ctx))
}

pub(crate) fn place_measured(
    data_url: &str,
    (natural_width, natural_height): (u32, u32),
    target: Point,
    color: Rgb,
    max_width: f64,
    ctx: &mut PlacementContext<'_>,
) -> Annotation {
    let (width, height) = placement_size(natural_width, natural_height, max_width);
    let fields = AnnotationFields {
        kind: AnnotationKind::Signature,
        page: ctx.page,
        x: target.x as f64 - width / 2.0,
        y: target.y as f64 - height / 2.0,
        width,
        height,
        image_id: Uuid::new_v4().to_string(),
        image_data: data_url.to_string(),
        original_width: natural_width,
        original_height: natural_height,
        color,
        rotation: 0.0,
        locked: false,
    };
    let annotation = ctx.factory.create(fields);
    ctx.undo_log.record_creation(&annotation);
    ctx.redraw.refresh(ctx.view_mode);
    log::info!(
        "signature placed on page {} at ({:.1}, {:.1})",
        annotation.fields.page,
        annotation.fields.x,
        annotation.fields.y
    );
    annotation
}
