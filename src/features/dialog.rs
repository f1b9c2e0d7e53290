use crate::config::SignatureConfig;
use crate::error::{Result, SignatureError};
use crate::features::color::Rgb;
use crate::features::crop::cropped_data_url;
use crate::features::placement::{measure, place_measured, Annotation, PlacementContext};
use crate::features::store::{KeyValueStore, SavedSignature, SignatureStore};
use crate::features::stroke::Point;
use crate::state::{CaptureState, DialogTab, SignatureSession};
use crate::ui::{to_value_or_text, Button, Column, Grid, Image, Text};
use serde_json::{json, Value};

/// Keyboard input delivered while the dialog has focus.
#[derive(Debug, Clone, Copy)]
pub struct KeyInput<'a> {
    pub key: &'a str,
    pub ctrl: bool,
    pub meta: bool,
}

/// Owns the capture session and drives it from pointer, key and button input.
///
/// `session` is `None` while the dialog is closed. Placing discards the
/// session; a failed placement leaves it (and its strokes) in place.
pub struct SignatureDialog<S: KeyValueStore> {
    config: SignatureConfig,
    store: SignatureStore<S>,
    session: Option<SignatureSession>,
    tab: DialogTab,
    target: Point,
    color: Rgb,
}

impl<S: KeyValueStore> SignatureDialog<S> {
    pub fn new(config: SignatureConfig, backend: S) -> Result<Self> {
        config.validate()?;
        let color = Rgb::parse(&config.default_color)?;
        let store = SignatureStore::new(backend, config.storage_key.clone(), config.max_saved);
        Ok(Self {
            config,
            store,
            session: None,
            tab: DialogTab::Draw,
            target: Point::new(0.0, 0.0),
            color,
        })
    }

    pub fn config(&self) -> &SignatureConfig {
        &self.config
    }

    pub fn store(&self) -> &SignatureStore<S> {
        &self.store
    }

    pub fn session(&self) -> Option<&SignatureSession> {
        self.session.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.session
            .as_ref()
            .map_or(CaptureState::Closed, SignatureSession::capture_state)
    }

    pub fn tab(&self) -> DialogTab {
        self.tab
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Opens a fresh session that will place its result centred on `target`.
    pub fn open(&mut self, target: Point) {
        self.target = target;
        self.tab = DialogTab::Draw;
        self.session = Some(SignatureSession::new(&self.config, target, self.color));
    }

    pub fn close(&mut self) {
        self.session = None;
    }

    pub fn select_tab(&mut self, tab: DialogTab) {
        self.tab = tab;
    }

    /// Applies to strokes begun after the call and is kept across sessions.
    pub fn set_color(&mut self, raw: &str) -> Result<()> {
        let color = Rgb::parse(raw)?;
        self.color = color;
        if let Some(session) = self.session.as_mut() {
            session.recorder.set_color(color);
        }
        Ok(())
    }

    pub fn pointer_down(&mut self, point: Point) {
        if let Some(session) = self.session.as_mut() {
            session.recorder.begin(point);
        }
    }

    pub fn pointer_move(&mut self, point: Point) {
        if let Some(session) = self.session.as_mut() {
            session.recorder.extend(point);
        }
    }

    pub fn pointer_up(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.recorder.end();
        }
    }

    pub fn pointer_leave(&mut self) {
        self.pointer_up();
    }

    pub fn undo(&mut self) -> bool {
        self.session
            .as_mut()
            .map_or(false, |session| session.recorder.undo().is_some())
    }

    pub fn clear(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.recorder.clear();
        }
    }

    /// Returns true when the key was consumed and must not reach the host's
    /// own shortcuts.
    pub fn handle_key(&mut self, input: KeyInput<'_>) -> bool {
        if !self.is_open() {
            return false;
        }
        if input.key == "Escape" {
            self.close();
            return true;
        }
        if (input.ctrl || input.meta) && input.key.eq_ignore_ascii_case("z") {
            self.undo();
            return true;
        }
        false
    }

    pub fn place(&mut self, ctx: &mut PlacementContext<'_>) -> Result<Annotation> {
        self.commit(false, ctx)
    }

    pub fn save_and_place(&mut self, ctx: &mut PlacementContext<'_>) -> Result<Annotation> {
        self.commit(true, ctx)
    }

    /// A stroke still held under the pointer is ended first, so it is only
    /// part of the raster when it would have been committed on release.
    fn commit(&mut self, save: bool, ctx: &mut PlacementContext<'_>) -> Result<Annotation> {
        let session = self.session.as_mut().ok_or(SignatureError::DialogClosed)?;
        if session.recorder.is_drawing() {
            session.recorder.end();
        }
        if !session.has_strokes() {
            return Err(SignatureError::NothingDrawn);
        }
        let data_url = cropped_data_url(session.recorder.surface().image(), self.config.crop_padding)?;
        let natural = measure(&data_url)?;
        if save {
            self.store.append(&data_url)?;
        }
        let annotation = place_measured(
            &data_url,
            natural,
            session.target,
            session.recorder.color(),
            self.config.max_placed_width,
            ctx,
        );
        self.session = None;
        Ok(annotation)
    }

    pub fn saved_signatures(&self) -> Vec<SavedSignature> {
        self.store.list()
    }

    /// Places a saved signature at the dialog's target in black and closes.
    pub fn place_saved(&mut self, index: usize, ctx: &mut PlacementContext<'_>) -> Result<Annotation> {
        if !self.is_open() {
            return Err(SignatureError::DialogClosed);
        }
        let saved = self
            .store
            .get(index)
            .ok_or(SignatureError::SavedSignatureMissing(index))?;
        let natural = measure(&saved.image_data)?;
        let annotation = place_measured(
            &saved.image_data,
            natural,
            self.target,
            Rgb::BLACK,
            self.config.max_placed_width,
            ctx,
        );
        self.session = None;
        Ok(annotation)
    }

    pub fn delete_saved(&mut self, index: usize) -> Result<Option<SavedSignature>> {
        self.store.delete_at(index)
    }

    pub fn saved_panel(&self) -> Value {
        render_saved_panel(&self.store.list())
    }
}

pub fn render_saved_panel(signatures: &[SavedSignature]) -> Value {
    if signatures.is_empty() {
        return to_value_or_text(
            Column::new(vec![to_value_or_text(
                Text::new("No saved signatures.").content_description("sig_saved_empty"),
                "sig_saved_empty",
            )])
            .content_description("sig_saved_panel"),
            "sig_saved_panel",
        );
    }

    let items: Vec<Value> = signatures
        .iter()
        .enumerate()
        .map(|(idx, sig)| {
            to_value_or_text(
                Column::new(vec![
                    to_value_or_text(
                        Image::new(&sig.image_data).action("sig_saved_place", json!({ "index": idx })),
                        "sig_saved_image",
                    ),
                    to_value_or_text(
                        Button::new("\u{00D7}", "sig_saved_delete")
                            .payload(json!({ "index": idx }))
                            .content_description("sig_saved_del"),
                        "sig_saved_del",
                    ),
                ])
                .content_description("sig_saved_item"),
                "sig_saved_item",
            )
        })
        .collect();

    to_value_or_text(
        Column::new(vec![to_value_or_text(
            Grid::new(items).columns(2).content_description("sig_saved_grid"),
            "sig_saved_grid",
        )])
        .content_description("sig_saved_panel"),
        "sig_saved_panel",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::crop::{decode_data_url, encode_png_data_url};
    use crate::features::placement::tests::Recording;
    use crate::features::placement::{AnnotationKind, DefaultAnnotationFactory, ViewMode};
    use crate::features::store::MemoryStore;
    use image::RgbaImage;

    struct Host {
        factory: DefaultAnnotationFactory,
        undo: Recording,
        redraw: Recording,
    }

    impl Host {
        fn new() -> Self {
            Self {
                factory: DefaultAnnotationFactory::new("Tester"),
                undo: Recording::default(),
                redraw: Recording::default(),
            }
        }

        fn ctx(&mut self) -> PlacementContext<'_> {
            PlacementContext {
                page: 1,
                view_mode: ViewMode::SinglePage,
                factory: &mut self.factory,
                undo_log: &mut self.undo,
                redraw: &mut self.redraw,
            }
        }
    }

    fn dialog() -> SignatureDialog<MemoryStore> {
        SignatureDialog::new(SignatureConfig::default(), MemoryStore::new()).unwrap()
    }

    fn drag(dialog: &mut SignatureDialog<MemoryStore>, points: &[(f32, f32)]) {
        let mut iter = points.iter();
        if let Some(&(x, y)) = iter.next() {
            dialog.pointer_down(Point::new(x, y));
        }
        for &(x, y) in iter {
            dialog.pointer_move(Point::new(x, y));
        }
        dialog.pointer_up();
    }

    #[test]
    fn capture_state_follows_pointer() {
        let mut dialog = dialog();
        assert_eq!(dialog.capture_state(), CaptureState::Closed);
        dialog.open(Point::new(10.0, 10.0));
        assert_eq!(dialog.capture_state(), CaptureState::Idle);
        dialog.pointer_down(Point::new(5.0, 5.0));
        assert_eq!(dialog.capture_state(), CaptureState::Drawing);
        dialog.pointer_leave();
        assert_eq!(dialog.capture_state(), CaptureState::Idle);
        dialog.close();
        assert_eq!(dialog.capture_state(), CaptureState::Closed);
    }

    #[test]
    fn draw_two_strokes_then_place() {
        let mut dialog = dialog();
        let mut host = Host::new();
        dialog.open(Point::new(300.0, 400.0));
        drag(&mut dialog, &[(20.0, 100.0), (120.0, 60.0), (220.0, 110.0)]);
        drag(&mut dialog, &[(240.0, 90.0), (300.0, 90.0)]);
        assert_eq!(dialog.session().unwrap().recorder.strokes().len(), 2);

        let ann = dialog.place(&mut host.ctx()).unwrap();
        assert_eq!(ann.fields.kind, AnnotationKind::Signature);
        let centre_x = ann.fields.x + ann.fields.width / 2.0;
        let centre_y = ann.fields.y + ann.fields.height / 2.0;
        assert!((centre_x - 300.0).abs() <= ann.fields.width / 2.0);
        assert!((centre_y - 400.0).abs() <= ann.fields.height / 2.0);
        assert!(ann.fields.width <= 200.0);
        assert!(!dialog.is_open());
        assert_eq!(host.undo.created.len(), 1);
        assert_eq!(host.redraw.refreshes, vec![ViewMode::SinglePage]);
        assert!(dialog.saved_signatures().is_empty());
    }

    #[test]
    fn placed_raster_is_cropped_to_strokes() {
        let mut dialog = dialog();
        let mut host = Host::new();
        dialog.open(Point::new(0.0, 0.0));
        drag(&mut dialog, &[(100.0, 100.0), (140.0, 100.0)]);
        let ann = dialog.place(&mut host.ctx()).unwrap();
        let raster = decode_data_url(&ann.fields.image_data).unwrap();
        // 41 px of line plus a 1 px stamp radius and 4 px padding each side
        assert_eq!((raster.width(), raster.height()), (51, 11));
        assert_eq!((ann.fields.original_width, ann.fields.original_height), (51, 11));
    }

    #[test]
    fn placing_nothing_is_rejected_without_state_change() {
        let mut dialog = dialog();
        let mut host = Host::new();
        dialog.open(Point::new(50.0, 50.0));
        drag(&mut dialog, &[(10.0, 10.0)]);
        assert!(matches!(dialog.place(&mut host.ctx()), Err(SignatureError::NothingDrawn)));
        assert!(matches!(dialog.save_and_place(&mut host.ctx()), Err(SignatureError::NothingDrawn)));
        assert!(dialog.is_open());
        assert!(host.undo.created.is_empty());
        assert!(dialog.saved_signatures().is_empty());
    }

    #[test]
    fn placing_mid_stroke_commits_the_held_stroke() {
        let mut dialog = dialog();
        let mut host = Host::new();
        dialog.open(Point::new(0.0, 0.0));
        dialog.pointer_down(Point::new(100.0, 100.0));
        dialog.pointer_move(Point::new(140.0, 100.0));
        assert_eq!(dialog.capture_state(), CaptureState::Drawing);
        let ann = dialog.save_and_place(&mut host.ctx()).unwrap();
        assert_eq!((ann.fields.original_width, ann.fields.original_height), (51, 11));
        assert_eq!(dialog.saved_signatures().len(), 1);
        assert!(!dialog.is_open());
    }

    #[test]
    fn placing_with_a_single_held_point_draws_nothing() {
        let mut dialog = dialog();
        let mut host = Host::new();
        dialog.open(Point::new(0.0, 0.0));
        dialog.pointer_down(Point::new(100.0, 100.0));
        assert!(matches!(dialog.place(&mut host.ctx()), Err(SignatureError::NothingDrawn)));
        assert_eq!(dialog.capture_state(), CaptureState::Idle);
        assert!(host.undo.created.is_empty());
    }

    #[test]
    fn placing_while_closed_is_rejected() {
        let mut dialog = dialog();
        let mut host = Host::new();
        assert!(matches!(dialog.place(&mut host.ctx()), Err(SignatureError::DialogClosed)));
    }

    #[test]
    fn save_and_place_appends_to_store() {
        let mut dialog = dialog();
        let mut host = Host::new();
        dialog.open(Point::new(50.0, 50.0));
        drag(&mut dialog, &[(10.0, 10.0), (60.0, 40.0)]);
        let ann = dialog.save_and_place(&mut host.ctx()).unwrap();
        let saved = dialog.saved_signatures();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].image_data, ann.fields.image_data);
    }

    #[test]
    fn escape_closes_and_ctrl_z_undoes() {
        let mut dialog = dialog();
        dialog.open(Point::new(0.0, 0.0));
        drag(&mut dialog, &[(10.0, 10.0), (60.0, 40.0)]);
        drag(&mut dialog, &[(10.0, 50.0), (60.0, 50.0)]);

        let undo = KeyInput { key: "z", ctrl: true, meta: false };
        assert!(dialog.handle_key(undo));
        assert_eq!(dialog.session().unwrap().recorder.strokes().len(), 1);
        assert!(!dialog.handle_key(KeyInput { key: "z", ctrl: false, meta: false }));

        assert!(dialog.handle_key(KeyInput { key: "Escape", ctrl: false, meta: false }));
        assert!(!dialog.is_open());
        assert!(!dialog.handle_key(undo));
    }

    #[test]
    fn color_persists_into_next_session() {
        let mut dialog = dialog();
        dialog.open(Point::new(0.0, 0.0));
        dialog.set_color("#3366ff").unwrap();
        assert!(dialog.set_color("blue-ish").is_err());
        dialog.close();
        dialog.open(Point::new(0.0, 0.0));
        drag(&mut dialog, &[(10.0, 10.0), (60.0, 40.0)]);
        let stroke = &dialog.session().unwrap().recorder.strokes()[0];
        assert_eq!(stroke.color.to_hex(), "#3366ff");
    }

    #[test]
    fn reopening_starts_blank() {
        let mut dialog = dialog();
        dialog.open(Point::new(0.0, 0.0));
        drag(&mut dialog, &[(10.0, 10.0), (60.0, 40.0)]);
        dialog.select_tab(DialogTab::Saved);
        dialog.open(Point::new(5.0, 5.0));
        let session = dialog.session().unwrap();
        assert!(session.recorder.strokes().is_empty());
        assert!(session.recorder.surface().image().pixels().all(|p| p[3] == 0));
        assert_eq!(dialog.tab(), DialogTab::Draw);
    }

    #[test]
    fn place_saved_uses_target_and_black() {
        let mut dialog = dialog();
        let mut host = Host::new();
        let url = encode_png_data_url(&RgbaImage::new(400, 100)).unwrap();
        dialog.store.append(&url).unwrap();
        dialog.open(Point::new(500.0, 500.0));
        dialog.set_color("#ff0000").unwrap();

        let ann = dialog.place_saved(0, &mut host.ctx()).unwrap();
        assert_eq!((ann.fields.x, ann.fields.y), (400.0, 475.0));
        assert_eq!(ann.fields.color, Rgb::BLACK);
        assert!(!dialog.is_open());

        dialog.open(Point::new(0.0, 0.0));
        assert!(matches!(
            dialog.place_saved(3, &mut host.ctx()),
            Err(SignatureError::SavedSignatureMissing(3))
        ));
    }

    #[test]
    fn corrupt_saved_raster_keeps_dialog_open() {
        let mut dialog = dialog();
        let mut host = Host::new();
        dialog.store.append("data:image/png;base64,AAAA").unwrap();
        dialog.open(Point::new(0.0, 0.0));
        drag(&mut dialog, &[(10.0, 10.0), (60.0, 40.0)]);
        assert!(dialog.place_saved(0, &mut host.ctx()).is_err());
        assert!(dialog.is_open());
        assert_eq!(dialog.session().unwrap().recorder.strokes().len(), 1);
        assert!(host.undo.created.is_empty());
    }

    #[test]
    fn saved_panel_lists_entries_with_delete_buttons() {
        let mut dialog = dialog();
        let empty = dialog.saved_panel();
        assert_eq!(empty["children"][0]["text"], "No saved signatures.");

        dialog.store.append("data:a").unwrap();
        dialog.store.append("data:b").unwrap();
        let panel = dialog.saved_panel();
        let grid = &panel["children"][0];
        assert_eq!(grid["type"], "Grid");
        let items = grid["children"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["children"][0]["src"], "data:b");
        assert_eq!(items[1]["children"][1]["payload"]["index"], 1);

        dialog.delete_saved(0).unwrap();
        assert_eq!(dialog.saved_signatures()[0].image_data, "data:b");
    }
}
