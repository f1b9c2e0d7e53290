use crate::error::{Result, SignatureError};
use crate::features::dialog::{KeyInput, SignatureDialog};
use crate::features::placement::PlacementContext;
use crate::features::store::KeyValueStore;
use crate::features::stroke::Point;
use crate::state::{CaptureState, DialogTab};
use serde::Deserialize;
use serde_json::{json, Value};

/// JSON command sent by the host UI, one per input event or button press.
#[derive(Debug, Default, Deserialize)]
pub struct Command {
    pub action: String,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub key: Option<String>,
    pub ctrl: Option<bool>,
    pub meta: Option<bool>,
    pub color: Option<String>,
    pub index: Option<usize>,
    pub tab: Option<String>,
}

#[derive(Debug, PartialEq)]
enum Action {
    Open(Point),
    Close,
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    Key { key: String, ctrl: bool, meta: bool },
    SetColor(String),
    Clear,
    Undo,
    SelectTab(DialogTab),
    Place,
    SaveAndPlace,
    PlaceSaved(usize),
    DeleteSaved(usize),
}

fn parse_action(command: Command) -> Result<Action> {
    let Command {
        action,
        x,
        y,
        key,
        ctrl,
        meta,
        color,
        index,
        tab,
    } = command;

    let point = || -> Result<Point> {
        match (x, y) {
            (Some(x), Some(y)) => Ok(Point::new(x, y)),
            _ => Err(SignatureError::InvalidCommand(format!("{action}_missing_point"))),
        }
    };
    let index = || {
        index.ok_or_else(|| SignatureError::InvalidCommand(format!("{action}_missing_index")))
    };

    match action.as_str() {
        "sig_open" => Ok(Action::Open(point()?)),
        "sig_close" => Ok(Action::Close),
        "sig_pointer_down" => Ok(Action::PointerDown(point()?)),
        "sig_pointer_move" => Ok(Action::PointerMove(point()?)),
        "sig_pointer_up" | "sig_pointer_leave" => Ok(Action::PointerUp),
        "sig_key" => Ok(Action::Key {
            key: key.unwrap_or_default(),
            ctrl: ctrl.unwrap_or(false),
            meta: meta.unwrap_or(false),
        }),
        "sig_color" => color
            .map(Action::SetColor)
            .ok_or_else(|| SignatureError::InvalidColor(String::new())),
        "sig_clear" => Ok(Action::Clear),
        "sig_undo" => Ok(Action::Undo),
        "sig_tab" => match tab.as_deref() {
            Some("saved") => Ok(Action::SelectTab(DialogTab::Saved)),
            Some("draw") | None => Ok(Action::SelectTab(DialogTab::Draw)),
            Some(other) => Err(SignatureError::InvalidCommand(format!("unknown_tab:{other}"))),
        },
        "sig_place" => Ok(Action::Place),
        "sig_save_place" => Ok(Action::SaveAndPlace),
        "sig_saved_place" => Ok(Action::PlaceSaved(index()?)),
        "sig_saved_delete" => Ok(Action::DeleteSaved(index()?)),
        other => Err(SignatureError::InvalidCommand(format!("unknown_action:{other}"))),
    }
}

/// Applies one command and describes the resulting dialog state.
pub fn handle_command<S: KeyValueStore>(
    dialog: &mut SignatureDialog<S>,
    command: Command,
    ctx: &mut PlacementContext<'_>,
) -> Result<Value> {
    let mut response = json!({});
    match parse_action(command)? {
        Action::Open(target) => dialog.open(target),
        Action::Close => dialog.close(),
        Action::PointerDown(point) => dialog.pointer_down(point),
        Action::PointerMove(point) => dialog.pointer_move(point),
        Action::PointerUp => dialog.pointer_up(),
        Action::Key { key, ctrl, meta } => {
            let consumed = dialog.handle_key(KeyInput {
                key: &key,
                ctrl,
                meta,
            });
            response["consumed"] = json!(consumed);
        }
        Action::SetColor(raw) => dialog.set_color(&raw)?,
        Action::Clear => dialog.clear(),
        Action::Undo => {
            dialog.undo();
        }
        Action::SelectTab(tab) => {
            dialog.select_tab(tab);
            if tab == DialogTab::Saved {
                response["panel"] = dialog.saved_panel();
            }
        }
        Action::Place => response["annotation"] = serde_json::to_value(dialog.place(ctx)?)?,
        Action::SaveAndPlace => {
            response["annotation"] = serde_json::to_value(dialog.save_and_place(ctx)?)?
        }
        Action::PlaceSaved(index) => {
            response["annotation"] = serde_json::to_value(dialog.place_saved(index, ctx)?)?
        }
        Action::DeleteSaved(index) => {
            dialog.delete_saved(index)?;
            response["panel"] = dialog.saved_panel();
        }
    }
    response["state"] = json!(state_label(dialog.capture_state()));
    response["strokes"] = json!(dialog
        .session()
        .map_or(0, |session| session.recorder.strokes().len()));
    Ok(response)
}

/// Entry point for hosts that speak JSON. Never fails; errors come back as
/// an `error` object.
pub fn dispatch<S: KeyValueStore>(
    dialog: &mut SignatureDialog<S>,
    input: &str,
    ctx: &mut PlacementContext<'_>,
) -> Value {
    let command = match serde_json::from_str::<Command>(input) {
        Ok(command) => command,
        Err(e) => return error_ui(&SignatureError::Json(e)),
    };
    match handle_command(dialog, command, ctx) {
        Ok(value) => value,
        Err(err) => error_ui(&err),
    }
}

fn state_label(state: CaptureState) -> &'static str {
    match state {
        CaptureState::Closed => "closed",
        CaptureState::Idle => "idle",
        CaptureState::Drawing => "drawing",
    }
}

fn user_message(err: &SignatureError) -> &'static str {
    match err {
        SignatureError::NothingDrawn => "Please draw a signature first.",
        SignatureError::ImageInvalid(_) | SignatureError::InvalidDataUrl(_) => {
            "The signature image could not be read."
        }
        SignatureError::InvalidColor(_) => "That colour is not valid.",
        SignatureError::Storage(_) | SignatureError::Io(_) => "Saved signatures could not be written.",
        _ => "The signature action failed.",
    }
}

fn error_ui(err: &SignatureError) -> Value {
    json!({
        "error": err.to_string(),
        "message": user_message(err),
    })
}
