use thiserror::Error;

/// Errors surfaced by the capture, store and placement paths.
///
/// The display strings are the short codes the host maps to user-facing
/// messages, with the underlying cause appended after a colon.
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("signature_empty")]
    NothingDrawn,

    #[error("signature_dialog_closed")]
    DialogClosed,

    #[error("invalid_color:{0}")]
    InvalidColor(String),

    #[error("invalid_data_url:{0}")]
    InvalidDataUrl(String),

    #[error("signature_image_invalid:{0}")]
    ImageInvalid(#[from] image::ImageError),

    #[error("signature_png_failed:{0}")]
    Encode(String),

    #[error("saved_signature_missing:{0}")]
    SavedSignatureMissing(usize),

    #[error("storage_failed:{0}")]
    Storage(String),

    #[error("json_err:{0}")]
    Json(#[from] serde_json::Error),

    #[error("io_err:{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid_command:{0}")]
    InvalidCommand(String),

    #[error("invalid_config:{0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SignatureError>;
