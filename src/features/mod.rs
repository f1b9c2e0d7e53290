pub mod color;
pub mod crop;
pub mod dialog;
pub mod placement;
pub mod store;
pub mod stroke;
pub mod surface;
