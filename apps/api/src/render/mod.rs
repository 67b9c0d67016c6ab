//! CV rendering. Pure: consumes a loaded profile and never touches storage
//! or the model.

mod cv;
mod metrics;

pub use cv::{render_cv, RenderError};
