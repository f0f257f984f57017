//! Helper functions shared by the rendering pipeline

mod emoji;
mod html;

pub use emoji::*;
pub use html::*;
