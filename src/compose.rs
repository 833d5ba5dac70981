//! Frame composition: layout, per-clip layers, and the per-frame blend.

pub mod composite;
pub mod composer;
pub mod layout;
pub mod surface;
pub(crate) mod text;
pub(crate) mod transform;
