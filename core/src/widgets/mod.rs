//! Example Widget Consumers
//!
//! Concrete widgets built entirely on the core: a click-cycling button
//! and a plain panel container. They are exemplars of the intended
//! composition style rather than a widget gallery.

mod button;
mod panel;

pub use button::Button;
pub use panel::Panel;
