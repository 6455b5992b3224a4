//! Debounced application lookup

mod debounce;
mod picker;

pub use debounce::Debouncer;
pub use picker::AppPicker;
