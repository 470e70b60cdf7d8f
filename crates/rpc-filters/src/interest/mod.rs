//! Installed filters and the changes buffered for them.

mod buffer;
pub use buffer::FilterDelta;

mod filters;
pub(crate) use filters::FilterManager;

mod kind;
pub(crate) use kind::InterestKind;
