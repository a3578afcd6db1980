//! Markup served to the browser: the embedded map page and the popup
//! fragments rendered server-side.
//!
//! The page is kept as a `&'static str` so it ships inside the binary without
//! filesystem lookups.

pub mod fragments;
pub mod page;
