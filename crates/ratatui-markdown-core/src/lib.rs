//! `ratatui-markdown-core` holds the UI-side building blocks used by `ratatui-markdown`.
//!
//! The markdown crate produces a tree of styled elements; the pieces in here are what it needs
//! to turn that tree into something a terminal can show and a user can interact with.
//!
//! - [`theme::Typography`]: read-only styles per block/inline category.
//! - [`input`]: backend-agnostic key/mouse events plus key binding sets.
//! - [`viewport::ViewportState`]: scroll offsets clamped to content size.
//! - [`render`]: painting spans into a [`ratatui::buffer::Buffer`] with horizontal clipping,
//!   column/byte conversions for selection, and a scrollbar.
//! - [`text::CodeHighlighter`]: the syntax highlighting collaborator interface.
//!
//! No async runtime is involved: everything here runs on the caller's thread.
pub mod theme;

pub mod text;

#[cfg(feature = "crossterm")]
pub mod crossterm_input;

pub mod input;
pub mod render;
pub mod viewport;
