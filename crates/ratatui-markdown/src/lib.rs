//! GitHub-Flavored Markdown rendered into styled, interactive ratatui elements.
//!
//! ## Pipeline
//!
//! text → [`parser::MarkdownParser`] → [`ast::Ast`] → reference pre-scan
//! ([`references::ReferenceLinks`]) → [`block::BlockRenderer`] walking the tree through the
//! [`components::MarkdownComponents`] table → [`element::Element`] tree →
//! [`layout::layout_elements`] for a width → ratatui lines with click regions.
//!
//! ## Two layers
//!
//! - [`view::MarkdownView`]: interactive widget (viewport, scrolling, selection/copy, link
//!   clicks, background parsing).
//! - [`render`]: parse once with [`MarkdownDocument::parse`], render element trees and lay
//!   them out yourself, or call [`render_markdown`] for both in one step.
//!
//! ```
//! use ratatui_markdown::{MarkdownOptions, render_markdown};
//!
//! let options = MarkdownOptions::default();
//! let doc = render_markdown("# Hello\n\nSome **bold** text.", &options).unwrap();
//! assert_eq!(doc.plain_lines(40, &options), vec!["Hello", "", "Some bold text."]);
//! ```
//!
//! The library never installs a `tracing` subscriber.
pub mod annotated;
pub mod ast;
pub mod block;
pub mod components;
pub mod element;
pub mod entities;
pub mod error;
pub mod image;
pub mod inline;
pub mod layout;
pub mod list;
pub mod parser;
pub mod references;
pub mod render;
pub mod table;
pub mod view;
pub mod worker;

pub use annotated::AnnotatedText;
pub use annotated::LinkAnnotation;
pub use annotated::LinkListener;
pub use element::Element;
pub use error::ParseError;
pub use image::ImageHandle;
pub use image::ImageTransformer;
pub use parser::Flavour;
pub use parser::MarkdownParser;
pub use parser::PulldownParser;
pub use render::MarkdownDocument;
pub use render::MarkdownOptions;
pub use render::RenderedDocument;
pub use render::render_markdown;
pub use view::MarkdownView;
pub use view::MarkdownViewOptions;
