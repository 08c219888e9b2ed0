//! Argument parsing for the SEO extension tags of a MediaWiki renderer.
//!
//! Page metadata is given either with a `<seo>` extension tag:
//!
//! ```text
//! <seo>
//! |title={{PAGENAME}} - Example
//! |description=An ''example'' page
//! </seo>
//! ```
//!
//! or with the `{{#seo:}}` parser function, which receives the same
//! `key=value` pairs as separate arguments. Either way, the values are
//! expanded by the host renderer and then reduced to plain text, since they
//! end up in `<meta>` tags.

pub mod expander;
pub mod php;
pub mod tag_parser;

pub use expander::{Frame, MarkupExpander, ParameterExpander, Verbatim};
pub use tag_parser::{ArgumentMap, TagParser};
