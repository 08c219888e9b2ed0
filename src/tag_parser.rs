//! Parsing of SEO tag arguments.
//!
//! Arguments arrive either as the body of a `<seo>` extension tag, which is a
//! single `|`-separated string, or as the already split arguments of a
//! `{{#seo:}}` parser function call. Each argument is a `key=value` pair.
//!
//! Values go through three steps: they are expanded by the host, then all
//! HTML tags are removed, then HTML entities are decoded. This order matters.
//! Decoding first would turn `&lt;b&gt;` into a tag which then gets stripped.

use crate::{expander::MarkupExpander, php};
use indexmap::IndexMap;

/// Parsed tag arguments, keyed by name.
pub type ArgumentMap = IndexMap<String, String>;

/// Parses and expands SEO tag arguments.
#[derive(Clone, Copy, Debug, Default)]
pub struct TagParser;

impl TagParser {
    /// The separator between arguments in tag content.
    pub const ARGUMENT_SEPARATOR: char = '|';

    /// The separator between the name and value of an argument.
    pub const VALUE_SEPARATOR: char = '=';

    /// Parses a list of `key=value` arguments.
    ///
    /// Arguments without a `=` are ignored, as are arguments whose trimmed key
    /// or value is empty. If a key appears more than once, the last one wins.
    /// The remaining values are then expanded with
    /// [`expand_tag_array`](Self::expand_tag_array), and any value which
    /// expanded to nothing is dropped too.
    ///
    /// Errors from `expander` are returned as-is.
    pub fn parse_args<I, S, E, C>(
        &self,
        args: I,
        expander: &E,
        context: &C,
    ) -> Result<ArgumentMap, E::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        E: MarkupExpander<C> + ?Sized,
        C: ?Sized,
    {
        let mut results = ArgumentMap::new();
        for arg in args {
            let arg = arg.as_ref();
            if let Some((name, value)) = arg.split_once(Self::VALUE_SEPARATOR) {
                results.insert(php::trim(name).to_owned(), php::trim(value).to_owned());
            } else {
                log::trace!("Skipping argument with no value: {arg:?}");
            }
        }

        // This happens after all arguments are collected so that an empty
        // duplicate also erases an earlier non-empty value
        results.retain(|name, value| {
            let keep = !name.is_empty() && !value.is_empty();
            if !keep {
                log::trace!("Skipping empty argument {name:?}={value:?}");
            }
            keep
        });

        let mut results = self.expand_tag_array(results, expander, context)?;
        results.retain(|_, value| !value.is_empty());
        log::debug!("Parsed {} tag arguments", results.len());
        Ok(results)
    }

    /// Parses the content of a `<seo>` tag.
    ///
    /// A self-closing tag has no content and produces no arguments. There is no
    /// way to escape a `|`, so a value can never contain one.
    pub fn parse_text<E, C>(
        &self,
        text: Option<&str>,
        expander: &E,
        context: &C,
    ) -> Result<ArgumentMap, E::Error>
    where
        E: MarkupExpander<C> + ?Sized,
        C: ?Sized,
    {
        let Some(text) = text else {
            return Ok(ArgumentMap::new());
        };

        self.parse_args(text.split(Self::ARGUMENT_SEPARATOR), expander, context)
    }

    /// Expands the markup in each value of `tags` and reduces it to plain text.
    pub fn expand_tag_array<E, C>(
        &self,
        mut tags: ArgumentMap,
        expander: &E,
        context: &C,
    ) -> Result<ArgumentMap, E::Error>
    where
        E: MarkupExpander<C> + ?Sized,
        C: ?Sized,
    {
        for value in tags.values_mut() {
            let expanded = expander.expand(value, context)?;
            *value = sanitize(&expanded);
        }

        Ok(tags)
    }
}

/// Converts expanded markup into trimmed plain text.
fn sanitize(expanded: &str) -> String {
    let text = php::strip_tags(expanded);
    let text = php::html_entity_decode(&text);
    php::trim(&text).to_owned()
}
