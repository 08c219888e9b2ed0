//! Markup expansion.
//!
//! Tag argument values may contain arbitrary Wikitext, and only the host
//! renderer knows how to expand it, so the host is injected as a
//! [`MarkupExpander`]. The parsing context (the current page, the template
//! frame, and so on) is owned by the host and is only ever borrowed here.
//!
//! [`ParameterExpander`] is a small stand-in for the host which only knows how
//! to substitute template parameters from a [`Frame`]. It is what the command
//! line tool uses.

use crate::php;
use indexmap::IndexMap;
use regex::Regex;
use std::{borrow::Cow, convert::Infallible, sync::LazyLock};

/// A markup expansion error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Expanding a template parameter recursed too deeply. This usually means
    /// an argument refers to itself.
    #[error("parameter '{name}' exceeded the expansion depth limit of {depth}")]
    DepthExceeded {
        /// The name of the parameter being expanded when the limit was hit.
        name: String,
        /// The depth limit.
        depth: usize,
    },
    /// Expanding a fragment produced more text than allowed.
    #[error("expanded text exceeded the size limit of {limit} bytes")]
    SizeExceeded {
        /// The size limit.
        limit: usize,
    },
}

/// Something which can fully expand a fragment of Wikitext within some parsing
/// context.
pub trait MarkupExpander<C: ?Sized> {
    /// The error returned when expansion fails.
    type Error;

    /// Recursively expands all markup in `fragment` using `context`, returning
    /// the final text.
    fn expand(&self, fragment: &str, context: &C) -> Result<String, Self::Error>;
}

impl<C, F, E> MarkupExpander<C> for F
where
    C: ?Sized,
    F: Fn(&str, &C) -> Result<String, E>,
{
    type Error = E;

    #[inline]
    fn expand(&self, fragment: &str, context: &C) -> Result<String, Self::Error> {
        self(fragment, context)
    }
}

/// An expander which returns every fragment unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Verbatim;

impl<C: ?Sized> MarkupExpander<C> for Verbatim {
    type Error = Infallible;

    #[inline]
    fn expand(&self, fragment: &str, _context: &C) -> Result<String, Self::Error> {
        Ok(fragment.to_owned())
    }
}

/// A template frame: the named arguments a template was called with.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Frame {
    /// The template arguments.
    arguments: IndexMap<String, String>,
}

impl Frame {
    /// Creates a new empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of the argument with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }

    /// Sets the value of an argument, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.arguments.insert(name.into(), value.into());
    }

    /// The number of arguments in the frame.
    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    /// Returns true if the frame has no arguments.
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Frame
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            arguments: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// An expander which substitutes `{{{name}}}` and `{{{name|default}}}`
/// template parameters from a [`Frame`].
///
/// Substituted text is expanded again, so arguments may refer to other
/// arguments. Parameters with no matching argument and no default are left
/// as-is, the same as in the host.
#[derive(Clone, Copy, Debug)]
pub struct ParameterExpander {
    /// The maximum number of nested substitutions.
    max_depth: usize,
    /// The maximum size of the text produced by any one expansion, in bytes.
    max_len: usize,
}

impl Default for ParameterExpander {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DEPTH)
    }
}

impl ParameterExpander {
    /// The default nesting limit, which is the host's default template depth
    /// limit.
    pub const DEFAULT_MAX_DEPTH: usize = 100;

    /// The default output size limit, which is the host's default include
    /// size limit.
    pub const DEFAULT_MAX_LEN: usize = 2 * 1024 * 1024;

    /// Creates a new expander which allows at most `max_depth` nested
    /// substitutions.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            max_len: Self::DEFAULT_MAX_LEN,
        }
    }

    /// Sets the maximum number of bytes any expansion may produce.
    #[must_use]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Expands all parameters in `text` which is at nesting level `depth`.
    fn expand_at<'a>(
        &self,
        text: &'a str,
        frame: &Frame,
        depth: usize,
    ) -> Result<Cow<'a, str>, Error> {
        static RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\{\{\{([^{}|]*)(?:\|([^{}]*))?\}\}\}").unwrap());

        let mut out = String::new();
        let mut flushed = 0;
        for capture in RE.captures_iter(text) {
            let name = php::trim(&capture[1]);
            let Some(value) = frame
                .get(name)
                .or_else(|| capture.get(2).map(|default| default.as_str()))
            else {
                continue;
            };

            if depth == self.max_depth {
                return Err(Error::DepthExceeded {
                    name: name.to_owned(),
                    depth,
                });
            }

            log::trace!("Expanding parameter '{name}' at depth {depth}");
            let value = self.expand_at(value, frame, depth + 1)?;
            let range = capture.get_match().range();
            out += &text[flushed..range.start];
            out += &value;
            flushed = range.end;

            // Nested results have already passed this check
            if out.len() > self.max_len {
                return Err(Error::SizeExceeded {
                    limit: self.max_len,
                });
            }
        }

        Ok(if flushed == 0 {
            Cow::Borrowed(text)
        } else {
            out += &text[flushed..];
            Cow::Owned(out)
        })
    }
}

impl MarkupExpander<Frame> for ParameterExpander {
    type Error = Error;

    fn expand(&self, fragment: &str, frame: &Frame) -> Result<String, Self::Error> {
        self.expand_at(fragment, frame, 0).map(Cow::into_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        [
            ("page", "Main Page"),
            ("site", "Example Wiki"),
            ("title", "{{{page}}} - {{{site}}}"),
            ("loop", "again {{{loop}}}"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_verbatim() {
        assert_eq!(
            Verbatim.expand("{{{page}}} <b>", &()).unwrap(),
            "{{{page}}} <b>"
        );
    }

    #[test]
    fn test_closure() {
        let upper = |fragment: &str, _: &()| Ok::<_, Infallible>(fragment.to_uppercase());
        assert_eq!(upper.expand("abc", &()).unwrap(), "ABC");
    }

    #[test]
    fn test_parameters() {
        let _ = env_logger::try_init();
        let expander = ParameterExpander::default();
        let frame = frame();
        assert_eq!(expander.expand("{{{page}}}", &frame).unwrap(), "Main Page");
        assert_eq!(expander.expand("{{{ page }}}!", &frame).unwrap(), "Main Page!");
        assert_eq!(
            expander.expand("{{{title}}}", &frame).unwrap(),
            "Main Page - Example Wiki"
        );
    }

    #[test]
    fn test_defaults() {
        let expander = ParameterExpander::default();
        let frame = frame();
        assert_eq!(
            expander.expand("{{{missing|fallback}}}", &frame).unwrap(),
            "fallback"
        );
        assert_eq!(expander.expand("[{{{missing|}}}]", &frame).unwrap(), "[]");
        assert_eq!(
            expander.expand("{{{page|fallback}}}", &frame).unwrap(),
            "Main Page"
        );
        // Defaults cannot contain parameters, so only the inner one is replaced
        assert_eq!(
            expander.expand("{{{missing|{{{page}}}}}}", &frame).unwrap(),
            "{{{missing|Main Page}}}"
        );
    }

    #[test]
    fn test_unknown_parameter_is_kept() {
        let expander = ParameterExpander::default();
        assert_eq!(
            expander.expand("a {{{missing}}} b", &frame()).unwrap(),
            "a {{{missing}}} b"
        );
    }

    #[test]
    fn test_depth_limit() {
        let expander = ParameterExpander::new(5);
        let err = expander.expand("{{{loop}}}", &frame()).unwrap_err();
        assert!(matches!(
            err,
            Error::DepthExceeded { ref name, depth: 5 } if name == "loop"
        ));

        let nested = ParameterExpander::new(1);
        assert!(nested.expand("{{{page}}}", &frame()).is_ok());
        assert!(nested.expand("{{{title}}}", &frame()).is_err());
    }

    #[test]
    fn test_size_limit() {
        let mut frame: Frame = (0..40)
            .map(|level| {
                let next = format!("{{{{{{p{}}}}}}}", level + 1);
                (format!("p{level}"), next.repeat(2))
            })
            .collect();
        frame.insert("p40", "abcdefgh");

        let err = ParameterExpander::default()
            .expand("{{{p0}}}", &frame)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SizeExceeded {
                limit: ParameterExpander::DEFAULT_MAX_LEN
            }
        ));

        let small = ParameterExpander::default().with_max_len(16);
        assert_eq!(small.expand("{{{p39}}}", &frame).unwrap(), "abcdefghabcdefgh");
        assert!(small.expand("{{{p38}}}", &frame).is_err());
    }

    #[test]
    fn test_frame_from_json() {
        let frame: Frame = serde_json::from_str(r#"{"page": "Main Page"}"#).unwrap();
        assert_eq!(frame.get("page"), Some("Main Page"));
        assert_eq!(frame.len(), 1);
        assert!(!frame.is_empty());
        assert!(Frame::new().is_empty());
    }
}
