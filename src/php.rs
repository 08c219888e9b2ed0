//! PHP compatible string functions.
//!
//! Tag arguments are sanitized the same way the SEO extension does it in the
//! host, so these follow PHP semantics rather than Rust or HTML5 semantics
//! wherever the two disagree.

use html_escape::NAMED_ENTITIES;
use std::borrow::Cow;

/// The characters removed by [`trim`](https://php.net/trim) when no character
/// list is given.
const TRIM_CHARS: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

/// Strips whitespace from both ends of a string like
/// [`trim`](https://php.net/trim).
///
/// Unlike [`str::trim`], this only strips ASCII whitespace (plus `NUL` and
/// vertical tab), so e.g. a non-breaking space is content.
#[inline]
pub fn trim(text: &str) -> &str {
    text.trim_matches(TRIM_CHARS)
}

/// Returns true if `b` is whitespace according to C `isspace`.
#[inline]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0B' | b'\x0C')
}

/// The scanner state of [`strip_tags`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TagState {
    /// Plain text, which is kept.
    Text,
    /// Inside an HTML tag.
    Tag {
        /// The number of unbalanced `<` seen since the tag started.
        depth: usize,
        /// The currently open attribute quote character, if any.
        quote: Option<u8>,
    },
    /// Inside an HTML comment.
    Comment,
    /// Inside a `<?…?>` processing instruction.
    Instruction,
}

/// Removes HTML tags, comments, and processing instructions from the input like
/// [`strip_tags`](https://php.net/strip_tags).
///
/// A `<` followed by whitespace is not a tag, and does not nest inside one.
/// Quotes inside a tag cannot be escaped. A tag, comment, or instruction which
/// is never closed consumes the rest of the input.
pub fn strip_tags(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let Some(first) = memchr::memchr(b'<', bytes) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len());
    let mut state = TagState::Text;
    let mut flushed = 0;
    let mut index = first;
    while index < bytes.len() {
        let b = bytes[index];
        let rest = &bytes[index..];
        let next_is_space = bytes.get(index + 1).copied().is_some_and(is_space);
        match state {
            TagState::Text => {
                if b == b'<' && !next_is_space {
                    out += &text[flushed..index];
                    state = if rest.starts_with(b"<!--") {
                        index += "<!-".len();
                        TagState::Comment
                    } else if bytes.get(index + 1) == Some(&b'?') {
                        index += "<".len();
                        TagState::Instruction
                    } else {
                        TagState::Tag {
                            depth: 1,
                            quote: None,
                        }
                    };
                }
            }
            TagState::Tag {
                depth,
                quote: Some(quote),
            } => {
                if b == quote {
                    state = TagState::Tag { depth, quote: None };
                }
            }
            TagState::Tag { depth, quote: None } => match b {
                b'"' | b'\'' => {
                    state = TagState::Tag {
                        depth,
                        quote: Some(b),
                    };
                }
                b'<' if !next_is_space => {
                    state = TagState::Tag {
                        depth: depth + 1,
                        quote: None,
                    };
                }
                b'>' if depth == 1 => {
                    state = TagState::Text;
                    flushed = index + 1;
                }
                b'>' => {
                    state = TagState::Tag {
                        depth: depth - 1,
                        quote: None,
                    };
                }
                _ => {}
            },
            TagState::Comment => {
                if rest.starts_with(b"-->") {
                    index += "--".len();
                    state = TagState::Text;
                    flushed = index + 1;
                }
            }
            TagState::Instruction => {
                if rest.starts_with(b"?>") {
                    index += "?".len();
                    state = TagState::Text;
                    flushed = index + 1;
                }
            }
        }
        index += 1;
    }

    if state == TagState::Text {
        out += &text[flushed..];
    }

    Cow::Owned(out)
}

/// Returns true if a numeric character reference to `c` is decoded by
/// `html_entity_decode` in its default HTML 4.01 document mode.
fn is_allowed_code_point(c: u32) -> bool {
    matches!(c, 0x09 | 0x0a | 0x0d | 0x20..=0x7e | 0xa0..=0xd7ff)
        || (matches!(c, 0xe000..=0x10_ffff)
            && (c & 0xffff) < 0xfffe
            && !matches!(c, 0xfdd0..=0xfdef))
}

/// Decodes the body of a numeric character reference (the part between `&#`
/// and `;`).
fn decode_numeric(number: &str) -> Option<char> {
    let (digits, radix) = if let Some(digits) = number.strip_prefix(['x', 'X']) {
        (digits, 16)
    } else {
        (number, 10)
    };

    // `from_str_radix` would also accept a leading sign
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    u32::from_str_radix(digits, radix)
        .ok()
        .filter(|c| is_allowed_code_point(*c))
        .and_then(char::from_u32)
}

/// Decodes named and numeric HTML character references like
/// [`html_entity_decode`](https://php.net/html_entity_decode).
///
/// References must be terminated by `;`. Unknown names and disallowed code
/// points are left as-is.
pub fn html_entity_decode(text: &str) -> Cow<'_, str> {
    const MAX_LEN: usize = {
        let mut max = 0;
        let mut entities = NAMED_ENTITIES.as_slice();
        while let [(name, _), rest @ ..] = entities {
            if name.len() > max {
                max = name.len();
            }
            entities = rest;
        }

        max + b";".len()
    };

    let bytes = text.as_bytes();
    let entity_ranges = memchr::memchr_iter(b'&', bytes).filter_map(|start| {
        let next = start + "&".len();
        memchr::memchr(b';', &bytes[next..(next + MAX_LEN).min(bytes.len())])
            .map(|len| start..(next + len + b";".len()))
    });

    let mut flushed = 0;
    let mut out = String::new();
    for range in entity_ranges {
        let mut char = [0; 4];
        let name = &text[range.start + 1..range.end - 1];
        let value = if let Some(number) = name.strip_prefix('#') {
            decode_numeric(number).map(|c| &*c.encode_utf8(&mut char))
        } else {
            NAMED_ENTITIES
                .binary_search_by(|(t_name, _)| t_name.cmp(&name.as_bytes()))
                .ok()
                .map(|index| NAMED_ENTITIES[index].1)
        };
        if let Some(value) = value {
            out += &text[flushed..range.start];
            out += value;
            flushed = range.end;
        }
    }

    if flushed != 0 {
        out += &text[flushed..];
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}
