//! Quote-aware splitting of a command line into segments.

use std::borrow::Cow;

/// Split `command` on `;`, `&&`, `||`, `|`, `&` and newlines that occur
/// outside single or double quotes.
///
/// Segments are trimmed; empty segments are dropped. This is a loose
/// tokenizer, not a shell grammar: it only has to keep quoted separators
/// from creating bogus segments.
pub(crate) fn split_segments(command: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    let mut chars = command.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some('"') | None, '\\') => escaped = true,
            (Some(_), _) => {},
            (None, '\'' | '"') => quote = Some(ch),
            (None, ';' | '\n' | '|' | '&') => {
                push_segment(&mut segments, &command[start..idx]);
                let mut end = idx.saturating_add(ch.len_utf8());
                // `&&` and `||` are one separator.
                if matches!(ch, '|' | '&')
                    && let Some(&(next_idx, next)) = chars.peek()
                    && next == ch
                {
                    chars.next();
                    end = next_idx.saturating_add(next.len_utf8());
                }
                start = end;
            },
            (None, _) => {},
        }
    }
    push_segment(&mut segments, &command[start..]);
    segments
}

fn push_segment<'a>(segments: &mut Vec<&'a str>, raw: &'a str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed);
    }
}

/// Canonical spelling of a segment for matching.
///
/// Shell quotes and backslash escapes are removed, whitespace is collapsed,
/// and every word containing `/` is reduced lexically, so `"/"`, `'/'`,
/// `//`, `/.` and `/tmp/..` all read as `/`.
pub(crate) fn normalize_segment(segment: &str) -> String {
    let mut unquoted = String::with_capacity(segment.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in segment.chars() {
        if escaped {
            unquoted.push(ch);
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some('"') | None, '\\') => escaped = true,
            (None, '\'' | '"') => quote = Some(ch),
            _ => unquoted.push(ch),
        }
    }
    unquoted
        .split_whitespace()
        .map(normalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_word(word: &str) -> Cow<'_, str> {
    if !word.contains('/') {
        return Cow::Borrowed(word);
    }
    let absolute = word.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in word.split('/') {
        match part {
            "" | "." => {},
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            },
            _ => parts.push(part),
        }
    }
    let joined = parts.join("/");
    if absolute {
        Cow::Owned(format!("/{joined}"))
    } else if joined.is_empty() {
        Cow::Borrowed(".")
    } else {
        Cow::Owned(joined)
    }
}
