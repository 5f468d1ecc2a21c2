//! Construct recognition.
//!
//! Finds the next wiki construct in a fragment of text. The leftmost construct
//! wins; at the same position the priority is comment, heading, scoped
//! function, standard function, instruction function, link, emoji, style.

use std::cell::{Cell, OnceCell};
use std::collections::HashMap;
use std::ops::Range;

use crate::prototype::{FunctionKind, is_valid_name, matching_paren};

/// Style delimiters recognized by the scanner.
pub(crate) const STYLE_DELIMITERS: [char; 6] = ['~', '*', '_', '/', '!', '^'];

/// How plain text of a fragment is treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Author markup: plain text is escaped.
    Source,
    /// Handler output: plain text is trusted HTML and tags are opaque.
    Emitted,
}

/// A recognized construct.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Construct<'s> {
    /// `;;` comment line.
    Comment,
    /// `==Title` heading; `body` is the heading text.
    Heading { level: usize, body: Range<usize> },
    /// `{{Name(args) body }}`; `opener` and `closer` are the literal
    /// delimiting ranges around `body`.
    Scoped {
        name: &'s str,
        args: &'s str,
        opener: Range<usize>,
        body: Range<usize>,
        closer: Range<usize>,
    },
    /// `##Name(args)` or `@@Name(args)`.
    Function {
        kind: FunctionKind,
        name: &'s str,
        args: &'s str,
    },
    /// `[[target|label]]`.
    Link {
        target: &'s str,
        label: Option<&'s str>,
    },
    /// `%key%` or `%key,scale%`.
    Emoji { key: &'s str, scale: Option<&'s str> },
    /// `*body*` and the other style delimiters.
    Style { delimiter: char, body: Range<usize> },
    /// An opener without its closer.
    Malformed {
        construct: &'static str,
        message: &'static str,
    },
}

impl Construct<'_> {
    /// Short name used in logs.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Heading { .. } => "heading",
            Self::Scoped { .. } => "scoped function",
            Self::Function {
                kind: FunctionKind::Instruction,
                ..
            } => "instruction function",
            Self::Function { .. } => "standard function",
            Self::Link { .. } => "link",
            Self::Emoji { .. } => "emoji",
            Self::Style { .. } => "style",
            Self::Malformed { construct, .. } => *construct,
        }
    }
}

/// A construct and the source range it covers.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Found<'s> {
    pub start: usize,
    pub end: usize,
    pub construct: Construct<'s>,
}

/// Scanner over one fragment.
pub(crate) struct Scanner<'s> {
    input: &'s str,
    mode: Mode,
    /// Whether offset 0 of the fragment begins a line.
    line_start: bool,
    /// Per style delimiter, a `(from, line_end)` span holding no closer.
    unclosed_styles: [Cell<Option<(usize, usize)>>; STYLE_DELIMITERS.len()],
    /// A `(from, line_end)` span holding no `]]`.
    unclosed_link: Cell<Option<(usize, usize)>>,
    /// `{{` offset to the offset of its `}}`.
    scope_closers: OnceCell<HashMap<usize, usize>>,
}

impl<'s> Scanner<'s> {
    pub(crate) fn new(input: &'s str, mode: Mode, line_start: bool) -> Self {
        Self {
            input,
            mode,
            line_start,
            unclosed_styles: Default::default(),
            unclosed_link: Cell::new(None),
            scope_closers: OnceCell::new(),
        }
    }

    /// Find the first construct starting at or after `from`.
    pub(crate) fn next(&self, from: usize) -> Option<Found<'s>> {
        let bytes = self.input.as_bytes();
        let mut i = from;

        while i < bytes.len() {
            if self.mode == Mode::Emitted
                && bytes[i] == b'<'
                && let Some(close) = self.input[i..].find('>')
            {
                i += close + 1;
                continue;
            }

            if let Some(found) = self.recognize(i) {
                return Some(found);
            }

            i += self.input[i..].chars().next().map_or(1, char::len_utf8);
        }

        None
    }

    fn is_line_start(&self, i: usize) -> bool {
        if i == 0 {
            self.line_start
        } else {
            self.input.as_bytes()[i - 1] == b'\n'
        }
    }

    fn recognize(&self, i: usize) -> Option<Found<'s>> {
        let rest = &self.input[i..];
        let first = rest.as_bytes()[0];

        if self.is_line_start(i) {
            if let Some(found) = self.comment(i) {
                return Some(found);
            }
            if first == b'='
                && let Some(found) = self.heading(i)
            {
                return Some(found);
            }
        }

        match first {
            b'{' if rest.starts_with("{{") => self.scoped(i),
            b'#' if rest.starts_with("##") => self.function(i, FunctionKind::Standard),
            b'@' if rest.starts_with("@@") => self.function(i, FunctionKind::Instruction),
            b'[' if rest.starts_with("[[") => self.link(i),
            b'%' => self.emoji(i),
            _ => self.style(i),
        }
    }

    fn line_end(&self, i: usize) -> usize {
        self.input[i..].find('\n').map_or(self.input.len(), |n| i + n)
    }

    fn comment(&self, i: usize) -> Option<Found<'s>> {
        let end = self.line_end(i);
        let line = &self.input[i..end];
        let blanks = line.len() - line.trim_start_matches([' ', '\t']).len();
        if !line[blanks..].starts_with(";;") {
            return None;
        }
        // Keep a `\r` of a CRLF terminator out of the span so truncation sees it.
        let end = if line.ends_with('\r') { end - 1 } else { end };
        Some(Found {
            start: i,
            end,
            construct: Construct::Comment,
        })
    }

    fn heading(&self, i: usize) -> Option<Found<'s>> {
        let end = self.line_end(i);
        let line = self.input[i..end].trim_end_matches('\r');
        let level = line.bytes().take_while(|&b| b == b'=').count();
        if !(2..=6).contains(&level) {
            return None;
        }

        let text = &line[level..];
        let leading = text.len() - text.trim_start().len();
        let trimmed = text.trim().trim_end_matches('=').trim_end();
        if trimmed.is_empty() {
            return None;
        }

        let body_start = i + level + leading;
        Some(Found {
            start: i,
            end: i + line.len(),
            construct: Construct::Heading {
                level,
                body: body_start..body_start + trimmed.len(),
            },
        })
    }

    fn call_name(&self, name_start: usize) -> Option<(&'s str, usize)> {
        let rest = &self.input[name_start..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let name = &rest[..len];
        is_valid_name(name).then_some((name, name_start + len))
    }

    /// Parse an optional `(args)` group at `pos`.
    ///
    /// Returns `Ok((args, end))`, or `Err(())` when a `(` is never closed.
    fn call_args(&self, pos: usize) -> Result<(&'s str, usize), ()> {
        let rest = &self.input[pos..];
        if !rest.starts_with('(') {
            return Ok(("", pos));
        }
        let close = matching_paren(rest).ok_or(())?;
        Ok((&rest[1..close], pos + close + 1))
    }

    fn function(&self, i: usize, kind: FunctionKind) -> Option<Found<'s>> {
        let (name, name_end) = self.call_name(i + 2)?;
        match self.call_args(name_end) {
            Ok((args, end)) => Some(Found {
                start: i,
                end,
                construct: Construct::Function { kind, name, args },
            }),
            Err(()) => Some(Found {
                start: i,
                end: name_end + 1,
                construct: Construct::Malformed {
                    construct: "function call",
                    message: "missing closing parenthesis",
                },
            }),
        }
    }

    fn scoped(&self, i: usize) -> Option<Found<'s>> {
        let (name, name_end) = self.call_name(i + 2)?;
        let (args, opener_end) = match self.call_args(name_end) {
            Ok(parsed) => parsed,
            Err(()) => {
                return Some(Found {
                    start: i,
                    end: name_end + 1,
                    construct: Construct::Malformed {
                        construct: "scoped function",
                        message: "missing closing parenthesis",
                    },
                });
            }
        };

        let Some(closer_start) = self.scope_closer(i).filter(|&c| c >= opener_end) else {
            return Some(Found {
                start: i,
                end: opener_end,
                construct: Construct::Malformed {
                    construct: "scoped function",
                    message: "missing closing }}",
                },
            });
        };

        let raw_body = &self.input[opener_end..closer_start];
        let lead = leading_break(raw_body);
        let trail = trailing_break(&raw_body[lead..]);
        let body = opener_end + lead..closer_start - trail;

        Some(Found {
            start: i,
            end: closer_start + 2,
            construct: Construct::Scoped {
                name,
                args,
                opener: i..body.start,
                closer: body.end..closer_start + 2,
                body,
            },
        })
    }

    /// Closing `}}` of the scope opened at `opener`.
    fn scope_closer(&self, opener: usize) -> Option<usize> {
        self.scope_closers
            .get_or_init(|| self.pair_scopes())
            .get(&opener)
            .copied()
    }

    /// Pair every `{{` with its `}}` in one pass over the fragment.
    ///
    /// A run of `{` pairs up from its end, so `{{{Name` opens at the second
    /// brace. Arguments of a call are skipped. Unmatched `}}` are ignored.
    fn pair_scopes(&self) -> HashMap<usize, usize> {
        let bytes = self.input.as_bytes();
        let mut open = Vec::new();
        let mut pairs = HashMap::new();
        let mut j = 0;

        while j < bytes.len() {
            match bytes[j] {
                b'{' => {
                    let run = bytes[j..].iter().take_while(|&&b| b == b'{').count();
                    let run_end = j + run;
                    open.extend((j + run % 2..run_end).step_by(2));
                    j = run_end;
                    if run >= 2
                        && let Some((_, name_end)) = self.call_name(run_end)
                        && let Ok((_, opener_end)) = self.call_args(name_end)
                    {
                        j = opener_end;
                    }
                }
                b'}' if bytes.get(j + 1) == Some(&b'}') => {
                    if let Some(start) = open.pop() {
                        pairs.insert(start, j);
                    }
                    j += 2;
                }
                _ => j += 1,
            }
        }

        pairs
    }

    fn link(&self, i: usize) -> Option<Found<'s>> {
        let search_from = i + 2;
        let close = if known_unclosed(&self.unclosed_link, search_from) {
            None
        } else {
            let line_end = self.line_end(search_from);
            let close = self.input[search_from..line_end].find("]]");
            if close.is_none() {
                self.unclosed_link.set(Some((search_from, line_end)));
            }
            close
        };
        let Some(close) = close else {
            return Some(Found {
                start: i,
                end: i + 2,
                construct: Construct::Malformed {
                    construct: "link",
                    message: "missing closing ]]",
                },
            });
        };

        let inner = &self.input[i + 2..i + 2 + close];
        let (target, label) = match inner.split_once('|') {
            Some((target, label)) => {
                let label = label.trim();
                (target.trim(), (!label.is_empty()).then_some(label))
            }
            None => (inner.trim(), None),
        };

        Some(Found {
            start: i,
            end: i + 2 + close + 2,
            construct: Construct::Link { target, label },
        })
    }

    fn emoji(&self, i: usize) -> Option<Found<'s>> {
        let rest = &self.input[i + 1..];
        if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        let key_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')))
            .unwrap_or(rest.len());
        let key = &rest[..key_len];
        let after = &rest[key_len..];

        let (scale, consumed) = if let Some(scale_text) = after.strip_prefix(',') {
            let digits = scale_text.strip_prefix('-').unwrap_or(scale_text);
            let digit_len = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            if digit_len == 0 {
                return None;
            }
            let scale_len = scale_text.len() - digits.len() + digit_len;
            (Some(&scale_text[..scale_len]), 1 + scale_len)
        } else {
            (None, 0)
        };

        if !after[consumed..].starts_with('%') {
            return None;
        }

        Some(Found {
            start: i,
            end: i + 1 + key_len + consumed + 1,
            construct: Construct::Emoji { key, scale },
        })
    }

    fn style(&self, i: usize) -> Option<Found<'s>> {
        let delimiter = self.input[i..].chars().next()?;
        if !STYLE_DELIMITERS.contains(&delimiter) {
            return None;
        }

        // `a*b`, `https://` and doubled delimiters never open a span.
        if self.input[..i]
            .chars()
            .next_back()
            .is_some_and(|p| p.is_alphanumeric() || p == ':' || p == delimiter)
        {
            return None;
        }
        let body_start = i + 1;
        let next = self.input[body_start..].chars().next()?;
        if next.is_whitespace() || next == delimiter {
            return None;
        }

        let close = self.style_closer(delimiter, body_start)?;
        Some(Found {
            start: i,
            end: close + 1,
            construct: Construct::Style {
                delimiter,
                body: body_start..close,
            },
        })
    }

    /// First `delimiter` on the line after a non-empty body, preceded by
    /// non-whitespace and not followed by an alphanumeric.
    fn style_closer(&self, delimiter: char, body_start: usize) -> Option<usize> {
        let slot = STYLE_DELIMITERS.iter().position(|&d| d == delimiter)?;
        let unclosed = &self.unclosed_styles[slot];
        // A later opener on the same line sees a subset of the same candidates.
        if known_unclosed(unclosed, body_start) {
            return None;
        }
        let line_end = self.line_end(body_start);
        let mut prev: Option<char> = None;
        let mut j = body_start;

        while j < line_end {
            let rest = &self.input[j..line_end];
            if self.mode == Mode::Emitted
                && rest.starts_with('<')
                && let Some(close) = rest.find('>')
            {
                j += close + 1;
                prev = Some('>');
                continue;
            }

            let c = rest.chars().next()?;
            if c == delimiter
                && j > body_start
                && prev.is_some_and(|p| !p.is_whitespace())
                && !rest[1..].chars().next().is_some_and(char::is_alphanumeric)
            {
                return Some(j);
            }
            prev = Some(c);
            j += c.len_utf8();
        }

        unclosed.set(Some((body_start, line_end)));
        None
    }
}

fn known_unclosed(span: &Cell<Option<(usize, usize)>>, pos: usize) -> bool {
    span.get()
        .is_some_and(|(from, line_end)| from <= pos && pos <= line_end)
}

/// Length of a single leading line break (or space) to strip from a body.
fn leading_break(body: &str) -> usize {
    if body.starts_with("\r\n") {
        2
    } else if body.starts_with(['\n', ' ']) {
        1
    } else {
        0
    }
}

/// Length of a single trailing line break (or space) to strip from a body.
fn trailing_break(body: &str) -> usize {
    if body.ends_with("\r\n") {
        2
    } else if body.ends_with(['\n', ' ']) {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn first(input: &str) -> Option<Found<'_>> {
        Scanner::new(input, Mode::Source, true).next(0)
    }

    fn all(input: &str, mode: Mode) -> Vec<(usize, usize)> {
        let scanner = Scanner::new(input, mode, true);
        let mut spans = Vec::new();
        let mut pos = 0;
        while let Some(found) = scanner.next(pos) {
            spans.push((found.start, found.end));
            pos = found.end;
        }
        spans
    }

    #[test]
    fn test_plain_text_has_no_constructs() {
        assert_eq!(first("just some text, 3 * 4 = 12"), None);
        assert_eq!(first("snake_case_name and a/b"), None);
    }

    #[test]
    fn test_comment_at_line_start_only() {
        let found = first("  ;; note\nnext").unwrap();
        assert_eq!((found.start, found.end), (0, 9));
        assert_eq!(found.construct, Construct::Comment);

        assert_eq!(first("text ;; not a comment"), None);
    }

    #[test]
    fn test_comment_not_at_fragment_start_without_line_start() {
        let scanner = Scanner::new(";;x", Mode::Source, false);
        assert_eq!(scanner.next(0), None);
    }

    #[test]
    fn test_comment_crlf_terminator_left_outside() {
        let found = first(";; x\r\nnext").unwrap();
        assert_eq!(found.end, 4);
    }

    #[test]
    fn test_heading() {
        let input = "=== Getting Started ===\nbody";
        let found = first(input).unwrap();
        assert_eq!(found.end, 23);
        let Construct::Heading { level, body } = found.construct else {
            panic!("expected heading");
        };
        assert_eq!(level, 3);
        assert_eq!(&input[body], "Getting Started");
    }

    #[test]
    fn test_heading_rejects_single_and_seven() {
        assert_eq!(first("= one"), None);
        assert_eq!(first("======= seven"), None);
        assert_eq!(first("=="), None);
    }

    #[test]
    fn test_standard_function_with_args() {
        let found = first("see ##Image(logo.png, 50) here").unwrap();
        assert_eq!((found.start, found.end), (4, 25));
        assert_eq!(
            found.construct,
            Construct::Function {
                kind: FunctionKind::Standard,
                name: "Image",
                args: "logo.png, 50",
            }
        );
    }

    #[test]
    fn test_function_without_parens() {
        let found = first("@@Draft\n").unwrap();
        assert_eq!(found.end, 7);
        assert_eq!(
            found.construct,
            Construct::Function {
                kind: FunctionKind::Instruction,
                name: "Draft",
                args: "",
            }
        );
    }

    #[test]
    fn test_function_unclosed_paren_is_malformed() {
        let found = first("##Image(logo.png").unwrap();
        assert_eq!(found.end, 8);
        assert!(matches!(found.construct, Construct::Malformed { .. }));
    }

    #[test]
    fn test_function_requires_name() {
        assert_eq!(first("C## and ##9"), None);
    }

    #[test]
    fn test_scoped_body_strips_single_line_breaks() {
        let input = "{{Code(rust)\nfn main() {}\n}}";
        let found = first(input).unwrap();
        let Construct::Scoped {
            name,
            args,
            opener,
            body,
            closer,
        } = found.construct
        else {
            panic!("expected scoped");
        };
        assert_eq!(name, "Code");
        assert_eq!(args, "rust");
        assert_eq!(&input[opener], "{{Code(rust)\n");
        assert_eq!(&input[body], "fn main() {}");
        assert_eq!(&input[closer], "\n}}");
        assert_eq!(found.end, input.len());
    }

    #[test]
    fn test_scoped_nesting() {
        let input = "{{Collapse {{Code x}} tail}} after";
        let found = first(input).unwrap();
        assert_eq!(&input[found.start..found.end], "{{Collapse {{Code x}} tail}}");
    }

    #[test]
    fn test_scoped_unclosed_is_malformed() {
        let found = first("{{Collapse(Title) body").unwrap();
        assert_eq!(found.end, 17);
        assert!(matches!(
            found.construct,
            Construct::Malformed {
                message: "missing closing }}",
                ..
            }
        ));
    }

    #[test]
    fn test_link() {
        let found = first("[[Home Page | Home]]").unwrap();
        assert_eq!(
            found.construct,
            Construct::Link {
                target: "Home Page",
                label: Some("Home"),
            }
        );
    }

    #[test]
    fn test_link_must_close_on_same_line() {
        let found = first("[[Home\n]]").unwrap();
        assert_eq!(found.end, 2);
        assert!(matches!(found.construct, Construct::Malformed { .. }));
    }

    #[test]
    fn test_emoji() {
        assert_eq!(
            first("%smile%").unwrap().construct,
            Construct::Emoji {
                key: "smile",
                scale: None,
            }
        );
        assert_eq!(
            first("%thumbs-up,-5%").unwrap().construct,
            Construct::Emoji {
                key: "thumbs-up",
                scale: Some("-5"),
            }
        );
        assert_eq!(first("50% and 60%"), None);
        assert_eq!(first("%smile,big%"), None);
    }

    #[test]
    fn test_emoji_key_starts_with_letter() {
        assert_eq!(first("ratio 10%-20% ok"), None);
        assert_eq!(first("from 5%+1% up"), None);
        assert_eq!(first("a %_x% b"), None);
        assert_eq!(
            first("%x-1%").unwrap().construct,
            Construct::Emoji {
                key: "x-1",
                scale: None,
            }
        );
    }

    #[test]
    fn test_style_nested_outer_first() {
        let input = "*~bold strike~*";
        let found = first(input).unwrap();
        assert_eq!((found.start, found.end), (0, input.len()));
        let Construct::Style { delimiter, body } = found.construct else {
            panic!("expected style");
        };
        assert_eq!(delimiter, '*');
        assert_eq!(&input[body], "~bold strike~");
    }

    #[test]
    fn test_style_closer_rules() {
        assert_eq!(all("*a* and *b*", Mode::Source), vec![(0, 3), (8, 11)]);
        assert_eq!(first("* not bold*"), None);
        assert_eq!(first("*unclosed"), None);
        assert_eq!(first("*a*b"), None);
        assert_eq!(first("**"), None);
    }

    #[test]
    fn test_style_ignores_urls_and_doubled_delimiters() {
        assert_eq!(first("see https://example.com/docs/ now"), None);
        assert_eq!(first("file:///tmp/a/ x"), None);
        assert_eq!(first("**not bold**"), None);
        assert_eq!(all("a/b and /c/", Mode::Source), vec![(8, 11)]);
    }

    #[test]
    fn test_style_unclosed_openers_share_one_line_scan() {
        let input = "*a ".repeat(4) + "\n*b*";
        assert_eq!(all(&input, Mode::Source), vec![(13, 16)]);

        let scanner = Scanner::new("*a *b *c", Mode::Source, true);
        assert_eq!(scanner.next(0), None);
        assert_eq!(scanner.unclosed_styles[1].get(), Some((1, 8)));
    }

    #[test]
    fn test_scoped_pairs_skip_call_arguments() {
        let input = "{{Outer({{x) body {{Inner y}} end}}";
        let found = first(input).unwrap();
        assert_eq!((found.start, found.end), (0, input.len()));

        let found = first("{{{Code x}}}").unwrap();
        assert_eq!((found.start, found.end), (1, 11));
    }

    #[test]
    fn test_link_unclosed_openers_share_one_line_scan() {
        let input = "[[a [[b\n[[c]]";
        assert_eq!(all(input, Mode::Source), vec![(0, 2), (4, 6), (8, 13)]);
    }

    #[test]
    fn test_style_does_not_cross_lines() {
        assert_eq!(first("*one\ntwo*"), None);
    }

    #[test]
    fn test_priority_at_same_position() {
        assert!(matches!(
            first(";;*x*").unwrap().construct,
            Construct::Comment
        ));
        assert!(matches!(
            first("{{Code x}}").unwrap().construct,
            Construct::Scoped { .. }
        ));
    }

    #[test]
    fn test_emitted_mode_skips_tags() {
        let input = r#"<a href="/x/*y*">*z*</a>"#;
        assert_eq!(all(input, Mode::Emitted), vec![(16, 19)]);
    }

    #[test]
    fn test_source_mode_does_not_skip_tags() {
        assert_eq!(all("<b>*z*</b>", Mode::Source), vec![(3, 6)]);
    }
}
