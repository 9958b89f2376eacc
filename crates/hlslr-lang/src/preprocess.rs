//! Comment and directive stripping.
//!
//! The grammar has no notion of comments or preprocessor lines, so both are
//! overwritten with spaces before parsing. Newlines are left in place, which
//! keeps every byte offset and line number of the original file valid for
//! diagnostics.

/// Directive lines in the order they appeared, each starting with `#`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinesContext {
    pub lines: Vec<String>,
}

impl DefinesContext {
    /// The `#define` lines, verbatim.
    pub fn defines(&self) -> impl Iterator<Item = &str> + '_ {
        self.lines
            .iter()
            .map(String::as_str)
            .filter(|line| directive_name(line) == Some("define"))
    }

    /// `#undef NAME` for every `#define NAME ...`, in the same order.
    pub fn undefs(&self) -> Vec<String> {
        self.defines()
            .filter_map(|line| {
                let rest = line.trim_start_matches('#').trim_start();
                let rest = rest.strip_prefix("define")?.trim_start();
                let name: String = rest
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                (!name.is_empty()).then(|| format!("#undef {name}"))
            })
            .collect()
    }
}

fn directive_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('#')?.trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Text ready for the parser plus the directives taken out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub text: String,
    pub defines: DefinesContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
}

pub fn preprocess(source: &str) -> Preprocessed {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut lines = Vec::new();
    let mut state = State::Code;
    let mut directive: Option<Vec<u8>> = None;
    let mut line_blank = true;

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            State::LineComment if b != b'\n' => {
                out[i] = b' ';
                i += 1;
                continue;
            }
            State::LineComment => state = State::Code,
            State::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    out[i] = b' ';
                    out[i + 1] = b' ';
                    state = State::Code;
                    if let Some(text) = directive.as_mut() {
                        text.push(b' ');
                    }
                    i += 2;
                } else {
                    if b == b'\n' {
                        line_blank = true;
                    } else {
                        out[i] = b' ';
                    }
                    i += 1;
                }
                continue;
            }
            State::Code => {}
        }

        if b == b'/' && next == Some(b'/') {
            state = State::LineComment;
            out[i] = b' ';
            out[i + 1] = b' ';
            i += 2;
            continue;
        }
        if b == b'/' && next == Some(b'*') {
            state = State::BlockComment;
            out[i] = b' ';
            out[i + 1] = b' ';
            i += 2;
            continue;
        }

        if b == b'\n' {
            if let Some(text) = directive.as_mut() {
                if continues(text) {
                    text.push(b'\n');
                } else if let Some(done) = directive.take() {
                    lines.push(finish(done));
                }
            }
            line_blank = true;
        } else if let Some(text) = directive.as_mut() {
            text.push(b);
            out[i] = b' ';
        } else if b == b'#' && line_blank {
            directive = Some(vec![b'#']);
            out[i] = b' ';
        } else if !b.is_ascii_whitespace() {
            line_blank = false;
        }
        i += 1;
    }
    if let Some(done) = directive.take() {
        lines.push(finish(done));
    }

    Preprocessed {
        text: String::from_utf8_lossy(&out).into_owned(),
        defines: DefinesContext { lines },
    }
}

/// A directive continues when its line ends in a backslash.
fn continues(text: &[u8]) -> bool {
    let trimmed = match text.last() {
        Some(b'\r') => &text[..text.len() - 1],
        _ => text,
    };
    trimmed.last() == Some(&b'\\')
}

fn finish(text: Vec<u8>) -> String {
    String::from_utf8_lossy(&text).trim_end().to_string()
}
