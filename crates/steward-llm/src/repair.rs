//! Deterministic JSON syntax repair
//!
//! Models regularly emit argument payloads that are almost JSON: cut off
//! mid-object, single-quoted, with trailing commas or Python literals.
//! [`repair_json`] fixes what can be fixed without guessing at content.
//! Anything it cannot fix is left for the LLM round trip in
//! [`crate::JsonFixer`].

/// Repair common syntax damage in a JSON document
///
/// The pass:
/// - skips any prose before the first `{` or `[` and after the matching close,
/// - turns single-quoted strings into double-quoted ones,
/// - quotes bare keys and bare words, mapping `True`/`False`/`None` to JSON literals,
/// - completes a literal cut off at the end of input (`tru` becomes `true`),
/// - drops `//` line comments between tokens,
/// - removes trailing commas and inserts missing commas and colons,
/// - fills a dangling `"key"` or `"key":` with `null`,
/// - closes an unterminated string and any unbalanced brackets, innermost first.
///
/// Returns an empty string when the input contains no object or array.
/// The result is not guaranteed to parse.
///
/// # Example
///
/// ```
/// use steward_llm::repair::repair_json;
///
/// assert_eq!(repair_json(r#"{"a": 1,}"#), r#"{"a": 1}"#);
/// assert_eq!(repair_json(r#"{'on': True, "data": {"#), r#"{"on": true, "data": {}}"#);
/// assert_eq!(repair_json(r#"{"a": 1, "b"#), r#"{"a": 1, "b": null}"#);
/// assert_eq!(repair_json("no json here"), "");
/// ```
pub fn repair_json(input: &str) -> String {
    let Some(start) = input.find(['{', '[']) else {
        return String::new();
    };

    let mut repairer = Repairer::default();
    repairer.run(&input[start..]);
    repairer.finish()
}

/// Position inside an object member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member {
    Key,
    Colon,
    Value,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object(Member),
    /// `true` once the array holds a value
    Array(bool),
}

impl Frame {
    fn closer(self) -> char {
        match self {
            Self::Object(_) => '}',
            Self::Array(_) => ']',
        }
    }
}

#[derive(Default)]
struct Repairer {
    out: String,
    frames: Vec<Frame>,
    quote: Option<char>,
    escaped: bool,
}

impl Repairer {
    fn run(&mut self, input: &str) {
        let chars: Vec<char> = input.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            i += 1;

            if let Some(quote) = self.quote {
                self.push_string_char(c, quote);
                continue;
            }

            match c {
                c if c.is_whitespace() => self.out.push(c),
                '/' if chars.get(i) == Some(&'/') => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                }
                '"' | '\'' => {
                    self.begin();
                    self.out.push('"');
                    self.quote = Some(c);
                }
                '{' | '[' => {
                    self.begin();
                    self.frames.push(if c == '{' {
                        Frame::Object(Member::Key)
                    } else {
                        Frame::Array(false)
                    });
                    self.out.push(c);
                }
                '}' | ']' => {
                    // stray closers are dropped
                    if self.close(c) && self.frames.is_empty() {
                        return;
                    }
                }
                // commas are re-inserted between values
                ',' => {}
                ':' => {
                    if self.frames.last() == Some(&Frame::Object(Member::Colon)) {
                        self.set_member(Member::Value);
                        self.out.push(':');
                    }
                }
                _ if self.expects_key() => {
                    if c.is_alphanumeric() || c == '_' {
                        let end = scan(&chars, i - 1, |ch| {
                            ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
                        });
                        let key: String = chars[i - 1..end].iter().collect();
                        i = end;
                        self.push_token(&quoted(&key));
                    }
                }
                '0'..='9' | '-' | '+' => {
                    let end = scan(&chars, i - 1, |ch| {
                        ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E')
                    });
                    let number: String = chars[i - 1..end].iter().collect();
                    i = end;
                    let number = number.trim_end_matches(|ch: char| !ch.is_ascii_digit());
                    if serde_json::from_str::<serde_json::Number>(number).is_ok() {
                        self.push_token(number);
                    } else if !number.is_empty() {
                        self.push_token(&quoted(number));
                    }
                }
                _ => {
                    let start = i - 1;
                    let end = bare_word_end(&chars, start);
                    let word: String = chars[start..end].iter().collect();
                    i = end;
                    self.push_word(word.trim_end(), end == chars.len());
                }
            }
        }
    }

    fn finish(mut self) -> String {
        if self.quote.take().is_some() {
            if self.escaped {
                self.out.pop();
                self.escaped = false;
            }
            self.out.push('"');
            self.end();
        }

        while let Some(frame) = self.frames.pop() {
            self.seal(frame);
        }

        self.out.trim().to_string()
    }

    fn push_string_char(&mut self, c: char, quote: char) {
        if self.escaped {
            // \' is not a JSON escape
            if c == '\'' {
                self.out.pop();
            }
            self.out.push(c);
            self.escaped = false;
            return;
        }

        match c {
            '\\' => {
                self.out.push(c);
                self.escaped = true;
            }
            c if c == quote => {
                self.out.push('"');
                self.quote = None;
                self.end();
            }
            '"' => self.out.push_str("\\\""),
            '\n' => self.out.push_str("\\n"),
            '\r' => self.out.push_str("\\r"),
            '\t' => self.out.push_str("\\t"),
            _ => self.out.push(c),
        }
    }

    /// Emit a bare value word; `at_end` when the input stops right after it
    fn push_word(&mut self, word: &str, at_end: bool) {
        let lower = word.to_ascii_lowercase();
        let literal = match lower.as_str() {
            "true" => Some("true"),
            "false" => Some("false"),
            "null" | "none" => Some("null"),
            _ if at_end => ["true", "false", "null"]
                .into_iter()
                .find(|literal| literal.starts_with(lower.as_str())),
            _ => None,
        };

        match literal {
            Some(literal) => self.push_token(literal),
            None => self.push_token(&quoted(word)),
        }
    }

    fn push_token(&mut self, token: &str) {
        self.begin();
        self.out.push_str(token);
        self.end();
    }

    /// Insert the separator owed before a new token
    fn begin(&mut self) {
        match self.frames.last() {
            Some(Frame::Object(Member::Next) | Frame::Array(true)) => self.insert(","),
            Some(Frame::Object(Member::Colon)) => self.insert(":"),
            _ => {}
        }
    }

    /// Advance the enclosing container past a finished token
    fn end(&mut self) {
        match self.frames.last_mut() {
            Some(Frame::Object(member)) => {
                *member = match member {
                    Member::Key | Member::Next => Member::Colon,
                    Member::Colon | Member::Value => Member::Next,
                };
            }
            Some(Frame::Array(filled)) => *filled = true,
            None => {}
        }
    }

    fn expects_key(&self) -> bool {
        matches!(
            self.frames.last(),
            Some(Frame::Object(Member::Key | Member::Next))
        )
    }

    fn set_member(&mut self, next: Member) {
        if let Some(Frame::Object(member)) = self.frames.last_mut() {
            *member = next;
        }
    }

    /// Close every open container up to and including the one `c` closes
    ///
    /// Returns false when nothing open matches `c`.
    fn close(&mut self, c: char) -> bool {
        let Some(pos) = self.frames.iter().rposition(|frame| frame.closer() == c) else {
            return false;
        };

        while self.frames.len() > pos {
            if let Some(frame) = self.frames.pop() {
                self.seal(frame);
            }
        }
        true
    }

    /// Fill a dangling member and write the closing bracket
    fn seal(&mut self, frame: Frame) {
        match frame {
            Frame::Object(Member::Colon) => {
                self.trim_end();
                self.out.push_str(": null");
            }
            Frame::Object(Member::Value) => {
                self.trim_end();
                self.out.push_str(" null");
            }
            _ => {}
        }
        self.out.push(frame.closer());
        self.end();
    }

    /// Insert `text` before any trailing whitespace
    fn insert(&mut self, text: &str) {
        let len = self.out.trim_end().len();
        let whitespace = self.out.split_off(len);
        self.out.push_str(text);
        self.out.push_str(&whitespace);
    }

    fn trim_end(&mut self) {
        let len = self.out.trim_end().len();
        self.out.truncate(len);
    }
}

fn scan(chars: &[char], start: usize, accept: impl Fn(char) -> bool) -> usize {
    chars[start..]
        .iter()
        .position(|&ch| !accept(ch))
        .map_or(chars.len(), |offset| start + offset)
}

/// End of a bare value word: the next delimiter or a `//` comment after whitespace
fn bare_word_end(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() {
        let ch = chars[end];
        let comment = ch == '/'
            && chars.get(end + 1) == Some(&'/')
            && end > start
            && chars[end - 1].is_whitespace();
        if comment || matches!(ch, ',' | '}' | ']' | '"' | '\n') {
            break;
        }
        end += 1;
    }
    end
}

fn quoted(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}
