//! Tokenizer for the brace-delimited `key = value` script format.
//!
//! The token stream is lazy: [`tokenize`] returns a [`Lexer`] iterator that
//! scans on demand, so a caller may stop early. Cloning a `Lexer` restarts
//! scanning from the clone's position without re-reading anything before it.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    OpenBrace,
    CloseBrace,
    Equals,
    /// Content between the quotes. Escape backslashes are kept verbatim.
    Quoted(String),
    /// Maximal run of characters other than whitespace, `{`, `}`, `=`, `"`, `#`
    Bare(String),
}

impl Token {
    /// Text of a word-like token (quoted or bare); `None` for punctuation.
    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Quoted(s) | Token::Bare(s) => Some(s),
            _ => None,
        }
    }
}

const BOM: char = '\u{feff}';

/// Remove any leading byte-order marks.
pub fn strip_bom(text: &str) -> &str {
    text.trim_start_matches(BOM)
}

/// Lazy token iterator over a source text.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

/// Tokenize `text`. The leading BOM is stripped before scanning.
pub fn tokenize(text: &str) -> Lexer<'_> {
    Lexer {
        src: strip_bom(text),
        pos: 0,
    }
}

fn ends_bare_word(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'{' | b'}' | b'=' | b'"' | b'#')
}

impl Lexer<'_> {
    /// Skip whitespace and `#` comments (a comment runs to end of line).
    fn skip_trivia(&mut self) {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'#' => {
                    while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b if b.is_ascii_whitespace() => self.pos += 1,
                _ => break,
            }
        }
    }

    fn quoted(&mut self, start: usize) -> Token {
        let bytes = self.src.as_bytes();
        let mut end = start + 1;
        while end < bytes.len() && bytes[end] != b'"' {
            if bytes[end] == b'\\' {
                end += 1;
            }
            end += 1;
        }
        // An unterminated quote runs to end of input.
        let end = end.min(bytes.len());
        self.pos = (end + 1).min(bytes.len());
        Token::Quoted(self.src[start + 1..end].to_owned())
    }

    fn bare(&mut self, start: usize) -> Token {
        let bytes = self.src.as_bytes();
        let mut end = start;
        while end < bytes.len() && !ends_bare_word(bytes[end]) {
            end += 1;
        }
        self.pos = end;
        Token::Bare(self.src[start..end].to_owned())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.skip_trivia();
        let start = self.pos;
        let c = *self.src.as_bytes().get(start)?;
        let token = match c {
            b'{' => {
                self.pos += 1;
                Token::OpenBrace
            }
            b'}' => {
                self.pos += 1;
                Token::CloseBrace
            }
            b'=' => {
                self.pos += 1;
                Token::Equals
            }
            b'"' => self.quoted(start),
            _ => self.bare(start),
        };
        Some(token)
    }
}
