/// Block parser: rebuilds nested key/value structure from the token stream.
/// Structural problems are recorded as anomalies and recovered from locally,
/// so one malformed block never hides its siblings.
use crate::document::{Document, Value};
use crate::error::{ParseAnomaly, ParseError};
use crate::lexer::{self, Token};

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

/// Deepest block nesting the parser descends into. Blocks opened below this
/// level are skipped by brace counting and reported as an anomaly.
pub const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    anomalies: Vec<ParseAnomaly>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], pos: usize) -> Self {
        Parser {
            tokens,
            pos,
            depth: 0,
            anomalies: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn note(&mut self, anomaly: ParseAnomaly) {
        tracing::debug!(?anomaly, "recovered from structural anomaly");
        self.anomalies.push(anomaly);
    }

    /// Parse the body of a block whose `{` at `index` was just consumed.
    /// Returns `None` when the block lies past [`MAX_DEPTH`].
    fn parse_nested(&mut self, index: usize) -> Option<Document> {
        if self.depth >= MAX_DEPTH {
            self.note(ParseAnomaly::NestingTooDeep { index });
            self.skip_block();
            return None;
        }
        self.depth += 1;
        let doc = self.parse_entries(false);
        self.depth -= 1;
        Some(doc)
    }

    /// Consume tokens up to and including the `}` closing an already opened
    /// block.
    fn skip_block(&mut self) {
        let mut open = 1usize;
        while let Some(tok) = self.peek() {
            self.advance();
            match tok {
                Token::OpenBrace => open += 1,
                Token::CloseBrace => {
                    open -= 1;
                    if open == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
        self.note(ParseAnomaly::UnclosedBlock { index: self.pos });
    }

    /// Parse entries until end of input or, inside a block, the closing `}`
    /// (which is consumed).
    fn parse_entries(&mut self, top_level: bool) -> Document {
        let mut doc = Document::new();
        loop {
            let index = self.pos;
            let Some(tok) = self.peek() else {
                if !top_level {
                    self.note(ParseAnomaly::UnclosedBlock { index });
                }
                break;
            };
            match tok {
                Token::CloseBrace => {
                    self.advance();
                    if !top_level {
                        break;
                    }
                    self.note(ParseAnomaly::UnmatchedCloseBrace { index });
                }
                Token::Equals => {
                    self.note(ParseAnomaly::UnexpectedToken { index });
                    self.advance();
                }
                Token::OpenBrace => {
                    // Anonymous block where a key belongs: parsed for balance, then dropped.
                    self.note(ParseAnomaly::UnexpectedToken { index });
                    self.advance();
                    self.parse_nested(index);
                }
                Token::Quoted(key) | Token::Bare(key) => {
                    self.advance();
                    if self.peek() != Some(&Token::Equals) {
                        doc.insert(key.as_str(), Value::Flag);
                        continue;
                    }
                    self.advance();
                    match self.peek() {
                        Some(Token::OpenBrace) => {
                            let open = self.pos;
                            self.advance();
                            if let Some(block) = self.parse_nested(open) {
                                doc.insert(key.as_str(), Value::Block(block));
                            }
                        }
                        Some(Token::Quoted(v)) | Some(Token::Bare(v)) => {
                            self.advance();
                            doc.insert(key.as_str(), Value::Scalar(v.clone()));
                        }
                        // `}` is left for the loop so it ends this scope.
                        Some(Token::CloseBrace) | Some(Token::Equals) | None => {
                            self.note(ParseAnomaly::MissingValue {
                                key: key.clone(),
                                index: self.pos,
                            });
                        }
                    }
                }
            }
        }
        doc
    }
}

/// Parse a top-level token sequence into a document, discarding anomalies.
pub fn parse_document(tokens: &[Token]) -> Document {
    parse_document_recovering(tokens).0
}

/// Parse a top-level token sequence, returning the anomalies recovered from.
pub fn parse_document_recovering(tokens: &[Token]) -> (Document, Vec<ParseAnomaly>) {
    let mut p = Parser::new(tokens, 0);
    let doc = p.parse_entries(true);
    (doc, p.anomalies)
}

/// Parse the `{ ... }` block opening at `tokens[index]`, returning the block
/// and the index just past its closing brace.
pub fn parse_block(tokens: &[Token], index: usize) -> Result<(Value, usize), ParseError> {
    if tokens.get(index) != Some(&Token::OpenBrace) {
        return Err(ParseError::ExpectedOpenBrace { index });
    }
    let mut p = Parser::new(tokens, index + 1);
    let doc = p.parse_nested(index).unwrap_or_default();
    Ok((Value::Block(doc), p.pos))
}

/// Tokenize and parse source text in one step.
pub fn parse_str(text: &str) -> (Document, Vec<ParseAnomaly>) {
    let tokens: Vec<Token> = lexer::tokenize(text).collect();
    parse_document_recovering(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(s: &str) -> Value {
        Value::Scalar(s.to_string())
    }

    fn tokens(src: &str) -> Vec<Token> {
        lexer::tokenize(src).collect()
    }

    #[test]
    fn duplicate_keys_promote_in_order() {
        let (doc, anomalies) = parse_str("x = { a=1 a=2 a=3 }");
        assert!(anomalies.is_empty());
        let x = doc.block("x").unwrap();
        assert_eq!(
            x.get("a"),
            Some(&Value::Repeated(vec![scalar("1"), scalar("2"), scalar("3")]))
        );
    }

    #[test]
    fn bare_words_become_flags() {
        let (doc, _) = parse_str("refs = { alpha beta gamma }");
        let refs = doc.block("refs").unwrap();
        let keys: Vec<&str> = refs.keys().collect();
        assert_eq!(keys, vec!["alpha", "beta", "gamma"]);
        assert!(refs.iter().all(|(_, v)| *v == Value::Flag));
    }

    #[test]
    fn flag_followed_by_assignment_keeps_both() {
        let (doc, _) = parse_str("b = { marker key = v }");
        let b = doc.block("b").unwrap();
        assert_eq!(b.get("marker"), Some(&Value::Flag));
        assert_eq!(b.scalar("key"), Some("v"));
    }

    #[test]
    fn nested_blocks_and_quoted_values() {
        let src = r#"
building = {
    name = "Grain Mill"
    on_built = { effect = { a = 1 } }
}
"#;
        let (doc, anomalies) = parse_str(src);
        assert!(anomalies.is_empty());
        let b = doc.block("building").unwrap();
        assert_eq!(b.scalar("name"), Some("Grain Mill"));
        let effect = b.block("on_built").unwrap().block("effect").unwrap();
        assert_eq!(effect.scalar("a"), Some("1"));
    }

    #[test]
    fn stray_close_brace_does_not_hide_siblings() {
        let (doc, anomalies) = parse_str("a = { b = 1 } } c = 2");
        assert_eq!(doc.scalar("c"), Some("2"));
        assert_eq!(anomalies, vec![ParseAnomaly::UnmatchedCloseBrace { index: 7 }]);
    }

    #[test]
    fn missing_value_ends_the_block() {
        let (doc, anomalies) = parse_str("a = { b = } c = 2");
        assert!(doc.block("a").unwrap().is_empty());
        assert_eq!(doc.scalar("c"), Some("2"));
        assert!(matches!(
            anomalies.as_slice(),
            [ParseAnomaly::MissingValue { key, .. }] if key == "b"
        ));
    }

    #[test]
    fn unclosed_block_is_reported() {
        let (doc, anomalies) = parse_str("a = { b = 1");
        assert_eq!(doc.block("a").unwrap().scalar("b"), Some("1"));
        assert_eq!(anomalies, vec![ParseAnomaly::UnclosedBlock { index: 6 }]);
    }

    #[test]
    fn anonymous_block_is_skipped() {
        let (doc, anomalies) = parse_str("list = { { x = 1 } y } z = 3");
        let list = doc.block("list").unwrap();
        assert_eq!(list.keys().collect::<Vec<_>>(), vec!["y"]);
        assert_eq!(doc.scalar("z"), Some("3"));
        assert_eq!(anomalies.len(), 1);
    }

    #[test]
    fn parse_block_requires_open_brace() {
        let toks = tokens("a = { b = 1 }");
        assert_eq!(
            parse_block(&toks, 0),
            Err(ParseError::ExpectedOpenBrace { index: 0 })
        );
    }

    #[test]
    fn parse_block_returns_next_index() {
        let toks = tokens("a = { b = 1 } c = 2");
        let (value, next) = parse_block(&toks, 2).unwrap();
        assert_eq!(value.as_block().unwrap().scalar("b"), Some("1"));
        assert_eq!(next, 7);
        assert_eq!(toks[next], Token::Bare("c".to_string()));
    }

    #[test]
    fn runaway_nesting_is_skipped_not_followed() {
        let src = "x = { ".repeat(200_000);
        let (doc, anomalies) = parse_str(&src);
        assert!(doc.block("x").is_some());
        assert!(matches!(anomalies[0], ParseAnomaly::NestingTooDeep { .. }));
        let unclosed = anomalies
            .iter()
            .filter(|a| matches!(a, ParseAnomaly::UnclosedBlock { .. }))
            .count();
        assert_eq!(unclosed, MAX_DEPTH + 1);
        assert_eq!(anomalies.len(), MAX_DEPTH + 2);
    }

    #[test]
    fn closed_deep_nesting_keeps_siblings() {
        let depth = MAX_DEPTH + 10;
        let src = format!("{}{} b = 1", "x = { ".repeat(depth), "} ".repeat(depth));
        let (doc, anomalies) = parse_str(&src);
        assert!(doc.block("x").is_some());
        assert_eq!(doc.scalar("b"), Some("1"));
        assert!(matches!(
            anomalies.as_slice(),
            [ParseAnomaly::NestingTooDeep { .. }]
        ));
    }

    #[test]
    fn top_level_duplicates_promote_too() {
        let doc = parse_document(&tokens("t = { a = 1 } t = { a = 2 }"));
        assert!(matches!(doc.get("t"), Some(Value::Repeated(items)) if items.len() == 2));
    }
}
