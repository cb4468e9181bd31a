//! Statement tokenizer shared by the LEF and DEF readers.
//!
//! Both formats are whitespace separated, terminate statements with `;` and use `#` for line
//! comments. `;`, `(` and `)` are split into tokens of their own even when glued to a word.

use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub text: String,
    pub line: usize,
}

#[derive(Debug)]
pub(crate) struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn tokenize(reader: &mut impl BufRead) -> io::Result<Self> {
        let mut tokens = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            split_line(&line, idx + 1, &mut tokens);
        }
        Ok(Self { tokens, pos: 0 })
    }

    pub fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|t| t.text.as_str())
    }

    pub fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Line of the next token, or of the last token once the stream is exhausted.
    pub fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.line)
    }

    pub fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line(),
            message: message.into(),
        }
    }

    pub fn word(&mut self, what: &str) -> Result<String, SyntaxError> {
        match self.next_token() {
            Some(t) if t.text != ";" => Ok(t.text),
            Some(t) => Err(SyntaxError {
                line: t.line,
                message: format!("expected {}, found ';'", what),
            }),
            None => Err(self.error(format!("expected {}, found end of file", what))),
        }
    }

    pub fn expect(&mut self, keyword: &str) -> Result<(), SyntaxError> {
        match self.next_token() {
            Some(t) if t.text.eq_ignore_ascii_case(keyword) => Ok(()),
            Some(t) => Err(SyntaxError {
                line: t.line,
                message: format!("expected '{}', found '{}'", keyword, t.text),
            }),
            None => Err(self.error(format!("expected '{}', found end of file", keyword))),
        }
    }

    pub fn number(&mut self, what: &str) -> Result<f64, SyntaxError> {
        let line = self.line();
        let word = self.word(what)?;
        word.parse().map_err(|_| SyntaxError {
            line,
            message: format!("invalid number '{}' for {}", word, what),
        })
    }

    pub fn integer(&mut self, what: &str) -> Result<i64, SyntaxError> {
        let line = self.line();
        let word = self.word(what)?;
        word.parse().map_err(|_| SyntaxError {
            line,
            message: format!("invalid integer '{}' for {}", word, what),
        })
    }

    /// Consumes tokens up to and including the next `;`.
    pub fn skip_statement(&mut self) -> Result<(), SyntaxError> {
        while let Some(t) = self.next_token() {
            if t.text == ";" {
                return Ok(());
            }
        }
        Err(self.error("unterminated statement"))
    }

    /// Collects the remaining tokens of the current statement and consumes its `;`.
    pub fn statement(&mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut out = Vec::new();
        while let Some(t) = self.next_token() {
            if t.text == ";" {
                return Ok(out);
            }
            out.push(t);
        }
        Err(self.error("unterminated statement"))
    }

    /// Consumes tokens up to and including `END <name>`.
    pub fn skip_block(&mut self, name: &str) -> Result<(), SyntaxError> {
        while let Some(t) = self.next_token() {
            if t.text.eq_ignore_ascii_case("END") && self.peek() == Some(name) {
                self.pos += 1;
                return Ok(());
            }
        }
        Err(self.error(format!("missing 'END {}'", name)))
    }
}

fn split_line(line: &str, line_no: usize, out: &mut Vec<Token>) {
    let mut current = String::new();
    let mut in_quotes = false;
    let push = |buf: &mut String, out: &mut Vec<Token>| {
        if !buf.is_empty() {
            out.push(Token {
                text: std::mem::take(buf),
                line: line_no,
            });
        }
    };

    for ch in line.chars() {
        if in_quotes {
            if ch == '"' {
                in_quotes = false;
                out.push(Token {
                    text: std::mem::take(&mut current),
                    line: line_no,
                });
            } else {
                current.push(ch);
            }
            continue;
        }
        match ch {
            '#' => break,
            '"' => {
                push(&mut current, out);
                in_quotes = true;
            }
            ';' | '(' | ')' => {
                push(&mut current, out);
                out.push(Token {
                    text: ch.to_string(),
                    line: line_no,
                });
            }
            c if c.is_whitespace() => push(&mut current, out),
            c => current.push(c),
        }
    }
    push(&mut current, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(text: &str) -> TokenStream {
        TokenStream::tokenize(&mut text.as_bytes()).unwrap()
    }

    fn texts(text: &str) -> Vec<String> {
        let mut s = stream(text);
        std::iter::from_fn(|| s.next_token().map(|t| t.text)).collect()
    }

    #[test]
    fn punctuation_is_split_from_words() {
        assert_eq!(
            texts("SIZE 0.4 BY 1.4; - u1 INV (10 20) N ;"),
            ["SIZE", "0.4", "BY", "1.4", ";", "-", "u1", "INV", "(", "10", "20", ")", "N", ";"]
        );
    }

    #[test]
    fn comments_and_quotes_are_handled() {
        assert_eq!(
            texts("BUSBITCHARS \"[]\" ; # trailing comment ;\nEND"),
            ["BUSBITCHARS", "[]", ";", "END"]
        );
    }

    #[test]
    fn skip_block_stops_after_named_end() {
        let mut s = stream("VIA v1 LAYER m1 ; RECT 0 0 1 1 ; END v1 NEXT");
        s.next_token();
        s.next_token();
        s.skip_block("v1").unwrap();
        assert_eq!(s.peek(), Some("NEXT"));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let mut s = stream("UNITS\nDATABASE MICRONS abc ;");
        s.expect("UNITS").unwrap();
        s.expect("DATABASE").unwrap();
        s.expect("MICRONS").unwrap();
        let err = s.integer("database units").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(s.skip_statement().is_ok());
        assert!(s.skip_statement().is_err());
    }
}
