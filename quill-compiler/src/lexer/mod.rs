use thiserror::Error;

use crate::ast::Span;

/// Character classes recognised by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// `[A-Za-z_$]`
    Letter,
    /// `[0-9]`
    Digit,
    /// `:`, `=` and `^`
    Symbol,
    /// Structural punctuation: `( ) [ ] , . "`
    Punctuation,
    /// Space, tab and carriage return.
    Whitespace,
    Newline,
    Other,
}

pub fn classify(ch: char) -> CharClass {
    match ch {
        'a'..='z' | 'A'..='Z' | '_' | '$' => CharClass::Letter,
        '0'..='9' => CharClass::Digit,
        ':' | '=' | '^' => CharClass::Symbol,
        '(' | ')' | '[' | ']' | ',' | '.' | '"' => CharClass::Punctuation,
        ' ' | '\t' | '\r' => CharClass::Whitespace,
        '\n' => CharClass::Newline,
        _ => CharClass::Other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerError {
    #[error("unterminated string starting at offset {start}")]
    UnterminatedString { start: usize },
}

/// Character cursor over the source text. The parser drives it one lexeme at
/// a time; nothing is buffered ahead.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::starting_at(input, 0)
    }

    /// Starts scanning at `start`, clamped to the input length.
    pub fn starting_at(input: &'a str, start: usize) -> Self {
        let mut position = start.min(input.len());
        while !input.is_char_boundary(position) {
            position += 1;
        }
        Self { input, position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    pub fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next()?;
        iter.next()
    }

    pub fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    pub fn slice(&self, span: Span) -> &'a str {
        &self.input[span.start..span.end]
    }

    /// Everything from the cursor to the end of input.
    pub fn remainder(&self) -> &'a str {
        &self.input[self.position..]
    }

    pub fn seek_end(&mut self) {
        self.position = self.input.len();
    }

    /// Skips spaces and tabs, and newlines too when `newlines` is set.
    pub fn skip_whitespace(&mut self, newlines: bool) {
        while let Some(ch) = self.peek_char() {
            match classify(ch) {
                CharClass::Whitespace => {}
                CharClass::Newline if newlines => {}
                _ => break,
            }
            self.advance_char();
        }
    }

    pub fn lex_identifier(&mut self) -> Span {
        let start = self.position;
        self.advance_char();
        while let Some(ch) = self.peek_char() {
            if matches!(classify(ch), CharClass::Letter | CharClass::Digit) {
                self.advance_char();
            } else {
                break;
            }
        }
        Span::new(start, self.position)
    }

    /// Digits and dots with an optional leading minus. The text is validated
    /// later, when the literal is translated.
    pub fn lex_number(&mut self) -> Span {
        let start = self.position;
        if self.peek_char() == Some('-') {
            self.advance_char();
        }
        while let Some(ch) = self.peek_char() {
            if ch == '.' || classify(ch) == CharClass::Digit {
                self.advance_char();
            } else {
                break;
            }
        }
        Span::new(start, self.position)
    }

    /// Scans a quoted string including both quotes. On end of input the
    /// cursor is left at the end and the error reports where the string began.
    pub fn lex_string(&mut self) -> Result<Span, LexerError> {
        let start = self.position;
        self.advance_char(); // opening quote

        while let Some(ch) = self.advance_char() {
            match ch {
                '"' => return Ok(Span::new(start, self.position)),
                '\\' => {
                    self.advance_char();
                }
                _ => {}
            }
        }

        Err(LexerError::UnterminatedString { start })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_symbol_set() {
        assert_eq!(classify(':'), CharClass::Symbol);
        assert_eq!(classify('='), CharClass::Symbol);
        assert_eq!(classify('^'), CharClass::Symbol);
        assert_eq!(classify('$'), CharClass::Letter);
        assert_eq!(classify('\t'), CharClass::Whitespace);
        assert_eq!(classify('#'), CharClass::Other);
    }

    #[test]
    fn escaped_quote_does_not_terminate() {
        let input = r#""a\"b" rest"#;
        let mut lexer = Lexer::new(input);
        let span = lexer.lex_string().expect("terminated string");
        assert_eq!(lexer.slice(span), r#""a\"b""#);
    }

    #[test]
    fn unterminated_string_runs_to_end() {
        let mut lexer = Lexer::new("\"open");
        let err = lexer.lex_string().expect_err("unterminated");
        assert_eq!(err, LexerError::UnterminatedString { start: 0 });
        assert!(lexer.is_at_end());
    }

    #[test]
    fn number_keeps_raw_text() {
        let mut lexer = Lexer::new("-12.5.1x");
        let span = lexer.lex_number();
        assert_eq!(lexer.slice(span), "-12.5.1");
        assert_eq!(lexer.peek_char(), Some('x'));
    }
}
