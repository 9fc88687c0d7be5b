// src/frontend/lexer.rs

use crate::errors::LexerError;
use crate::frontend::{Span, Token, TokenType};

pub struct Lexer<'src> {
    source: &'src str,
    chars: std::iter::Peekable<std::str::CharIndices<'src>>,
    /// Global offset of this file's first byte; spans are emitted in
    /// compilation-wide coordinates so multiple files can share one stream.
    base: usize,
    start: usize,
    current: usize,
    line: u32,
    column: u32,
    start_column: u32,
    start_line: u32,
    // Error collection
    errors: Vec<LexerError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self::with_base(source, 0)
    }

    pub fn with_base(source: &'src str, base: usize) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            base,
            start: base,
            current: base,
            line: 1,
            column: 1,
            start_column: 1,
            start_line: 1,
            errors: Vec::new(),
        }
    }

    /// Take all collected errors, leaving the internal list empty.
    pub fn take_errors(&mut self) -> Vec<LexerError> {
        std::mem::take(&mut self.errors)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        self.start = self.current;
        self.start_column = self.column;
        self.start_line = self.line;

        let Some(c) = self.advance() else {
            return self.make_token(TokenType::Eof);
        };

        match c {
            '(' => self.make_token(TokenType::LParen),
            ')' => self.make_token(TokenType::RParen),
            '{' => self.make_token(TokenType::LBrace),
            '}' => self.make_token(TokenType::RBrace),
            '[' => self.make_token(TokenType::LBracket),
            ']' => self.make_token(TokenType::RBracket),
            ',' => self.make_token(TokenType::Comma),
            ';' => self.make_token(TokenType::Semicolon),
            '.' => self.make_token(TokenType::Dot),
            '#' => self.make_token(TokenType::Hash),
            '@' => self.make_token(TokenType::At),
            '?' => self.make_token(TokenType::Question),
            ':' => {
                if self.match_char(':') {
                    self.make_token(TokenType::ColonColon)
                } else {
                    self.make_token(TokenType::Colon)
                }
            }
            '+' => {
                if self.match_char(':') {
                    self.make_token(TokenType::PlusColon)
                } else {
                    self.make_token(TokenType::Plus)
                }
            }
            '-' => {
                if self.match_char(':') {
                    self.make_token(TokenType::MinusColon)
                } else {
                    self.make_token(TokenType::Minus)
                }
            }
            '*' => {
                if self.match_char('*') {
                    self.make_token(TokenType::StarStar)
                } else {
                    self.make_token(TokenType::Star)
                }
            }
            '/' => self.make_token(TokenType::Slash),
            '%' => self.make_token(TokenType::Percent),
            '&' => {
                if self.match_char('&') {
                    self.make_token(TokenType::AmpAmp)
                } else {
                    self.make_token(TokenType::Amp)
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.make_token(TokenType::PipePipe)
                } else {
                    self.make_token(TokenType::Pipe)
                }
            }
            '^' => {
                if self.match_char('~') {
                    self.make_token(TokenType::TildeCaret)
                } else {
                    self.make_token(TokenType::Caret)
                }
            }
            '~' => {
                if self.match_char('^') {
                    self.make_token(TokenType::TildeCaret)
                } else if self.match_char('&') {
                    self.make_token(TokenType::TildeAmp)
                } else if self.match_char('|') {
                    self.make_token(TokenType::TildePipe)
                } else {
                    self.make_token(TokenType::Tilde)
                }
            }
            '!' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        self.make_token(TokenType::BangEqEq)
                    } else if self.match_char('?') {
                        self.make_token(TokenType::BangEqQuest)
                    } else {
                        self.make_token(TokenType::BangEq)
                    }
                } else {
                    self.make_token(TokenType::Bang)
                }
            }
            '=' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        self.make_token(TokenType::EqEqEq)
                    } else if self.match_char('?') {
                        self.make_token(TokenType::EqEqQuest)
                    } else {
                        self.make_token(TokenType::EqEq)
                    }
                } else {
                    self.make_token(TokenType::Eq)
                }
            }
            '<' => {
                if self.match_char('<') {
                    if self.match_char('<') {
                        self.make_token(TokenType::LtLtLt)
                    } else {
                        self.make_token(TokenType::LtLt)
                    }
                } else if self.match_char('=') {
                    self.make_token(TokenType::LtEq)
                } else {
                    self.make_token(TokenType::Lt)
                }
            }
            '>' => {
                if self.match_char('>') {
                    if self.match_char('>') {
                        self.make_token(TokenType::GtGtGt)
                    } else {
                        self.make_token(TokenType::GtGt)
                    }
                } else if self.match_char('=') {
                    self.make_token(TokenType::GtEq)
                } else {
                    self.make_token(TokenType::Gt)
                }
            }
            '"' => self.string_literal(),
            '\'' => self.apostrophe(),
            '$' => self.system_name(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            c => {
                self.errors.push(LexerError::UnexpectedCharacter {
                    ch: c,
                    span: self.current_span().into(),
                });
                self.make_token(TokenType::Error)
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek().map(|&(_, c)| c) {
                        Some('/') => {
                            while let Some(c) = self.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.advance();
                            }
                        }
                        Some('*') => {
                            self.advance(); // /
                            self.advance(); // *
                            loop {
                                match self.advance() {
                                    Some('*') if self.peek() == Some('/') => {
                                        self.advance();
                                        break;
                                    }
                                    Some(_) => {}
                                    None => {
                                        self.errors.push(LexerError::UnterminatedComment {
                                            span: self.current_span().into(),
                                        });
                                        break;
                                    }
                                }
                            }
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
    }

    fn string_literal(&mut self) -> Token {
        loop {
            match self.advance() {
                Some('"') => return self.make_token(TokenType::StringLiteral),
                Some('\\') => {
                    self.advance();
                }
                Some('\n') | None => {
                    self.errors.push(LexerError::UnterminatedString {
                        span: self.current_span().into(),
                    });
                    return self.make_token(TokenType::Error);
                }
                Some(_) => {}
            }
        }
    }

    // An apostrophe starts an unbased unsized literal ('0 '1 'x 'z), a based
    // literal with no size ('hff), or an assignment pattern ('{).
    fn apostrophe(&mut self) -> Token {
        match self.peek() {
            Some('{') => self.make_token(TokenType::Apostrophe),
            Some('s') | Some('S') | Some('b') | Some('B') | Some('o') | Some('O') | Some('d')
            | Some('D') | Some('h') | Some('H') => self.based_digits(),
            Some(c) if matches!(c, '0' | '1' | 'x' | 'X' | 'z' | 'Z') => {
                // Unbased only when the digit is not the start of a longer
                // based-digit run (e.g. 'x is unbased, but 'x0 is malformed).
                self.advance();
                if matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
                    self.errors.push(LexerError::InvalidNumber {
                        span: self.current_span().into(),
                    });
                    return self.make_token(TokenType::Error);
                }
                self.make_token(TokenType::UnbasedLiteral)
            }
            _ => {
                self.errors.push(LexerError::UnexpectedCharacter {
                    ch: '\'',
                    span: self.current_span().into(),
                });
                self.make_token(TokenType::Error)
            }
        }
    }

    // Consumes [s]<base><digits> after an apostrophe.
    fn based_digits(&mut self) -> Token {
        if matches!(self.peek(), Some('s') | Some('S')) {
            self.advance();
        }
        match self.peek() {
            Some('b') | Some('B') | Some('o') | Some('O') | Some('d') | Some('D') | Some('h')
            | Some('H') => {
                self.advance();
            }
            _ => {
                self.errors.push(LexerError::InvalidNumber {
                    span: self.current_span().into(),
                });
                return self.make_token(TokenType::Error);
            }
        }
        let mut saw_digit = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_hexdigit() || matches!(c, 'x' | 'X' | 'z' | 'Z' | '?' | '_') {
                saw_digit = true;
                self.advance();
            } else {
                break;
            }
        }
        if !saw_digit {
            self.errors.push(LexerError::InvalidNumber {
                span: self.current_span().into(),
            });
            return self.make_token(TokenType::Error);
        }
        self.make_token(TokenType::BasedLiteral)
    }

    fn number(&mut self) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
            self.advance();
        }

        // Size prefix of a based literal: 4'b1010
        if self.peek() == Some('\'') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if matches!(
                lookahead.peek().map(|&(_, c)| c),
                Some('s') | Some('S') | Some('b') | Some('B') | Some('o') | Some('O') | Some('d')
                    | Some('D') | Some('h') | Some('H')
            ) {
                self.advance(); // '
                return self.based_digits();
            }
        }

        // Real literal: 3.14 or 1e9 or 2.5e-3
        let mut is_real = false;
        if self.peek() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if matches!(lookahead.peek().map(|&(_, c)| c), Some(c) if c.is_ascii_digit()) {
                is_real = true;
                self.advance(); // .
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
                    self.advance();
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            let next = lookahead.peek().map(|&(_, c)| c);
            let exp_ok = match next {
                Some(c) if c.is_ascii_digit() => true,
                Some('+') | Some('-') => {
                    lookahead.next();
                    matches!(lookahead.peek().map(|&(_, c)| c), Some(c) if c.is_ascii_digit())
                }
                _ => false,
            };
            if exp_ok {
                is_real = true;
                self.advance(); // e
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.advance();
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        if is_real {
            self.make_token(TokenType::RealLiteral)
        } else {
            self.make_token(TokenType::IntLiteral)
        }
    }

    fn identifier(&mut self) -> Token {
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '$') {
            self.advance();
        }
        let text = &self.source[self.start - self.base..self.current - self.base];
        match TokenType::keyword(text) {
            Some(kw) => self.make_token(kw),
            None => self.make_token(TokenType::Identifier),
        }
    }

    fn system_name(&mut self) -> Token {
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        self.make_token(TokenType::SystemName)
    }

    fn advance(&mut self) -> Option<char> {
        let (idx, c) = self.chars.next()?;
        self.current = self.base + idx + c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_span(&self) -> Span {
        Span::new(self.start, self.current, self.start_line, self.start_column)
    }

    fn make_token(&self, ty: TokenType) -> Token {
        Token::new(
            ty,
            &self.source[self.start - self.base..self.current - self.base],
            self.current_span(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<TokenType> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token();
            if t.ty == TokenType::Eof {
                break;
            }
            out.push(t.ty);
        }
        out
    }

    #[test]
    fn lexes_module_header() {
        let toks = lex_all("module top; endmodule");
        assert_eq!(
            toks,
            vec![
                TokenType::KwModule,
                TokenType::Identifier,
                TokenType::Semicolon,
                TokenType::KwEndModule,
            ]
        );
    }

    #[test]
    fn lexes_based_literals() {
        let mut lexer = Lexer::new("4'b10x1 'hff 'sd12 8'd255");
        let t = lexer.next_token();
        assert_eq!(t.ty, TokenType::BasedLiteral);
        assert_eq!(t.lexeme, "4'b10x1");
        assert_eq!(lexer.next_token().ty, TokenType::BasedLiteral);
        assert_eq!(lexer.next_token().ty, TokenType::BasedLiteral);
        assert_eq!(lexer.next_token().ty, TokenType::BasedLiteral);
        assert!(!lexer.has_errors());
    }

    #[test]
    fn lexes_unbased_literals() {
        let toks = lex_all("'0 '1 'x 'z");
        assert_eq!(toks, vec![TokenType::UnbasedLiteral; 4]);
    }

    #[test]
    fn lexes_operators() {
        let toks = lex_all("=== ==? <<< >>> ~^ +: -:");
        assert_eq!(
            toks,
            vec![
                TokenType::EqEqEq,
                TokenType::EqEqQuest,
                TokenType::LtLtLt,
                TokenType::GtGtGt,
                TokenType::TildeCaret,
                TokenType::PlusColon,
                TokenType::MinusColon,
            ]
        );
    }

    #[test]
    fn lexes_reals_and_ints() {
        let toks = lex_all("42 3.14 1e9 2.5e-3");
        assert_eq!(
            toks,
            vec![
                TokenType::IntLiteral,
                TokenType::RealLiteral,
                TokenType::RealLiteral,
                TokenType::RealLiteral,
            ]
        );
    }

    #[test]
    fn skips_comments() {
        let toks = lex_all("// line\nmodule /* block */ m");
        assert_eq!(toks, vec![TokenType::KwModule, TokenType::Identifier]);
    }

    #[test]
    fn system_names() {
        let mut lexer = Lexer::new("$display $clog2");
        let t = lexer.next_token();
        assert_eq!(t.ty, TokenType::SystemName);
        assert_eq!(t.lexeme, "$display");
        assert_eq!(lexer.next_token().ty, TokenType::SystemName);
    }

    #[test]
    fn reports_unterminated_string() {
        let mut lexer = Lexer::new("\"abc");
        let t = lexer.next_token();
        assert_eq!(t.ty, TokenType::Error);
        assert!(lexer.has_errors());
    }
}
