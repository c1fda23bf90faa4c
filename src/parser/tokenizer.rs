use thiserror::Error;

use crate::utils::{BoolToErrorHelper, Located};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizerError {
    #[error("`{0}` must be followed by a name")]
    EmptyName(char),
    #[error("incomplete hex literal")]
    IncompleteHexLiteral,
    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
}
impl TokenizerError {
    #[inline(always)]
    pub const fn at(self, line: usize, col: usize) -> Located<Self> {
        Located { t: self, line, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    /// `%name`; the slice excludes the sigil.
    LocalName,
    /// `@name`; the slice excludes the sigil.
    GlobalName,
    Number,
    OpenBracket,
    CloseBracket,
    OpenParenthese,
    CloseParenthese,
    OpenBrace,
    CloseBrace,
    Comma,
    Colon,
    Eq,
}

#[derive(Debug, Clone)]
pub struct Token<'s> {
    pub slice: &'s str,
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

#[inline(always)]
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'
}

pub struct Tokenizer<'s> {
    pub source: &'s str,
    pub line: usize,
    pub col: usize,
}
impl<'s> Tokenizer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            line: 0,
            col: 0,
        }
    }

    fn skip_spaces_and_comments(&mut self) {
        loop {
            let mut chars = self.source.chars();
            match chars.next() {
                Some('\n') => {
                    self.line += 1;
                    self.col = 0;
                    self.source = &self.source[1..];
                }
                Some(c) if c.is_whitespace() => {
                    self.col += 1;
                    self.source = &self.source[c.len_utf8()..];
                }
                Some(';') => {
                    // line comment
                    self.source = self.source.trim_start_matches(|c| c != '\n');
                }
                _ => break,
            }
        }
    }

    #[inline]
    fn take(&mut self, byte_count: usize, kind: TokenKind, skip: usize) -> Token<'s> {
        let tk = Token {
            slice: &self.source[skip..byte_count],
            kind,
            line: self.line,
            col: self.col,
        };
        self.col += self.source[..byte_count].chars().count();
        self.source = &self.source[byte_count..];

        tk
    }

    pub fn next_token(&mut self) -> Result<Option<Token<'s>>, Located<TokenizerError>> {
        self.skip_spaces_and_comments();

        let Some(head) = self.source.chars().next() else {
            return Ok(None);
        };

        let punct = match head {
            '[' => Some(TokenKind::OpenBracket),
            ']' => Some(TokenKind::CloseBracket),
            '(' => Some(TokenKind::OpenParenthese),
            ')' => Some(TokenKind::CloseParenthese),
            '{' => Some(TokenKind::OpenBrace),
            '}' => Some(TokenKind::CloseBrace),
            ',' => Some(TokenKind::Comma),
            ':' => Some(TokenKind::Colon),
            '=' => Some(TokenKind::Eq),
            _ => None,
        };
        if let Some(kind) = punct {
            return Ok(Some(self.take(1, kind, 0)));
        }

        if head == '%' || head == '@' {
            let name_bytes = self.source[1..]
                .chars()
                .take_while(|&c| is_name_char(c))
                .map(char::len_utf8)
                .sum::<usize>();
            (name_bytes > 0).or_err(|| TokenizerError::EmptyName(head).at(self.line, self.col))?;

            let kind = if head == '%' {
                TokenKind::LocalName
            } else {
                TokenKind::GlobalName
            };
            return Ok(Some(self.take(1 + name_bytes, kind, 1)));
        }

        let sign = usize::from(head == '-');
        if self.source[sign..].starts_with("0x") || self.source[sign..].starts_with("0X") {
            let digits = self.source[sign + 2..]
                .chars()
                .take_while(char::is_ascii_hexdigit)
                .count();
            (digits > 0)
                .or_err(|| TokenizerError::IncompleteHexLiteral.at(self.line, self.col))?;

            return Ok(Some(self.take(sign + 2 + digits, TokenKind::Number, 0)));
        }
        if self.source[sign..].starts_with(|c: char| c.is_ascii_digit()) {
            let digits = self.source[sign..]
                .chars()
                .take_while(char::is_ascii_digit)
                .count();

            return Ok(Some(self.take(sign + digits, TokenKind::Number, 0)));
        }

        let ident_bytes = self
            .source
            .chars()
            .take_while(|&c| is_name_char(c))
            .map(char::len_utf8)
            .sum::<usize>();
        (ident_bytes > 0)
            .or_err(|| TokenizerError::InvalidCharacter(head).at(self.line, self.col))?;

        Ok(Some(self.take(ident_bytes, TokenKind::Identifier, 0)))
    }

    pub fn tokenize(mut self) -> Result<Vec<Token<'s>>, Located<TokenizerError>> {
        let mut tokens = Vec::new();
        while let Some(t) = self.next_token()? {
            tokens.push(t);
        }

        Ok(tokens)
    }
}
