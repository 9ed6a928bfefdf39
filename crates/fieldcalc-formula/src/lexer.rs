//! Formula tokenizer
//!
//! Converts formula text into a stream of [`Token`]s. Positions are
//! zero-based character offsets into the source text.

use crate::error::{FormulaError, FormulaResult};
use std::fmt;

/// Reserved words, matched case-insensitively
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    True,
    False,
    Null,
    And,
    Or,
    Not,
}

impl Keyword {
    /// Match an identifier against the keyword set (case-insensitive)
    pub fn lookup(ident: &str) -> Option<Keyword> {
        match ident.to_ascii_lowercase().as_str() {
            "true" => Some(Keyword::True),
            "false" => Some(Keyword::False),
            "null" => Some(Keyword::Null),
            "and" => Some(Keyword::And),
            "or" => Some(Keyword::Or),
            "not" => Some(Keyword::Not),
            _ => None,
        }
    }

    /// Lower-cased keyword text
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
        }
    }
}

/// Token kinds, carrying the literal payload where there is one
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(String),

    // Names
    Identifier(String),
    Keyword(Keyword),

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,

    // End of input
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::String(s) => write!(f, "string {:?}", s),
            TokenKind::Identifier(name) => write!(f, "identifier '{}'", name),
            TokenKind::Keyword(kw) => write!(f, "keyword '{}'", kw.as_str()),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::StarStar => f.write_str("'**'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::Percent => f.write_str("'%'"),
            TokenKind::EqualEqual => f.write_str("'=='"),
            TokenKind::NotEqual => f.write_str("'!='"),
            TokenKind::Less => f.write_str("'<'"),
            TokenKind::LessEqual => f.write_str("'<='"),
            TokenKind::Greater => f.write_str("'>'"),
            TokenKind::GreaterEqual => f.write_str("'>='"),
            TokenKind::LeftParen => f.write_str("'('"),
            TokenKind::RightParen => f.write_str("')'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

/// A token and the offset of its first character
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, position: usize) -> Self {
        Self { kind, position }
    }
}

/// Tokenize formula text
///
/// The returned stream always ends with a [`TokenKind::Eof`] token.
///
/// # Example
/// ```rust
/// use fieldcalc_formula::lexer::{tokenize, TokenKind};
///
/// let tokens = tokenize("a <= 2").unwrap();
/// assert_eq!(tokens[1].kind, TokenKind::LessEqual);
/// assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
/// ```
pub fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    Lexer::new(input).tokenize()
}

/// Formula tokenizer
struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn tokenize(mut self) -> FormulaResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    // === Token scanning ===

    fn scan_token(&mut self) -> FormulaResult<Token> {
        self.skip_whitespace();

        let start = self.pos;
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::Eof, start)),
        };

        if c.is_ascii_digit() {
            return self.scan_number();
        }

        if c == '"' || c == '\'' {
            return self.scan_string(c);
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.scan_identifier());
        }

        // Two-character operators must win over their one-character prefixes
        let two = match (c, self.peek_char_at(1)) {
            ('*', Some('*')) => Some(TokenKind::StarStar),
            ('=', Some('=')) => Some(TokenKind::EqualEqual),
            ('!', Some('=')) => Some(TokenKind::NotEqual),
            ('<', Some('=')) => Some(TokenKind::LessEqual),
            ('>', Some('=')) => Some(TokenKind::GreaterEqual),
            _ => None,
        };
        if let Some(kind) = two {
            self.pos += 2;
            return Ok(Token::new(kind, start));
        }

        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ',' => TokenKind::Comma,
            _ => {
                return Err(FormulaError::lex(
                    format!("Unexpected character '{}'", c),
                    start,
                ))
            }
        };
        self.pos += 1;
        Ok(Token::new(kind, start))
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }

        // Decimal part, only when a digit follows the point
        if self.peek_char() == Some('.')
            && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())
        {
            self.pos += 1;
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        let value = text
            .parse::<f64>()
            .map_err(|e| FormulaError::lex(format!("Invalid number '{}': {}", text, e), start))?;
        Ok(Token::new(TokenKind::Number(value), start))
    }

    fn scan_string(&mut self, quote: char) -> FormulaResult<Token> {
        let start = self.pos;
        self.pos += 1; // Skip opening quote

        let mut s = String::new();
        loop {
            let c = match self.peek_char() {
                Some(c) => c,
                None => return Err(FormulaError::lex("Unterminated string", start)),
            };
            self.pos += 1;

            if c == quote {
                return Ok(Token::new(TokenKind::String(s), start));
            }

            if c != '\\' {
                s.push(c);
                continue;
            }

            let escaped = match self.peek_char() {
                Some(e) => e,
                None => return Err(FormulaError::lex("Unterminated string", start)),
            };
            self.pos += 1;
            match escaped {
                'n' => s.push('\n'),
                't' => s.push('\t'),
                'r' => s.push('\r'),
                '\\' => s.push('\\'),
                e if e == quote => s.push(e),
                other => {
                    s.push('\\');
                    s.push(other);
                }
            }
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        match Keyword::lookup(&text) {
            Some(kw) => Token::new(TokenKind::Keyword(kw), start),
            None => Token::new(TokenKind::Identifier(text), start),
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            kinds("42 3.14"),
            vec![
                TokenKind::Number(42.0),
                TokenKind::Number(3.14),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_out_of_range_number_is_infinite() {
        let text = format!("1{}", "0".repeat(400));
        assert_eq!(
            kinds(&text),
            vec![TokenKind::Number(f64::INFINITY), TokenKind::Eof]
        );
    }

    #[test]
    fn test_trailing_point_is_not_part_of_number() {
        let err = tokenize("1.").unwrap_err();
        assert_eq!(err.position(), Some(1));
        assert!(err.to_string().contains("'.'"));
    }

    #[test]
    fn test_tokenize_strings() {
        assert_eq!(
            kinds(r#"'it\'s' "a\tb\\""#),
            vec![
                TokenKind::String("it's".into()),
                TokenKind::String("a\tb\\".into()),
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds(r#""say \"hi\"\n""#),
            vec![TokenKind::String("say \"hi\"\n".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_unknown_escape_is_kept() {
        assert_eq!(
            kinds(r#""a\qb""#),
            vec![TokenKind::String("a\\qb".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("x + 'abc").unwrap_err();
        assert!(matches!(err, FormulaError::Lex { position: 4, .. }));

        let err = tokenize("'abc\\").unwrap_err();
        assert!(matches!(err, FormulaError::Lex { position: 0, .. }));
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("TRUE And Not null"),
            vec![
                TokenKind::Keyword(Keyword::True),
                TokenKind::Keyword(Keyword::And),
                TokenKind::Keyword(Keyword::Not),
                TokenKind::Keyword(Keyword::Null),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_identifiers_preserve_case() {
        assert_eq!(
            kinds("Field_1 _x"),
            vec![
                TokenKind::Identifier("Field_1".into()),
                TokenKind::Identifier("_x".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_two_char_operators_first() {
        assert_eq!(
            kinds("a<=b**2!=c>=d==e"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::LessEqual,
                TokenKind::Identifier("b".into()),
                TokenKind::StarStar,
                TokenKind::Number(2.0),
                TokenKind::NotEqual,
                TokenKind::Identifier("c".into()),
                TokenKind::GreaterEqual,
                TokenKind::Identifier("d".into()),
                TokenKind::EqualEqual,
                TokenKind::Identifier("e".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("  ab + 'x'").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![2, 5, 7, 10]);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a = b").unwrap_err();
        assert_eq!(
            err,
            FormulaError::Lex {
                message: "Unexpected character '='".into(),
                position: 2
            }
        );

        let err = tokenize("a & b").unwrap_err();
        assert_eq!(err.position(), Some(2));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds("   "), vec![TokenKind::Eof]);
    }
}
