use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Dot,
    LBrace,
    RBrace,
    /// Array marker, `*Item`.
    Star,
    Colon,
    LParen,
    RParen,
    Name(String),
    /// Decimal spots or string length inside `( )`.
    Number(u64),
    /// A character that starts no token.
    Unexpected(char),
    Eof,
}

/// A token and the 1-based line it starts on.
#[derive(Debug, Clone)]
pub struct Located {
    pub token: Token,
    pub line: usize,
}

/// Tokenizer for schema declaration text. Whitespace and commas separate
/// tokens; `#` starts a comment that runs to the end of the line.
pub struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    lookahead: Option<Located>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            chars: src.char_indices().peekable(),
            line: 1,
            lookahead: None,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        let mut in_comment = false;
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                '\n' => in_comment = false,
                '#' => in_comment = true,
                c if in_comment || c.is_whitespace() || c == ',' => {}
                _ => return,
            }
            self.bump();
        }
    }

    /// The run of characters starting at byte `start` that satisfy `keep`.
    fn word(&mut self, start: usize, keep: fn(char) -> bool) -> &'a str {
        let mut end = self.src.len();
        while let Some(&(i, c)) = self.chars.peek() {
            if !keep(c) {
                end = i;
                break;
            }
            self.bump();
        }
        &self.src[start..end]
    }

    fn scan(&mut self) -> Located {
        self.skip_trivia();
        let line = self.line;
        let Some(&(start, c)) = self.chars.peek() else {
            return Located {
                token: Token::Eof,
                line,
            };
        };

        let token = if c.is_ascii_alphabetic() || c == '_' {
            let name = self.word(start, |c| c.is_ascii_alphanumeric() || c == '_');
            Token::Name(name.to_string())
        } else if c.is_ascii_digit() {
            let digits = self.word(start, |c| c.is_ascii_digit());
            digits.parse().map_or(Token::Unexpected(c), Token::Number)
        } else {
            self.bump();
            match c {
                '.' => Token::Dot,
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                '*' => Token::Star,
                ':' => Token::Colon,
                '(' => Token::LParen,
                ')' => Token::RParen,
                other => Token::Unexpected(other),
            }
        };
        Located { token, line }
    }

    pub fn next_token(&mut self) -> Located {
        match self.lookahead.take() {
            Some(tok) => tok,
            None => self.scan(),
        }
    }

    pub fn peek_token(&mut self) -> Located {
        match &self.lookahead {
            Some(tok) => tok.clone(),
            None => {
                let tok = self.scan();
                self.lookahead = Some(tok.clone());
                tok
            }
        }
    }
}
