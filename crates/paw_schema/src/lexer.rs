/// Lexer for the paw schema IDL.
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Package,
    Record,
    Primitive,
    Streaming,

    // Parameterized type keywords
    List,
    OptionKw,
    Any,

    // Literals
    Ident(String),
    Integer(u64),

    // Punctuation
    Colon,
    Comma,
    Dot,
    At,
    LBrace,
    RBrace,
    LAngle,
    RAngle,

    // Special
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Package => write!(f, "package"),
            Token::Record => write!(f, "record"),
            Token::Primitive => write!(f, "primitive"),
            Token::Streaming => write!(f, "streaming"),
            Token::List => write!(f, "list"),
            Token::OptionKw => write!(f, "option"),
            Token::Any => write!(f, "any"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Integer(n) => write!(f, "{n}"),
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::At => write!(f, "@"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LAngle => write!(f, "<"),
            Token::RAngle => write!(f, ">"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.token == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn peek_pair(&self, first: u8, second: u8) -> bool {
        let bytes = self.bytes();
        self.pos + 1 < bytes.len() && bytes[self.pos] == first && bytes[self.pos + 1] == second
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            while let Some(b) = self.peek_byte() {
                if b.is_ascii_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            if self.peek_pair(b'/', b'/') {
                while let Some(b) = self.advance() {
                    if b == b'\n' {
                        break;
                    }
                }
                continue;
            }

            if self.peek_pair(b'/', b'*') {
                let (line, col) = (self.line, self.col);
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        None => {
                            return Err(LexError {
                                line,
                                col,
                                message: "unterminated block comment".to_string(),
                            });
                        }
                        Some(b'*') if self.peek_byte() == Some(b'/') => {
                            self.advance();
                            break;
                        }
                        _ => {}
                    }
                }
                continue;
            }

            return Ok(());
        }
    }

    fn next_token(&mut self) -> Result<SpannedToken, LexError> {
        self.skip_whitespace_and_comments()?;

        let line = self.line;
        let col = self.col;

        let Some(b) = self.peek_byte() else {
            return Ok(SpannedToken {
                token: Token::Eof,
                line,
                col,
            });
        };

        let punct = match b {
            b':' => Some(Token::Colon),
            b',' => Some(Token::Comma),
            b'.' => Some(Token::Dot),
            b'@' => Some(Token::At),
            b'{' => Some(Token::LBrace),
            b'}' => Some(Token::RBrace),
            b'<' => Some(Token::LAngle),
            b'>' => Some(Token::RAngle),
            _ => None,
        };

        if let Some(token) = punct {
            self.advance();
            return Ok(SpannedToken { token, line, col });
        }

        if b.is_ascii_digit() {
            let mut num = 0u64;
            while let Some(d) = self.peek_byte() {
                if !d.is_ascii_digit() {
                    break;
                }
                num = num
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(u64::from(d - b'0')))
                    .ok_or_else(|| LexError {
                        line,
                        col,
                        message: "integer literal out of range".to_string(),
                    })?;
                self.advance();
            }
            return Ok(SpannedToken {
                token: Token::Integer(num),
                line,
                col,
            });
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            let start = self.pos;
            while let Some(c) = self.peek_byte() {
                if c.is_ascii_alphanumeric() || c == b'_' {
                    self.advance();
                } else {
                    break;
                }
            }
            // Identifier bytes are ASCII, so the slice is on char boundaries.
            let word = &self.input[start..self.pos];
            let token = match word {
                "package" => Token::Package,
                "record" => Token::Record,
                "primitive" => Token::Primitive,
                "streaming" => Token::Streaming,
                "list" => Token::List,
                "option" => Token::OptionKw,
                "any" => Token::Any,
                other => Token::Ident(other.to_string()),
            };
            return Ok(SpannedToken { token, line, col });
        }

        let ch = self.input[self.pos..].chars().next().unwrap_or('\u{fffd}');
        Err(LexError {
            line,
            col,
            message: format!("unexpected character: '{ch}'"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LexError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for LexError {}
