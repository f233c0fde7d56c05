/// Recursive-descent parser for the paw schema IDL.
use crate::ast::*;
use crate::lexer::{LexError, Lexer, SpannedToken, Token};
use std::fmt;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        Self {
            line: e.line,
            col: e.col,
            message: e.message,
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    pub fn parse(input: &str) -> Result<File, ParseError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        let mut parser = Self { tokens, pos: 0 };
        parser.parse_file()
    }

    // -- Helpers --

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn error(&self, message: String) -> ParseError {
        let t = &self.tokens[self.pos];
        ParseError {
            line: t.line,
            col: t.col,
            message,
        }
    }

    fn advance(&mut self) {
        // The trailing Eof token is never consumed.
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {expected}, got {}", self.peek())))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Ident(s) => {
                self.advance();
                Ok(s)
            }
            // Soft keywords are fine as field names.
            tok @ (Token::Streaming | Token::Primitive) => {
                self.advance();
                Ok(tok.to_string())
            }
            other => Err(self.error(format!("expected identifier, got {other}"))),
        }
    }

    fn expect_integer(&mut self) -> Result<u64, ParseError> {
        match self.peek().clone() {
            Token::Integer(n) => {
                self.advance();
                Ok(n)
            }
            other => Err(self.error(format!("expected integer, got {other}"))),
        }
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    // -- Top-level --

    fn parse_file(&mut self) -> Result<File, ParseError> {
        let package = self.parse_package_decl()?;
        let mut types = Vec::new();
        while !self.at(&Token::Eof) {
            types.push(self.parse_type_decl()?);
        }
        Ok(File { package, types })
    }

    fn parse_package_decl(&mut self) -> Result<PackageDecl, ParseError> {
        self.expect(&Token::Package)?;
        let namespace = self.expect_ident()?;
        self.expect(&Token::Colon)?;
        let name = self.expect_ident()?;
        let version = if self.eat(&Token::At) {
            Some(self.parse_version()?)
        } else {
            None
        };
        Ok(PackageDecl {
            namespace,
            name,
            version,
        })
    }

    fn parse_version(&mut self) -> Result<String, ParseError> {
        let major = self.expect_integer()?;
        self.expect(&Token::Dot)?;
        let minor = self.expect_integer()?;
        self.expect(&Token::Dot)?;
        let patch = self.expect_integer()?;
        Ok(format!("{major}.{minor}.{patch}"))
    }

    // -- Type declarations --

    fn parse_type_decl(&mut self) -> Result<TypeDecl, ParseError> {
        let primitive = match self.peek() {
            Token::Record => false,
            Token::Primitive => true,
            other => {
                return Err(self.error(format!(
                    "expected `record` or `primitive`, got {other}"
                )));
            }
        };
        self.advance();

        let name = self.expect_ident()?;
        let base = if self.eat(&Token::Colon) {
            if primitive {
                return Err(self.error(format!(
                    "primitive type '{name}' cannot derive from another type"
                )));
            }
            Some(self.expect_ident()?)
        } else {
            None
        };

        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        loop {
            if self.at(&Token::RBrace) {
                break;
            }
            fields.push(self.parse_field()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;

        Ok(TypeDecl {
            name,
            base,
            primitive,
            fields,
        })
    }

    fn parse_field(&mut self) -> Result<Field, ParseError> {
        let streaming = if self.eat(&Token::At) {
            self.expect(&Token::Streaming)?;
            true
        } else {
            false
        };
        let name = self.expect_ident()?;
        self.expect(&Token::Colon)?;
        let ty = self.parse_type_expr()?;
        Ok(Field {
            name,
            ty,
            streaming,
        })
    }

    fn parse_type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        match self.peek().clone() {
            Token::List => {
                self.advance();
                self.expect(&Token::LAngle)?;
                let inner = self.parse_type_expr()?;
                self.expect(&Token::RAngle)?;
                Ok(TypeExpr::list(inner))
            }
            Token::OptionKw => {
                self.advance();
                self.expect(&Token::LAngle)?;
                let inner = self.parse_type_expr()?;
                self.expect(&Token::RAngle)?;
                Ok(TypeExpr::option(inner))
            }
            Token::Any => {
                self.advance();
                Ok(TypeExpr::Any)
            }
            Token::Ident(name) => {
                self.advance();
                Ok(TypeExpr::named(name))
            }
            other => Err(self.error(format!("expected type expression, got {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let input = r#"
            package test:minimal@0.1.0

            record empty {}
        "#;
        let file = Parser::parse(input).unwrap();
        assert_eq!(file.package.namespace, "test");
        assert_eq!(file.package.name, "minimal");
        assert_eq!(file.package.version.as_deref(), Some("0.1.0"));
        assert_eq!(file.types.len(), 1);
        assert!(file.types[0].fields.is_empty());
    }

    #[test]
    fn test_parse_package_without_version() {
        let file = Parser::parse("package test:bare").unwrap();
        assert_eq!(file.package.version, None);
        assert!(file.types.is_empty());
    }

    #[test]
    fn test_parse_primitive_and_record() {
        let input = r#"
            package test:records@0.1.0

            primitive float3 { x: f32, y: f32, z: f32 }

            record streaming_tile {
                position: float3,
                entities: list<entity>,
            }
        "#;
        let file = Parser::parse(input).unwrap();
        assert!(file.types[0].primitive);
        assert_eq!(file.types[0].fields.len(), 3);
        assert_eq!(file.types[0].fields[0].ty, TypeExpr::Scalar("f32".into()));

        let tile = &file.types[1];
        assert!(!tile.primitive);
        assert_eq!(tile.fields[0].ty, TypeExpr::Named("float3".into()));
        assert_eq!(
            tile.fields[1].ty,
            TypeExpr::list(TypeExpr::Named("entity".into()))
        );
    }

    #[test]
    fn test_parse_streaming_field_and_base() {
        let input = r#"
            package test:poly

            record map { @streaming tiles: list<streaming_tile> }
            record transform_component : component {
                children: list<transform_component>,
                parent: option<any>,
            }
        "#;
        let file = Parser::parse(input).unwrap();
        assert!(file.types[0].fields[0].streaming);
        assert_eq!(file.types[1].base.as_deref(), Some("component"));
        assert!(!file.types[1].fields[0].streaming);
        assert_eq!(file.types[1].fields[1].ty, TypeExpr::option(TypeExpr::Any));
    }

    #[test]
    fn test_soft_keyword_field_name() {
        let file = Parser::parse("package t:k record a { streaming: bool }").unwrap();
        assert_eq!(file.types[0].fields[0].name, "streaming");
    }

    #[test]
    fn test_primitive_cannot_derive() {
        let err = Parser::parse("package t:p primitive a : b {}").unwrap_err();
        assert!(err.message.contains("cannot derive"));
    }

    #[test]
    fn test_missing_colon_reports_position() {
        let err = Parser::parse("package t:e\nrecord a { x f32 }").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("expected :"));
    }

    #[test]
    fn test_unknown_annotation_rejected() {
        let err = Parser::parse("package t:e record a { @owned x: b }").unwrap_err();
        assert!(err.message.contains("expected streaming"));
    }
}
