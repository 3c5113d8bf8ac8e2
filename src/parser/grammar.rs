use crate::error::ParseError;
use super::ast::{AstField, AstMember, AstSchema};
use super::lexer::{Lexer, Located, Token};

/// Parse schema declaration text into an AST.
pub fn parse_schema(input: &str) -> Result<Vec<AstSchema>, ParseError> {
    let mut parser = Parser {
        lexer: Lexer::new(input),
    };
    let mut schemas = Vec::new();
    while !parser.at(&Token::Eof) {
        if !parser.at(&Token::Dot) {
            let found = parser.lexer.next_token();
            return Err(Parser::error(&found, "a schema declaration (.)"));
        }
        schemas.push(parser.declaration()?);
    }
    Ok(schemas)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl Parser<'_> {
    fn error(found: &Located, wanted: &str) -> ParseError {
        ParseError::Syntax {
            line: found.line,
            message: format!("expected {}, found {:?}", wanted, found.token),
        }
    }

    fn at(&mut self, token: &Token) -> bool {
        &self.lexer.peek_token().token == token
    }

    /// Consume `token` if it comes next.
    fn eat(&mut self, token: &Token) -> bool {
        let next = self.at(token);
        if next {
            self.lexer.next_token();
        }
        next
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        let found = self.lexer.next_token();
        if found.token == token {
            Ok(())
        } else {
            Err(Self::error(&found, &format!("{:?}", token)))
        }
    }

    fn name(&mut self) -> Result<String, ParseError> {
        match self.lexer.next_token() {
            Located {
                token: Token::Name(name),
                ..
            } => Ok(name),
            found => Err(Self::error(&found, "a name")),
        }
    }

    fn number(&mut self) -> Result<u64, ParseError> {
        match self.lexer.next_token() {
            Located {
                token: Token::Number(n),
                ..
            } => Ok(n),
            found => Err(Self::error(&found, "a number")),
        }
    }

    /// `.Name { member* }`
    fn declaration(&mut self) -> Result<AstSchema, ParseError> {
        let line = self.lexer.peek_token().line;
        self.expect(Token::Dot)?;
        let name = self.name()?;
        self.expect(Token::LBrace)?;

        let mut members = Vec::new();
        loop {
            let next = self.lexer.peek_token();
            let member = match next.token {
                Token::RBrace | Token::Eof => break,
                Token::Dot => AstMember::NestedSchema(self.declaration()?),
                Token::Name(_) => AstMember::Field(self.field()?),
                _ => return Err(Self::error(&next, "a field, a nested schema or '}'")),
            };
            members.push(member);
        }

        self.expect(Token::RBrace)?;
        Ok(AstSchema {
            name,
            members,
            line,
        })
    }

    /// `name : [*]type[(n)]`; schema references are resolved later.
    fn field(&mut self) -> Result<AstField, ParseError> {
        let line = self.lexer.peek_token().line;
        let name = self.name()?;
        self.expect(Token::Colon)?;
        let is_array = self.eat(&Token::Star);
        let type_name = self.name()?;
        let param = if self.eat(&Token::LParen) {
            let n = self.number()?;
            self.expect(Token::RParen)?;
            Some(n)
        } else {
            None
        };
        Ok(AstField {
            name,
            is_array,
            type_name,
            param,
            line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_field(schema: &AstSchema) -> &AstField {
        match &schema.members[0] {
            AstMember::Field(f) => f,
            _ => panic!("expected field"),
        }
    }

    #[test]
    fn test_parse_simple_schema() {
        let items = parse_schema(".Person { name : string  id : int32 }").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Person");
        assert_eq!(items[0].members.len(), 2);
    }

    #[test]
    fn test_parse_array_field() {
        let items = parse_schema(".Data { items : *Item }").unwrap();
        let f = first_field(&items[0]);
        assert!(f.is_array);
        assert_eq!(f.type_name, "Item");
        assert_eq!(f.param, None);
    }

    #[test]
    fn test_parse_param() {
        let items = parse_schema(".Data { price : uint32(2) }").unwrap();
        assert_eq!(first_field(&items[0]).param, Some(2));
    }

    #[test]
    fn test_parse_nested_schema() {
        let schema = r#"
        .Person {
            name : string
            .Phone {
                number : string_small(12)
            }
            phone : *Phone
        }
        "#;
        let items = parse_schema(schema).unwrap();
        assert_eq!(items[0].members.len(), 3);
        assert!(matches!(&items[0].members[1], AstMember::NestedSchema(s) if s.name == "Phone"));
    }

    #[test]
    fn test_field_line_numbers() {
        let items = parse_schema("\n.T {\n  a : int8\n  b : int8\n}").unwrap();
        assert_eq!(items[0].line, 2);
        match &items[0].members[1] {
            AstMember::Field(f) => assert_eq!(f.line, 4),
            _ => panic!("expected field"),
        }
    }

    #[test]
    fn test_syntax_errors() {
        for text in [
            "Person { }",
            ".Person { name string }",
            ".Person { name : }",
            ".Person { name : int32( }",
            ".Person { name : int32(x) }",
            ".Person { name : int32",
            ".Person { ! }",
        ] {
            assert!(
                matches!(parse_schema(text), Err(ParseError::Syntax { .. })),
                "{}",
                text
            );
        }
    }
}
