//! Análisis sintáctico.
//!
//! Parser descendente recursivo. Cada regla gramatical es un método que
//! consume tokens y retorna el subárbol que reconoció. El scope abierto
//! en cada punto se pasa explicítamente a las reglas que declaran
//! variables o que abren bloques anidados.
//!
//! La gramática es LL(1) con una única excepción: distinguir una llamada
//! `f(...)` de una lectura de variable requiere observar dos tokens, lo
//! cual se resuelve con [`Parser::lookahead()`] sobre una copia del cursor.
//!
//! El primer error aborta el análisis completo; no hay recuperación.

use std::{iter::Peekable, rc::Rc, slice};
use thiserror::Error;

use crate::{
    ast::{
        Ast, BinOp, Block, Comparison, Condition, Declaration, Expr, Function, Parameter,
        Statement, TypeName,
    },
    lex::{Identifier, Keyword, Kind, Operator, Token},
    scope::{Redeclared, Scope, Type},
    source::{Located, Location},
};

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected token: '{0}'")]
    ExpectedToken(Token),

    #[error("Expected token of type '{0}'")]
    ExpectedKind(Kind),

    #[error("Expected variable type")]
    ExpectedVarType,

    #[error("Expected return type")]
    ExpectedReturnType,

    #[error("Expected comparison operator")]
    ExpectedComparison,

    #[error("Illegal start of expression")]
    IllegalExpression,

    #[error("Reached end of file while parsing")]
    UnexpectedEof,

    #[error("Expected end of file")]
    TrailingInput,

    #[error(transparent)]
    Redeclared(#[from] Redeclared),
}

type Parse<T> = Result<T, Located<ParserError>>;

/// Construye el árbol sintáctico de un programa completo.
pub fn parse(tokens: &[Located<Token>]) -> Parse<Ast> {
    let mut parser = Parser {
        tokens: tokens.iter().peekable(),
        last_known: Location::default(),
        scopes: 0,
    };

    parser.program()
}

#[derive(Clone)]
struct Parser<'a> {
    tokens: Peekable<slice::Iter<'a, Located<Token>>>,
    last_known: Location,
    scopes: u32,
}

impl<'a> Parser<'a> {
    fn program(&mut self) -> Parse<Ast> {
        self.keyword(Keyword::Program)?;
        let name = self.id()?;
        self.keyword(Keyword::Begin)?;

        let mut scope = Scope::global();
        let globals = self.declarations(&mut scope)?;

        let mut functions = Vec::new();
        while self.sees_keyword(Keyword::Function) {
            functions.push(self.function(&scope)?);
        }

        self.keyword(Keyword::End)?;
        if let Some(token) = self.tokens.peek() {
            return Err(Located::at(ParserError::TrailingInput, *token.location()));
        }

        Ok(Ast {
            name,
            globals,
            scope: Rc::new(scope),
            functions,
            eof: self.last_known,
        })
    }

    fn declarations(&mut self, scope: &mut Scope) -> Parse<Vec<Declaration>> {
        let mut declarations = Vec::new();
        loop {
            let declaration = match self.peek_token() {
                Some(Token::Keyword(Keyword::String)) => self.string_declaration(scope)?,
                Some(Token::Keyword(Keyword::Int | Keyword::Float)) => {
                    self.var_declaration(scope)?
                }

                _ => break Ok(declarations),
            };

            declarations.push(declaration);
        }
    }

    fn string_declaration(&mut self, scope: &mut Scope) -> Parse<Declaration> {
        self.keyword(Keyword::String)?;
        let name = self.id()?;
        self.expect(Operator::Assign)?;

        let (location, token) = self.require(Kind::StringLiteral)?.split();
        let value = match token {
            Token::StringLiteral(text) => Located::at(text, location),
            _ => unreachable!(),
        };

        self.expect(Operator::Semicolon)?;

        scope
            .declare(name.clone(), Type::String, Some(Rc::clone(value.val())))
            .map_err(|error| error.map(ParserError::from))?;

        Ok(Declaration::Text { name, value })
    }

    fn var_declaration(&mut self, scope: &mut Scope) -> Parse<Declaration> {
        let of = self.var_type()?;
        let names = self.id_list()?;
        self.expect(Operator::Semicolon)?;

        for name in &names {
            declare(scope, name, *of.as_ref())?;
        }

        Ok(Declaration::Variables { of, names })
    }

    fn function(&mut self, global: &Scope) -> Parse<Function> {
        self.keyword(Keyword::Function)?;
        let returns = self.any_type()?;
        let name = self.id()?;

        // Los parámetros pertenecen al mismo scope que el cuerpo
        let mut scope = self.open(global);

        self.expect(Operator::OpenParen)?;
        let mut parameters = Vec::new();
        if matches!(self.peek_token(), Some(Token::Keyword(Keyword::Int | Keyword::Float))) {
            loop {
                let of = self.var_type()?;
                let name = self.id()?;

                declare(&mut scope, &name, *of.as_ref())?;
                parameters.push(Parameter { of, name });

                if !self.accept(Operator::Comma) {
                    break;
                }
            }
        }

        self.expect(Operator::CloseParen)?;
        self.keyword(Keyword::Begin)?;
        let body = self.block(scope)?;
        self.keyword(Keyword::End)?;

        Ok(Function {
            returns,
            name,
            parameters,
            body,
        })
    }

    fn block(&mut self, mut scope: Scope) -> Parse<Block> {
        let declarations = self.declarations(&mut scope)?;
        let statements = self.statements(&scope)?;

        Ok(Block {
            declarations,
            statements,
            scope: Rc::new(scope),
        })
    }

    fn statements(&mut self, scope: &Scope) -> Parse<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            let statement = match self.peek_token() {
                Some(Token::Keyword(Keyword::If)) => self.if_statement(scope)?,
                Some(Token::Keyword(Keyword::While)) => self.while_statement(scope)?,
                Some(Token::Keyword(Keyword::Read)) => Statement::Read(self.io_list(Keyword::Read)?),
                Some(Token::Keyword(Keyword::Write)) => {
                    Statement::Write(self.io_list(Keyword::Write)?)
                }

                Some(Token::Keyword(Keyword::Return)) => {
                    self.keyword(Keyword::Return)?;
                    let value = self.expr()?;
                    self.expect(Operator::Semicolon)?;

                    Statement::Return(value)
                }

                Some(Token::Id(_)) => {
                    let target = self.id()?;
                    self.expect(Operator::Assign)?;
                    let value = self.expr()?;
                    self.expect(Operator::Semicolon)?;

                    Statement::Assignment { target, value }
                }

                _ => break Ok(statements),
            };

            statements.push(statement);
        }
    }

    fn if_statement(&mut self, scope: &Scope) -> Parse<Statement> {
        self.keyword(Keyword::If)?;
        let inner = self.open(scope);

        self.expect(Operator::OpenParen)?;
        let condition = self.condition()?;
        self.expect(Operator::CloseParen)?;

        let then = self.block(inner)?;
        let otherwise = if self.accept_keyword(Keyword::Else) {
            let inner = self.open(scope);
            Some(self.block(inner)?)
        } else {
            None
        };

        self.keyword(Keyword::EndIf)?;

        Ok(Statement::If {
            condition,
            then,
            otherwise,
        })
    }

    fn while_statement(&mut self, scope: &Scope) -> Parse<Statement> {
        self.keyword(Keyword::While)?;
        let inner = self.open(scope);

        self.expect(Operator::OpenParen)?;
        let condition = self.condition()?;
        self.expect(Operator::CloseParen)?;

        let body = self.block(inner)?;
        self.keyword(Keyword::EndWhile)?;

        Ok(Statement::While { condition, body })
    }

    fn io_list(&mut self, keyword: Keyword) -> Parse<Vec<Located<Identifier>>> {
        self.keyword(keyword)?;
        self.expect(Operator::OpenParen)?;
        let names = self.id_list()?;
        self.expect(Operator::CloseParen)?;
        self.expect(Operator::Semicolon)?;

        Ok(names)
    }

    fn condition(&mut self) -> Parse<Condition> {
        let lhs = self.expr()?;

        let op = match self.peek_token() {
            Some(Token::Operator(Operator::Less)) => Comparison::Less,
            Some(Token::Operator(Operator::Greater)) => Comparison::Greater,
            Some(Token::Operator(Operator::LessOrEqual)) => Comparison::LessOrEqual,
            Some(Token::Operator(Operator::GreaterOrEqual)) => Comparison::GreaterOrEqual,
            Some(Token::Operator(Operator::Equal)) => Comparison::Equal,
            Some(Token::Operator(Operator::NotEqual)) => Comparison::NotEqual,
            _ => return self.fail(ParserError::ExpectedComparison),
        };

        self.next()?;
        let rhs = self.expr()?;

        Ok(Condition { lhs, op, rhs })
    }

    fn expr(&mut self) -> Parse<Located<Expr>> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Operator(Operator::Plus)) => BinOp::Add,
                Some(Token::Operator(Operator::Minus)) => BinOp::Sub,
                _ => break Ok(lhs),
            };

            self.next()?;
            lhs = binary(lhs, op, self.factor()?);
        }
    }

    fn factor(&mut self) -> Parse<Located<Expr>> {
        let mut lhs = self.postfix()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Operator(Operator::Times)) => BinOp::Mul,
                Some(Token::Operator(Operator::Divide)) => BinOp::Div,
                _ => break Ok(lhs),
            };

            self.next()?;
            lhs = binary(lhs, op, self.postfix()?);
        }
    }

    fn postfix(&mut self) -> Parse<Located<Expr>> {
        match self.peek_token() {
            Some(Token::Id(_)) if self.lookahead(Self::sees_call) => self.call(),

            Some(Token::Operator(Operator::OpenParen)) => {
                self.expect(Operator::OpenParen)?;
                let start = self.last_known;

                let expr = self.expr()?;
                self.expect(Operator::CloseParen)?;

                let (_, inner) = expr.split();
                Ok(Located::at(inner, Location::span(&start, &self.last_known)))
            }

            Some(Token::Id(_) | Token::IntLiteral(_) | Token::FloatLiteral(_)) => {
                let (location, token) = self.next()?.split();
                let expr = match token {
                    Token::Id(id) => Expr::Read(id),
                    Token::IntLiteral(text) => Expr::Int(text),
                    Token::FloatLiteral(text) => Expr::Float(text),
                    _ => unreachable!(),
                };

                Ok(Located::at(expr, location))
            }

            _ => self.fail(ParserError::IllegalExpression),
        }
    }

    fn call(&mut self) -> Parse<Located<Expr>> {
        let function = self.id()?;
        self.expect(Operator::OpenParen)?;

        let mut args = Vec::new();
        if self.sees_expr() {
            loop {
                args.push(self.expr()?);
                if !self.accept(Operator::Comma) {
                    break;
                }
            }
        }

        self.expect(Operator::CloseParen)?;

        let location = Location::span(function.location(), &self.last_known);
        Ok(Located::at(Expr::Call { function, args }, location))
    }

    fn sees_call(&mut self) -> bool {
        self.tokens.next().is_some() && self.accept(Operator::OpenParen)
    }

    fn sees_expr(&mut self) -> bool {
        matches!(
            self.peek_token(),
            Some(
                Token::Id(_)
                    | Token::IntLiteral(_)
                    | Token::FloatLiteral(_)
                    | Token::Operator(Operator::OpenParen)
            )
        )
    }

    fn var_type(&mut self) -> Parse<Located<TypeName>> {
        match self.peek_token() {
            Some(Token::Keyword(Keyword::Int)) => self.type_name(TypeName::Int),
            Some(Token::Keyword(Keyword::Float)) => self.type_name(TypeName::Float),
            _ => self.fail(ParserError::ExpectedVarType),
        }
    }

    fn any_type(&mut self) -> Parse<Located<TypeName>> {
        match self.peek_token() {
            Some(Token::Keyword(Keyword::Int)) => self.type_name(TypeName::Int),
            Some(Token::Keyword(Keyword::Float)) => self.type_name(TypeName::Float),
            Some(Token::Keyword(Keyword::Void)) => self.type_name(TypeName::Void),
            _ => self.fail(ParserError::ExpectedReturnType),
        }
    }

    fn type_name(&mut self, typ: TypeName) -> Parse<Located<TypeName>> {
        let location = *self.next()?.location();
        Ok(Located::at(typ, location))
    }

    fn id_list(&mut self) -> Parse<Vec<Located<Identifier>>> {
        let mut ids = vec![self.id()?];
        while self.accept(Operator::Comma) {
            ids.push(self.id()?);
        }

        Ok(ids)
    }

    /// Abre un scope anidado con el siguiente número disponible.
    fn open(&mut self, outer: &Scope) -> Scope {
        self.scopes += 1;
        Scope::nested(outer, self.scopes)
    }

    fn lookahead<T, F>(&mut self, rule: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        rule(&mut self.clone())
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        let (location, token) = self.require(Kind::Identifier)?.split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            _ => unreachable!(),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<()> {
        self.expect_token(Token::Keyword(keyword))
    }

    fn expect(&mut self, operator: Operator) -> Parse<()> {
        self.expect_token(Token::Operator(operator))
    }

    fn expect_token(&mut self, token: Token) -> Parse<()> {
        match self.peek_token() {
            Some(found) if *found == token => self.next().map(drop),
            Some(_) => self.fail(ParserError::ExpectedToken(token)),
            None => self.next().map(drop),
        }
    }

    fn require(&mut self, kind: Kind) -> Parse<Located<Token>> {
        match self.peek_token() {
            Some(found) if found.kind() == kind => self.next(),
            Some(_) => self.fail(ParserError::ExpectedKind(kind)),
            None => self.next(),
        }
    }

    fn accept(&mut self, operator: Operator) -> bool {
        self.accept_token(Token::Operator(operator))
    }

    fn accept_keyword(&mut self, keyword: Keyword) -> bool {
        self.accept_token(Token::Keyword(keyword))
    }

    fn accept_token(&mut self, token: Token) -> bool {
        let matches = self.peek_token() == Some(&token);
        if matches {
            self.tokens.next();
        }

        matches
    }

    fn sees_keyword(&mut self, keyword: Keyword) -> bool {
        self.peek_token() == Some(&Token::Keyword(keyword))
    }

    fn peek_token(&mut self) -> Option<&'a Token> {
        self.tokens.peek().map(|&token| token.val())
    }

    fn next(&mut self) -> Parse<Located<Token>> {
        match self.tokens.next() {
            Some(token) => {
                self.last_known = *token.location();
                Ok(token.clone())
            }

            None => Err(Located::at(ParserError::UnexpectedEof, self.last_known)),
        }
    }

    /// Falla en la ubicación del siguiente token, o del último si no hay más.
    fn fail<T>(&mut self, error: ParserError) -> Parse<T> {
        let location = match self.tokens.peek() {
            Some(token) => *token.location(),
            None => return Err(Located::at(ParserError::UnexpectedEof, self.last_known)),
        };

        Err(Located::at(error, location))
    }
}

fn declare(scope: &mut Scope, name: &Located<Identifier>, typ: TypeName) -> Parse<()> {
    let typ = match typ {
        TypeName::Int => Type::Int,
        TypeName::Float => Type::Float,
        TypeName::String => Type::String,
        TypeName::Void => unreachable!("void variable"),
    };

    scope
        .declare(name.clone(), typ, None)
        .map_err(|error| error.map(ParserError::from))
}

fn binary(lhs: Located<Expr>, op: BinOp, rhs: Located<Expr>) -> Located<Expr> {
    let location = Location::span(lhs.location(), rhs.location());
    Located::at(Expr::Binary(Box::new(lhs), op, Box::new(rhs)), location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::Lexer, source::Source};

    fn try_parse(text: &str) -> Parse<Ast> {
        let source = Source::new("<test>", text);
        let tokens = Lexer::new(source.chars()).try_exhaustive().unwrap();
        parse(&tokens)
    }

    fn main_body(ast: &Ast) -> &Block {
        &ast.functions.last().unwrap().body
    }

    #[test]
    fn parses_minimal_program() {
        let ast = try_parse("PROGRAM p BEGIN FUNCTION VOID main() BEGIN END END").unwrap();

        assert_eq!(ast.name.val().to_string(), "p");
        assert!(ast.globals.is_empty());
        assert_eq!(ast.functions.len(), 1);
        assert_eq!(ast.scope.id(), 0);
    }

    #[test]
    fn duplicate_declaration_in_one_statement() {
        let error = try_parse("PROGRAM p BEGIN INT a, a; END").unwrap_err();

        assert!(matches!(error.as_ref(), ParserError::Redeclared(_)));
        assert_eq!(
            (error.location().line(), error.location().column()),
            (1, 23)
        );
    }

    #[test]
    fn sibling_blocks_declare_independently() {
        let ast = try_parse(
            "PROGRAM p BEGIN
                FUNCTION VOID main() BEGIN
                    INT a;
                    IF (a < 1) INT t; t := 1; ENDIF
                    IF (a > 1) INT t; t := 2; ELSE INT t; t := 3; ENDIF
                END
            END",
        )
        .unwrap();

        let ids: Vec<_> = main_body(&ast)
            .statements
            .iter()
            .flat_map(|statement| match statement {
                Statement::If {
                    then, otherwise, ..
                } => {
                    let mut ids = vec![then.scope.id()];
                    ids.extend(otherwise.iter().map(|block| block.scope.id()));
                    ids
                }

                _ => panic!("unexpected statement"),
            })
            .collect();

        assert_eq!(ids, [2, 3, 4]);
    }

    #[test]
    fn parameters_share_the_function_scope() {
        let error = try_parse(
            "PROGRAM p BEGIN FUNCTION INT f(INT x) BEGIN FLOAT x; END END",
        )
        .unwrap_err();

        assert!(matches!(error.as_ref(), ParserError::Redeclared(_)));
    }

    #[test]
    fn inner_blocks_may_shadow() {
        let ast = try_parse(
            "PROGRAM p BEGIN INT x;
                FUNCTION VOID main() BEGIN
                    WHILE (x < 10) FLOAT x; x := 1.5; ENDWHILE
                END
            END",
        )
        .unwrap();

        match &main_body(&ast).statements[0] {
            Statement::While { body, .. } => {
                assert_eq!(body.scope.lookup("x").unwrap().mangled(), "var2x");
            }

            _ => panic!("expected WHILE"),
        }
    }

    #[test]
    fn calls_need_two_tokens_of_lookahead() {
        let ast = try_parse(
            "PROGRAM p BEGIN INT a;
                FUNCTION VOID main() BEGIN a := f(a, 2) + a; END
            END",
        )
        .unwrap();

        match &main_body(&ast).statements[0] {
            Statement::Assignment { value, .. } => match value.as_ref() {
                Expr::Binary(lhs, BinOp::Add, rhs) => {
                    assert!(matches!(lhs.val(), Expr::Call { args, .. } if args.len() == 2));
                    assert!(matches!(rhs.val(), Expr::Read(_)));
                }

                other => panic!("unexpected expression {:?}", other),
            },

            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn errors_point_at_offending_token() {
        let error = try_parse("PROGRAM p BEGIN\nFUNCTION VOID main() BEGIN\n  x := 1 END END")
            .unwrap_err();

        assert_eq!(error.as_ref().to_string(), "Expected token: ';'");
        assert_eq!((error.location().line(), error.location().column()), (3, 9));
    }

    #[test]
    fn error_messages() {
        let cases = [
            ("PROGRAM BEGIN END", "Expected token of type 'IDENTIFIER'"),
            ("PROGRAM p BEGIN STRING s := 1; END", "Expected token of type 'STRINGLITERAL'"),
            ("PROGRAM p BEGIN FUNCTION main() BEGIN END END", "Expected return type"),
            ("PROGRAM p BEGIN FUNCTION VOID f(VOID x) BEGIN END END", "Expected token: ')'"),
            (
                "PROGRAM p BEGIN FUNCTION VOID main() BEGIN IF (1) ENDIF END END",
                "Expected comparison operator",
            ),
            (
                "PROGRAM p BEGIN INT a; FUNCTION VOID main() BEGIN a := * 2; END END",
                "Illegal start of expression",
            ),
            ("PROGRAM p BEGIN", "Reached end of file while parsing"),
            ("PROGRAM p BEGIN END END", "Expected end of file"),
        ];

        for (text, message) in cases.iter() {
            let error = try_parse(text).unwrap_err();
            assert_eq!(&error.as_ref().to_string(), message, "for {:?}", text);
        }
    }
}
