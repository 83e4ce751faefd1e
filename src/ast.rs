//! Árbol sintáctico.
//!
//! El parser construye directamente los tipos de este módulo: cada regla
//! gramatical retorna el subárbol que reconoció, por lo cual la aridad de
//! cada nodo queda garantizada por tipos. Los bloques léxicos llevan
//! consigo su [`Scope`], ya sellado.
//!
//! # Vista etiquetada
//! Para depuración y pruebas existe además una vista uniforme del árbol,
//! [`Node`], en la que cada nodo es una [`Tag`] con un valor opcional,
//! una lista de hijos y opcionalmente la tabla de símbolos de su bloque.
//! Esta vista se imprime como elementos anidados de la forma
//! `<Tag valor table="...">` ... `</Tag>` o `<Tag valor/>`.

use std::{
    fmt::{self, Display},
    rc::Rc,
};

use crate::{
    lex::Identifier,
    scope::Scope,
    source::{Located, Location},
};

/// Un programa completo.
#[derive(Debug)]
pub struct Ast {
    /// Nombre que sigue a `PROGRAM`.
    pub name: Located<Identifier>,

    /// Declaraciones globales.
    pub globals: Vec<Declaration>,

    /// Scope global, número 0.
    pub scope: Rc<Scope>,

    /// Funciones, en orden de aparición.
    pub functions: Vec<Function>,

    /// Ubicación del último token del programa.
    pub eof: Location,
}

#[derive(Debug)]
pub struct Function {
    pub returns: Located<TypeName>,
    pub name: Located<Identifier>,
    pub parameters: Vec<Parameter>,
    pub body: Block,
}

#[derive(Debug)]
pub struct Parameter {
    pub of: Located<TypeName>,
    pub name: Located<Identifier>,
}

/// Región de declaraciones seguidas de sentencias con un scope propio.
#[derive(Debug)]
pub struct Block {
    pub declarations: Vec<Declaration>,
    pub statements: Vec<Statement>,
    pub scope: Rc<Scope>,
}

/// Tipo escrito en el código fuente.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Float,
    String,
    Void,
}

#[derive(Debug)]
pub enum Declaration {
    /// `STRING nombre := "literal";`
    Text {
        name: Located<Identifier>,
        value: Located<Rc<str>>,
    },

    /// `INT a, b;` o `FLOAT a, b;`
    Variables {
        of: Located<TypeName>,
        names: Vec<Located<Identifier>>,
    },
}

#[derive(Debug)]
pub enum Statement {
    Assignment {
        target: Located<Identifier>,
        value: Located<Expr>,
    },

    Read(Vec<Located<Identifier>>),

    Write(Vec<Located<Identifier>>),

    If {
        condition: Condition,
        then: Block,
        otherwise: Option<Block>,
    },

    While {
        condition: Condition,
        body: Block,
    },

    Return(Located<Expr>),
}

/// Una única comparación entre dos expresiones.
#[derive(Debug)]
pub struct Condition {
    pub lhs: Located<Expr>,
    pub op: Comparison,
    pub rhs: Located<Expr>,
}

#[derive(Debug)]
pub enum Expr {
    /// Literal entero, con su lexema original.
    Int(Rc<str>),

    /// Literal real, con su lexema original.
    Float(Rc<str>),

    /// Lectura de una variable.
    Read(Identifier),

    Binary(Box<Located<Expr>>, BinOp, Box<Located<Expr>>),

    Call {
        function: Located<Identifier>,
        args: Vec<Located<Expr>>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comparison {
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

impl Comparison {
    /// Comparación que es verdadera exactamente cuando esta es falsa.
    pub fn negate(self) -> Comparison {
        use Comparison::*;

        match self {
            Less => GreaterOrEqual,
            Greater => LessOrEqual,
            LessOrEqual => Greater,
            GreaterOrEqual => Less,
            Equal => NotEqual,
            NotEqual => Equal,
        }
    }
}

/// Etiqueta de un nodo en la vista uniforme.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    Identifier,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    NotEqual,
    Equal,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Assignment,
    Read,
    Write,
    If,
    While,
    Return,
    Call,
    Condition,
    StringDeclaration,
    VariableDeclaration,
    DeclarationList,
    StatementList,
    IntType,
    FloatType,
    StringType,
    VoidType,
    Parameter,
    ParameterList,
    Function,
    FunctionList,
    Program,
}

impl Display for Tag {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, fmt)
    }
}

impl From<BinOp> for Tag {
    fn from(op: BinOp) -> Self {
        match op {
            BinOp::Add => Tag::Addition,
            BinOp::Sub => Tag::Subtraction,
            BinOp::Mul => Tag::Multiplication,
            BinOp::Div => Tag::Division,
        }
    }
}

impl From<Comparison> for Tag {
    fn from(op: Comparison) -> Self {
        match op {
            Comparison::Less => Tag::LessThan,
            Comparison::Greater => Tag::GreaterThan,
            Comparison::LessOrEqual => Tag::LessThanEqual,
            Comparison::GreaterOrEqual => Tag::GreaterThanEqual,
            Comparison::Equal => Tag::Equal,
            Comparison::NotEqual => Tag::NotEqual,
        }
    }
}

impl From<TypeName> for Tag {
    fn from(typ: TypeName) -> Self {
        match typ {
            TypeName::Int => Tag::IntType,
            TypeName::Float => Tag::FloatType,
            TypeName::String => Tag::StringType,
            TypeName::Void => Tag::VoidType,
        }
    }
}

/// Nodo de la vista uniforme del árbol.
#[derive(Debug)]
pub struct Node {
    tag: Tag,
    value: Option<String>,
    children: Vec<Node>,
    scope: Option<Rc<Scope>>,
}

impl Node {
    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Tabla de símbolos asociada, solo en bloques con declaraciones.
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_deref()
    }

    fn leaf<V: ToString>(tag: Tag, value: V) -> Self {
        Node {
            tag,
            value: Some(value.to_string()),
            children: Vec::new(),
            scope: None,
        }
    }

    fn branch(tag: Tag, children: Vec<Node>) -> Self {
        Node {
            tag,
            value: None,
            children,
            scope: None,
        }
    }

    fn with_scope(mut self, scope: &Rc<Scope>) -> Self {
        if !scope.is_empty() {
            self.scope = Some(Rc::clone(scope));
        }

        self
    }
}

impl Display for Node {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "<{}", self.tag)?;
        if let Some(value) = &self.value {
            write!(fmt, " {}", value)?;
        }

        if let Some(scope) = &self.scope {
            write!(fmt, " table=\"{}\"", scope)?;
        }

        if self.children.is_empty() {
            return writeln!(fmt, "/>");
        }

        writeln!(fmt, ">")?;
        for child in &self.children {
            child.fmt(fmt)?;
        }

        writeln!(fmt, "</{}>", self.tag)
    }
}

impl Ast {
    /// Construye la vista uniforme del programa.
    pub fn tree(&self) -> Node {
        let globals = declaration_list(&self.globals).with_scope(&self.scope);
        let functions = self.functions.iter().map(Function::tree).collect();

        Node::branch(
            Tag::Program,
            vec![
                identifier(&self.name),
                globals,
                Node::branch(Tag::FunctionList, functions),
            ],
        )
    }
}

impl Display for Ast {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tree().fmt(fmt)
    }
}

impl Function {
    fn tree(&self) -> Node {
        let parameters = self
            .parameters
            .iter()
            .map(|parameter| {
                Node::branch(
                    Tag::Parameter,
                    vec![type_name(&parameter.of), identifier(&parameter.name)],
                )
            })
            .collect();

        let [declarations, statements] = self.body.tree();
        Node::branch(
            Tag::Function,
            vec![
                type_name(&self.returns),
                identifier(&self.name),
                Node::branch(Tag::ParameterList, parameters),
                declarations,
                statements,
            ],
        )
    }
}

impl Block {
    fn tree(&self) -> [Node; 2] {
        let statements = self.statements.iter().map(Statement::tree).collect();

        [
            declaration_list(&self.declarations),
            Node::branch(Tag::StatementList, statements).with_scope(&self.scope),
        ]
    }
}

impl Statement {
    fn tree(&self) -> Node {
        match self {
            Statement::Assignment { target, value } => {
                Node::branch(Tag::Assignment, vec![identifier(target), value.val().tree()])
            }

            Statement::Read(names) => {
                Node::branch(Tag::Read, names.iter().map(identifier).collect())
            }

            Statement::Write(names) => {
                Node::branch(Tag::Write, names.iter().map(identifier).collect())
            }

            Statement::If {
                condition,
                then,
                otherwise,
            } => {
                let mut children = vec![condition.tree()];
                children.extend(then.tree());
                if let Some(otherwise) = otherwise {
                    children.extend(otherwise.tree());
                }

                Node::branch(Tag::If, children)
            }

            Statement::While { condition, body } => {
                let mut children = vec![condition.tree()];
                children.extend(body.tree());

                Node::branch(Tag::While, children)
            }

            Statement::Return(value) => Node::branch(Tag::Return, vec![value.val().tree()]),
        }
    }
}

impl Condition {
    fn tree(&self) -> Node {
        let comparison = Node::branch(
            Tag::from(self.op),
            vec![self.lhs.val().tree(), self.rhs.val().tree()],
        );

        Node::branch(Tag::Condition, vec![comparison])
    }
}

impl Expr {
    fn tree(&self) -> Node {
        match self {
            Expr::Int(text) => Node::leaf(Tag::IntLiteral, text),
            Expr::Float(text) => Node::leaf(Tag::FloatLiteral, text),
            Expr::Read(id) => Node::leaf(Tag::Identifier, id),

            Expr::Binary(lhs, op, rhs) => Node::branch(
                Tag::from(*op),
                vec![lhs.val().tree(), rhs.val().tree()],
            ),

            Expr::Call { function, args } => Node {
                tag: Tag::Call,
                value: Some(function.as_ref().to_string()),
                children: args.iter().map(|arg| arg.val().tree()).collect(),
                scope: None,
            },
        }
    }
}

fn declaration_list(declarations: &[Declaration]) -> Node {
    let children = declarations
        .iter()
        .map(|declaration| match declaration {
            Declaration::Text { name, value } => Node::branch(
                Tag::StringDeclaration,
                vec![
                    identifier(name),
                    Node::leaf(Tag::StringLiteral, value.as_ref()),
                ],
            ),

            Declaration::Variables { of, names } => {
                let mut children = vec![type_name(of)];
                children.extend(names.iter().map(identifier));

                Node::branch(Tag::VariableDeclaration, children)
            }
        })
        .collect();

    Node::branch(Tag::DeclarationList, children)
}

fn identifier(id: &Located<Identifier>) -> Node {
    Node::leaf(Tag::Identifier, id.as_ref())
}

fn type_name(typ: &Located<TypeName>) -> Node {
    Node::branch(Tag::from(*typ.as_ref()), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::Lexer, parse, source::Source};

    fn parse_text(text: &str) -> Ast {
        let source = Source::new("<test>", text);
        let tokens = Lexer::new(source.chars()).try_exhaustive().unwrap();
        parse::parse(&tokens).unwrap()
    }

    #[test]
    fn program_has_three_children() {
        let ast = parse_text("PROGRAM p BEGIN FUNCTION VOID main() BEGIN END END");
        let tree = ast.tree();

        assert_eq!(tree.tag(), Tag::Program);
        let tags: Vec<_> = tree.children().iter().map(Node::tag).collect();
        assert_eq!(tags, [Tag::Identifier, Tag::DeclarationList, Tag::FunctionList]);
        assert_eq!(tree.children()[0].value(), Some("p"));
    }

    #[test]
    fn operators_associate_left_and_nest_by_precedence() {
        let ast = parse_text(
            "PROGRAM p BEGIN INT a; FUNCTION VOID main() BEGIN a := 1 - 2 - 3 * 4; END END",
        );

        let tree = ast.tree();
        let main = &tree.children()[2].children()[0];
        let statements = &main.children()[4];
        let value = &statements.children()[0].children()[1];

        // ((1 - 2) - (3 * 4))
        assert_eq!(value.tag(), Tag::Subtraction);
        assert_eq!(value.children()[0].tag(), Tag::Subtraction);
        assert_eq!(value.children()[1].tag(), Tag::Multiplication);
        assert_eq!(value.children()[0].children()[0].value(), Some("1"));
    }

    #[test]
    fn only_blocks_with_declarations_carry_tables() {
        let ast = parse_text(
            "PROGRAM p BEGIN
                FUNCTION VOID main() BEGIN
                    INT a;
                    IF (a < 1) a := 1; ENDIF
                END
            END",
        );

        let tree = ast.tree();
        assert!(tree.children()[1].scope().is_none());

        let main = &tree.children()[2].children()[0];
        let body = &main.children()[4];
        assert_eq!(body.scope().map(Scope::id), Some(1));

        let branch = &body.children()[0];
        assert_eq!(branch.tag(), Tag::If);
        assert_eq!(branch.children().len(), 3);
        assert!(branch.children()[2].scope().is_none());
    }

    #[test]
    fn renders_nested_elements() {
        let ast = parse_text(
            "PROGRAM p BEGIN STRING s := \"hi\"; FUNCTION VOID main() BEGIN WRITE(s); END END",
        );

        let expected = "\
<Program>
<Identifier p/>
<DeclarationList table=\"Symbol table 0
name s_0 type STRING value \"hi\"\">
<StringDeclaration>
<Identifier s/>
<StringLiteral hi/>
</StringDeclaration>
</DeclarationList>
<FunctionList>
<Function>
<VoidType/>
<Identifier main/>
<ParameterList/>
<DeclarationList/>
<StatementList>
<Write>
<Identifier s/>
</Write>
</StatementList>
</Function>
</FunctionList>
</Program>
";

        assert_eq!(ast.to_string(), expected);
    }
}
