//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un flujo de
//! caracteres con posiciones (ver [`Source::chars()`]) en unidades léxicas
//! denominadas tokens. Los espacios en blanco y los comentarios se descartan
//! durante esta operación. Cada token emitido está asociado a una ubicación
//! en el código fuente original, lo cual permite rastrear errores tanto en
//! los mismos como en constructos más elevados de fases posteriores.
//!
//! # Contenido de un token
//! Operadores, puntuación y palabras clave se identifican por el hecho de
//! lo que son. Identificadores y literales preservan su lexema original, ya
//! que este se transporta sin cambios hasta el código emitido.
//!
//! # Reglas importantes del lenguaje
//! - El lenguaje distingue mayúsculas de minúsculas: `BEGIN` es una
//!   palabra clave, `begin` es un identificador.
//! - Los comentarios inician con `--` y terminan al final de la línea.
//! - Una constante con `.` es real; puede iniciar con `.`, como en `.5`.
//! - Los literales de texto no admiten secuencias de escape ni saltos
//!   de línea.
//!
//! # Errores
//! El lexer es capaz de recuperarse parcialmente de condiciones de error.
//! Esto ocurre en suficiente grado como para reportar más de un error por
//! ejecución, pero no lo suficiente como para permitir el avance a las
//! demás fases de la compilación.
//!
//! [`Source::chars()`]: crate::source::Source::chars

use crate::source::{Located, Location, Position};
use std::{
    borrow::Borrow,
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Se esperaba un carácter específico en esta posición.
    #[error("Expected {0:?}")]
    Expected(char),

    /// Un literal de texto alcanzó el final de la línea.
    #[error("Unterminated string literal")]
    UnterminatedString,

    /// Una constante numérica con más de un punto, o solo un punto.
    #[error("Malformed numeric literal")]
    MalformedNumber,
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Clase de un token, tal como se reporta en errores de sintaxis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Identifier,
    Keyword,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    Operator,
}

impl Display for Kind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Identifier => "IDENTIFIER",
            Kind::Keyword => "KEYWORD",
            Kind::IntLiteral => "INTLITERAL",
            Kind::FloatLiteral => "FLOATLITERAL",
            Kind::StringLiteral => "STRINGLITERAL",
            Kind::Operator => "OPERATOR",
        };

        fmt.write_str(name)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal de entero, con su lexema original.
    IntLiteral(Rc<str>),

    /// Literal real, con su lexema original.
    FloatLiteral(Rc<str>),

    /// Literal de texto, sin comillas.
    StringLiteral(Rc<str>),

    /// Operador o signo de puntuación.
    Operator(Operator),
}

impl Token {
    /// Clase a la que pertenece este token.
    pub fn kind(&self) -> Kind {
        match self {
            Token::Id(_) => Kind::Identifier,
            Token::Keyword(_) => Kind::Keyword,
            Token::IntLiteral(_) => Kind::IntLiteral,
            Token::FloatLiteral(_) => Kind::FloatLiteral,
            Token::StringLiteral(_) => Kind::StringLiteral,
            Token::Operator(_) => Kind::Operator,
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Id(id) => id.fmt(fmt),
            Token::Keyword(keyword) => keyword.fmt(fmt),
            Token::IntLiteral(text) | Token::FloatLiteral(text) => fmt.write_str(text),
            Token::StringLiteral(text) => write!(fmt, "\"{}\"", text),
            Token::Operator(operator) => operator.fmt(fmt),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Program,
    Begin,
    End,
    Function,
    Read,
    Write,
    If,
    Else,
    EndIf,
    While,
    EndWhile,
    Continue,
    Break,
    Return,
    Int,
    Void,
    String,
    Float,
}

/// Tabla de palabras clave y sus lexemas.
const KEYWORDS: &[(&str, Keyword)] = &[
    ("PROGRAM",  Keyword::Program),
    ("BEGIN",    Keyword::Begin),
    ("END",      Keyword::End),
    ("FUNCTION", Keyword::Function),
    ("READ",     Keyword::Read),
    ("WRITE",    Keyword::Write),
    ("IF",       Keyword::If),
    ("ELSE",     Keyword::Else),
    ("ENDIF",    Keyword::EndIf),
    ("WHILE",    Keyword::While),
    ("ENDWHILE", Keyword::EndWhile),
    ("CONTINUE", Keyword::Continue),
    ("BREAK",    Keyword::Break),
    ("RETURN",   Keyword::Return),
    ("INT",      Keyword::Int),
    ("VOID",     Keyword::Void),
    ("STRING",   Keyword::String),
    ("FLOAT",    Keyword::Float),
];

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (string, _) = KEYWORDS
            .iter()
            .find(|(_, keyword)| keyword == self)
            .expect("keyword missing from table");

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Operadores y signos de puntuación.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    /// `:=`
    Assign,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Divide,

    /// `=`
    Equal,

    /// `!=`
    NotEqual,

    /// `<`
    Less,

    /// `>`
    Greater,

    /// `<=`
    LessOrEqual,

    /// `>=`
    GreaterOrEqual,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `;`
    Semicolon,

    /// `,`
    Comma,
}

impl Operator {
    /// Operadores que constan de un único carácter sin ambigüedad.
    fn single(c: char) -> Option<Operator> {
        use Operator::*;

        let operator = match c {
            '+' => Plus,
            '*' => Times,
            '/' => Divide,
            '=' => Equal,
            '(' => OpenParen,
            ')' => CloseParen,
            ';' => Semicolon,
            ',' => Comma,
            _ => return None,
        };

        Some(operator)
    }
}

impl Display for Operator {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Operator::*;

        let string = match self {
            Assign         => ":=",
            Plus           => "+",
            Minus          => "-",
            Times          => "*",
            Divide         => "/",
            Equal          => "=",
            NotEqual       => "!=",
            Less           => "<",
            Greater        => ">",
            LessOrEqual    => "<=",
            GreaterOrEqual => ">=",
            OpenParen      => "(",
            CloseParen     => ")",
            Semicolon      => ";",
            Comma          => ",",
        };

        fmt.write_str(string)
    }
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<S: Iterator<Item = (char, Position)>> {
    source: Peekable<S>,
    state: State,
    lexeme: String,
    start: Position,
    last: Position,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de error.
    Error,

    /// Estado de completitud; siempre emite el token incluido,
    /// sin consumir la entrada actual, y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `-`.
    ///
    /// Si sigue otro `-` se entra en un comentario.
    Dash,

    /// Comentario de línea.
    ///
    /// Este estado vuelve a [`State::Start`] al encontrar `'\n'`.
    Comment,

    /// Se encontró uno de `:`, `!`, `<` o `>`, que pueden formar
    /// operadores de dos caracteres al ser seguidos por `=`.
    Pair(char),

    /// Constante numérica, real si ya se encontró un punto.
    Number { dot: bool },

    /// Término que puede ser un identificador o una palabra clave.
    Word,

    /// Literal de texto entre comillas.
    Text,
}

impl<S: Iterator<Item = (char, Position)>> Lexer<S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(source: S) -> Self {
        Lexer {
            source: source.peekable(),
            state: State::Start,
            lexeme: String::new(),
            start: Position::default(),
            last: Position::default(),
        }
    }

    /// Reduce la entrada a una secuencia conocida de tokens
    /// infalibles o una secuencia de errores.
    ///
    /// En caso de que ocurra al menos un error, el lexer dejará
    /// de buscar tokens exitosos y comenzará a acumular solamente
    /// errores. El propósito de esta función es permitir la
    /// recolección de múltiples errores léxicos en una misma ejecución
    /// del compilador.
    pub fn try_exhaustive(mut self) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
        let mut tokens = Vec::new();

        while let Some(result) = self.next() {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => {
                    drop(tokens);

                    let mut errors = vec![error];
                    errors.extend(self.filter_map(Result::err));

                    return Err(errors);
                }
            }
        }

        Ok(tokens)
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<Token>, LexerError> {
        use State::*;

        loop {
            let next = self.source.peek().copied();

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let (Start, Some((_, position))) = (&self.state, next) {
                self.start = position;
            }

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next.map(|(c, _)| c)) {
                // Condiciones de error: se descarta la línea donde
                // ocurrió el error. Al llegar al final de la línea
                // el lexer se recupera y reinicia.
                (Error, None) => return Ok(None),
                (Error, Some('\n')) => self.state = Start,
                (Error, Some(_)) => (),

                (Start, None) => return Ok(None),
                (Start, Some(c)) if c.is_whitespace() => (),

                (Start, Some('"')) => self.state = Text,
                (Start, Some('-')) => self.state = Dash,
                (Start, Some(c @ (':' | '!' | '<' | '>'))) => self.state = Pair(c),

                // Identificadores y palabras clave
                (Start, Some(c)) if c.is_ascii_alphabetic() => {
                    self.lexeme.push(c);
                    self.state = Word;
                }

                // Inicio de una constante numérica
                (Start, Some(c)) if c.is_ascii_digit() || c == '.' => {
                    self.lexeme.push(c);
                    self.state = Number { dot: c == '.' };
                }

                (Start, Some(c)) => match Operator::single(c) {
                    Some(operator) => self.state = Complete(Token::Operator(operator)),
                    None => break Err(LexerError::BadChar(c)),
                },

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => {
                    break Ok(Some(std::mem::replace(token, Token::Operator(Operator::Comma))))
                }

                // `--` inicia un comentario, `-` por sí solo es una resta
                (Dash, Some('-')) => self.state = Comment,
                (Dash, _) => break Ok(Some(Token::Operator(Operator::Minus))),

                // Los comentarios descartan la línea donde ocurren
                (Comment, Some('\n')) | (Comment, None) => self.state = Start,
                (Comment, Some(_)) => (),

                (Pair(first), Some('=')) => {
                    let operator = match first {
                        ':' => Operator::Assign,
                        '!' => Operator::NotEqual,
                        '<' => Operator::LessOrEqual,
                        _ => Operator::GreaterOrEqual,
                    };

                    self.state = Complete(Token::Operator(operator));
                }

                (Pair('<'), _) => break Ok(Some(Token::Operator(Operator::Less))),
                (Pair('>'), _) => break Ok(Some(Token::Operator(Operator::Greater))),
                (Pair(_), _) => break Err(LexerError::Expected('=')),

                // Acumulación dígito por dígito de constantes numéricas
                (Number { .. }, Some(c)) if c.is_ascii_digit() => self.lexeme.push(c),
                (Number { dot: true }, Some('.')) => break Err(LexerError::MalformedNumber),
                (Number { dot }, Some('.')) => {
                    *dot = true;
                    self.lexeme.push('.');
                }

                // Si sigue algo que no es parte del número, este ha terminado
                (Number { dot }, _) => {
                    if self.lexeme == "." {
                        break Err(LexerError::MalformedNumber);
                    }

                    let text = Rc::from(std::mem::take(&mut self.lexeme));
                    let token = if *dot {
                        Token::FloatLiteral(text)
                    } else {
                        Token::IntLiteral(text)
                    };

                    break Ok(Some(token));
                }

                // Extensión de términos
                (Word, Some(c)) if c.is_ascii_alphanumeric() => self.lexeme.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word, _) => {
                    let word = std::mem::take(&mut self.lexeme);
                    let token = match Keyword::from_str(&word) {
                        Ok(keyword) => Token::Keyword(keyword),
                        Err(()) => Token::Id(Identifier::from(word.as_str())),
                    };

                    break Ok(Some(token));
                }

                (Text, Some('"')) => {
                    let text = Rc::from(std::mem::take(&mut self.lexeme));
                    self.state = Complete(Token::StringLiteral(text));
                }

                (Text, Some('\n')) | (Text, None) => break Err(LexerError::UnterminatedString),
                (Text, Some(c)) => self.lexeme.push(c),
            }

            // Si no hubo `break`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some((_, position)) = self.source.next() {
                self.last = position;
            }
        }
    }
}

impl<S: Iterator<Item = (char, Position)>> Iterator for Lexer<S> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.lex();

        self.state = State::Start;
        self.lexeme.clear();

        match result {
            Ok(None) => None,
            Ok(Some(token)) => {
                let location = Location::span(&Location::at(self.start), &Location::at(self.last));
                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                self.state = State::Error;

                let here = self.source.peek().map_or(self.last, |&(_, position)| position);
                Some(Err(Located::at(error, Location::at(here))))
            }
        }
    }
}
