//! Representación intermedia.
//!
//! Un programa en IR es una lista plana de instrucciones de tres
//! direcciones. Los operandos son temporales (`$T<n>`), variables,
//! etiquetas (`label<n>`) o texto literal. Los temporales son
//! monotónicamente crecientes y nunca se reutilizan.
//!
//! Adicionalmente a las instrucciones ejecutables existe
//! [`Instruction::Declare`], que indica el punto donde deben declararse
//! las variables de un scope. Esta instrucción no tiene representación
//! textual en IR, solamente afecta la traducción al objetivo.

use std::{
    fmt::{self, Display},
    rc::Rc,
};

use crate::{
    ast::{BinOp, Comparison},
    scope::{Scope, Type, Variable},
};

/// Un programa completo, en orden de ejecución.
#[derive(Debug, Default)]
pub struct Program {
    pub code: Vec<Instruction>,
}

/// Registro virtual.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Temp(pub u32);

/// Destino de un salto.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Label(pub u32);

/// Clase numérica de un valor, la cual determina la variante
/// entera o real de cada instrucción.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Class {
    Int,
    Float,
}

impl Class {
    /// Clase de una operación binaria entre dos valores.
    ///
    /// Basta con que un operando sea real para que la operación lo sea.
    pub fn promote(self, other: Class) -> Class {
        match (self, other) {
            (Class::Int, Class::Int) => Class::Int,
            _ => Class::Float,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Operand {
    Temp(Temp),
    Var(Rc<Variable>),

    /// Constante numérica, con su lexema original.
    Literal(Rc<str>),
}

#[derive(Debug)]
pub enum Instruction {
    /// Declaración de todas las variables propias de un scope.
    Declare(Rc<Scope>),

    /// `out = lhs <op> rhs`.
    Arith {
        op: BinOp,
        class: Class,
        lhs: Temp,
        rhs: Temp,
        out: Temp,
    },

    /// Copia de un valor.
    Store {
        class: Class,
        from: Operand,
        to: Operand,
    },

    /// Salta a `target` si `lhs <test> rhs`.
    Branch {
        test: Comparison,
        class: Class,
        lhs: Temp,
        rhs: Temp,
        target: Label,
    },

    Jump(Label),

    Label(Label),

    Read(Class, Rc<Variable>),

    Write(Rc<Variable>),
}

impl Instruction {
    /// Nombre de la operación, si la instrucción es ejecutable.
    pub fn opcode(&self) -> Option<&'static str> {
        use Class::{Float, Int};

        let opcode = match self {
            Instruction::Declare(_) => return None,

            Instruction::Arith { op, class, .. } => match (op, class) {
                (BinOp::Add, Int) => "ADDI",
                (BinOp::Add, Float) => "ADDF",
                (BinOp::Sub, Int) => "SUBI",
                (BinOp::Sub, Float) => "SUBF",
                (BinOp::Mul, Int) => "MULTI",
                (BinOp::Mul, Float) => "MULTF",
                (BinOp::Div, Int) => "DIVI",
                (BinOp::Div, Float) => "DIVF",
            },

            Instruction::Store { class: Int, .. } => "STOREI",
            Instruction::Store { class: Float, .. } => "STOREF",

            Instruction::Branch { test, class, .. } => match (test, class) {
                (Comparison::Greater, Int) => "GTI",
                (Comparison::GreaterOrEqual, Int) => "GEI",
                (Comparison::Less, Int) => "LTI",
                (Comparison::LessOrEqual, Int) => "LEI",
                (Comparison::NotEqual, Int) => "NEI",
                (Comparison::Equal, Int) => "EQI",
                (Comparison::Greater, Float) => "GTF",
                (Comparison::GreaterOrEqual, Float) => "GEF",
                (Comparison::Less, Float) => "LTF",
                (Comparison::LessOrEqual, Float) => "LEF",
                (Comparison::NotEqual, Float) => "NEF",
                (Comparison::Equal, Float) => "EQF",
            },

            Instruction::Jump(_) => "JUMP",
            Instruction::Label(_) => "LABEL",
            Instruction::Read(Int, _) => "READI",
            Instruction::Read(Float, _) => "READF",

            Instruction::Write(var) => match var.typ() {
                Type::Int => "WRITEI",
                Type::Float => "WRITEF",
                Type::String => "WRITES",
            },
        };

        Some(opcode)
    }
}

impl Display for Temp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "$T{}", self.0)
    }
}

impl Display for Label {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "label{}", self.0)
    }
}

impl Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp(temp) => temp.fmt(fmt),
            Operand::Var(var) => fmt.write_str(&var.mangled()),
            Operand::Literal(text) => fmt.write_str(text),
        }
    }
}

/// Forma `opcode operando operando resultado`. Las declaraciones
/// se muestran como una cadena vacía.
impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opcode = match self.opcode() {
            Some(opcode) => opcode,
            None => return Ok(()),
        };

        fmt.write_str(opcode)?;
        match self {
            Instruction::Declare(_) => Ok(()),

            Instruction::Arith { lhs, rhs, out, .. } => write!(fmt, " {} {} {}", lhs, rhs, out),
            Instruction::Store { from, to, .. } => write!(fmt, " {} {}", from, to),

            Instruction::Branch {
                lhs, rhs, target, ..
            } => write!(fmt, " {} {} {}", lhs, rhs, target),

            Instruction::Jump(label) | Instruction::Label(label) => write!(fmt, " {}", label),
            Instruction::Read(_, var) | Instruction::Write(var) => {
                write!(fmt, " {}", var.mangled())
            }
        }
    }
}

/// Una línea por instrucción ejecutable.
impl Display for Program {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in self.executable() {
            writeln!(fmt, "{}", instruction)?;
        }

        Ok(())
    }
}

impl Program {
    /// Instrucciones con representación textual.
    pub fn executable(&self) -> impl Iterator<Item = &Instruction> {
        self.code
            .iter()
            .filter(|instruction| !matches!(instruction, Instruction::Declare(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_is_contagious() {
        assert_eq!(Class::Int.promote(Class::Int), Class::Int);
        assert_eq!(Class::Int.promote(Class::Float), Class::Float);
        assert_eq!(Class::Float.promote(Class::Int), Class::Float);
        assert_eq!(Class::Float.promote(Class::Float), Class::Float);
    }

    #[test]
    fn renders_three_address_form() {
        let program = Program {
            code: vec![
                Instruction::Declare(Rc::new(Scope::global())),
                Instruction::Store {
                    class: Class::Float,
                    from: Operand::Literal("2.5".into()),
                    to: Operand::Temp(Temp(0)),
                },
                Instruction::Arith {
                    op: BinOp::Mul,
                    class: Class::Int,
                    lhs: Temp(1),
                    rhs: Temp(2),
                    out: Temp(0),
                },
                Instruction::Branch {
                    test: Comparison::GreaterOrEqual,
                    class: Class::Float,
                    lhs: Temp(3),
                    rhs: Temp(4),
                    target: Label(1),
                },
                Instruction::Jump(Label(0)),
                Instruction::Label(Label(1)),
            ],
        };

        assert_eq!(
            program.to_string(),
            "STOREF 2.5 $T0\nMULTI $T1 $T2 $T0\nGEF $T3 $T4 label1\nJUMP label0\nLABEL label1\n"
        );
    }

    #[test]
    fn declarations_render_as_nothing() {
        let declare = Instruction::Declare(Rc::new(Scope::global()));

        assert_eq!(declare.opcode(), None);
        assert_eq!(declare.to_string(), "");
    }
}
