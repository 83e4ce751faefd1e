//! Traducción de IR a ensamblador Tiny.
//!
//! Cada instrucción de IR se traduce de forma independiente por medio de
//! una plantilla fija. Los temporales `$T<n>` se convierten en registros
//! `r<n>`; variables, etiquetas y literales se transcriben sin cambios.

use std::{
    fmt,
    io::{self, Write},
};

use crate::{
    ast::{BinOp, Comparison},
    ir::{Class, Instruction, Operand, Program, Temp},
    scope::{Scope, Type},
};

/// Escribe el listado completo de un programa.
pub fn emit<W: Write>(program: &Program, output: &mut W) -> io::Result<()> {
    let mut emitter = Emitter { output };
    for instruction in &program.code {
        emitter.put_instruction(instruction)?;
    }

    Ok(())
}

struct Emitter<'a, W> {
    output: &'a mut W,
}

impl<W: Write> Emitter<'_, W> {
    fn put_instruction(&mut self, instruction: &Instruction) -> io::Result<()> {
        match instruction {
            Instruction::Declare(scope) => self.declare(scope),

            Instruction::Arith {
                op,
                class,
                lhs,
                rhs,
                out,
            } => {
                let opcode = match op {
                    BinOp::Add => "add",
                    BinOp::Sub => "sub",
                    BinOp::Mul => "mul",
                    BinOp::Div => "div",
                };

                emit!(self.output, "move", Reg(*lhs), Reg(*out))?;
                emit!(
                    self.output,
                    format_args!("{}{}", opcode, suffix(*class)),
                    Reg(*rhs),
                    Reg(*out)
                )
            }

            Instruction::Store { from, to, .. } => {
                emit!(self.output, "move", Tiny(from), Tiny(to))
            }

            Instruction::Branch {
                test,
                class,
                lhs,
                rhs,
                target,
            } => {
                let jump = match test {
                    Comparison::Greater => "jgt",
                    Comparison::GreaterOrEqual => "jge",
                    Comparison::Less => "jlt",
                    Comparison::LessOrEqual => "jle",
                    Comparison::NotEqual => "jne",
                    Comparison::Equal => "jeq",
                };

                let compare = match class {
                    Class::Int => "cmpi",
                    Class::Float => "cmpr",
                };

                emit!(self.output, compare, Reg(*lhs), Reg(*rhs))?;
                emit!(self.output, jump, target)
            }

            Instruction::Jump(label) => emit!(self.output, "jmp", label),
            Instruction::Label(label) => emit!(self.output, "label", label),

            Instruction::Read(class, var) => emit!(
                self.output,
                "sys",
                format_args!("read{}", suffix(*class)),
                var.mangled()
            ),

            Instruction::Write(var) => {
                let call = match var.typ() {
                    Type::Int => "writei",
                    Type::Float => "writer",
                    Type::String => "writes",
                };

                emit!(self.output, "sys", call, var.mangled())
            }
        }
    }

    fn declare(&mut self, scope: &Scope) -> io::Result<()> {
        for var in scope.declared() {
            match var.typ() {
                Type::String => {
                    let value = var.value().unwrap_or_default();
                    emit!(
                        self.output,
                        "str",
                        var.mangled(),
                        format_args!("\"{}\"", value)
                    )?;
                }

                Type::Int | Type::Float => emit!(self.output, "var", var.mangled())?,
            }
        }

        Ok(())
    }
}

/// Sufijo de las instrucciones enteras o reales.
fn suffix(class: Class) -> char {
    match class {
        Class::Int => 'i',
        Class::Float => 'r',
    }
}

/// Registro de Tiny que corresponde a un temporal.
#[derive(Copy, Clone)]
struct Reg(Temp);

impl fmt::Display for Reg {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Reg(Temp(number)) = self;
        write!(fmt, "r{}", number)
    }
}

/// Operando en su forma de Tiny.
struct Tiny<'a>(&'a Operand);

impl fmt::Display for Tiny<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Operand::Temp(temp) => fmt::Display::fmt(&Reg(*temp), fmt),
            other => fmt::Display::fmt(other, fmt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::Label,
        lex::Identifier,
        source::{Located, Location},
    };
    use std::rc::Rc;

    fn translate(code: Vec<Instruction>) -> String {
        let mut output = Vec::new();
        emit(&Program { code }, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn name(id: &str) -> Located<Identifier> {
        Located::at(Identifier::from(id), Location::default())
    }

    #[test]
    fn arithmetic_expands_to_move_and_operate() {
        let code = vec![
            Instruction::Arith {
                op: BinOp::Add,
                class: Class::Int,
                lhs: Temp(1),
                rhs: Temp(2),
                out: Temp(0),
            },
            Instruction::Arith {
                op: BinOp::Div,
                class: Class::Float,
                lhs: Temp(4),
                rhs: Temp(5),
                out: Temp(3),
            },
        ];

        assert_eq!(
            translate(code),
            "move r1 r0\naddi r2 r0\nmove r4 r3\ndivr r5 r3\n"
        );
    }

    #[test]
    fn branches_compare_then_jump() {
        let code = vec![
            Instruction::Branch {
                test: Comparison::GreaterOrEqual,
                class: Class::Int,
                lhs: Temp(0),
                rhs: Temp(1),
                target: Label(0),
            },
            Instruction::Branch {
                test: Comparison::Equal,
                class: Class::Float,
                lhs: Temp(2),
                rhs: Temp(3),
                target: Label(1),
            },
            Instruction::Jump(Label(0)),
            Instruction::Label(Label(1)),
        ];

        assert_eq!(
            translate(code),
            "cmpi r0 r1\njge label0\ncmpr r2 r3\njeq label1\njmp label0\nlabel label1\n"
        );
    }

    #[test]
    fn declarations_and_system_calls() {
        let mut scope = Scope::global();
        scope.declare(name("n"), Type::Int, None).unwrap();
        scope
            .declare(name("s"), Type::String, Some("hi there".into()))
            .unwrap();
        scope.declare(name("x"), Type::Float, None).unwrap();

        let scope = Rc::new(scope);
        let var = |id: &str| Rc::clone(scope.lookup(id).unwrap());

        let code = vec![
            Instruction::Declare(Rc::clone(&scope)),
            Instruction::Read(Class::Float, var("x")),
            Instruction::Store {
                class: Class::Int,
                from: Operand::Literal("7".into()),
                to: Operand::Temp(Temp(3)),
            },
            Instruction::Store {
                class: Class::Int,
                from: Operand::Temp(Temp(3)),
                to: Operand::Var(var("n")),
            },
            Instruction::Write(var("n")),
            Instruction::Write(var("x")),
            Instruction::Write(var("s")),
        ];

        let expected = "\
var var0n
str var0s \"hi there\"
var var0x
sys readr var0x
move 7 r3
move r3 var0n
sys writei var0n
sys writer var0x
sys writes var0s
";

        assert_eq!(translate(code), expected);
    }
}
