//! Generación de código intermedio.
//!
//! Se recorre una única vez el árbol sintáctico a partir de la función
//! `main`, emitiendo instrucciones de tres direcciones. Las demás
//! funciones se aceptan sintácticamente pero no se traducen.
//!
//! # Temporales
//! Cada literal, lectura de variable u operación binaria deposita su
//! resultado en un temporal nuevo. El temporal del resultado de una
//! expresión se reserva antes que los de sus operandos, por lo cual en
//! `a + b` la suma ocupa `$T0`, `a` ocupa `$T1` y `b` ocupa `$T2`.
//!
//! # Tipos
//! Toda expresión es entera o real (ver [`Class`]). Una operación con al
//! menos un operando real es real. Las variables `STRING` solo pueden
//! aparecer en `WRITE`.

use std::rc::Rc;
use thiserror::Error;

use crate::{
    ast::{Ast, Block, Condition, Expr, Statement},
    ir::{self, Class, Instruction, Label, Operand, Temp},
    lex::Identifier,
    scope::{Scope, Type, Variable},
    source::{Located, Location},
};

pub type Semantic<T> = Result<T, Located<SemanticError>>;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("Could not find main method")]
    NoMain,

    #[error("Variable '{0}' is not declared in this scope")]
    Undeclared(Identifier),

    #[error("Variable '{0}' has type {1}, expected INT or FLOAT")]
    NotNumeric(Identifier, Type),

    #[error("{0} are not supported")]
    Unsupported(&'static str),
}

impl Ast {
    /// Traduce el programa a IR.
    pub fn generate(&self) -> Semantic<ir::Program> {
        let mut sink = Sink::default();
        sink.declare(&self.scope);

        let main = self
            .functions
            .iter()
            .find(|function| function.name.val().as_ref() == "main")
            .ok_or_else(|| Located::at(SemanticError::NoMain, self.eof))?;

        let mut context = Context {
            scope: &self.scope,
            sink: &mut sink,
        };

        context.block(&main.body)?;
        Ok(ir::Program { code: sink.code })
    }
}

/// Destino de las instrucciones emitidas y fuente de nombres frescos.
#[derive(Default)]
struct Sink {
    code: Vec<Instruction>,
    temps: u32,
    labels: u32,
}

impl Sink {
    fn push(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    fn temp(&mut self) -> Temp {
        self.temps += 1;
        Temp(self.temps - 1)
    }

    fn label(&mut self) -> Label {
        self.labels += 1;
        Label(self.labels - 1)
    }

    /// Solo los scopes que declaran algo producen una declaración.
    fn declare(&mut self, scope: &Rc<Scope>) {
        if !scope.is_empty() {
            self.push(Instruction::Declare(Rc::clone(scope)));
        }
    }
}

struct Context<'a> {
    scope: &'a Scope,
    sink: &'a mut Sink,
}

impl Context<'_> {
    fn block(&mut self, block: &Block) -> Semantic<()> {
        self.sink.declare(&block.scope);

        let mut inner = Context {
            scope: &block.scope,
            sink: &mut *self.sink,
        };

        for statement in &block.statements {
            inner.statement(statement)?;
        }

        Ok(())
    }

    fn statement(&mut self, statement: &Statement) -> Semantic<()> {
        match statement {
            Statement::Assignment { target, value } => {
                let (class, var) = self.numeric(target.val(), target.location())?;
                let (_, result) = self.expr(value)?;

                self.sink.push(Instruction::Store {
                    class,
                    from: Operand::Temp(result),
                    to: Operand::Var(var),
                });
            }

            Statement::Read(names) => {
                for name in names {
                    let (class, var) = self.numeric(name.val(), name.location())?;
                    self.sink.push(Instruction::Read(class, var));
                }
            }

            Statement::Write(names) => {
                for name in names {
                    let var = self.lookup(name.val(), name.location())?;
                    self.sink.push(Instruction::Write(var));
                }
            }

            Statement::If {
                condition,
                then,
                otherwise: None,
            } => {
                let exit = self.sink.label();

                self.condition(condition, exit)?;
                self.block(then)?;
                self.sink.push(Instruction::Label(exit));
            }

            Statement::If {
                condition,
                then,
                otherwise: Some(otherwise),
            } => {
                let alternative = self.sink.label();
                let exit = self.sink.label();

                self.condition(condition, alternative)?;
                self.block(then)?;
                self.sink.push(Instruction::Jump(exit));

                self.sink.push(Instruction::Label(alternative));
                self.block(otherwise)?;
                self.sink.push(Instruction::Label(exit));
            }

            Statement::While { condition, body } => {
                let top = self.sink.label();
                let exit = self.sink.label();

                self.sink.push(Instruction::Label(top));
                self.condition(condition, exit)?;
                self.block(body)?;

                self.sink.push(Instruction::Jump(top));
                self.sink.push(Instruction::Label(exit));
            }

            Statement::Return(value) => {
                let error = SemanticError::Unsupported("RETURN statements");
                return Err(Located::at(error, *value.location()));
            }
        }

        Ok(())
    }

    /// Salta a `target` cuando la condición es falsa.
    fn condition(&mut self, condition: &Condition, target: Label) -> Semantic<()> {
        let (lhs_class, lhs) = self.expr(&condition.lhs)?;
        let (rhs_class, rhs) = self.expr(&condition.rhs)?;

        self.sink.push(Instruction::Branch {
            test: condition.op.negate(),
            class: lhs_class.promote(rhs_class),
            lhs,
            rhs,
            target,
        });

        Ok(())
    }

    fn expr(&mut self, expr: &Located<Expr>) -> Semantic<(Class, Temp)> {
        let out = self.sink.temp();

        let class = match expr.val() {
            Expr::Int(text) => self.store(Class::Int, Operand::Literal(Rc::clone(text)), out),
            Expr::Float(text) => self.store(Class::Float, Operand::Literal(Rc::clone(text)), out),

            Expr::Read(id) => {
                let (class, var) = self.numeric(id, expr.location())?;
                self.store(class, Operand::Var(var), out)
            }

            Expr::Binary(lhs, op, rhs) => {
                let (lhs_class, lhs) = self.expr(lhs)?;
                let (rhs_class, rhs) = self.expr(rhs)?;
                let class = lhs_class.promote(rhs_class);

                self.sink.push(Instruction::Arith {
                    op: *op,
                    class,
                    lhs,
                    rhs,
                    out,
                });

                class
            }

            Expr::Call { function, .. } => {
                let error = SemanticError::Unsupported("Function calls");
                return Err(Located::at(error, *function.location()));
            }
        };

        Ok((class, out))
    }

    fn store(&mut self, class: Class, from: Operand, out: Temp) -> Class {
        self.sink.push(Instruction::Store {
            class,
            from,
            to: Operand::Temp(out),
        });

        class
    }

    fn lookup(&self, id: &Identifier, location: &Location) -> Semantic<Rc<Variable>> {
        self.scope
            .lookup(id.as_ref())
            .cloned()
            .ok_or_else(|| Located::at(SemanticError::Undeclared(id.clone()), *location))
    }

    /// Busca una variable que debe ser `INT` o `FLOAT`.
    fn numeric(&self, id: &Identifier, location: &Location) -> Semantic<(Class, Rc<Variable>)> {
        let var = self.lookup(id, location)?;
        let class = match var.typ() {
            Type::Int => Class::Int,
            Type::Float => Class::Float,
            Type::String => {
                let error = SemanticError::NotNumeric(id.clone(), var.typ());
                return Err(Located::at(error, *location));
            }
        };

        Ok((class, var))
    }
}
