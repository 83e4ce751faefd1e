//! Compilador para el lenguaje Little.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente, descrito
//! por [`source`]. Este archivo se somete primero a análisis léxico en
//! [`lex`], de lo cual se obtiene un flujo de tokens. El flujo de tokens
//! se dispone en un árbol sintáctico ([`ast`]) por medio de análisis
//! sintáctico en [`parse`], el cual también construye las tablas de
//! símbolos de cada bloque ([`scope`]). El árbol sintáctico se traduce
//! en [`semantic`] a la representación intermedia descrita en [`ir`],
//! con lo cual concluyen las fases delanteras del compilador.
//!
//! # Back end
//! La representación intermedia se traduce instrucción por instrucción
//! a ensamblador Tiny en [`target`]. No hay asignación de registros:
//! cada temporal corresponde a un registro distinto.
//!
//! [`driver`] encadena todas las fases y reporta errores por medio de
//! [`error::Diagnostics`].

#[macro_use]
mod macros;

pub mod ast;
pub mod driver;
pub mod error;
pub mod ir;
pub mod lex;
pub mod parse;
pub mod scope;
pub mod semantic;
pub mod source;

mod codegen;

/// Emisión de código.
///
/// Este módulo reexporta suficientes ítems internos relacionados a
/// generación de código para traducir IR a ensamblador Tiny.
pub mod target {
    pub use crate::codegen::emit;
}
