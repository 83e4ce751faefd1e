//! Orquestación de fases.
//!
//! [`compile()`] ejecuta en orden análisis léxico, sintáctico y
//! generación de IR. Cada fase corre dentro de su propio span de
//! `tracing`. Los errores de cualquier fase se entregan como
//! [`Diagnostics`] listos para imprimirse.

use std::{
    io::{self, Write},
    rc::Rc,
};

use bitflags::bitflags;
use tracing::{debug, info_span};

use crate::{ast::Ast, error::Diagnostics, ir, lex::Lexer, parse, source::Source, target};

bitflags! {
    /// Listados a incluir en la salida de una compilación.
    pub struct Listings: u32 {
        /// Árbol sintáctico en forma de elementos anidados.
        const AST = 0x01;

        /// Código intermedio, cada línea precedida por `;`.
        const IR = 0x02;

        /// Ensamblador Tiny.
        const TARGET = 0x04;
    }
}

impl Default for Listings {
    fn default() -> Self {
        Listings::IR | Listings::TARGET
    }
}

/// Resultado de una compilación exitosa.
#[derive(Debug)]
pub struct Compilation {
    pub ast: Ast,
    pub program: ir::Program,
}

/// Compila un programa completo.
pub fn compile(source: &Rc<Source>) -> Result<Compilation, Diagnostics> {
    let fail = |diagnostics: Diagnostics, kind| diagnostics.kind(kind).source(Rc::clone(source));

    let tokens = {
        let _span = info_span!("littlec.lex", source = source.name()).entered();

        let tokens = Lexer::new(source.chars())
            .try_exhaustive()
            .map_err(|errors| fail(errors.into(), "Lexical error"))?;

        debug!(tokens = tokens.len(), "scanned");
        tokens
    };

    let ast = {
        let _span = info_span!("littlec.parse").entered();

        let ast = parse::parse(&tokens).map_err(|error| fail(error.into(), "Syntax error"))?;
        debug!(program = %ast.name.val(), functions = ast.functions.len(), "parsed");
        ast
    };

    let program = {
        let _span = info_span!("littlec.generate").entered();

        let program = ast
            .generate()
            .map_err(|error| fail(error.into(), "Semantic error"))?;

        debug!(instructions = program.code.len(), "generated");
        program
    };

    Ok(Compilation { ast, program })
}

impl Compilation {
    /// Escribe los listados seleccionados, en orden AST, IR y Tiny.
    pub fn write<W: Write>(&self, listings: Listings, output: &mut W) -> io::Result<()> {
        let _span = info_span!("littlec.emit", listings = ?listings).entered();

        if listings.contains(Listings::AST) {
            write!(output, "{}", self.ast)?;
        }

        if listings.contains(Listings::IR) {
            for instruction in self.program.executable() {
                writeln!(output, ";{}", instruction)?;
            }

            if listings.contains(Listings::TARGET) {
                writeln!(output)?;
            }
        }

        if listings.contains(Listings::TARGET) {
            target::emit(&self.program, output)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_text(text: &str) -> Result<Compilation, Diagnostics> {
        compile(&Rc::new(Source::new("<test>", text)))
    }

    fn listing(text: &str, listings: Listings) -> String {
        let mut output = Vec::new();
        compile_text(text)
            .unwrap()
            .write(listings, &mut output)
            .unwrap();

        String::from_utf8(output).unwrap()
    }

    const PROGRAM: &str = "PROGRAM p BEGIN INT a; FUNCTION VOID main() BEGIN a := 3; WRITE(a); END END";

    #[test]
    fn default_listing_has_ir_then_target() {
        let expected = "\
;STOREI 3 $T0
;STOREI $T0 var0a
;WRITEI var0a

var var0a
move 3 r0
move r0 var0a
sys writei var0a
";

        assert_eq!(listing(PROGRAM, Listings::default()), expected);
    }

    #[test]
    fn listings_are_selectable() {
        let ast = listing(PROGRAM, Listings::AST);
        assert!(ast.starts_with("<Program>\n"));
        assert!(!ast.contains(";STOREI"));

        let target = listing(PROGRAM, Listings::TARGET);
        assert!(target.starts_with("var var0a\n"));

        assert_eq!(listing(PROGRAM, Listings::empty()), "");
    }

    #[test]
    fn failures_name_their_phase() {
        let cases = [
            ("PROGRAM p BEGIN # END", "Lexical error: Line 1: "),
            ("PROGRAM p BEGIN INT a END", "Syntax error: Line 1: "),
            ("PROGRAM p BEGIN END", "Semantic error: Line 1: "),
        ];

        for (text, prefix) in cases.iter() {
            let diagnostics = compile_text(text).unwrap_err();
            assert!(diagnostics.to_string().starts_with(prefix), "for {}", text);
        }
    }

    #[test]
    fn lexical_errors_are_collected() {
        let diagnostics = compile_text("PROGRAM p BEGIN\n#\n?\nEND").unwrap_err();
        assert_eq!(diagnostics.len(), 2);

        let lines: Vec<_> = diagnostics
            .errors()
            .map(|error| error.location().line())
            .collect();

        assert_eq!(lines, [2, 3]);
        assert!(diagnostics
            .errors()
            .all(|error| error.source().to_string().starts_with("Bad character")));
    }
}
