//! Tablas de símbolos.
//!
//! Cada bloque léxico (el programa, el cuerpo de una función o las ramas
//! de un `IF`, `ELSE` o `WHILE`) introduce un [`Scope`]. Los scopes se
//! abren durante el análisis sintáctico y se sellan al terminar su bloque,
//! momento a partir del cual son inmutables y se comparten por medio de
//! `Rc` entre el AST y la representación intermedia.
//!
//! Un scope anidado inicia con una copia de los nombres visibles en el
//! scope que lo contiene. Por tanto, una búsqueda nunca necesita recorrer
//! cadenas de scopes: basta con consultar el scope del bloque correcto.
//! Las declaraciones propias de un scope ocultan a las heredadas.

use std::{
    collections::HashMap,
    fmt::{self, Display},
    rc::Rc,
};

use thiserror::Error;

use crate::{lex::Identifier, source::Located};

/// Tipo declarado de una variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
    Float,
    String,
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => fmt.write_str("INT"),
            Type::Float => fmt.write_str("FLOAT"),
            Type::String => fmt.write_str("STRING"),
        }
    }
}

/// Un nombre se declaró dos veces en un mismo scope.
#[derive(Error, Debug)]
#[error("Variable '{0}' has already been declared in this scope")]
pub struct Redeclared(pub Identifier);

/// Una variable declarada.
#[derive(Debug)]
pub struct Variable {
    name: Located<Identifier>,
    typ: Type,
    value: Option<Rc<str>>,
    scope: u32,
}

impl Variable {
    /// Identificador con el que se declaró la variable.
    pub fn name(&self) -> &Located<Identifier> {
        &self.name
    }

    /// Tipo declarado.
    pub fn typ(&self) -> Type {
        self.typ
    }

    /// Valor inicial, solo presente en variables `STRING`.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Número del scope que declaró a esta variable.
    pub fn scope(&self) -> u32 {
        self.scope
    }

    /// Nombre con el que la variable existe en el código emitido.
    ///
    /// Incluir el número de scope evita colisiones entre variables
    /// homónimas de distintos scopes.
    pub fn mangled(&self) -> String {
        format!("var{}{}", self.scope, self.name.as_ref())
    }
}

/// Un scope léxico.
#[derive(Debug)]
pub struct Scope {
    id: u32,
    declared: Vec<Rc<Variable>>,
    visible: HashMap<Identifier, Rc<Variable>>,
}

impl Scope {
    /// Scope global, siempre el número 0.
    pub fn global() -> Self {
        Scope {
            id: 0,
            declared: Vec::new(),
            visible: HashMap::new(),
        }
    }

    /// Abre un scope anidado dentro de `outer`.
    pub fn nested(outer: &Scope, id: u32) -> Self {
        Scope {
            id,
            declared: Vec::new(),
            visible: outer.visible.clone(),
        }
    }

    /// Número de scope.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Declara una variable en este scope.
    ///
    /// Falla si este mismo scope ya declaró el nombre. Nombres heredados
    /// del scope exterior se ocultan sin error.
    pub fn declare(
        &mut self,
        name: Located<Identifier>,
        typ: Type,
        value: Option<Rc<str>>,
    ) -> Result<(), Located<Redeclared>> {
        let id = name.as_ref();
        if self.declared.iter().any(|var| var.name.as_ref() == id) {
            let (location, id) = name.split();
            return Err(Located::at(Redeclared(id), location));
        }

        let var = Rc::new(Variable {
            name,
            typ,
            value,
            scope: self.id,
        });

        self.visible
            .insert(var.name.as_ref().clone(), Rc::clone(&var));

        self.declared.push(var);
        Ok(())
    }

    /// Busca una variable visible desde este scope.
    pub fn lookup(&self, name: &str) -> Option<&Rc<Variable>> {
        self.visible.get(name)
    }

    /// Variables declaradas por este scope, en orden de declaración.
    pub fn declared(&self) -> impl Iterator<Item = &Rc<Variable>> {
        self.declared.iter()
    }

    /// Determina si este scope no declara variables propias.
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}

impl Display for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "Symbol table {}", self.id)?;

        for var in &self.declared {
            write!(fmt, "\nname {}_{} type {}", var.name.as_ref(), self.id, var.typ)?;
            if let Some(value) = &var.value {
                write!(fmt, " value \"{}\"", value)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Location, Position};

    fn id(name: &str, column: u32) -> Located<Identifier> {
        Located::at(
            Identifier::from(name),
            Location::at(Position::new(1, column)),
        )
    }

    #[test]
    fn duplicate_names_fail_at_second_declaration() {
        let mut scope = Scope::global();
        scope.declare(id("a", 4), Type::Int, None).unwrap();

        let error = scope.declare(id("a", 7), Type::Float, None).unwrap_err();
        assert_eq!(error.location().column(), 7);
        assert_eq!(
            error.as_ref().to_string(),
            "Variable 'a' has already been declared in this scope"
        );
    }

    #[test]
    fn nested_scopes_inherit_and_shadow() {
        let mut global = Scope::global();
        global.declare(id("x", 0), Type::Int, None).unwrap();
        global.declare(id("y", 0), Type::Int, None).unwrap();

        let mut inner = Scope::nested(&global, 3);
        inner.declare(id("x", 7), Type::Float, None).unwrap();

        let shadow = inner.lookup("x").unwrap();
        assert_eq!(shadow.scope(), 3);
        assert_eq!(shadow.name().location().column(), 7);
        assert_eq!(shadow.mangled(), "var3x");
        assert_eq!(global.lookup("x").unwrap().scope(), 0);
        assert_eq!(inner.lookup("y").unwrap().mangled(), "var0y");
        assert_eq!(global.lookup("x").unwrap().typ(), Type::Int);
        assert_eq!(inner.declared().count(), 1);
    }

    #[test]
    fn sibling_scopes_are_independent() {
        let global = Scope::global();

        let mut first = Scope::nested(&global, 1);
        let mut second = Scope::nested(&global, 2);
        first.declare(id("t", 0), Type::Int, None).unwrap();
        second.declare(id("t", 0), Type::Int, None).unwrap();

        assert!(global.lookup("t").is_none());
        assert!(global.is_empty());
    }

    #[test]
    fn renders_in_declaration_order() {
        let mut scope = Scope::global();
        scope.declare(id("b", 0), Type::Int, None).unwrap();
        scope
            .declare(id("s", 0), Type::String, Some("hi".into()))
            .unwrap();
        scope.declare(id("a", 0), Type::Float, None).unwrap();

        assert_eq!(
            scope.to_string(),
            "Symbol table 0\nname b_0 type INT\nname s_0 type STRING value \"hi\"\nname a_0 type FLOAT"
        );
    }
}
