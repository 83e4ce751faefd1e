//! Reporte de errores.
//!
//! Todas las fases producen errores ubicados ([`Located`]). Un conjunto
//! de estos se agrupa en [`Diagnostics`], que los imprime junto a la
//! línea afectada y un indicador bajo la columna del error.

use crate::source::{Located, Location, Source};
use std::{
    error::Error,
    fmt::{self, Display},
    rc::Rc,
};

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

pub struct Diagnostics {
    kind: &'static str,
    source: Option<Rc<Source>>,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    /// Fase o clase de error, se antepone a cada mensaje.
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Código fuente del cual se extraen las líneas afectadas.
    pub fn source(self, source: Rc<Source>) -> Self {
        Diagnostics {
            source: Some(source),
            ..self
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &(dyn 'static + LocatedError)> {
        self.errors.iter().map(|error| &**error)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            source: None,
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl<E: 'static + LocatedError> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| {
                let error: Box<dyn LocatedError> = Box::new(error);
                error
            })
            .collect();

        Diagnostics {
            errors,
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics {
            kind,
            source,
            errors,
        } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            let location = error.location();
            writeln!(
                fmt,
                "{}: Line {}: {}",
                kind,
                location.line(),
                error.source()
            )?;

            let line = source.as_ref().and_then(|source| source.line(location.line()));
            if let Some(line) = line {
                // La línea se reproduce sin indentación, el indicador se desplaza igual
                let trimmed = line.trim();
                let indent = line.chars().count() - line.trim_start().chars().count();
                let column = (location.column() as usize).saturating_sub(indent);

                writeln!(fmt, "{}", trimmed)?;
                writeln!(fmt, "{:column$}^", "", column = column)?;
            }

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, fmt)
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}
