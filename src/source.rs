//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de posiciones o rangos de ubicaciones en
//! el código fuente original, lo cual permite determinar un punto
//! exacto en donde ocurre un error, así como reproducir la línea
//! afectada al reportarlo.
//!
//! # Convenciones
//! Las líneas se numeran a partir de 1 y las columnas a partir de 0.
//! Un rango de ubicación es inclusivo en ambos extremos: su fin es la
//! columna del último carácter que abarca.

use std::{
    fmt::{self, Debug, Display, Formatter},
    io::{self, BufRead},
};

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una ubicación está conformada por un rango inclusivo de posiciones.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct Location {
    start: Position,
    end: Position,
}

impl Location {
    /// Ubicación de un único carácter.
    pub fn at(position: Position) -> Self {
        Location {
            start: position,
            end: position,
        }
    }

    /// Ubicación desde el inicio de `from` hasta el fin de `to`.
    pub fn span(from: &Location, to: &Location) -> Self {
        Location {
            start: from.start,
            end: to.end,
        }
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.start
    }

    /// Obtiene la posición del último carácter.
    pub fn end(&self) -> Position {
        self.end
    }

    /// Número de línea de inicio.
    pub fn line(&self) -> u32 {
        self.start.line
    }

    /// Columna de inicio.
    pub fn column(&self) -> u32 {
        self.start.column
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(formatter, "{}", self.start)
        } else if self.start.line == self.end.line {
            write!(
                formatter,
                "{}:[{}-{}]",
                self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(formatter, "[{}-{}]", self.start, self.end)
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Construye una posición. `line` inicia en 1 y `column` en 0.
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 0 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Nombre de origen y listado de líneas.
///
/// Las líneas se preservan para poder reproducirlas en diagnósticos.
#[derive(Debug)]
pub struct Source {
    name: String,
    lines: Vec<String>,
}

impl Source {
    /// Construye a partir de un texto completo.
    pub fn new<S: Into<String>>(name: S, text: &str) -> Self {
        Source {
            name: name.into(),
            lines: text.lines().map(String::from).collect(),
        }
    }

    /// Consume un flujo de entrada estándar hasta su final.
    pub fn read<R: BufRead, S: Into<String>>(reader: R, name: S) -> io::Result<Self> {
        let lines = reader.lines().collect::<Result<_, _>>()?;
        Ok(Source {
            name: name.into(),
            lines,
        })
    }

    /// Nombre de origen, usualmente una ruta.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Obtiene una línea a partir de su número (desde 1).
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = (number as usize).checked_sub(1)?;
        self.lines.get(index).map(String::as_str)
    }

    /// Recorre el texto carácter por carácter.
    ///
    /// Cada línea termina con un `'\n'` sintético, aún si el texto
    /// original no incluía el último.
    pub fn chars(&self) -> impl Iterator<Item = (char, Position)> + '_ {
        self.lines.iter().enumerate().flat_map(|(index, line)| {
            let line_number = index as u32 + 1;
            line.chars()
                .chain(std::iter::once('\n'))
                .enumerate()
                .map(move |(column, c)| (c, Position::new(line_number, column as u32)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chars_carry_positions() {
        let source = Source::new("<test>", "ab\nc");
        let chars: Vec<_> = source.chars().collect();

        assert_eq!(chars[0], ('a', Position::new(1, 0)));
        assert_eq!(chars[2], ('\n', Position::new(1, 2)));
        assert_eq!(chars[3], ('c', Position::new(2, 0)));
        assert_eq!(chars.len(), 5);
    }

    #[test]
    fn lines_are_one_based() {
        let source = Source::new("<test>", "first\r\nsecond");

        assert_eq!(source.line(0), None);
        assert_eq!(source.line(1), Some("first"));
        assert_eq!(source.line(2), Some("second"));
        assert_eq!(source.line(3), None);
    }

    #[test]
    fn span_joins_locations() {
        let from = Location::at(Position::new(2, 4));
        let to = Location::at(Position::new(2, 9));
        let span = Location::span(&from, &to);

        assert_eq!(span.start(), Position::new(2, 4));
        assert_eq!(span.end(), Position::new(2, 9));
        assert_eq!(span.to_string(), "2:[4-9]");
    }
}
