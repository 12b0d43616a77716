//! A small s-expression reader with source positions, for the transition
//! system input language.

use crate::error::VigilError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sexp {
    Atom {
        text: String,
        line: usize,
        column: usize,
    },
    List {
        items: Vec<Sexp>,
        line: usize,
        column: usize,
    },
}

impl Sexp {
    pub fn atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom { text, .. } => Some(text),
            Sexp::List { .. } => None,
        }
    }

    pub fn items(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List { items, .. } => Some(items),
            Sexp::Atom { .. } => None,
        }
    }

    pub fn position(&self) -> (usize, usize) {
        match self {
            Sexp::Atom { line, column, .. } | Sexp::List { line, column, .. } => (*line, *column),
        }
    }

    pub fn error(&self, message: impl Into<String>) -> VigilError {
        let (line, column) = self.position();
        VigilError::Parse {
            line,
            column,
            message: message.into(),
        }
    }
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Reader {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> VigilError {
        VigilError::Parse {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.bump();
            } else if c == b';' {
                while let Some(c) = self.peek() {
                    if c == b'\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn read(&mut self) -> Result<Option<Sexp>, VigilError> {
        self.skip_trivia();
        let (line, column) = (self.line, self.column);
        match self.peek() {
            None => Ok(None),
            Some(b'(') => {
                self.bump();
                let mut items = Vec::new();
                loop {
                    self.skip_trivia();
                    match self.peek() {
                        Some(b')') => {
                            self.bump();
                            return Ok(Some(Sexp::List {
                                items,
                                line,
                                column,
                            }));
                        }
                        Some(_) => match self.read()? {
                            Some(item) => items.push(item),
                            None => return Err(self.error("unexpected end of input in list")),
                        },
                        None => return Err(self.error("unclosed `(`")),
                    }
                }
            }
            Some(b')') => Err(self.error("unexpected `)`")),
            Some(_) => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_ascii_whitespace() || c == b'(' || c == b')' || c == b';' {
                        break;
                    }
                    self.bump();
                }
                let text = std::str::from_utf8(&self.input[start..self.pos])
                    .map_err(|_| self.error("input is not valid UTF-8"))?
                    .to_string();
                Ok(Some(Sexp::Atom {
                    text,
                    line,
                    column,
                }))
            }
        }
    }
}

/// Read every top-level s-expression of `input`.
pub fn parse_all(input: &str) -> Result<Vec<Sexp>, VigilError> {
    let mut reader = Reader::new(input);
    let mut out = Vec::new();
    while let Some(sexp) = reader.read()? {
        out.push(sexp);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_lists_and_comments() {
        let input = "; header\n(define-states s1 st (and (<= x 2) flag))\n";
        let parsed = parse_all(input).unwrap();
        assert_eq!(parsed.len(), 1);
        let items = parsed[0].items().unwrap();
        assert_eq!(items[0].atom(), Some("define-states"));
        assert_eq!(items[3].items().unwrap()[0].atom(), Some("and"));
    }

    #[test]
    fn reports_positions_on_errors() {
        let err = parse_all("(a (b c)").unwrap_err();
        assert!(matches!(err, VigilError::Parse { .. }));
        let err = parse_all(")").unwrap_err();
        let VigilError::Parse { line, column, .. } = err else {
            panic!("expected a parse error");
        };
        assert_eq!((line, column), (1, 1));
    }
}
