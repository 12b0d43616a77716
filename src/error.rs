use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VigilError {
    #[error("SMT solver returned unknown")]
    SmtUnknown,
    #[error("SMT backend failure: {0}")]
    Backend(String),
    #[error("Ill-typed term: {0}")]
    Type(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unknown engine `{0}`")]
    UnknownEngine(String),
    #[error("Unknown solver `{0}`")]
    UnknownSolver(String),
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("I/O error")]
    Io(#[from] io::Error),
}
