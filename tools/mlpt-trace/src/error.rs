use mlpt_vmem::GeometryError;

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("line {line}: unknown command {command:?}")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: {command} expects {expected} argument(s)")]
    Arity {
        line: usize,
        command: &'static str,
        expected: usize,
    },
    #[error("line {line}: invalid address {text:?}")]
    InvalidAddress { line: usize, text: String },
    #[error("{0}")]
    Usage(String),
}
