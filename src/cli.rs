//! CLI utilities for the interactive relay client.
//!
//! The interactive client reads one line per command. Parsing lives here,
//! out of the binary, so the line-to-action mapping is testable: the
//! binary performs network I/O only for [`Command::Query`], which this
//! parser never produces for a query keyword without SQL text.

/// Which result encoding a REPL query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Raw,
    Json,
    Binary,
    Stream,
}

impl QueryKind {
    pub fn keyword(self) -> &'static str {
        match self {
            QueryKind::Raw => "raw",
            QueryKind::Json => "json",
            QueryKind::Binary => "binary",
            QueryKind::Stream => "stream",
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "raw" => Some(QueryKind::Raw),
            "json" => Some(QueryKind::Json),
            "binary" => Some(QueryKind::Binary),
            "stream" => Some(QueryKind::Stream),
            _ => None,
        }
    }
}

/// One parsed REPL input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Execute SQL with the named encoding.
    Query { kind: QueryKind, sql: String },
    /// Query keyword with no SQL text; print the usage line, send nothing.
    Usage(QueryKind),
    /// Blank input, skipped without comment.
    Ignore,
    /// `quit`, `exit`, or `q`.
    Quit,
    /// Anything else; print a hint and continue.
    Unknown(String),
}

/// Maps one input line to a [`Command`]. Never fails: unrecognized input
/// becomes [`Command::Unknown`] so the prompt loop always continues.
pub fn parse_line(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Ignore;
    }

    let (word, rest) = match line.split_once(' ') {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "quit" | "exit" | "q" => Command::Quit,
        word => match QueryKind::from_keyword(word) {
            Some(kind) if rest.is_empty() => Command::Usage(kind),
            Some(kind) => Command::Query {
                kind,
                sql: rest.to_string(),
            },
            None => Command::Unknown(word.to_string()),
        },
    }
}
