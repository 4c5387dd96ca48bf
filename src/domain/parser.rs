//! Tree parser: recursive descent over a stream of lines.
//!
//! One call of `parse_block` handles one nesting level. The
//! parser keeps the current line and an offset into it, so several
//! statements on one line (`a = { b = 1 }`) and blocks spanning many lines
//! are handled by the same loop. Lines that match no production are skipped
//! and reported as diagnostics; only I/O failures abort a parse.

use std::fmt;
use std::io::{self, BufRead};

use tracing::{debug, trace, warn};

use crate::domain::classifier::{classify, Classified, Scalar, Statement};
use crate::domain::entities::{Define, Forest, Node, SourceId};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::number::{Decimal, NumberError};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Deepest block nesting the parser builds. Deeper blocks are skipped whole.
pub const MAX_DEPTH: usize = 256;

/// Non-fatal problem found while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub source: SourceId,
    /// 1-based line number.
    pub line: usize,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    /// The fragment matched no production and was dropped.
    SkippedLine { text: String },
    /// Number-shaped token outside the decimal range; the statement was dropped.
    MalformedNumber { token: String, reason: NumberError },
    /// `}` with no open block; ignored.
    StrayClose,
    /// Input ended inside a block; the block keeps what was read.
    UnclosedBlock { name: Option<String> },
    /// Block opened beyond `MAX_DEPTH`; it was skipped with everything inside.
    NestingTooDeep { name: Option<String> },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::SkippedLine { text } => write!(f, "skipped unrecognized text: {text}"),
            DiagnosticKind::MalformedNumber { token, reason } => {
                write!(f, "skipped malformed number '{token}': {reason}")
            }
            DiagnosticKind::StrayClose => f.write_str("ignored '}' without open block"),
            DiagnosticKind::UnclosedBlock { name: Some(name) } => {
                write!(f, "block '{name}' not closed before end of file")
            }
            DiagnosticKind::UnclosedBlock { name: None } => {
                f.write_str("anonymous block not closed before end of file")
            }
            DiagnosticKind::NestingTooDeep { name } => write!(
                f,
                "skipped block '{}' nested deeper than {MAX_DEPTH} levels",
                name.as_deref().unwrap_or("<anonymous>")
            ),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.source.display(), self.line, self.kind)
    }
}

/// Everything read from one file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedFile {
    pub forest: Forest,
    pub diagnostics: Vec<Diagnostic>,
}

/// Convert a number lexeme accepted by the classifier.
pub fn parse_number(lexeme: &str) -> DomainResult<Decimal> {
    lexeme
        .parse()
        .map_err(|reason| DomainError::MalformedNumber {
            token: lexeme.to_string(),
            reason,
        })
}

/// Lines of a reader, decoded lossily and stripped of `\n` / `\r\n`.
pub fn read_lines<R: BufRead>(reader: R) -> LossyLines<R> {
    LossyLines {
        reader,
        buf: Vec::new(),
    }
}

/// Iterator returned by [`read_lines`].
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.ends_with(b"\n") {
                    self.buf.pop();
                    if self.buf.ends_with(b"\r") {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Parse in-memory text.
pub fn parse_str(source: SourceId, text: &str) -> DomainResult<ParsedFile> {
    ScriptParser::new(source, text.lines().map(|line| Ok(line.to_string()))).parse()
}

enum BlockEnd {
    Closed,
    EndOfInput,
}

/// Streaming parser for one file.
pub struct ScriptParser<L> {
    source: SourceId,
    lines: L,
    line: String,
    pos: usize,
    line_no: usize,
    exhausted: bool,
    defines: Vec<Define>,
    diagnostics: Vec<Diagnostic>,
}

impl<L> ScriptParser<L>
where
    L: Iterator<Item = io::Result<String>>,
{
    pub fn new(source: SourceId, lines: L) -> Self {
        Self {
            source,
            lines,
            line: String::new(),
            pos: 0,
            line_no: 0,
            exhausted: false,
            defines: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Parse the whole stream into root nodes and defines.
    ///
    /// Deterministic for identical input. Fails only when a line cannot be read.
    pub fn parse(mut self) -> DomainResult<ParsedFile> {
        debug!("parse: source={}", self.source.display());
        self.advance()?;

        let mut roots = Vec::new();
        while !self.exhausted {
            if let BlockEnd::Closed = self.parse_block(0, &mut roots)? {
                self.report(DiagnosticKind::StrayClose);
            }
        }

        debug!(
            "parse: source={} roots={} defines={} diagnostics={}",
            self.source.display(),
            roots.len(),
            self.defines.len(),
            self.diagnostics.len()
        );
        Ok(ParsedFile {
            forest: Forest {
                roots,
                defines: self.defines,
            },
            diagnostics: self.diagnostics,
        })
    }

    fn parse_block(&mut self, depth: usize, context: &mut Vec<Node>) -> DomainResult<BlockEnd> {
        while !self.exhausted {
            let (statement, consumed) = {
                let remaining = &self.line[self.pos..];
                let Classified { statement, rest } = classify(remaining, depth == 0);
                (statement.into_owned(), remaining.len() - rest.len())
            };

            match statement {
                Statement::Empty => self.advance()?,
                Statement::Define { name, lexeme } => {
                    match parse_number(&lexeme) {
                        Ok(value) => self.defines.push(Define {
                            name: name.into_owned(),
                            value,
                            source: self.source.clone(),
                        }),
                        Err(e) => self.report_malformed(e)?,
                    }
                    self.advance()?;
                }
                Statement::Open { name } => {
                    self.pos += consumed;
                    let name = name.map(|n| n.into_owned());
                    if depth >= MAX_DEPTH {
                        self.report(DiagnosticKind::NestingTooDeep { name: name.clone() });
                        if let BlockEnd::EndOfInput = self.skip_block()? {
                            self.report(DiagnosticKind::UnclosedBlock { name });
                        }
                        continue;
                    }
                    trace!("open: depth={} name={:?}", depth + 1, name);

                    let mut children = Vec::new();
                    if let BlockEnd::EndOfInput = self.parse_block(depth + 1, &mut children)? {
                        self.report(DiagnosticKind::UnclosedBlock { name: name.clone() });
                    }
                    context.push(Node::block(name, children, self.source.clone()));
                }
                Statement::Close => {
                    self.pos += consumed;
                    trace!("close: depth={}", depth);
                    return Ok(BlockEnd::Closed);
                }
                Statement::Leaf { name, scalar } => {
                    self.pos += consumed;
                    let name = name.map(|n| n.into_owned());
                    match scalar {
                        Scalar::Number { op, lexeme } => match parse_number(&lexeme) {
                            Ok(value) => {
                                context.push(Node::number(name, op, value, self.source.clone()))
                            }
                            Err(e) => self.report_malformed(e)?,
                        },
                        Scalar::Text(text) => {
                            context.push(Node::text(name, text.into_owned(), self.source.clone()))
                        }
                    }
                }
                Statement::Unrecognized => {
                    let text = self.line[self.pos..].trim().to_string();
                    self.report(DiagnosticKind::SkippedLine { text });
                    self.advance()?;
                }
            }
        }
        Ok(BlockEnd::EndOfInput)
    }

    /// Consume an already opened block up to its matching close without building it.
    fn skip_block(&mut self) -> DomainResult<BlockEnd> {
        let mut open = 1usize;
        while !self.exhausted {
            let (statement, consumed) = {
                let remaining = &self.line[self.pos..];
                let Classified { statement, rest } = classify(remaining, false);
                (statement.into_owned(), remaining.len() - rest.len())
            };
            match statement {
                Statement::Empty | Statement::Unrecognized => self.advance()?,
                Statement::Open { .. } => {
                    self.pos += consumed;
                    open += 1;
                }
                Statement::Close => {
                    self.pos += consumed;
                    open -= 1;
                    if open == 0 {
                        return Ok(BlockEnd::Closed);
                    }
                }
                Statement::Define { .. } | Statement::Leaf { .. } => self.pos += consumed,
            }
        }
        Ok(BlockEnd::EndOfInput)
    }

    /// Move to the next line, or mark the stream exhausted.
    fn advance(&mut self) -> DomainResult<()> {
        self.pos = 0;
        match self.lines.next() {
            Some(Ok(line)) => {
                self.line_no += 1;
                self.line = line;
                if self.line_no == 1 && self.line.starts_with(BYTE_ORDER_MARK) {
                    self.pos = BYTE_ORDER_MARK.len_utf8();
                }
            }
            Some(Err(source)) => {
                return Err(DomainError::ReadFailed {
                    path: self.source.to_path_buf(),
                    source,
                })
            }
            None => {
                self.line.clear();
                self.exhausted = true;
            }
        }
        Ok(())
    }

    fn report_malformed(&mut self, error: DomainError) -> DomainResult<()> {
        match error {
            DomainError::MalformedNumber { token, reason } => {
                self.report(DiagnosticKind::MalformedNumber { token, reason });
                Ok(())
            }
            other => Err(other),
        }
    }

    fn report(&mut self, kind: DiagnosticKind) {
        let diagnostic = Diagnostic {
            source: self.source.clone(),
            line: self.line_no,
            kind,
        };
        match diagnostic.kind {
            DiagnosticKind::SkippedLine { .. } => debug!("{}", diagnostic),
            _ => warn!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }
}
