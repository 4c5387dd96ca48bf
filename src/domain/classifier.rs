//! Line classifier: matches the start of a line fragment against the script grammar.
//!
//! Productions are tried in a fixed order and the first match wins:
//! empty/comment, define (root only), block open, block close, keyed number,
//! keyed text, bare number, bare text. Every match reports the unconsumed
//! remainder so the parser can continue on the same line.
//!
//! A `#` starts a comment wherever a token may start. Quotes are ordinary
//! token characters, so a `#` inside a quoted value still starts a comment.

use std::borrow::Cow;

use crate::domain::entities::ComparisonOperator;

/// Scalar payload of a leaf statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar<'a> {
    /// Number-shaped lexeme; converted by the parser.
    Number {
        op: ComparisonOperator,
        lexeme: Cow<'a, str>,
    },
    Text(Cow<'a, str>),
}

impl Scalar<'_> {
    pub fn into_owned(self) -> Scalar<'static> {
        match self {
            Scalar::Number { op, lexeme } => Scalar::Number {
                op,
                lexeme: own(lexeme),
            },
            Scalar::Text(text) => Scalar::Text(own(text)),
        }
    }
}

/// Grammar production recognized at the start of a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    /// Whitespace and/or a comment up to the end of the line.
    Empty,
    /// `@name = number`; always consumes the whole line.
    Define {
        name: Cow<'a, str>,
        lexeme: Cow<'a, str>,
    },
    /// `name = {` or a bare `{`.
    Open { name: Option<Cow<'a, str>> },
    /// `}`
    Close,
    /// Keyed or bare scalar.
    Leaf {
        name: Option<Cow<'a, str>>,
        scalar: Scalar<'a>,
    },
    /// Nothing matched.
    Unrecognized,
}

impl Statement<'_> {
    pub fn into_owned(self) -> Statement<'static> {
        match self {
            Statement::Empty => Statement::Empty,
            Statement::Define { name, lexeme } => Statement::Define {
                name: own(name),
                lexeme: own(lexeme),
            },
            Statement::Open { name } => Statement::Open {
                name: name.map(own),
            },
            Statement::Close => Statement::Close,
            Statement::Leaf { name, scalar } => Statement::Leaf {
                name: name.map(own),
                scalar: scalar.into_owned(),
            },
            Statement::Unrecognized => Statement::Unrecognized,
        }
    }
}

fn own(s: Cow<'_, str>) -> Cow<'static, str> {
    Cow::Owned(s.into_owned())
}

/// Classification result: the statement and the text after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified<'a> {
    pub statement: Statement<'a>,
    /// Suffix of the input left unconsumed. Empty for whole-line productions.
    pub rest: &'a str,
}

/// Classify the start of `input`. Defines are only recognized when `at_root` is set.
pub fn classify(input: &str, at_root: bool) -> Classified<'_> {
    for (production, root_only) in PRODUCTIONS {
        if root_only && !at_root {
            continue;
        }
        let mut cursor = Cursor::new(input);
        if let Some(statement) = production(&mut cursor) {
            return Classified {
                statement,
                rest: cursor.rest(),
            };
        }
    }
    Classified {
        statement: Statement::Unrecognized,
        rest: input,
    }
}

type Production = for<'a> fn(&mut Cursor<'a>) -> Option<Statement<'a>>;

const PRODUCTIONS: [(Production, bool); 8] = [
    (empty, false),
    (define, true),
    (open, false),
    (close, false),
    (keyed_number, false),
    (keyed_text, false),
    (bare_number, false),
    (bare_text, false),
];

fn empty<'a>(c: &mut Cursor<'a>) -> Option<Statement<'a>> {
    c.skip_ws();
    c.at_line_end().then(|| {
        c.finish();
        Statement::Empty
    })
}

fn define<'a>(c: &mut Cursor<'a>) -> Option<Statement<'a>> {
    c.skip_ws();
    c.expect('@')?;
    let name = c.take_while(is_define_name_char)?;
    c.skip_ws();
    c.expect('=')?;
    c.skip_ws();
    let lexeme = number_token(c)?;
    c.skip_ws();
    if !c.at_line_end() {
        return None;
    }
    c.finish();
    Some(Statement::Define {
        name: Cow::Borrowed(name),
        lexeme: Cow::Borrowed(lexeme),
    })
}

fn open<'a>(c: &mut Cursor<'a>) -> Option<Statement<'a>> {
    c.skip_ws();
    let name = if c.eat('{') {
        None
    } else {
        let name = c.take_while(is_ident_char)?;
        c.skip_ws();
        c.expect('=')?;
        c.skip_ws();
        c.expect('{')?;
        Some(Cow::Borrowed(name))
    };
    c.skip_ws();
    Some(Statement::Open { name })
}

fn close<'a>(c: &mut Cursor<'a>) -> Option<Statement<'a>> {
    c.skip_ws();
    c.expect('}')?;
    c.skip_ws();
    Some(Statement::Close)
}

fn keyed_number<'a>(c: &mut Cursor<'a>) -> Option<Statement<'a>> {
    c.skip_ws();
    let name = c.take_while(is_ident_char)?;
    c.skip_ws();
    let op = operator(c)?;
    c.skip_ws();
    let lexeme = number_token(c)?;
    c.skip_ws();
    Some(Statement::Leaf {
        name: Some(Cow::Borrowed(name)),
        scalar: Scalar::Number {
            op,
            lexeme: Cow::Borrowed(lexeme),
        },
    })
}

fn keyed_text<'a>(c: &mut Cursor<'a>) -> Option<Statement<'a>> {
    c.skip_ws();
    let name = c.take_while(is_ident_char)?;
    c.skip_ws();
    c.expect('=')?;
    c.skip_ws();
    let value = c.take_while(is_ident_char)?;
    c.skip_ws();
    Some(Statement::Leaf {
        name: Some(Cow::Borrowed(name)),
        scalar: Scalar::Text(Cow::Borrowed(value)),
    })
}

fn bare_number<'a>(c: &mut Cursor<'a>) -> Option<Statement<'a>> {
    c.skip_ws();
    let lexeme = number_token(c)?;
    c.skip_ws();
    Some(Statement::Leaf {
        name: None,
        scalar: Scalar::Number {
            op: ComparisonOperator::Eq,
            lexeme: Cow::Borrowed(lexeme),
        },
    })
}

fn bare_text<'a>(c: &mut Cursor<'a>) -> Option<Statement<'a>> {
    c.skip_ws();
    let value = c.take_while(is_ident_char)?;
    c.skip_ws();
    Some(Statement::Leaf {
        name: None,
        scalar: Scalar::Text(Cow::Borrowed(value)),
    })
}

fn operator(c: &mut Cursor<'_>) -> Option<ComparisonOperator> {
    ComparisonOperator::BY_SYMBOL_LENGTH
        .into_iter()
        .find(|op| c.eat_str(op.symbol()))
}

/// A whole token of the form `[+-]?digits(.digits*)?`.
///
/// The token runs as far as identifier characters go and must match as a
/// whole. A numeric prefix never splits a token, so ids like `10abc` and
/// dates like `2200.1.1` stay text.
fn number_token<'a>(c: &mut Cursor<'a>) -> Option<&'a str> {
    let input = c.input;
    let start = c.pos;
    if !c.eat('+') {
        c.eat('-');
    }
    match c.take_while(is_ident_char) {
        Some(body) if is_number_shape(body) => Some(&input[start..c.pos]),
        _ => {
            c.pos = start;
            None
        }
    }
}

fn is_number_shape(token: &str) -> bool {
    let (int_part, frac_part) = token.split_once('.').unwrap_or((token, ""));
    !int_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '"')
}

fn is_define_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn finish(&mut self) {
        self.pos = self.input.len();
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// End of input, or a comment that runs to it.
    fn at_line_end(&self) -> bool {
        let rest = self.rest();
        rest.is_empty() || rest.starts_with('#')
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.rest().starts_with(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Option<()> {
        self.eat(expected).then_some(())
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        if self.rest().starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    /// Non-empty run of matching characters.
    fn take_while(&mut self, pred: fn(char) -> bool) -> Option<&'a str> {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }
}
