//! Turns program text into a flat token stream.
//!
//! One statement per logical line: `name[:offset] = expression`. Comments
//! run from `//`, `--`, or `※` to end of line. A run of blank lines collapses
//! into a single [`TokenKind::Newline`], mirroring the original lexer's
//! newline-coalescing so that blank lines between statements don't produce
//! empty statements downstream.

use super::error::SurfaceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    ParenL,
    ParenR,
    BracketL,
    BracketR,
    Sepr,
    Eq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Not,
    Len,
    Idx,
    Def,
    Eqq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Newline,
    Symbol(Symbol),
    Bool(bool),
    Number(i64),
    Atom(String),
    Variable { name: String, offset: Option<i64> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Tokenizes `text` in full. Byte offsets are not tracked; only 1-based
/// line numbers, which are all a [`SurfaceError`] needs to point at.
pub fn lex(text: &str) -> Result<Vec<Token>, SurfaceError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let mut line = 1usize;
    let mut newline_pending = false;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            i += 1;
            line += 1;
            if !newline_pending {
                tokens.push(Token { kind: TokenKind::Newline, line });
                newline_pending = true;
            }
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if is_comment_start(&chars, i) {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let (tok, next) = lex_word(&chars, i, line)?;
            tokens.push(tok);
            i = next;
            newline_pending = false;
            continue;
        }

        if c.is_ascii_digit() {
            let (tok, next) = lex_number(&chars, i, line)?;
            tokens.push(tok);
            i = next;
            newline_pending = false;
            continue;
        }

        if c == '"' {
            let (tok, next) = lex_atom(&chars, i, line)?;
            tokens.push(tok);
            i = next;
            newline_pending = false;
            continue;
        }

        let (symbol, width) = lex_symbol(&chars, i).ok_or_else(|| {
            SurfaceError::new(format!("unrecognized character “{c}”"), line)
        })?;
        tokens.push(Token { kind: TokenKind::Symbol(symbol), line });
        i += width;
        newline_pending = false;
    }

    Ok(tokens)
}

/// Recognizes a comment marker (`//`, `--`, `※`) starting at `pos`.
fn is_comment_start(chars: &[char], pos: usize) -> bool {
    chars[pos] == '\u{203B}'
        || (chars.get(pos + 1) == Some(&chars[pos]) && matches!(chars[pos], '/' | '-'))
}

fn lex_word(chars: &[char], start: usize, line: usize) -> Result<(Token, usize), SurfaceError> {
    let mut i = start;
    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    if i < chars.len() && chars[i] == '?' {
        i += 1;
    }
    let word: String = chars[start..i].iter().collect();

    let kind = match word.as_str() {
        "true" => TokenKind::Bool(true),
        "false" => TokenKind::Bool(false),
        "and" => TokenKind::Symbol(Symbol::And),
        "or" => TokenKind::Symbol(Symbol::Or),
        "not" => TokenKind::Symbol(Symbol::Not),
        "len" => TokenKind::Symbol(Symbol::Len),
        "def" => TokenKind::Symbol(Symbol::Def),
        _ => {
            let (offset, consumed) = lex_offset(chars, i, line)?;
            i += consumed;
            TokenKind::Variable { name: word, offset }
        }
    };
    Ok((Token { kind, line }, i))
}

/// Parses an optional `:0` / `:+n` / `:-n` suffix immediately following an
/// identifier. Returns `(None, 0)` if no such suffix is present at `pos`.
fn lex_offset(chars: &[char], pos: usize, line: usize) -> Result<(Option<i64>, usize), SurfaceError> {
    if chars.get(pos) != Some(&':') {
        return Ok((None, 0));
    }
    let mut j = pos + 1;
    let sign = match chars.get(j) {
        Some('+') => {
            j += 1;
            Some(1i64)
        }
        Some('-') | Some('\u{2212}') => {
            j += 1;
            Some(-1i64)
        }
        _ => None,
    };
    let digits_start = j;
    while chars.get(j).is_some_and(char::is_ascii_digit) {
        j += 1;
    }
    if j == digits_start {
        // Not actually an offset suffix (e.g. the `:` belongs to something
        // else entirely) — leave it for the caller to reject as a stray symbol.
        return Ok((None, 0));
    }
    let digits: String = chars[digits_start..j].iter().collect();
    let magnitude: i64 = digits
        .parse()
        .map_err(|_| SurfaceError::new("offset magnitude out of range", line))?;
    if sign.is_none() && magnitude != 0 {
        return Err(SurfaceError::new("a nonzero offset needs an explicit sign", line)
            .with_note(format!("write “+{digits}” or “\u{2212}{digits}”")));
    }
    let value = sign.unwrap_or(1) * magnitude;
    Ok((Some(value), j - pos))
}

fn lex_number(chars: &[char], start: usize, line: usize) -> Result<(Token, usize), SurfaceError> {
    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let digits: String = chars[start..i].iter().collect();
    let value: i64 = digits
        .parse()
        .map_err(|_| SurfaceError::new("integer literal out of range", line))?;
    Ok((Token { kind: TokenKind::Number(value), line }, i))
}

fn lex_atom(chars: &[char], start: usize, line: usize) -> Result<(Token, usize), SurfaceError> {
    let mut i = start + 1;
    let mut out = String::new();
    loop {
        match chars.get(i) {
            None => return Err(SurfaceError::new("unterminated atom literal", line)),
            Some('"') => {
                i += 1;
                break;
            }
            Some('\\') => {
                let escaped = chars.get(i + 1).copied().ok_or_else(|| SurfaceError::new("unterminated escape sequence", line))?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    'e' => '\u{1B}',
                    '"' => '"',
                    '\\' => '\\',
                    other => return Err(SurfaceError::new(format!("unknown escape sequence “\\{other}”"), line)),
                });
                i += 2;
            }
            Some(&c) => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok((Token { kind: TokenKind::Atom(out), line }, i))
}

fn lex_symbol(chars: &[char], pos: usize) -> Option<(Symbol, usize)> {
    let pair: Option<(char, char)> = chars.get(pos + 1).map(|&b| (chars[pos], b));
    if let Some(p) = pair {
        let sym = match p {
            ('=', '=') => Some(Symbol::Eqq),
            ('!', '=') => Some(Symbol::Neq),
            ('<', '=') => Some(Symbol::Leq),
            ('>', '=') => Some(Symbol::Geq),
            ('=', '<') => Some(Symbol::Leq),
            _ => None,
        };
        if let Some(sym) = sym {
            return Some((sym, 2));
        }
    }
    let sym = match chars[pos] {
        '(' => Symbol::ParenL,
        ')' => Symbol::ParenR,
        '[' => Symbol::BracketL,
        ']' => Symbol::BracketR,
        ',' => Symbol::Sepr,
        '=' => Symbol::Eq,
        '+' => Symbol::Add,
        '-' | '\u{2212}' => Symbol::Sub,
        '*' | '\u{D7}' => Symbol::Mul,
        '/' | '\u{F7}' => Symbol::Div,
        '%' => Symbol::Mod,
        '!' => Symbol::Not,
        '#' => Symbol::Len,
        '.' => Symbol::Idx,
        '?' | '~' => Symbol::Def,
        '<' => Symbol::Lt,
        '>' => Symbol::Gt,
        '\u{2260}' => Symbol::Neq,
        '\u{2265}' => Symbol::Geq,
        '\u{2264}' => Symbol::Leq,
        '\u{2227}' => Symbol::And,
        '\u{2228}' => Symbol::Or,
        _ => return None,
    };
    Some((sym, 1))
}
