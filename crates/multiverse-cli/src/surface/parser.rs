//! Recursive-descent parser over the token stream: one `name[:offset] =
//! expression` statement per logical line.
//!
//! Operator precedence, loosest to tightest binding: `or`, `and`,
//! comparisons (`==`,`!=`,`<`,`>`,`<=`,`>=`), additive (`+`,`-`),
//! multiplicative (`*`,`/`,`%`), prefix (`-`,`!`,`#`,`def`), then `.`
//! (tuple indexing) binding tightest of all. `[a, b, c]` builds a tuple
//! literal; `[]` is the empty tuple.

use multiverse::{Op, Value};

use super::error::SurfaceError;
use super::lexer::{Symbol, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStmtKind {
    Mutation,
    Revision,
    Prophecy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceExpr {
    Lit(Value),
    Var { name: String, offset: Option<i64> },
    Def { name: String, offset: Option<i64> },
    Unary { op: Op, operand: Box<SurfaceExpr> },
    Binary { op: Op, left: Box<SurfaceExpr>, right: Box<SurfaceExpr> },
    TupleLit(Vec<SurfaceExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceStatement {
    pub kind: SurfaceStmtKind,
    pub lhs_name: String,
    pub lhs_offset: Option<i64>,
    pub rhs: SurfaceExpr,
    pub line: usize,
}

pub fn parse_program(tokens: &[Token]) -> Result<Vec<SurfaceStatement>, SurfaceError> {
    let mut pos = 0usize;
    let mut statements = Vec::new();
    skip_newlines(tokens, &mut pos);
    while pos < tokens.len() {
        let stmt = parse_statement(tokens, &mut pos)?;
        statements.push(stmt);
        skip_newlines(tokens, &mut pos);
    }
    Ok(statements)
}

fn skip_newlines(tokens: &[Token], pos: &mut usize) {
    while tokens.get(*pos).is_some_and(|t| t.kind == TokenKind::Newline) {
        *pos += 1;
    }
}

fn parse_statement(tokens: &[Token], pos: &mut usize) -> Result<SurfaceStatement, SurfaceError> {
    let head = tokens.get(*pos).ok_or_else(|| SurfaceError::new("expected a statement", 0))?;
    let TokenKind::Variable { name, offset } = head.kind.clone() else {
        return Err(SurfaceError::new("a statement must begin with a variable name", head.line));
    };
    let line = head.line;
    *pos += 1;

    match tokens.get(*pos) {
        Some(Token { kind: TokenKind::Symbol(Symbol::Eq), .. }) => *pos += 1,
        other => {
            let at = other.map_or(line, |t| t.line);
            return Err(SurfaceError::new("expected “=” after the variable name", at));
        }
    }

    let rhs_tokens = take_until_top_level_newline(tokens, pos);
    if rhs_tokens.is_empty() {
        return Err(SurfaceError::new("missing right-hand side expression", line));
    }
    let rhs = parse_expression(rhs_tokens, line)?;

    let kind = match offset {
        None => SurfaceStmtKind::Mutation,
        Some(n) if n > 0 => SurfaceStmtKind::Prophecy,
        Some(_) => SurfaceStmtKind::Revision,
    };
    Ok(SurfaceStatement { kind, lhs_name: name, lhs_offset: offset, rhs, line })
}

/// Slices off every token up to (but not including) the next `Newline` that
/// occurs while the bracket nesting depth is zero, advancing `pos` past it.
fn take_until_top_level_newline<'a>(tokens: &'a [Token], pos: &mut usize) -> &'a [Token] {
    let start = *pos;
    let mut depth = 0i32;
    while let Some(tok) = tokens.get(*pos) {
        match &tok.kind {
            TokenKind::Newline if depth == 0 => break,
            TokenKind::Symbol(Symbol::ParenL | Symbol::BracketL) => depth += 1,
            TokenKind::Symbol(Symbol::ParenR | Symbol::BracketR) => depth -= 1,
            _ => {}
        }
        *pos += 1;
    }
    let end = *pos;
    if tokens.get(*pos).is_some() {
        *pos += 1; // consume the terminating newline
    }
    &tokens[start..end]
}

fn parse_expression(tokens: &[Token], line: usize) -> Result<SurfaceExpr, SurfaceError> {
    let mut parser = ExprParser { tokens, pos: 0, line };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        let at = parser.tokens.get(parser.pos).map_or(parser.line, |t| t.line);
        return Err(SurfaceError::new("unexpected trailing tokens in expression", at));
    }
    Ok(expr)
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
}

impl<'a> ExprParser<'a> {
    fn peek_symbol(&self) -> Option<Symbol> {
        match self.tokens.get(self.pos) {
            Some(Token { kind: TokenKind::Symbol(s), .. }) => Some(*s),
            _ => None,
        }
    }

    fn bump(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn err(&self, message: impl Into<String>) -> SurfaceError {
        let at = self.tokens.get(self.pos).map_or(self.line, |t| t.line);
        SurfaceError::new(message, at)
    }

    fn expect_symbol(&mut self, symbol: Symbol, context: &str) -> Result<(), SurfaceError> {
        if self.peek_symbol() == Some(symbol) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.err(format!("expected {context}")))
        }
    }

    fn parse_or(&mut self) -> Result<SurfaceExpr, SurfaceError> {
        let mut lhs = self.parse_and()?;
        while self.peek_symbol() == Some(Symbol::Or) {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = SurfaceExpr::Binary { op: Op::Or, left: Box::new(lhs), right: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<SurfaceExpr, SurfaceError> {
        let mut lhs = self.parse_cmp()?;
        while self.peek_symbol() == Some(Symbol::And) {
            self.bump();
            let rhs = self.parse_cmp()?;
            lhs = SurfaceExpr::Binary { op: Op::And, left: Box::new(lhs), right: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<SurfaceExpr, SurfaceError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_symbol() {
                Some(Symbol::Eqq) => Op::Eq,
                Some(Symbol::Neq) => Op::Neq,
                Some(Symbol::Lt) => Op::Lt,
                Some(Symbol::Gt) => Op::Gt,
                Some(Symbol::Leq) => Op::Leq,
                Some(Symbol::Geq) => Op::Geq,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_additive()?;
            lhs = SurfaceExpr::Binary { op, left: Box::new(lhs), right: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<SurfaceExpr, SurfaceError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek_symbol() {
                Some(Symbol::Add) => Op::Add,
                Some(Symbol::Sub) => Op::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_term()?;
            lhs = SurfaceExpr::Binary { op, left: Box::new(lhs), right: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<SurfaceExpr, SurfaceError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_symbol() {
                Some(Symbol::Mul) => Op::Mul,
                Some(Symbol::Div) => Op::Div,
                Some(Symbol::Mod) => Op::Mod,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = SurfaceExpr::Binary { op, left: Box::new(lhs), right: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<SurfaceExpr, SurfaceError> {
        match self.peek_symbol() {
            Some(Symbol::Add) => {
                // Unary plus has no engine-level operator; it's a pure
                // surface no-op, so it's simply discarded here.
                self.bump();
                self.parse_unary()
            }
            Some(Symbol::Sub) => {
                self.bump();
                let operand = self.parse_unary()?;
                Ok(SurfaceExpr::Unary { op: Op::Neg, operand: Box::new(operand) })
            }
            Some(Symbol::Not) => {
                self.bump();
                let operand = self.parse_unary()?;
                Ok(SurfaceExpr::Unary { op: Op::Not, operand: Box::new(operand) })
            }
            Some(Symbol::Len) => {
                self.bump();
                let operand = self.parse_unary()?;
                Ok(SurfaceExpr::Unary { op: Op::Len, operand: Box::new(operand) })
            }
            Some(Symbol::Def) => {
                self.bump();
                match self.parse_unary()? {
                    SurfaceExpr::Var { name, offset } => Ok(SurfaceExpr::Def { name, offset }),
                    _ => Err(self.err("“def” only applies to a variable reference")),
                }
            }
            _ => self.parse_idx(),
        }
    }

    fn parse_idx(&mut self) -> Result<SurfaceExpr, SurfaceError> {
        let mut lhs = self.parse_primary()?;
        while self.peek_symbol() == Some(Symbol::Idx) {
            self.bump();
            let rhs = self.parse_primary()?;
            lhs = SurfaceExpr::Binary { op: Op::Idx, left: Box::new(lhs), right: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<SurfaceExpr, SurfaceError> {
        let Some(tok) = self.bump().cloned() else {
            return Err(self.err("expected an expression"));
        };
        match tok.kind {
            TokenKind::Number(n) => Ok(SurfaceExpr::Lit(Value::Integer(n))),
            TokenKind::Atom(s) => Ok(SurfaceExpr::Lit(Value::Atom(s))),
            TokenKind::Bool(b) => Ok(SurfaceExpr::Lit(Value::Boolean(b))),
            TokenKind::Variable { name, offset } => Ok(SurfaceExpr::Var { name, offset }),
            TokenKind::Symbol(Symbol::ParenL) => {
                let inner = self.parse_or()?;
                self.expect_symbol(Symbol::ParenR, "“)”")?;
                Ok(inner)
            }
            TokenKind::Symbol(Symbol::BracketL) => {
                let mut elements = Vec::new();
                if self.peek_symbol() != Some(Symbol::BracketR) {
                    elements.push(self.parse_or()?);
                    while self.peek_symbol() == Some(Symbol::Sepr) {
                        self.bump();
                        elements.push(self.parse_or()?);
                    }
                }
                self.expect_symbol(Symbol::BracketR, "“]”")?;
                Ok(SurfaceExpr::TupleLit(elements))
            }
            _ => Err(self.err("expected an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::lexer::lex;
    use super::*;

    #[test]
    fn unary_minus_binds_tighter_than_multiplication() {
        let tokens = lex("x = -1 * 2\n").unwrap();
        let statements = parse_program(&tokens).unwrap();
        let SurfaceExpr::Binary { op: Op::Mul, left, .. } = &statements[0].rhs else {
            panic!("expected a multiplication at the top");
        };
        assert!(matches!(**left, SurfaceExpr::Unary { op: Op::Neg, .. }));
    }

    #[test]
    fn idx_binds_tighter_than_unary() {
        let tokens = lex("x = -a.0\n").unwrap();
        let statements = parse_program(&tokens).unwrap();
        let SurfaceExpr::Unary { op: Op::Neg, operand } = &statements[0].rhs else {
            panic!("expected a negation at the top");
        };
        assert!(matches!(**operand, SurfaceExpr::Binary { op: Op::Idx, .. }));
    }

    #[test]
    fn tuple_literal_parses_comma_separated_elements() {
        let tokens = lex("x = [1, 2, 3]\n").unwrap();
        let statements = parse_program(&tokens).unwrap();
        let SurfaceExpr::TupleLit(elements) = &statements[0].rhs else {
            panic!("expected a tuple literal");
        };
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn revision_and_prophecy_are_distinguished_by_offset_sign() {
        let tokens = lex("x:-1 = 0\ny:+1 = 0\n").unwrap();
        let statements = parse_program(&tokens).unwrap();
        assert_eq!(statements[0].kind, SurfaceStmtKind::Revision);
        assert_eq!(statements[1].kind, SurfaceStmtKind::Prophecy);
    }

    #[test]
    fn def_requires_a_bare_variable_operand() {
        let tokens = lex("x = def (1 + 1)\n").unwrap();
        let err = parse_program(&tokens).unwrap_err();
        assert!(err.message.contains("def"));
    }
}
