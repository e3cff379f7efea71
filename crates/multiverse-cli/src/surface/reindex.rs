//! Converts parsed statements with relative offsets into the engine's
//! absolute-index [`Statement`]s, and derives the `var_count` table.
//!
//! A running `name -> latest index` table is threaded through the statement
//! sequence in order. Only mutations advance it (a mutation always appends
//! the next event); revisions and prophecies read it but never bump it,
//! since they don't extend the timeline themselves — a revision replaces an
//! event that some mutation already created, and a prophecy's event is
//! created later by whatever mutation or revision eventually reaches it.
//! Every bare or offset variable reference inside a right-hand side resolves
//! against the table as it stood *before* the statement's own left-hand
//! side is applied.

use indexmap::IndexMap;

use multiverse::{Expr, Program, Statement, StmtKind, VarCount, VarRef};

use super::parser::{SurfaceExpr, SurfaceStatement, SurfaceStmtKind};

pub fn reindex(statements: Vec<SurfaceStatement>) -> (Program, VarCount) {
    let mut counts: IndexMap<String, i64, ahash::RandomState> = IndexMap::default();
    let mut program = Program::with_capacity(statements.len());

    for stmt in statements {
        let rhs = reindex_expr(stmt.rhs, &mut counts);
        // Only a mutation ever writes into `counts` — a revision or prophecy
        // computes its own target index by reading the table, but leaves it
        // untouched, exactly as in the source this was ported from. A
        // variable that is only ever prophesied about (never mutated) can
        // therefore end up with a declared count lower than the index its
        // own prophecy targets; that's expected; `var_count` only gates
        // reads, not writes.
        let lhs_index = match stmt.kind {
            SurfaceStmtKind::Mutation => {
                let next = counts.get(&stmt.lhs_name).copied().unwrap_or(-1) + 1;
                counts.insert(stmt.lhs_name.clone(), next);
                next
            }
            SurfaceStmtKind::Revision | SurfaceStmtKind::Prophecy => {
                let offset = stmt.lhs_offset.expect("revision/prophecy statements always carry an explicit offset");
                counts.get(&stmt.lhs_name).copied().unwrap_or(-1) + offset
            }
        };
        program.push(Statement {
            kind: stmt.kind.into(),
            lhs_name: stmt.lhs_name,
            lhs_index,
            rhs,
            source_line: Some(stmt.line as u32),
        });
    }

    let var_count = counts
        .into_iter()
        .map(|(name, latest)| (name, (latest + 1).max(0) as usize))
        .collect();
    (program, var_count)
}

fn reindex_expr(expr: SurfaceExpr, counts: &mut IndexMap<String, i64, ahash::RandomState>) -> Expr {
    match expr {
        SurfaceExpr::Lit(v) => Expr::Lit(v),
        SurfaceExpr::Var { name, offset } => {
            let current = *counts.entry(name.clone()).or_insert(-1);
            let index = current + offset.unwrap_or(0);
            Expr::Var(VarRef { name, index })
        }
        SurfaceExpr::Def { name, offset } => {
            let current = *counts.entry(name.clone()).or_insert(-1);
            let index = current + offset.unwrap_or(0);
            Expr::Def(VarRef { name, index })
        }
        SurfaceExpr::Unary { op, operand } => Expr::Unary { op, operand: Box::new(reindex_expr(*operand, counts)) },
        SurfaceExpr::Binary { op, left, right } => Expr::Binary {
            op,
            left: Box::new(reindex_expr(*left, counts)),
            right: Box::new(reindex_expr(*right, counts)),
        },
        SurfaceExpr::TupleLit(elements) => {
            let elements: Vec<Expr> = elements.into_iter().map(|e| reindex_expr(e, counts)).collect();
            let concrete = elements.iter().all(|e| matches!(e, Expr::Lit(_)));
            Expr::TupleExpr { elements, concrete }
        }
    }
}

impl From<SurfaceStmtKind> for StmtKind {
    fn from(kind: SurfaceStmtKind) -> Self {
        match kind {
            SurfaceStmtKind::Mutation => Self::Mutation,
            SurfaceStmtKind::Revision => Self::Revision,
            SurfaceStmtKind::Prophecy => Self::Prophecy,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::lexer::lex;
    use super::super::parser::parse_program;
    use super::*;

    #[test]
    fn mutations_advance_the_running_index() {
        let tokens = lex("x = 1\nx = x:-1 + 1\n").unwrap();
        let statements = parse_program(&tokens).unwrap();
        let (program, var_count) = reindex(statements);
        assert_eq!(program[0].lhs_index, 0);
        assert_eq!(program[1].lhs_index, 1);
        assert_eq!(*var_count.get("x").unwrap(), 2);
    }

    #[test]
    fn revision_targets_the_latest_index_without_advancing_the_count() {
        let tokens = lex("x = 1\nx = 2\nx:0 = 9\n").unwrap();
        let statements = parse_program(&tokens).unwrap();
        let (program, var_count) = reindex(statements);
        // ":0" means "the most recently mutated index", here x@1
        assert_eq!(program[2].lhs_index, 1);
        // the revision does not itself add to x's declared count
        assert_eq!(*var_count.get("x").unwrap(), 2);
    }

    #[test]
    fn prophecy_does_not_advance_the_declared_count() {
        let tokens = lex("x = 1\nx:+1 = 2\nout = x:0\n").unwrap();
        let statements = parse_program(&tokens).unwrap();
        let (program, var_count) = reindex(statements);
        assert_eq!(program[1].lhs_index, 1);
        // the prophecy target (x@1) sits past what the table ever records,
        // since only mutations advance it
        assert_eq!(*var_count.get("x").unwrap(), 1);
    }
}
