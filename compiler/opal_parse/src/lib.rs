//! Recursive-descent parser: token stream → surface AST.
//!
//! Expression parsing is precedence climbing over the closed operator
//! table; statements and declarations are straightforward descent with
//! two speculative spots (variable declarations vs. expressions, and
//! match case labels vs. statements) handled by cursor snapshots.

mod cursor;
mod grammar;

pub use cursor::{Cursor, PResult};

use opal_diagnostic::Diagnostic;
use opal_ir::ast::Decl;
use opal_ir::{StringInterner, TokenList};

/// Parse a whole token stream into top-level declarations.
pub fn parse(tokens: &TokenList, interner: &StringInterner) -> Result<Vec<Decl>, Diagnostic> {
    let mut cx = Cursor::new(tokens, interner);
    grammar::decl::parse_program(&mut cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_ir::ast::{DeclKind, ExprKind, ParsedTypeKind, StmtKind};
    // Tests drive the parser through real token streams from the sibling
    // lexer crate rather than hand-built ones.
    use opal_lexer::lex;

    fn parse_source(source: &str) -> Vec<Decl> {
        let interner = StringInterner::new();
        let tokens = lex(source, 0, &interner).expect("lex failed");
        parse(&tokens, &interner).expect("parse failed")
    }

    fn parse_err(source: &str) -> Diagnostic {
        let interner = StringInterner::new();
        let tokens = lex(source, 0, &interner).expect("lex failed");
        parse(&tokens, &interner).expect_err("expected parse failure")
    }

    #[test]
    fn parses_main_with_print() {
        let decls = parse_source("proc main() { print(1 + 2 * 3); }");
        assert_eq!(decls.len(), 1);
        let DeclKind::Subroutine(subr) = &decls[0].kind else {
            panic!("expected subroutine");
        };
        assert!(!subr.pure);
        assert!(subr.ret.is_none());
        assert_eq!(subr.params.len(), 0);
        let body = subr.body.as_ref().unwrap();
        assert!(matches!(body[0].kind, StmtKind::Print(_)));
    }

    #[test]
    fn precedence_groups_multiplication_tighter() {
        let decls = parse_source("proc main() { print(1 + 2 * 3); }");
        let DeclKind::Subroutine(subr) = &decls[0].kind else { panic!() };
        let StmtKind::Print(exprs) = &subr.body.as_ref().unwrap()[0].kind else { panic!() };
        // (1 + (2 * 3))
        let ExprKind::Binary(lhs, op, rhs) = &exprs[0].kind else { panic!() };
        assert_eq!(op.as_str(), "+");
        assert!(matches!(lhs.kind, ExprKind::Int(1)));
        assert!(matches!(rhs.kind, ExprKind::Binary(..)));
    }

    #[test]
    fn parses_typed_function() {
        let decls = parse_source("func int f(int x) { return x * x; }");
        let DeclKind::Subroutine(subr) = &decls[0].kind else { panic!() };
        assert!(subr.pure);
        assert!(matches!(
            subr.ret.as_ref().unwrap().kind,
            ParsedTypeKind::Prim(opal_ir::ast::PrimName::Int)
        ));
        assert_eq!(subr.params.len(), 1);
    }

    #[test]
    fn parses_array_decl_and_index_assign() {
        let decls = parse_source("proc main() { int[] a = [1, 2, 3]; a[1] = 10; }");
        let DeclKind::Subroutine(subr) = &decls[0].kind else { panic!() };
        let body = subr.body.as_ref().unwrap();
        assert!(matches!(
            &body[0].kind,
            StmtKind::VarDecl { ty, .. } if matches!(ty.kind, ParsedTypeKind::Array(_))
        ));
        let StmtKind::Assign { lhs, op: None, .. } = &body[1].kind else { panic!() };
        assert!(matches!(lhs.kind, ExprKind::Index { .. }));
    }

    #[test]
    fn parses_for_c_with_continue() {
        let decls =
            parse_source("proc main() { for(int i = 0; i < 3; i++) { if(i == 1) continue; } }");
        let DeclKind::Subroutine(subr) = &decls[0].kind else { panic!() };
        let StmtKind::ForC { init, incr, .. } = &subr.body.as_ref().unwrap()[0].kind else {
            panic!()
        };
        assert!(matches!(
            init.as_deref().unwrap().kind,
            StmtKind::VarDecl { .. }
        ));
        // i++ arrives as i = i + 1 in spirit: an assign with op Plus.
        assert!(matches!(
            &incr.as_deref().unwrap().kind,
            StmtKind::Assign { op: Some(op), .. } if op.as_str() == "+"
        ));
    }

    #[test]
    fn parses_range_and_array_loops() {
        let decls = parse_source(
            "proc main() { for i : 0, 10 { print(i); } for [j, x] : [1, 2] { print(x); } }",
        );
        let DeclKind::Subroutine(subr) = &decls[0].kind else { panic!() };
        let body = subr.body.as_ref().unwrap();
        assert!(matches!(body[0].kind, StmtKind::ForRange { .. }));
        let StmtKind::ForArray { names, .. } = &body[1].kind else { panic!() };
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn parses_union_type_and_match() {
        let decls = parse_source(
            "proc main() { (int|bool) u = true; match(v: u) { bool: print(v); int: print(\"i\"); } }",
        );
        let DeclKind::Subroutine(subr) = &decls[0].kind else { panic!() };
        let body = subr.body.as_ref().unwrap();
        assert!(matches!(
            &body[0].kind,
            StmtKind::VarDecl { ty, .. } if matches!(&ty.kind, ParsedTypeKind::Union(opts) if opts.len() == 2)
        ));
        let StmtKind::Match { cases, .. } = &body[1].kind else { panic!() };
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].body.len(), 1);
        assert_eq!(cases[1].body.len(), 1);
    }

    #[test]
    fn parses_switch_with_labels() {
        let decls = parse_source(
            "proc main() { switch(x) { case 1: print(1); break; case 2: print(2); default: print(0); } }",
        );
        let DeclKind::Subroutine(subr) = &decls[0].kind else { panic!() };
        let StmtKind::Switch { cases, default, stmts, .. } =
            &subr.body.as_ref().unwrap()[0].kind
        else {
            panic!()
        };
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].1, 0);
        assert_eq!(cases[1].1, 2);
        assert_eq!(*default, Some(3));
        assert_eq!(stmts.len(), 4);
    }

    #[test]
    fn parses_struct_with_method() {
        let decls = parse_source(
            "struct Vec { int x; int y; func int sum() { return this.x + this.y; } }",
        );
        let DeclKind::Struct { decls: members, .. } = &decls[0].kind else { panic!() };
        assert_eq!(members.len(), 3);
        assert!(matches!(members[0].kind, DeclKind::Var { .. }));
        assert!(matches!(members[2].kind, DeclKind::Subroutine(_)));
    }

    #[test]
    fn parses_module_enum_typedef() {
        let decls = parse_source(
            "module m { enum Color { red, green = 5, blue } typedef (int: bool) Flags; }",
        );
        let DeclKind::Module { decls: inner, .. } = &decls[0].kind else { panic!() };
        let DeclKind::Enum { items, .. } = &inner[0].kind else { panic!() };
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].value, Some((false, 5)));
        assert!(matches!(
            &inner[1].kind,
            DeclKind::Typedef { ty, .. } if matches!(ty.kind, ParsedTypeKind::Map(..))
        ));
    }

    #[test]
    fn parses_extern_and_static() {
        let decls = parse_source("extern proc int now(); static int counter = 0;");
        assert!(matches!(decls[0].kind, DeclKind::ExternSubroutine(_)));
        assert!(matches!(decls[1].kind, DeclKind::Var { is_static: true, .. }));
    }

    #[test]
    fn parses_new_array_and_is_as() {
        let decls = parse_source(
            "proc main() { int[][] g = array int[3][4]; if (u is bool) { bool b = u as bool; } }",
        );
        let DeclKind::Subroutine(subr) = &decls[0].kind else { panic!() };
        let body = subr.body.as_ref().unwrap();
        let StmtKind::VarDecl { init: Some(init), .. } = &body[0].kind else { panic!() };
        let ExprKind::NewArray { dims, .. } = &init.kind else { panic!() };
        assert_eq!(dims.len(), 2);
        let StmtKind::If { cond, .. } = &body[1].kind else { panic!() };
        assert!(matches!(cond.kind, ExprKind::Is { .. }));
    }

    #[test]
    fn rejects_statement_soup() {
        let err = parse_err("proc main() { 1 + 2; }");
        assert!(err.message.contains("not a statement"));
    }

    #[test]
    fn rejects_empty_enum() {
        let err = parse_err("enum E { }");
        assert!(err.message.contains("at least one"));
    }
}
