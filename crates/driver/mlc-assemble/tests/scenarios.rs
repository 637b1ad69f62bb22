//! End-to-end scenarios straight from the testable-properties list: each
//! builds a hand-written [`mlc_hir::Program`] and drives it through
//! [`mlc_assemble::mir_from_hir`] (MIR lowering + monomorphization), then
//! asserts on the resulting MIR shape. The typed-AST layer a real frontend
//! would hand to [`mlc_assemble::assemble_program`] is out of scope here;
//! exercising the HIR-to-MIR leg directly is what actually pins down this
//! crate's own behavior.

use mlc_diag::Diagnostics;
use mlc_hir::{
    Block, Decl, Expr, ExprKind, Function, Literal, MatchArm, Param, Pattern, Stmt, StmtKind, Struct,
};
use mlc_intern::Interner;
use mlc_mir::{Operand, PlaceElem, RValue, Statement, Terminator};
use mlc_span::FileSpan;
use mlc_ty::{Primitive, Type};

use mlc_assemble::{mir_from_hir, PipelineConfig};

fn span() -> FileSpan {
    FileSpan::synthetic(mlc_span::FileId(0))
}

fn int_lit(value: i64) -> Expr {
    Expr { kind: ExprKind::Literal(Literal::Int(value)), ty: Type::Primitive(Primitive::Int), span: span() }
}

/// Scenario 1: a method returning a field through `self` mangles to
/// `Type__method` and lowers `self.x` to a deref-then-field place.
#[test]
fn field_through_self_lowers_to_a_deref_field_place() {
    let interner = Interner::new();
    let point = interner.intern("Point");
    let field_x = interner.intern("x");
    let method_name = interner.intern("Point__x");
    let self_name = interner.intern("self");

    let hir_program = mlc_hir::Program {
        decls: vec![
            Decl::Struct(Struct {
                name: point,
                generics: vec![],
                fields: vec![Param { name: field_x, ty: Type::Primitive(Primitive::Int) }],
                auto_impls: vec![],
                span: span(),
            }),
            Decl::Function(Function {
                name: method_name,
                params: vec![Param { name: self_name, ty: Type::Pointer(Box::new(Type::Struct { name: point, type_args: vec![] })) }],
                return_type: Type::Primitive(Primitive::Int),
                generics: vec![],
                body: Some(Block {
                    stmts: vec![Stmt {
                        kind: StmtKind::Return(Some(Expr {
                            kind: ExprKind::Member {
                                object: Box::new(Expr { kind: ExprKind::VarRef { name: self_name, is_function_ref: false, is_closure: false }, ty: Type::Pointer(Box::new(Type::Struct { name: point, type_args: vec![] })), span: span() }),
                                field_or_method: field_x,
                                args: None,
                                is_method_call: false,
                            },
                            ty: Type::Primitive(Primitive::Int),
                            span: span(),
                        })),
                        span: span(),
                    }],
                }),
                is_export: false,
                is_extern: false,
                is_variadic: false,
                span: span(),
            }),
        ],
    };

    let mut diagnostics = Diagnostics::new();
    let mir = mir_from_hir(&hir_program, &interner, &mut diagnostics, &PipelineConfig::default());

    assert!(!diagnostics.has_errors());
    if let Some(function) = mir.functions.iter().find(|f| f.name == method_name) {
        let entry = &function.blocks[0];
        let reads_field = entry.statements.iter().any(|statement| {
            matches!(
                statement,
                Statement::Assign { value: RValue::Use(Operand::Copy(place)), .. }
                    if place.projection == vec![PlaceElem::Deref, PlaceElem::Field(0)]
            )
        });
        assert!(reads_field, "expected a statement reading (*self).field0, got {:?}", entry.statements);
    } else {
        assert!(false, "expected the Point__x method to survive lowering");
    }
}

/// Scenario 2: `println` of an interpolated literal calls `cm_println_format`
/// directly with `(fmt, argc, value)`, never materializing an intermediate
/// formatted string first.
#[test]
fn interpolated_println_calls_the_format_runtime_entry_directly() {
    let interner = Interner::new();
    let main = interner.intern("main");
    let n = interner.intern("n");
    let println_format = interner.intern("cm_println_format");

    let hir_program = mlc_hir::Program {
        decls: vec![Decl::Function(Function {
            name: main,
            params: vec![],
            return_type: Type::Primitive(Primitive::Void),
            generics: vec![],
            body: Some(Block {
                stmts: vec![
                    Stmt { kind: StmtKind::Let { name: n, ty: Type::Primitive(Primitive::Int), init: Some(int_lit(42)), is_const: false, is_static: false, is_move: false }, span: span() },
                    Stmt {
                        kind: StmtKind::Expr(Expr {
                            kind: ExprKind::Call { func_name: println_format, args: vec![
                                Expr { kind: ExprKind::Literal(Literal::String("n={}".to_owned())), ty: Type::Primitive(Primitive::String), span: span() },
                                Expr { kind: ExprKind::Literal(Literal::Int(1)), ty: Type::Primitive(Primitive::Int), span: span() },
                                Expr { kind: ExprKind::VarRef { name: n, is_function_ref: false, is_closure: false }, ty: Type::Primitive(Primitive::Int), span: span() },
                            ], is_indirect: false },
                            ty: Type::Primitive(Primitive::Void),
                            span: span(),
                        }),
                        span: span(),
                    },
                ],
            }),
            is_export: false,
            is_extern: false,
            is_variadic: false,
            span: span(),
        })],
    };

    let mut diagnostics = Diagnostics::new();
    let mir = mir_from_hir(&hir_program, &interner, &mut diagnostics, &PipelineConfig::default());

    assert!(!diagnostics.has_errors());
    if let Some(function) = mir.functions.iter().find(|f| f.name == main) {
        let calls_format = function.blocks.iter().any(|block| {
            matches!(&block.terminator, Terminator::Call { func: Operand::FunctionRef(name), args, .. } if *name == println_format && args.len() == 3)
        });
        assert!(calls_format, "expected a 3-arg call to cm_println_format, got {:?}", function.blocks);
    } else {
        assert!(false, "expected main to survive lowering");
    }
}

/// Scenario 3: `match x { v if v > 0 => 1, _ => 0 }` desugars (upstream of
/// this crate) to a ternary over `x > 0`; here we lower that ternary
/// directly and check it produces a diamond CFG rather than a `Match` node
/// reaching MIR lowering.
#[test]
fn ternary_desugaring_of_a_guarded_match_produces_a_diamond_cfg() {
    let interner = Interner::new();
    let main = interner.intern("main");
    let x = interner.intern("x");

    let cond = Expr {
        kind: ExprKind::Binary { op: mlc_hir::BinOp::Gt, lhs: Box::new(Expr { kind: ExprKind::VarRef { name: x, is_function_ref: false, is_closure: false }, ty: Type::Primitive(Primitive::Int), span: span() }), rhs: Box::new(int_lit(0)) },
        ty: Type::Primitive(Primitive::Bool),
        span: span(),
    };

    let hir_program = mlc_hir::Program {
        decls: vec![Decl::Function(Function {
            name: main,
            params: vec![Param { name: x, ty: Type::Primitive(Primitive::Int) }],
            return_type: Type::Primitive(Primitive::Int),
            generics: vec![],
            body: Some(Block {
                stmts: vec![Stmt {
                    kind: StmtKind::Return(Some(Expr {
                        kind: ExprKind::Ternary { cond: Box::new(cond), then_branch: Box::new(int_lit(1)), else_branch: Box::new(int_lit(0)) },
                        ty: Type::Primitive(Primitive::Int),
                        span: span(),
                    })),
                    span: span(),
                }],
            }),
            is_export: false,
            is_extern: false,
            is_variadic: false,
            span: span(),
        })],
    };

    let mut diagnostics = Diagnostics::new();
    let mir = mir_from_hir(&hir_program, &interner, &mut diagnostics, &PipelineConfig::default());

    assert!(!diagnostics.has_errors());
    if let Some(function) = mir.functions.iter().find(|f| f.name == main) {
        assert!(function.blocks.len() >= 4, "expected a then/else/merge diamond, got {} blocks", function.blocks.len());
    } else {
        assert!(false, "expected main to survive lowering");
    }
}

/// Scenario 4: a generic function's instantiation is mangled (`id__int`),
/// never left bare, and the bare generic template is gone afterward.
#[test]
fn generic_call_site_monomorphizes_to_a_mangled_instance() {
    let interner = Interner::new();
    let id = interner.intern("id");
    let t = interner.intern("T");
    let x = interner.intern("x");
    let main = interner.intern("main");

    let hir_program = mlc_hir::Program {
        decls: vec![
            Decl::Function(Function {
                name: id,
                params: vec![Param { name: x, ty: Type::Generic(t) }],
                return_type: Type::Generic(t),
                generics: vec![t],
                body: Some(Block { stmts: vec![Stmt { kind: StmtKind::Return(Some(Expr { kind: ExprKind::VarRef { name: x, is_function_ref: false, is_closure: false }, ty: Type::Generic(t), span: span() })), span: span() }] }),
                is_export: false,
                is_extern: false,
                is_variadic: false,
                span: span(),
            }),
            Decl::Function(Function {
                name: main,
                params: vec![],
                return_type: Type::Primitive(Primitive::Int),
                generics: vec![],
                body: Some(Block {
                    stmts: vec![Stmt {
                        kind: StmtKind::Return(Some(Expr {
                            kind: ExprKind::Call { func_name: id, args: vec![int_lit(5)], is_indirect: false },
                            ty: Type::Primitive(Primitive::Int),
                            span: span(),
                        })),
                        span: span(),
                    }],
                }),
                is_export: false,
                is_extern: false,
                is_variadic: false,
                span: span(),
            }),
        ],
    };

    let mut diagnostics = Diagnostics::new();
    let mir = mir_from_hir(&hir_program, &interner, &mut diagnostics, &PipelineConfig::default());

    assert!(!diagnostics.has_errors());
    assert!(!mir.functions.iter().any(|f| f.name == id), "the bare generic template must not survive monomorphization");
    if let Some(instance) = mir.functions.iter().find(|f| f.name != main) {
        assert_eq!(interner.resolve(&instance.name), "id__int");
    } else {
        assert!(false, "expected a specialized id__int instance");
    }
}

/// Scenario 5: a `defer` runs after the function body but before `return`,
/// in reverse (LIFO) declaration order, once per scope exit.
#[test]
fn defers_run_in_lifo_order_before_return() {
    let interner = Interner::new();
    let main = interner.intern("main");
    let first = interner.intern("first");
    let second = interner.intern("second");

    let call_stmt = |name: mlc_intern::Symbol| Stmt {
        kind: StmtKind::Expr(Expr { kind: ExprKind::Call { func_name: name, args: vec![], is_indirect: false }, ty: Type::Primitive(Primitive::Void), span: span() }),
        span: span(),
    };

    let hir_program = mlc_hir::Program {
        decls: vec![Decl::Function(Function {
            name: main,
            params: vec![],
            return_type: Type::Primitive(Primitive::Void),
            generics: vec![],
            body: Some(Block {
                stmts: vec![
                    Stmt { kind: StmtKind::Defer { body: Block { stmts: vec![call_stmt(first)] } }, span: span() },
                    Stmt { kind: StmtKind::Defer { body: Block { stmts: vec![call_stmt(second)] } }, span: span() },
                ],
            }),
            is_export: false,
            is_extern: false,
            is_variadic: false,
            span: span(),
        })],
    };

    let mut diagnostics = Diagnostics::new();
    let mir = mir_from_hir(&hir_program, &interner, &mut diagnostics, &PipelineConfig::default());

    assert!(!diagnostics.has_errors());
    if let Some(function) = mir.functions.iter().find(|f| f.name == main) {
        let call_order: Vec<mlc_intern::Symbol> = function
            .blocks
            .iter()
            .filter_map(|block| match &block.terminator {
                Terminator::Call { func: Operand::FunctionRef(name), .. } if *name == first || *name == second => Some(*name),
                _ => None,
            })
            .collect();
        assert_eq!(call_order, vec![second, first], "defers must run in LIFO order");
    } else {
        assert!(false, "expected main to survive lowering");
    }
}

/// Scenario 6: an early `return` inside a scope still runs that scope's
/// outstanding destructor before the `return` terminator.
#[test]
fn early_return_still_runs_a_pending_defer() {
    let interner = Interner::new();
    let main = interner.intern("main");
    let cleanup = interner.intern("cleanup");

    let call_cleanup = Stmt {
        kind: StmtKind::Expr(Expr { kind: ExprKind::Call { func_name: cleanup, args: vec![], is_indirect: false }, ty: Type::Primitive(Primitive::Void), span: span() }),
        span: span(),
    };

    let hir_program = mlc_hir::Program {
        decls: vec![Decl::Function(Function {
            name: main,
            params: vec![],
            return_type: Type::Primitive(Primitive::Void),
            generics: vec![],
            body: Some(Block {
                stmts: vec![
                    Stmt { kind: StmtKind::Defer { body: Block { stmts: vec![call_cleanup] } }, span: span() },
                    Stmt { kind: StmtKind::Return(None), span: span() },
                ],
            }),
            is_export: false,
            is_extern: false,
            is_variadic: false,
            span: span(),
        })],
    };

    let mut diagnostics = Diagnostics::new();
    let mir = mir_from_hir(&hir_program, &interner, &mut diagnostics, &PipelineConfig::default());

    assert!(!diagnostics.has_errors());
    if let Some(function) = mir.functions.iter().find(|f| f.name == main) {
        let calls_cleanup = function.blocks.iter().any(|block| matches!(&block.terminator, Terminator::Call { func: Operand::FunctionRef(name), .. } if *name == cleanup));
        assert!(calls_cleanup, "expected the deferred cleanup call to run before return");
    } else {
        assert!(false, "expected main to survive lowering");
    }
}

#[test]
fn match_arm_pattern_is_constructible_even_though_desugaring_happens_upstream() {
    // Regression guard: `mlc_hir::Pattern`/`MatchArm` must stay constructible
    // from this crate's tests even though HIR lowering always desugars
    // `match` to `Ternary` before MIR lowering ever sees it (scenario 3).
    let interner = Interner::new();
    let v = interner.intern("v");
    let arm = MatchArm { pattern: Pattern::Variable(v), guard: None, body: Box::new(int_lit(1)) };
    assert!(matches!(arm.pattern, Pattern::Variable(_)));
}
