//! Desugars `match` into a right-associated ternary chain, per the HIR
//! lowering rules: `match x { P1 => E1, ..., _ => E_default }` becomes
//! `cond(P1) ? E1 : (cond(P2) ? E2 : ... : E_default)`.

use mlc_diag::{Diagnostics, Warning};
use mlc_hir::{BinOp, Expr, ExprKind, Literal, Stmt, StmtKind};
use mlc_intern::Symbol;
use mlc_span::FileSpan;
use mlc_ty::Type;

/// One already-lowered match arm: `scrutinee`-independent pieces have been
/// lowered by the caller; this module only builds the ternary-chain shape.
pub struct LoweredArm {
    pub pattern: ArmPattern,
    pub guard: Option<Expr>,
    pub body: Expr,
    pub span: FileSpan,
}

pub enum ArmPattern {
    Literal(Expr),
    EnumTag(i64),
    Variable(Symbol),
    Wildcard,
}

/// Builds the ternary chain for one match. `scrutinee` must already be a
/// side-effect-free place-like expression (lowering hoists the scrutinee
/// into a temp before calling this, so it can be evaluated repeatedly by
/// the generated `cond(P)` checks without re-running side effects).
#[must_use]
pub fn desugar(
    scrutinee: Expr,
    arms: Vec<LoweredArm>,
    result_type: Type,
    span: FileSpan,
    diagnostics: &mut Diagnostics,
) -> Expr {
    let has_default = arms.iter().any(|arm| matches!(arm.pattern, ArmPattern::Wildcard));
    if !has_default {
        diagnostics.report_warning(
            &Warning::MissingMatchDefault {
                scrutinee_type: format!("{:?}", scrutinee.ty),
                span,
            },
            span,
            None,
        );
    }
    let default = zero_value(&result_type, span);
    build_chain(&scrutinee, &arms, 0, default, span)
}

fn build_chain(scrutinee: &Expr, arms: &[LoweredArm], index: usize, default: Expr, span: FileSpan) -> Expr {
    let Some(arm) = arms.get(index) else {
        return default;
    };
    let rest = build_chain(scrutinee, arms, index + 1, default, span);

    match &arm.pattern {
        ArmPattern::Wildcard => {
            // A wildcard with no guard takes over unconditionally; the
            // boundary case "empty match with only a wildcard" falls out
            // of this naturally since `rest` is just `default`.
            match &arm.guard {
                None => arm.body.clone(),
                Some(guard) => ternary(guard.clone(), arm.body.clone(), rest, span),
            }
        }
        ArmPattern::Literal(literal) => {
            let cond = eq(scrutinee.clone(), literal.clone(), span);
            let cond = attach_guard(cond, &arm.guard, span);
            ternary(cond, arm.body.clone(), rest, span)
        }
        ArmPattern::EnumTag(tag) => {
            let literal = Expr {
                kind: ExprKind::Literal(Literal::Int(*tag)),
                ty: scrutinee.ty.clone(),
                span,
            };
            let cond = eq(scrutinee.clone(), literal, span);
            let cond = attach_guard(cond, &arm.guard, span);
            ternary(cond, arm.body.clone(), rest, span)
        }
        ArmPattern::Variable(name) => {
            // Bind the variable for both guard and body via a scoped let.
            let bound_guard = arm.guard.as_ref().map(|guard| bind(*name, scrutinee.clone(), guard.clone(), span));
            let bound_body = bind(*name, scrutinee.clone(), arm.body.clone(), span);
            match bound_guard {
                Some(guard) => ternary(guard, bound_body, rest, span),
                None => bound_body,
            }
        }
    }
}

fn bind(name: Symbol, scrutinee: Expr, value: Expr, span: FileSpan) -> Expr {
    let let_stmt = Stmt {
        kind: StmtKind::Let {
            name,
            ty: scrutinee.ty.clone(),
            init: Some(scrutinee),
            is_const: true,
            is_static: false,
            is_move: false,
        },
        span,
    };
    Expr {
        ty: value.ty.clone(),
        kind: ExprKind::Block { stmts: vec![let_stmt], value: Box::new(value) },
        span,
    }
}

fn attach_guard(cond: Expr, guard: &Option<Expr>, span: FileSpan) -> Expr {
    match guard {
        None => cond,
        Some(guard) => Expr {
            ty: mlc_ty::Type::Primitive(mlc_ty::Primitive::Bool),
            kind: ExprKind::Binary { op: BinOp::And, lhs: Box::new(cond), rhs: Box::new(guard.clone()) },
            span,
        },
    }
}

fn eq(lhs: Expr, rhs: Expr, span: FileSpan) -> Expr {
    Expr {
        ty: mlc_ty::Type::Primitive(mlc_ty::Primitive::Bool),
        kind: ExprKind::Binary { op: BinOp::Eq, lhs: Box::new(lhs), rhs: Box::new(rhs) },
        span,
    }
}

fn ternary(cond: Expr, then_branch: Expr, else_branch: Expr, span: FileSpan) -> Expr {
    Expr {
        ty: then_branch.ty.clone(),
        kind: ExprKind::Ternary {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        },
        span,
    }
}

fn zero_value(ty: &Type, span: FileSpan) -> Expr {
    let literal = match ty {
        Type::Primitive(mlc_ty::Primitive::Bool) => Literal::Bool(false),
        Type::Primitive(mlc_ty::Primitive::Char) => Literal::Char('\0'),
        Type::Primitive(mlc_ty::Primitive::Float | mlc_ty::Primitive::Double) => Literal::Float(0.0),
        Type::Primitive(mlc_ty::Primitive::String) => Literal::String(String::new()),
        Type::Primitive(mlc_ty::Primitive::Void) => Literal::Void,
        _ => Literal::Int(0),
    };
    Expr { kind: ExprKind::Literal(literal), ty: ty.clone(), span }
}
