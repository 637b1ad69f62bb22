//! Statement lowering: control flow, scopes, defer/destructor flushing, and
//! the single-place compound-assignment fix.

use mlc_diag::Diagnostics;
use mlc_hir::{Block as HirBlock, Stmt, StmtKind};
use mlc_intern::Interner;
use mlc_mir::{LocalId, Local, Operand, Place, RValue, Statement, Terminator};
use mlc_ty::Type;

use crate::context::FunctionContext;
use crate::expr::ExprLowerer;

pub fn lower_block(ctx: &mut FunctionContext<'_>, interner: &Interner, diagnostics: &mut Diagnostics, block: &HirBlock) {
    ctx.push_scope();
    for stmt in &block.stmts {
        lower_stmt(ctx, interner, diagnostics, stmt);
    }
    let (defers, destructors) = ctx.pop_scope();
    flush_defers_and_destructors(ctx, interner, diagnostics, defers, destructors);
}

pub fn lower_stmt(ctx: &mut FunctionContext<'_>, interner: &Interner, diagnostics: &mut Diagnostics, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Let { name, ty, init, is_const: _, is_static: _, is_move } => {
            lower_let(ctx, interner, diagnostics, *name, ty, init.as_ref(), *is_move);
        }
        StmtKind::Assign { target, op, value } => lower_assign(ctx, interner, diagnostics, target, *op, value),
        StmtKind::Return(value) => lower_return(ctx, interner, diagnostics, value.as_ref()),
        StmtKind::If { cond, then_branch, else_branch } => lower_if(ctx, interner, diagnostics, cond, then_branch, else_branch.as_ref()),
        StmtKind::While { cond, body } => lower_while(ctx, interner, diagnostics, cond, body),
        StmtKind::For { init, cond, update, body } => lower_for(ctx, interner, diagnostics, init.as_deref(), cond.as_ref(), update.as_ref(), body),
        StmtKind::Loop { body } => lower_loop(ctx, interner, diagnostics, body),
        StmtKind::Switch { discriminant, cases, default } => lower_switch(ctx, interner, diagnostics, discriminant, cases, default),
        StmtKind::Break => {
            if let Some(frame) = ctx.current_loop() {
                ctx.builder.set_terminator(Terminator::Goto(frame.exit));
            }
        }
        StmtKind::Continue => {
            if let Some(frame) = ctx.current_loop() {
                ctx.builder.set_terminator(Terminator::Goto(frame.continue_target));
            }
        }
        StmtKind::Block(block) => lower_block(ctx, interner, diagnostics, block),
        StmtKind::Defer { body } => ctx.push_defer(body.clone()),
        StmtKind::Asm { code, operands, clobbers, is_must } => {
            let lowered_operands: Vec<Operand> = operands
                .iter()
                .filter_map(|operand| operand.value.as_ref())
                .map(|value| ExprLowerer { ctx: &mut *ctx, interner, diagnostics: &mut *diagnostics }.lower_to_operand(value))
                .collect();
            ctx.builder.push_statement(Statement::Asm {
                code: code.clone(),
                operands: lowered_operands,
                clobbers: clobbers.clone(),
                no_opt: *is_must,
            });
        }
        StmtKind::MustBlock { body } => {
            let previous = ctx.in_must_block;
            ctx.in_must_block = true;
            lower_block(ctx, interner, diagnostics, body);
            ctx.in_must_block = previous;
        }
        StmtKind::Expr(expr) => {
            ExprLowerer { ctx: &mut *ctx, interner, diagnostics: &mut *diagnostics }.lower_to_operand(expr);
        }
    }
}

fn lower_let(
    ctx: &mut FunctionContext<'_>,
    interner: &Interner,
    diagnostics: &mut Diagnostics,
    name: mlc_intern::Symbol,
    ty: &Type,
    init: Option<&mlc_hir::Expr>,
    is_move: bool,
) {
    // `let y = move x` aliases `x`'s local directly rather than copying:
    // no destructor is registered twice for the same storage.
    if is_move {
        if let Some(init_expr) = init {
            if let mlc_hir::ExprKind::VarRef { name: source, .. } = &init_expr.kind {
                if let Some(existing) = ctx.resolve_local(*source) {
                    ctx.register_alias(name, existing);
                    return;
                }
            }
        }
    }

    let id = ctx.builder.reserve_local();
    ctx.builder.push_local(Local {
        id,
        name: Some(name),
        ty: ty.clone(),
        mutable: true,
        user_origin: true,
        is_static: false,
        closure_info: None,
    });
    ctx.builder.push_statement(Statement::StorageLive(id));
    if let Some(init_expr) = init {
        let operand = ExprLowerer { ctx: &mut *ctx, interner, diagnostics: &mut *diagnostics }.lower_to_operand(init_expr);
        ctx.builder.push_statement(Statement::Assign { place: Place::from_local(id), value: RValue::Use(operand) });
    }
    ctx.register_local(name, id, ty.clone());

    if let Type::Struct { name: type_name, .. } = ty {
        let type_text = interner.resolve(type_name);
        if let Some(dtor) = ctx.destructor_for(&type_text, interner) {
            ctx.push_destructor(id, dtor);
        }
    }
}

/// Builds the assignment target place exactly once and reuses it for both
/// the read (under a compound operator) and the write, so `a[f()] += 1`
/// never evaluates `f()` twice.
fn lower_assign(
    ctx: &mut FunctionContext<'_>,
    interner: &Interner,
    diagnostics: &mut Diagnostics,
    target: &mlc_hir::Expr,
    op: Option<mlc_hir::BinOp>,
    value: &mlc_hir::Expr,
) {
    let mut lowerer = ExprLowerer { ctx: &mut *ctx, interner, diagnostics: &mut *diagnostics };
    // The right-hand side is lowered before the target place so its side
    // effects still happen even when the target turns out to be ill-formed.
    let rhs_operand = lowerer.lower_to_operand(value);
    let place = match lowerer.build_place(target) {
        Ok(place) => place,
        Err(()) => {
            lowerer.discard_into_temp(rhs_operand, value.ty.clone());
            return;
        }
    };
    match op {
        None => {
            ctx.builder.push_statement(Statement::Assign { place, value: RValue::Use(rhs_operand) });
        }
        Some(bin_op) => {
            let result_type = target.ty.clone();
            ctx.builder.push_statement(Statement::Assign {
                place: place.clone(),
                value: RValue::BinaryOp { op: bin_op.into(), lhs: Operand::Copy(place), rhs: rhs_operand, result_type },
            });
        }
    }
}

fn lower_return(ctx: &mut FunctionContext<'_>, interner: &Interner, diagnostics: &mut Diagnostics, value: Option<&mlc_hir::Expr>) {
    // The return value is computed before defers/destructors run so that a
    // deferred mutation never observes a half-torn-down scope, then staged
    // into the return slot after every outstanding scope is flushed.
    let staged = value.map(|expr| ExprLowerer { ctx: &mut *ctx, interner, diagnostics: &mut *diagnostics }.lower_to_operand(expr));
    let (defers, destructors) = ctx.all_outstanding();
    flush_defers_and_destructors(ctx, interner, diagnostics, defers, destructors);
    if let Some(operand) = staged {
        ctx.builder.push_statement(Statement::Assign { place: Place::from_local(LocalId(0)), value: RValue::Use(operand) });
    }
    ctx.builder.set_terminator(Terminator::Return);
}

pub fn flush_defers_and_destructors(
    ctx: &mut FunctionContext<'_>,
    interner: &Interner,
    diagnostics: &mut Diagnostics,
    defers: Vec<HirBlock>,
    destructors: Vec<(LocalId, mlc_intern::Symbol)>,
) {
    for defer_body in &defers {
        lower_block(ctx, interner, diagnostics, defer_body);
    }
    for (local, dtor) in destructors {
        let success = ctx.builder.new_block();
        let self_ptr = ctx.builder.reserve_local();
        ctx.builder.push_local(Local {
            id: self_ptr,
            name: None,
            ty: Type::Pointer(Box::new(ctx.local_type(local).unwrap_or(Type::Primitive(mlc_ty::Primitive::Void)))),
            mutable: true,
            user_origin: false,
            is_static: false,
            closure_info: None,
        });
        ctx.builder.push_statement(Statement::Assign {
            place: Place::from_local(self_ptr),
            value: RValue::Ref { place: Place::from_local(local), is_mut: true },
        });
        ctx.builder.set_terminator(Terminator::Call {
            func: Operand::FunctionRef(dtor),
            args: vec![Operand::Copy(Place::from_local(self_ptr))],
            destination: None,
            success,
            unwind: None,
            interface_name: None,
            method_name: None,
            is_virtual: false,
        });
        ctx.builder.switch_to_block(success);
    }
}

fn lower_if(
    ctx: &mut FunctionContext<'_>,
    interner: &Interner,
    diagnostics: &mut Diagnostics,
    cond: &mlc_hir::Expr,
    then_branch: &HirBlock,
    else_branch: Option<&HirBlock>,
) {
    let cond_operand = ExprLowerer { ctx: &mut *ctx, interner, diagnostics: &mut *diagnostics }.lower_to_operand(cond);
    let then_block = ctx.builder.new_block();
    let else_block = ctx.builder.new_block();
    let merge = ctx.builder.new_block();
    let mut targets = indexmap::IndexMap::new();
    targets.insert(1i128, then_block);
    ctx.builder.set_terminator(Terminator::SwitchInt { discriminant: cond_operand, targets, otherwise: else_block });

    ctx.builder.switch_to_block(then_block);
    lower_block(ctx, interner, diagnostics, then_branch);
    if ctx.builder.current_terminator_is_unreachable() {
        ctx.builder.set_terminator(Terminator::Goto(merge));
    }

    ctx.builder.switch_to_block(else_block);
    if let Some(else_body) = else_branch {
        lower_block(ctx, interner, diagnostics, else_body);
    }
    if ctx.builder.current_terminator_is_unreachable() {
        ctx.builder.set_terminator(Terminator::Goto(merge));
    }

    ctx.builder.switch_to_block(merge);
}

fn lower_while(ctx: &mut FunctionContext<'_>, interner: &Interner, diagnostics: &mut Diagnostics, cond: &mlc_hir::Expr, body: &HirBlock) {
    let header = ctx.builder.new_block();
    ctx.builder.set_terminator(Terminator::Goto(header));
    ctx.builder.switch_to_block(header);
    let cond_operand = ExprLowerer { ctx: &mut *ctx, interner, diagnostics: &mut *diagnostics }.lower_to_operand(cond);
    let body_block = ctx.builder.new_block();
    let exit = ctx.builder.new_block();
    let mut targets = indexmap::IndexMap::new();
    targets.insert(1i128, body_block);
    ctx.builder.set_terminator(Terminator::SwitchInt { discriminant: cond_operand, targets, otherwise: exit });

    ctx.builder.switch_to_block(body_block);
    ctx.enter_loop(header, exit, header);
    lower_block(ctx, interner, diagnostics, body);
    ctx.exit_loop();
    if ctx.builder.current_terminator_is_unreachable() {
        ctx.builder.set_terminator(Terminator::Goto(header));
    }

    ctx.builder.switch_to_block(exit);
}

fn lower_for(
    ctx: &mut FunctionContext<'_>,
    interner: &Interner,
    diagnostics: &mut Diagnostics,
    init: Option<&Stmt>,
    cond: Option<&mlc_hir::Expr>,
    update: Option<&mlc_hir::Expr>,
    body: &HirBlock,
) {
    ctx.push_scope();
    if let Some(init_stmt) = init {
        lower_stmt(ctx, interner, diagnostics, init_stmt);
    }
    let header = ctx.builder.new_block();
    ctx.builder.set_terminator(Terminator::Goto(header));
    ctx.builder.switch_to_block(header);
    let body_block = ctx.builder.new_block();
    let update_block = ctx.builder.new_block();
    let exit = ctx.builder.new_block();
    match cond {
        Some(cond_expr) => {
            let cond_operand = ExprLowerer { ctx: &mut *ctx, interner, diagnostics: &mut *diagnostics }.lower_to_operand(cond_expr);
            let mut targets = indexmap::IndexMap::new();
            targets.insert(1i128, body_block);
            ctx.builder.set_terminator(Terminator::SwitchInt { discriminant: cond_operand, targets, otherwise: exit });
        }
        None => ctx.builder.set_terminator(Terminator::Goto(body_block)),
    }

    ctx.builder.switch_to_block(body_block);
    ctx.enter_loop(header, exit, update_block);
    lower_block(ctx, interner, diagnostics, body);
    ctx.exit_loop();
    if ctx.builder.current_terminator_is_unreachable() {
        ctx.builder.set_terminator(Terminator::Goto(update_block));
    }

    ctx.builder.switch_to_block(update_block);
    if let Some(update_expr) = update {
        ExprLowerer { ctx: &mut *ctx, interner, diagnostics: &mut *diagnostics }.lower_to_operand(update_expr);
    }
    ctx.builder.set_terminator(Terminator::Goto(header));

    ctx.builder.switch_to_block(exit);
    let (defers, destructors) = ctx.pop_scope();
    flush_defers_and_destructors(ctx, interner, diagnostics, defers, destructors);
}

fn lower_loop(ctx: &mut FunctionContext<'_>, interner: &Interner, diagnostics: &mut Diagnostics, body: &HirBlock) {
    let header = ctx.builder.new_block();
    ctx.builder.set_terminator(Terminator::Goto(header));
    ctx.builder.switch_to_block(header);
    let exit = ctx.builder.new_block();

    ctx.enter_loop(header, exit, header);
    lower_block(ctx, interner, diagnostics, body);
    ctx.exit_loop();
    if ctx.builder.current_terminator_is_unreachable() {
        ctx.builder.set_terminator(Terminator::Goto(header));
    }

    ctx.builder.switch_to_block(exit);
}

fn lower_switch(
    ctx: &mut FunctionContext<'_>,
    interner: &Interner,
    diagnostics: &mut Diagnostics,
    discriminant: &mlc_hir::Expr,
    cases: &[mlc_hir::SwitchCase],
    default: &Option<HirBlock>,
) {
    let discriminant_operand = ExprLowerer { ctx: &mut *ctx, interner, diagnostics: &mut *diagnostics }.lower_to_operand(discriminant);
    let exit = ctx.builder.new_block();
    let default_block = ctx.builder.new_block();
    let mut targets = indexmap::IndexMap::new();
    let mut case_blocks = Vec::with_capacity(cases.len());
    for case in cases {
        let block = ctx.builder.new_block();
        targets.insert(case_discriminant(&case.value), block);
        case_blocks.push(block);
    }
    ctx.builder.set_terminator(Terminator::SwitchInt { discriminant: discriminant_operand, targets, otherwise: default_block });

    for (case, block) in cases.iter().zip(case_blocks) {
        ctx.builder.switch_to_block(block);
        lower_block(ctx, interner, diagnostics, &case.body);
        if ctx.builder.current_terminator_is_unreachable() {
            ctx.builder.set_terminator(Terminator::Goto(exit));
        }
    }

    ctx.builder.switch_to_block(default_block);
    if let Some(default_body) = default {
        lower_block(ctx, interner, diagnostics, default_body);
    }
    if ctx.builder.current_terminator_is_unreachable() {
        ctx.builder.set_terminator(Terminator::Goto(exit));
    }

    ctx.builder.switch_to_block(exit);
}

/// Switch cases carry their discriminant as a literal HIR expression
/// (an `int` literal or an enum tag folded to one by HIR lowering).
fn case_discriminant(value: &mlc_hir::Expr) -> i128 {
    match &value.kind {
        mlc_hir::ExprKind::Literal(mlc_hir::Literal::Int(v)) => i128::from(*v),
        mlc_hir::ExprKind::Literal(mlc_hir::Literal::UInt(v)) => i128::from(*v),
        mlc_hir::ExprKind::Literal(mlc_hir::Literal::Char(c)) => i128::from(*c as u32),
        _ => 0,
    }
}
