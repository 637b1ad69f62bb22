//! Expression lowering: every HIR expression lowers to a fresh temp (an
//! [`Operand`]), plus the shared lvalue place constructor from spec §4.5.

use mlc_diag::{Diagnostics, LowerError};
use mlc_hir::{BinOp, Expr, ExprKind, Literal, UnOp};
use mlc_intern::{Interner, Symbol};
use mlc_mir::{
    AggregateKind, Constant, ConstKind, Local, LocalId, Operand, Place, PlaceElem, RValue, Statement, Terminator,
};
use mlc_span::FileSpan;
use mlc_ty::{Primitive, Type};

use crate::context::FunctionContext;

pub struct ExprLowerer<'a, 'b> {
    pub ctx: &'a mut FunctionContext<'b>,
    pub interner: &'a Interner,
    pub diagnostics: &'a mut Diagnostics,
}

impl ExprLowerer<'_, '_> {
    fn new_temp(&mut self, ty: Type) -> LocalId {
        let id = self.ctx.builder.reserve_local();
        self.ctx.builder.push_local(Local {
            id,
            name: None,
            ty: ty.clone(),
            mutable: true,
            user_origin: false,
            is_static: false,
            closure_info: None,
        });
        self.ctx.register_local(self.interner.intern(&format!("__tmp{}", id.0)), id, ty.clone());
        self.ctx.builder.push_statement(Statement::StorageLive(id));
        id
    }

    /// Lowers `expr` and returns an operand holding its value.
    pub fn lower_to_operand(&mut self, expr: &Expr) -> Operand {
        match &expr.kind {
            ExprKind::Literal(literal) => Operand::Constant(self.lower_literal(literal, &expr.ty)),
            ExprKind::VarRef { name, is_function_ref: true, .. } => Operand::FunctionRef(*name),
            ExprKind::VarRef { name, .. } => match self.ctx.resolve_local(*name) {
                Some(local) => Operand::Copy(Place::from_local(local)),
                None => match self.implicit_self_field(*name) {
                    Some(place) => Operand::Copy(place),
                    None => {
                        self.diagnostics.report_error(
                            &LowerError::UnresolvedIdentifier { name: self.interner.resolve(name), span: expr.span },
                            expr.span,
                            Some(self.ctx.function_name),
                        );
                        Operand::Constant(self.zero_constant(&expr.ty))
                    }
                },
            },
            ExprKind::Binary { op: BinOp::And, lhs, rhs } => self.lower_short_circuit(lhs, rhs, true, expr.span),
            ExprKind::Binary { op: BinOp::Or, lhs, rhs } => self.lower_short_circuit(lhs, rhs, false, expr.span),
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs, &expr.ty),
            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand, &expr.ty),
            ExprKind::Call { func_name, args, .. } => self.lower_call(*func_name, args, &expr.ty, expr.span),
            ExprKind::Index { .. } | ExprKind::Member { is_method_call: false, .. } => {
                match self.build_place(expr) {
                    Ok(place) => Operand::Copy(place),
                    Err(()) => Operand::Constant(self.zero_constant(&expr.ty)),
                }
            }
            ExprKind::Member { is_method_call: true, object, field_or_method, args } => {
                self.lower_method_call(object, *field_or_method, args.as_deref().unwrap_or(&[]), &expr.ty, expr.span)
            }
            ExprKind::Ternary { cond, then_branch, else_branch } => self.lower_ternary(cond, then_branch, else_branch, &expr.ty),
            ExprKind::StructLiteral { struct_name, fields } => self.lower_struct_literal(*struct_name, fields, &expr.ty),
            ExprKind::ArrayLiteral { elements } => self.lower_array_literal(elements, &expr.ty),
            ExprKind::Cast { operand, target } => self.lower_cast(operand, target),
            ExprKind::EnumConstruct { enum_name, variant, tag, args } => self.lower_enum_construct(*enum_name, *variant, *tag, args, &expr.ty),
            ExprKind::EnumPayload { scrutinee, field_index, .. } => self.lower_enum_payload(scrutinee, *field_index, &expr.ty),
            ExprKind::Block { stmts, value } => {
                self.ctx.push_scope();
                for stmt in stmts {
                    crate::stmt::lower_stmt(self.ctx, self.interner, self.diagnostics, stmt);
                }
                let operand = self.lower_to_operand(value);
                let (defers, destructors) = self.ctx.pop_scope();
                crate::stmt::flush_defers_and_destructors(self.ctx, self.interner, self.diagnostics, defers, destructors);
                operand
            }
            ExprKind::Lambda { .. } => {
                // Closures lower to a synthesized top-level function by an
                // earlier pass (out of scope here); by the time MIR
                // lowering sees one it is always a function reference.
                Operand::Constant(self.zero_constant(&expr.ty))
            }
            ExprKind::Slice { object, start, end, step } => self.lower_slice(object, start.as_deref(), end.as_deref(), step.as_deref(), &expr.ty),
            ExprKind::Match { .. } => {
                // Matches are desugared to Ternary at HIR-lowering time;
                // reaching here means a caller skipped that pass.
                Operand::Constant(self.zero_constant(&expr.ty))
            }
            ExprKind::Error => Operand::Constant(self.zero_constant(&expr.ty)),
        }
    }

    /// Lowers `expr` into a statement assigning its value into a freshly
    /// created temp local, returning that local.
    pub fn lower_to_local(&mut self, expr: &Expr) -> LocalId {
        let operand = self.lower_to_operand(expr);
        if let Operand::Copy(place) = &operand {
            if place.projection.is_empty() {
                return place.local;
            }
        }
        let temp = self.new_temp(expr.ty.clone());
        self.ctx.builder.push_statement(Statement::Assign { place: Place::from_local(temp), value: RValue::Use(operand) });
        temp
    }

    /// Sinks an already-evaluated operand into a fresh, otherwise-unread
    /// temp. Used when a right-hand side was lowered (for its side effects)
    /// but the assignment it belonged to turned out to have no valid target
    /// place: the value still needs a harmless use instead of being dropped
    /// mid-statement.
    pub fn discard_into_temp(&mut self, operand: Operand, ty: Type) {
        let temp = self.new_temp(ty);
        self.ctx.builder.push_statement(Statement::Assign { place: Place::from_local(temp), value: RValue::Use(operand) });
    }

    fn lower_literal(&mut self, literal: &Literal, ty: &Type) -> Constant {
        let kind = match literal {
            Literal::Int(value) => ConstKind::Int(*value),
            Literal::UInt(value) => ConstKind::UInt(*value),
            Literal::Float(value) => ConstKind::Float(*value),
            Literal::Bool(value) => ConstKind::Bool(*value),
            Literal::Char(value) => ConstKind::Char(*value),
            Literal::String(value) => ConstKind::String(value.clone()),
            Literal::Void => ConstKind::Void,
        };
        Constant { kind, ty: ty.clone() }
    }

    fn zero_constant(&self, ty: &Type) -> Constant {
        let kind = match ty {
            Type::Primitive(Primitive::Bool) => ConstKind::Bool(false),
            Type::Primitive(Primitive::Char) => ConstKind::Char('\0'),
            Type::Primitive(Primitive::Float | Primitive::Double) => ConstKind::Float(0.0),
            Type::Primitive(Primitive::String) => ConstKind::String(String::new()),
            Type::Primitive(Primitive::Void) => ConstKind::Void,
            _ => ConstKind::Int(0),
        };
        Constant { kind, ty: ty.clone() }
    }

    /// An unresolved identifier is tried once more as a field on an
    /// implicit `self` before the caller gives up and reports it: `x`
    /// inside a method body may mean `self.x`. Returns `None` when there
    /// is no `self` local in scope, `self` isn't a struct pointer, or the
    /// struct has no field by that name.
    fn implicit_self_field(&mut self, name: Symbol) -> Option<Place> {
        let self_symbol = self.interner.intern("self");
        let self_local = self.ctx.resolve_local(self_symbol)?;
        let Type::Pointer(inner) = self.ctx.local_type(self_local)? else { return None };
        let Type::Struct { name: struct_name, .. } = *inner else { return None };
        let fields = self.ctx.program.struct_fields.get(&struct_name)?;
        let index = fields.iter().position(|(field_name, _)| *field_name == name)?;
        Some(Place::from_local(self_local).project(PlaceElem::Deref).project(PlaceElem::Field(index)))
    }

    /// Builds the lvalue place for `expr` using the one shared routine
    /// spec §4.5 mandates for assignment targets, address-of operands,
    /// format-interpolation arguments, and match scrutinees. Ill-formed
    /// places report a diagnostic and return `Err`; callers must still
    /// evaluate the already-lowered operand for side effects.
    pub fn build_place(&mut self, expr: &Expr) -> Result<Place, ()> {
        match &expr.kind {
            ExprKind::VarRef { name, .. } => match self.ctx.resolve_local(*name) {
                Some(local) => Ok(Place::from_local(local)),
                None => match self.implicit_self_field(*name) {
                    Some(place) => Ok(place),
                    None => {
                        self.diagnostics.report_error(
                            &LowerError::IllFormedLvalue { span: expr.span },
                            expr.span,
                            Some(self.ctx.function_name),
                        );
                        Err(())
                    }
                },
            },
            ExprKind::Member { object, field_or_method, .. } => {
                let mut place = self.build_place(object)?;
                let mut object_type = self.ctx.local_type(place.local).unwrap_or_else(|| object.ty.clone());
                if let Type::Pointer(inner) = object_type {
                    place = place.project(PlaceElem::Deref);
                    object_type = *inner;
                }
                let Type::Struct { name, .. } = &object_type else {
                    self.diagnostics.report_error(
                        &LowerError::IllFormedLvalue { span: expr.span },
                        expr.span,
                        Some(self.ctx.function_name),
                    );
                    return Err(());
                };
                let fields = self.ctx.program.struct_fields.get(name).cloned().unwrap_or_default();
                let Some(index) = fields.iter().position(|(field_name, _)| field_name == field_or_method) else {
                    self.diagnostics.report_error(
                        &LowerError::IllFormedLvalue { span: expr.span },
                        expr.span,
                        Some(self.ctx.function_name),
                    );
                    return Err(());
                };
                Ok(place.project(PlaceElem::Field(index)))
            }
            ExprKind::Index { object, index } => {
                let place = self.build_place(object).or_else(|()| {
                    // Fall back to treating `object` as an ordinary
                    // expression producing a place-valued temp, e.g. the
                    // result of a function call returning a slice.
                    let local = self.lower_to_local(object);
                    Ok::<_, ()>(Place::from_local(local))
                })?;
                let index_local = self.lower_to_local(index);
                Ok(place.project(PlaceElem::Index(index_local)))
            }
            ExprKind::Unary { op: UnOp::Deref, operand } => {
                let place = match self.build_place(operand) {
                    Ok(place) => place,
                    Err(()) => {
                        let local = self.lower_to_local(operand);
                        Place::from_local(local)
                    }
                };
                Ok(place.project(PlaceElem::Deref))
            }
            _ => {
                self.diagnostics.report_error(
                    &LowerError::IllFormedLvalue { span: expr.span },
                    expr.span,
                    Some(self.ctx.function_name),
                );
                Err(())
            }
        }
    }

    fn lower_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, result_type: &Type) -> Operand {
        let lhs_operand = self.lower_to_operand(lhs);
        let rhs_operand = self.lower_to_operand(rhs);
        let temp = self.new_temp(result_type.clone());
        self.ctx.builder.push_statement(Statement::Assign {
            place: Place::from_local(temp),
            value: RValue::BinaryOp { op: op.into(), lhs: lhs_operand, rhs: rhs_operand, result_type: result_type.clone() },
        });
        Operand::Copy(Place::from_local(temp))
    }

    fn lower_unary(&mut self, op: UnOp, operand: &Expr, result_type: &Type) -> Operand {
        match op {
            UnOp::AddrOf => {
                let place = match self.build_place(operand) {
                    Ok(place) => place,
                    Err(()) => {
                        let local = self.lower_to_local(operand);
                        Place::from_local(local)
                    }
                };
                let temp = self.new_temp(result_type.clone());
                self.ctx.builder.push_statement(Statement::Assign {
                    place: Place::from_local(temp),
                    value: RValue::Ref { place, is_mut: true },
                });
                Operand::Copy(Place::from_local(temp))
            }
            UnOp::Deref => {
                let place = match self.build_place(operand) {
                    Ok(place) => place.project(PlaceElem::Deref),
                    Err(()) => {
                        let local = self.lower_to_local(operand);
                        Place::from_local(local).project(PlaceElem::Deref)
                    }
                };
                Operand::Copy(place)
            }
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => self.lower_inc_dec(op, operand, result_type),
            UnOp::Neg | UnOp::Not | UnOp::BitNot => {
                let inner = self.lower_to_operand(operand);
                let temp = self.new_temp(result_type.clone());
                let mir_op = match op {
                    UnOp::Neg => mlc_mir::UnOp::Neg,
                    UnOp::Not => mlc_mir::UnOp::Not,
                    _ => mlc_mir::UnOp::BitNot,
                };
                self.ctx.builder.push_statement(Statement::Assign {
                    place: Place::from_local(temp),
                    value: RValue::UnaryOp { op: mir_op, operand: inner },
                });
                Operand::Copy(Place::from_local(temp))
            }
        }
    }

    fn lower_inc_dec(&mut self, op: UnOp, operand: &Expr, result_type: &Type) -> Operand {
        let place = match self.build_place(operand) {
            Ok(place) => place,
            Err(()) => {
                let local = self.lower_to_local(operand);
                Place::from_local(local)
            }
        };
        let pre_value_temp = self.new_temp(result_type.clone());
        self.ctx.builder.push_statement(Statement::Assign {
            place: Place::from_local(pre_value_temp),
            value: RValue::Use(Operand::Copy(place.clone())),
        });
        let is_inc = matches!(op, UnOp::PreInc | UnOp::PostInc);
        let one = Constant { kind: ConstKind::Int(1), ty: result_type.clone() };
        let updated_temp = self.new_temp(result_type.clone());
        self.ctx.builder.push_statement(Statement::Assign {
            place: Place::from_local(updated_temp),
            value: RValue::BinaryOp {
                op: if is_inc { mlc_mir::BinOp::Add } else { mlc_mir::BinOp::Sub },
                lhs: Operand::Copy(Place::from_local(pre_value_temp)),
                rhs: Operand::Constant(one),
                result_type: result_type.clone(),
            },
        });
        self.ctx.builder.push_statement(Statement::Assign { place, value: RValue::Use(Operand::Copy(Place::from_local(updated_temp))) });
        match op {
            UnOp::PreInc | UnOp::PreDec => Operand::Copy(Place::from_local(updated_temp)),
            _ => Operand::Copy(Place::from_local(pre_value_temp)),
        }
    }

    fn lower_short_circuit(&mut self, lhs: &Expr, rhs: &Expr, is_and: bool, span: FileSpan) -> Operand {
        let result_ty = Type::Primitive(Primitive::Bool);
        let result = self.new_temp(result_ty.clone());
        let lhs_operand = self.lower_to_operand(lhs);
        let eval_rhs = self.ctx.builder.new_block();
        let skip_rhs = self.ctx.builder.new_block();
        let merge = self.ctx.builder.new_block();
        let (true_target, false_target) = if is_and { (eval_rhs, skip_rhs) } else { (skip_rhs, eval_rhs) };
        let mut targets = indexmap::IndexMap::new();
        targets.insert(1i128, true_target);
        targets.insert(0i128, false_target);
        self.ctx.builder.set_terminator(Terminator::SwitchInt { discriminant: lhs_operand, targets, otherwise: false_target });

        self.ctx.builder.switch_to_block(eval_rhs);
        let rhs_operand = self.lower_to_operand(rhs);
        self.ctx.builder.push_statement(Statement::Assign { place: Place::from_local(result), value: RValue::Use(rhs_operand) });
        self.ctx.builder.set_terminator(Terminator::Goto(merge));

        self.ctx.builder.switch_to_block(skip_rhs);
        let short_value = Constant { kind: ConstKind::Bool(!is_and), ty: result_ty.clone() };
        self.ctx.builder.push_statement(Statement::Assign { place: Place::from_local(result), value: RValue::Use(Operand::Constant(short_value)) });
        self.ctx.builder.set_terminator(Terminator::Goto(merge));

        self.ctx.builder.switch_to_block(merge);
        let _ = span;
        Operand::Copy(Place::from_local(result))
    }

    fn lower_ternary(&mut self, cond: &Expr, then_branch: &Expr, else_branch: &Expr, result_type: &Type) -> Operand {
        let result = self.new_temp(result_type.clone());
        let cond_operand = self.lower_to_operand(cond);
        let then_block = self.ctx.builder.new_block();
        let else_block = self.ctx.builder.new_block();
        let merge = self.ctx.builder.new_block();
        let mut targets = indexmap::IndexMap::new();
        targets.insert(1i128, then_block);
        self.ctx.builder.set_terminator(Terminator::SwitchInt { discriminant: cond_operand, targets, otherwise: else_block });

        self.ctx.builder.switch_to_block(then_block);
        let then_operand = self.lower_to_operand(then_branch);
        self.ctx.builder.push_statement(Statement::Assign { place: Place::from_local(result), value: RValue::Use(then_operand) });
        if self.ctx.builder.current_terminator_is_unreachable() {
            self.ctx.builder.set_terminator(Terminator::Goto(merge));
        }

        self.ctx.builder.switch_to_block(else_block);
        let else_operand = self.lower_to_operand(else_branch);
        self.ctx.builder.push_statement(Statement::Assign { place: Place::from_local(result), value: RValue::Use(else_operand) });
        if self.ctx.builder.current_terminator_is_unreachable() {
            self.ctx.builder.set_terminator(Terminator::Goto(merge));
        }

        self.ctx.builder.switch_to_block(merge);
        Operand::Copy(Place::from_local(result))
    }

    fn lower_call(&mut self, func_name: Symbol, args: &[Expr], result_type: &Type, span: FileSpan) -> Operand {
        let name_text = self.interner.resolve(&func_name);
        if name_text == "println" || name_text == "print" {
            return self.lower_println(&name_text, args, span);
        }
        let lowered_args: Vec<Operand> = args.iter().map(|arg| self.lower_to_operand(arg)).collect();
        let destination = if matches!(result_type, Type::Primitive(Primitive::Void)) {
            None
        } else {
            Some(self.new_temp(result_type.clone()))
        };
        let success = self.ctx.builder.new_block();
        self.ctx.builder.set_terminator(Terminator::Call {
            func: Operand::FunctionRef(func_name),
            args: lowered_args,
            destination: destination.map(Place::from_local),
            success,
            unwind: None,
            interface_name: None,
            method_name: None,
            is_virtual: false,
        });
        self.ctx.builder.switch_to_block(success);
        match destination {
            Some(local) => Operand::Copy(Place::from_local(local)),
            None => Operand::Constant(self.zero_constant(&Type::Primitive(Primitive::Void))),
        }
    }

    fn lower_println(&mut self, which: &str, args: &[Expr], span: FileSpan) -> Operand {
        let symbol_name = normalize_println_symbol(which, &args.first().map(|arg| arg.ty.clone()));
        let lowered_args: Vec<Operand> = args.iter().map(|arg| self.lower_to_operand(arg)).collect();
        let success = self.ctx.builder.new_block();
        self.ctx.builder.set_terminator(Terminator::Call {
            func: Operand::FunctionRef(self.interner.intern(&symbol_name)),
            args: lowered_args,
            destination: None,
            success,
            unwind: None,
            interface_name: None,
            method_name: None,
            is_virtual: false,
        });
        self.ctx.builder.switch_to_block(success);
        let _ = span;
        Operand::Constant(self.zero_constant(&Type::Primitive(Primitive::Void)))
    }

    fn lower_method_call(&mut self, object: &Expr, method: Symbol, args: &[Expr], result_type: &Type, span: FileSpan) -> Operand {
        let is_interface = matches!(&object.ty, Type::Interface(_));
        if is_interface {
            return self.lower_virtual_call(object, method, args, result_type, span);
        }
        let Type::Struct { name, .. } = &object.ty else {
            // Not a struct or interface receiver after typechecking: fall
            // back to a zero value rather than fabricating a call.
            return Operand::Constant(self.zero_constant(result_type));
        };
        let mangled = self.interner.intern(&mlc_ty::mangle_member(&self.interner.resolve(name), &self.interner.resolve(&method)));
        let self_place = self.build_place(object).ok();
        let mut lowered_args = Vec::with_capacity(args.len() + 1);
        match self_place {
            Some(place) => {
                let temp = self.new_temp(Type::Pointer(Box::new(object.ty.clone())));
                self.ctx.builder.push_statement(Statement::Assign { place: Place::from_local(temp), value: RValue::Ref { place, is_mut: true } });
                lowered_args.push(Operand::Copy(Place::from_local(temp)));
            }
            None => lowered_args.push(self.lower_to_operand(object)),
        }
        lowered_args.extend(args.iter().map(|arg| self.lower_to_operand(arg)));
        let destination = if matches!(result_type, Type::Primitive(Primitive::Void)) { None } else { Some(self.new_temp(result_type.clone())) };
        let success = self.ctx.builder.new_block();
        self.ctx.builder.set_terminator(Terminator::Call {
            func: Operand::FunctionRef(mangled),
            args: lowered_args,
            destination: destination.map(Place::from_local),
            success,
            unwind: None,
            interface_name: None,
            method_name: None,
            is_virtual: false,
        });
        self.ctx.builder.switch_to_block(success);
        match destination {
            Some(local) => Operand::Copy(Place::from_local(local)),
            None => Operand::Constant(self.zero_constant(&Type::Primitive(Primitive::Void))),
        }
    }

    /// Materializes the fat pointer `{data_ptr, vtable_ptr}` for an
    /// interface-typed receiver and dispatches through its vtable slot.
    fn lower_virtual_call(&mut self, object: &Expr, method: Symbol, args: &[Expr], result_type: &Type, _span: FileSpan) -> Operand {
        let Type::Interface(interface_name) = &object.ty else {
            // Caller only routes here when `object.ty` is an interface.
            return Operand::Constant(self.zero_constant(result_type));
        };
        let fat_pointer_local = self.lower_to_local(object);
        let fat_pointer = Place::from_local(fat_pointer_local);
        let mut lowered_args = vec![Operand::Copy(fat_pointer)];
        lowered_args.extend(args.iter().map(|arg| self.lower_to_operand(arg)));
        let destination = if matches!(result_type, Type::Primitive(Primitive::Void)) { None } else { Some(self.new_temp(result_type.clone())) };
        let success = self.ctx.builder.new_block();
        self.ctx.builder.set_terminator(Terminator::Call {
            // The callee is resolved dynamically from the vtable at
            // codegen time; `func` names the interface method slot so the
            // backend can still pretty-print/debug the call site.
            func: Operand::FunctionRef(method),
            args: lowered_args,
            destination: destination.map(Place::from_local),
            success,
            unwind: None,
            interface_name: Some(*interface_name),
            method_name: Some(method),
            is_virtual: true,
        });
        self.ctx.builder.switch_to_block(success);
        match destination {
            Some(local) => Operand::Copy(Place::from_local(local)),
            None => Operand::Constant(self.zero_constant(&Type::Primitive(Primitive::Void))),
        }
    }

    fn lower_struct_literal(&mut self, struct_name: Symbol, fields: &[mlc_hir::StructFieldInit], result_type: &Type) -> Operand {
        let field_order = self.ctx.program.struct_fields.get(&struct_name).cloned().unwrap_or_default();
        let mut operands = vec![Operand::Constant(self.zero_constant(&Type::Primitive(Primitive::Int))); field_order.len()];
        for init in fields {
            if let Some(index) = field_order.iter().position(|(name, _)| *name == init.field) {
                operands[index] = self.lower_to_operand(&init.value);
            }
        }
        let temp = self.new_temp(result_type.clone());
        self.ctx.builder.push_statement(Statement::Assign {
            place: Place::from_local(temp),
            value: RValue::Aggregate { kind: AggregateKind::Struct(struct_name), operands },
        });
        Operand::Copy(Place::from_local(temp))
    }

    fn lower_array_literal(&mut self, elements: &[Expr], result_type: &Type) -> Operand {
        let element_type = match result_type {
            Type::Array { element, .. } => (**element).clone(),
            other => other.clone(),
        };
        if elements.is_empty() {
            // Boundary: an empty slice literal allocates capacity 0 and
            // pushes nothing.
            let temp = self.new_temp(result_type.clone());
            let elem_size = Constant { kind: ConstKind::UInt(u64::from(element_type.size_align(&self.ctx.program.size_align_table()).0)), ty: Type::Primitive(Primitive::ULong) };
            let success = self.ctx.builder.new_block();
            self.ctx.builder.set_terminator(Terminator::Call {
                func: Operand::FunctionRef(self.interner.intern("cm_slice_new")),
                args: vec![Operand::Constant(elem_size), Operand::Constant(Constant { kind: ConstKind::UInt(0), ty: Type::Primitive(Primitive::ULong) })],
                destination: Some(Place::from_local(temp)),
                success,
                unwind: None,
                interface_name: None,
                method_name: None,
                is_virtual: false,
            });
            self.ctx.builder.switch_to_block(success);
            return Operand::Copy(Place::from_local(temp));
        }
        let operands: Vec<Operand> = elements.iter().map(|element| self.lower_to_operand(element)).collect();
        let temp = self.new_temp(result_type.clone());
        self.ctx.builder.push_statement(Statement::Assign {
            place: Place::from_local(temp),
            value: RValue::Aggregate { kind: AggregateKind::Array(element_type), operands },
        });
        Operand::Copy(Place::from_local(temp))
    }

    fn lower_cast(&mut self, operand: &Expr, target: &Type) -> Operand {
        let inner = self.lower_to_operand(operand);
        let temp = self.new_temp(target.clone());
        self.ctx.builder.push_statement(Statement::Assign { place: Place::from_local(temp), value: RValue::Cast { operand: inner, target_type: target.clone() } });
        Operand::Copy(Place::from_local(temp))
    }

    fn lower_enum_construct(&mut self, enum_name: Symbol, variant: Symbol, tag: i64, args: &[Expr], result_type: &Type) -> Operand {
        if args.is_empty() {
            return Operand::Constant(Constant { kind: ConstKind::Int(tag), ty: result_type.clone() });
        }
        let variant_idx = self.ctx.program.variant_index(enum_name, variant).unwrap_or_else(|| usize::try_from(tag.max(0)).unwrap_or(0));
        let mut operands = vec![Operand::Constant(Constant { kind: ConstKind::Int(tag), ty: Type::Primitive(Primitive::Int) })];
        operands.extend(args.iter().map(|arg| self.lower_to_operand(arg)));
        let temp = self.new_temp(result_type.clone());
        self.ctx.builder.push_statement(Statement::Assign {
            place: Place::from_local(temp),
            value: RValue::Aggregate { kind: AggregateKind::Enum { enum_name, variant_idx }, operands },
        });
        Operand::Copy(Place::from_local(temp))
    }

    fn lower_enum_payload(&mut self, scrutinee: &Expr, field_index: usize, _result_type: &Type) -> Operand {
        let place = match self.build_place(scrutinee) {
            Ok(place) => place,
            Err(()) => Place::from_local(self.lower_to_local(scrutinee)),
        };
        Operand::Copy(place.project(PlaceElem::Field(field_index + 1)))
    }

    fn lower_slice(&mut self, object: &Expr, start: Option<&Expr>, end: Option<&Expr>, step: Option<&Expr>, result_type: &Type) -> Operand {
        let object_local = self.lower_to_local(object);
        let start_operand = start.map_or(Operand::Constant(Constant { kind: ConstKind::Int(0), ty: Type::Primitive(Primitive::Long) }), |expr| self.lower_to_operand(expr));
        let end_operand = end.map_or(Operand::Constant(Constant { kind: ConstKind::Int(-1), ty: Type::Primitive(Primitive::Long) }), |expr| self.lower_to_operand(expr));
        let out_len = self.new_temp(Type::Primitive(Primitive::ULong));
        let result = self.new_temp(result_type.clone());
        let success = self.ctx.builder.new_block();
        self.ctx.builder.set_terminator(Terminator::Call {
            func: Operand::FunctionRef(self.interner.intern("__builtin_array_slice")),
            args: vec![Operand::Copy(Place::from_local(object_local)), start_operand, end_operand, Operand::Copy(Place::from_local(out_len))],
            destination: Some(Place::from_local(result)),
            success,
            unwind: None,
            interface_name: None,
            method_name: None,
            is_virtual: false,
        });
        self.ctx.builder.switch_to_block(success);
        let _ = step;
        Operand::Copy(Place::from_local(result))
    }
}

fn normalize_println_symbol(which: &str, ty: &Option<Type>) -> String {
    if which != "println" {
        return "cm_print_format".to_owned();
    }
    match ty {
        Some(Type::Primitive(Primitive::String)) => "cm_println_string".to_owned(),
        Some(Type::Primitive(Primitive::Int)) => "cm_println_int".to_owned(),
        Some(Type::Primitive(Primitive::UInt)) => "cm_println_uint".to_owned(),
        Some(Type::Primitive(Primitive::Double | Primitive::Float)) => "cm_println_double".to_owned(),
        Some(Type::Primitive(Primitive::Bool)) => "cm_println_bool".to_owned(),
        Some(Type::Primitive(Primitive::Char)) => "cm_println_char".to_owned(),
        _ => "cm_println_format".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use mlc_diag::Diagnostics;
    use mlc_intern::Interner;
    use mlc_mir::{AggregateKind, MirBuilder, Operand, PlaceElem, RValue, Statement, Terminator};
    use mlc_span::FileSpan;
    use mlc_ty::{Primitive, Type};

    use super::ExprLowerer;
    use crate::context::{FunctionContext, ProgramInfo};

    fn span() -> FileSpan {
        FileSpan::synthetic(mlc_span::FileId(0))
    }

    #[test]
    fn bare_identifier_falls_back_to_an_implicit_self_field() {
        let interner = Interner::new();
        let point = interner.intern("Point");
        let x = interner.intern("x");
        let self_symbol = interner.intern("self");

        let mut program = ProgramInfo::default();
        program.struct_fields.insert(point, vec![(x, Type::Primitive(Primitive::Int))]);

        let builder = MirBuilder::new(interner.intern("get_x"), vec![]);
        let mut ctx = FunctionContext::new(builder, &program, interner.intern("get_x"));
        let self_local = ctx.builder.reserve_local();
        ctx.register_local(self_symbol, self_local, Type::Pointer(Box::new(Type::Struct { name: point, type_args: vec![] })));

        let mut diagnostics = Diagnostics::new();
        let mut lowerer = ExprLowerer { ctx: &mut ctx, interner: &interner, diagnostics: &mut diagnostics };

        let expr = mlc_hir::Expr {
            kind: mlc_hir::ExprKind::VarRef { name: x, is_function_ref: false, is_closure: false },
            ty: Type::Primitive(Primitive::Int),
            span: span(),
        };
        let operand = lowerer.lower_to_operand(&expr);

        assert!(!diagnostics.has_errors());
        if let Operand::Copy(place) = operand {
            assert_eq!(place.local, self_local);
            assert_eq!(place.projection, vec![PlaceElem::Deref, PlaceElem::Field(0)]);
        } else {
            assert!(false, "expected a field place built through the implicit self fallback");
        }
    }

    #[test]
    fn enum_construct_uses_the_real_enum_name_and_ordinal_variant_index() {
        let interner = Interner::new();
        let option_enum = interner.intern("Option");
        let none = interner.intern("None");
        let some = interner.intern("Some");

        let mut program = ProgramInfo::default();
        program.enum_variants.insert(option_enum, vec![none, some]);

        let builder = MirBuilder::new(interner.intern("f"), vec![]);
        let mut ctx = FunctionContext::new(builder, &program, interner.intern("f"));
        let mut diagnostics = Diagnostics::new();
        let mut lowerer = ExprLowerer { ctx: &mut ctx, interner: &interner, diagnostics: &mut diagnostics };

        let arg = mlc_hir::Expr { kind: mlc_hir::ExprKind::Literal(mlc_hir::Literal::Int(7)), ty: Type::Primitive(Primitive::Int), span: span() };
        let operand = lowerer.lower_enum_construct(option_enum, some, 1, std::slice::from_ref(&arg), &Type::Primitive(Primitive::Int));

        assert!(!diagnostics.has_errors());
        let Operand::Copy(place) = operand else {
            assert!(false, "expected enum construct to produce a place copy");
            return;
        };
        let function = ctx.builder.finish();
        let block = &function.blocks[0];
        let statement = block.statements.iter().find(|statement| matches!(statement, Statement::Assign { place: assigned, .. } if *assigned == place));
        if let Some(Statement::Assign { value: RValue::Aggregate { kind: AggregateKind::Enum { enum_name, variant_idx }, .. }, .. }) = statement {
            assert_eq!(*enum_name, option_enum);
            assert_eq!(*variant_idx, 1);
        } else {
            assert!(false, "expected an Enum aggregate assignment naming the real enum");
        }
    }

    #[test]
    fn virtual_call_passes_the_whole_fat_pointer_as_the_first_argument() {
        let interner = Interner::new();
        let shape = interner.intern("Shape");
        let area = interner.intern("area");

        let program = ProgramInfo::default();
        let builder = MirBuilder::new(interner.intern("f"), vec![]);
        let mut ctx = FunctionContext::new(builder, &program, interner.intern("f"));
        let object_local = ctx.builder.reserve_local();
        let object_symbol = interner.intern("shape");
        ctx.register_local(object_symbol, object_local, Type::Interface(shape));

        let mut diagnostics = Diagnostics::new();
        let mut lowerer = ExprLowerer { ctx: &mut ctx, interner: &interner, diagnostics: &mut diagnostics };

        let object = mlc_hir::Expr {
            kind: mlc_hir::ExprKind::VarRef { name: object_symbol, is_function_ref: false, is_closure: false },
            ty: Type::Interface(shape),
            span: span(),
        };
        drop(lowerer.lower_virtual_call(&object, area, &[], &Type::Primitive(Primitive::Double), span()));

        let function = ctx.builder.finish();
        let entry = &function.blocks[0];
        if let Terminator::Call { args, is_virtual, interface_name, method_name, .. } = &entry.terminator {
            assert!(*is_virtual);
            assert_eq!(*interface_name, Some(shape));
            assert_eq!(*method_name, Some(area));
            match args.first() {
                Some(Operand::Copy(place)) => {
                    assert!(place.projection.is_empty(), "the fat pointer place itself must be passed, not a field projection of it");
                }
                other => assert!(false, "expected the fat pointer place as the first argument, got {other:?}"),
            }
        } else {
            assert!(false, "expected a virtual Call terminator");
        }
    }

    #[test]
    fn truly_unresolved_identifier_still_reports_a_diagnostic() {
        let interner = Interner::new();
        let program = ProgramInfo::default();
        let builder = MirBuilder::new(interner.intern("f"), vec![]);
        let mut ctx = FunctionContext::new(builder, &program, interner.intern("f"));
        let mut diagnostics = Diagnostics::new();
        let mut lowerer = ExprLowerer { ctx: &mut ctx, interner: &interner, diagnostics: &mut diagnostics };

        let unknown = interner.intern("unknown");
        let expr = mlc_hir::Expr {
            kind: mlc_hir::ExprKind::VarRef { name: unknown, is_function_ref: false, is_closure: false },
            ty: Type::Primitive(Primitive::Int),
            span: span(),
        };
        drop(lowerer.lower_to_operand(&expr));

        assert!(diagnostics.has_errors());
    }
}
