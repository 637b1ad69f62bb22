//! Clones a generic [`MirFunction`] into one concrete instantiation per
//! unique `(function, type_args)` pair, substituting every occurrence of a
//! generic parameter's [`Type::Generic`] with the concrete type it was bound
//! to, and rewriting the instance's own name and any call back to itself.

use mlc_intern::{Interner, Symbol};
use mlc_mir::{AggregateKind, BasicBlock, Local, MirFunction, Operand, RValue, Statement, Terminator};
use mlc_ty::Type;
use rustc_hash::FxHashMap;

use crate::collect::InstantiationRequest;

/// Mangles a generic function instantiation's name, reusing the same
/// double-underscore convention [`Type::mangled_name`] uses for generic
/// structs: `id<int>` -> `id__int`.
#[must_use]
pub fn mangled_instance_name(base: Symbol, type_args: &[Type], interner: &Interner) -> String {
    let mut out = interner.resolve(&base);
    for type_arg in type_args {
        out.push_str("__");
        out.push_str(&type_arg.mangled_name(interner));
    }
    out
}

fn substitute(ty: &Type, bindings: &FxHashMap<Symbol, Type>) -> Type {
    match ty {
        Type::Generic(name) => bindings.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Pointer(inner) => Type::Pointer(Box::new(substitute(inner, bindings))),
        Type::Array { element, size } => Type::Array { element: Box::new(substitute(element, bindings)), size: *size },
        Type::Function { params, return_type, variadic } => Type::Function {
            params: params.iter().map(|param| substitute(param, bindings)).collect(),
            return_type: Box::new(substitute(return_type, bindings)),
            variadic: *variadic,
        },
        Type::Struct { name, type_args } => {
            Type::Struct { name: *name, type_args: type_args.iter().map(|arg| substitute(arg, bindings)).collect() }
        }
        Type::Primitive(_) | Type::Interface(_) | Type::LiteralUnion(_) => ty.clone(),
    }
}

fn substitute_operand(operand: &Operand, bindings: &FxHashMap<Symbol, Type>, original_name: Symbol, instance_name: Symbol) -> Operand {
    match operand {
        Operand::Constant(constant) => {
            Operand::Constant(mlc_mir::Constant { kind: constant.kind.clone(), ty: substitute(&constant.ty, bindings) })
        }
        Operand::FunctionRef(name) if *name == original_name => Operand::FunctionRef(instance_name),
        other => other.clone(),
    }
}

fn substitute_rvalue(rvalue: &RValue, bindings: &FxHashMap<Symbol, Type>, original_name: Symbol, instance_name: Symbol) -> RValue {
    let op = |operand: &Operand| substitute_operand(operand, bindings, original_name, instance_name);
    match rvalue {
        RValue::Use(operand) => RValue::Use(op(operand)),
        RValue::BinaryOp { op: bin_op, lhs, rhs, result_type } => {
            RValue::BinaryOp { op: *bin_op, lhs: op(lhs), rhs: op(rhs), result_type: substitute(result_type, bindings) }
        }
        RValue::UnaryOp { op: un_op, operand } => RValue::UnaryOp { op: *un_op, operand: op(operand) },
        RValue::Ref { place, is_mut } => RValue::Ref { place: place.clone(), is_mut: *is_mut },
        RValue::Cast { operand, target_type } => RValue::Cast { operand: op(operand), target_type: substitute(target_type, bindings) },
        RValue::Aggregate { kind, operands } => {
            let kind = match kind {
                AggregateKind::Array(element) => AggregateKind::Array(substitute(element, bindings)),
                other => other.clone(),
            };
            RValue::Aggregate { kind, operands: operands.iter().map(op).collect() }
        }
        RValue::FormatConvert { operand, spec } => RValue::FormatConvert { operand: op(operand), spec: spec.clone() },
    }
}

fn substitute_statement(statement: &Statement, bindings: &FxHashMap<Symbol, Type>, original_name: Symbol, instance_name: Symbol) -> Statement {
    match statement {
        Statement::Assign { place, value } => {
            Statement::Assign { place: place.clone(), value: substitute_rvalue(value, bindings, original_name, instance_name) }
        }
        other => other.clone(),
    }
}

fn substitute_terminator(terminator: &Terminator, bindings: &FxHashMap<Symbol, Type>, original_name: Symbol, instance_name: Symbol) -> Terminator {
    match terminator {
        Terminator::Call { func, args, destination, success, unwind, interface_name, method_name, is_virtual } => Terminator::Call {
            func: substitute_operand(func, bindings, original_name, instance_name),
            args: args.iter().map(|arg| substitute_operand(arg, bindings, original_name, instance_name)).collect(),
            destination: destination.clone(),
            success: *success,
            unwind: *unwind,
            interface_name: *interface_name,
            method_name: *method_name,
            is_virtual: *is_virtual,
        },
        other => other.clone(),
    }
}

/// Builds one concrete instance of `generic_function`, substituting every
/// `Type::Generic` occurrence in its locals and statements per `bindings`,
/// and renaming it (and any recursive self-call) to `instance_name`.
#[must_use]
pub fn specialize_function(generic_function: &MirFunction, bindings: &FxHashMap<Symbol, Type>, instance_name: Symbol) -> MirFunction {
    let original_name = generic_function.name;
    let locals = generic_function
        .locals
        .iter()
        .map(|local| Local { ty: substitute(&local.ty, bindings), ..local.clone() })
        .collect();
    let blocks = generic_function
        .blocks
        .iter()
        .map(|block| BasicBlock {
            id: block.id,
            statements: block.statements.iter().map(|statement| substitute_statement(statement, bindings, original_name, instance_name)).collect(),
            terminator: substitute_terminator(&block.terminator, bindings, original_name, instance_name),
        })
        .collect();

    MirFunction { name: instance_name, locals, blocks, ..generic_function.clone() }
}

/// Runs [`specialize_function`] for every requested instantiation, keyed by
/// request so the caller (`lib.rs`) can rewrite call sites by looking up
/// exactly the `(function, type_args)` pair a call resolved to.
#[must_use]
pub fn specialize_all(
    generic_functions: &FxHashMap<Symbol, MirFunction>,
    requests: &[InstantiationRequest],
    generics_by_function: &FxHashMap<Symbol, Vec<Symbol>>,
    interner: &Interner,
) -> Vec<(InstantiationRequest, MirFunction)> {
    let mut out = Vec::with_capacity(requests.len());
    for request in requests {
        let Some(generic_function) = generic_functions.get(&request.function) else { continue };
        let Some(generics) = generics_by_function.get(&request.function) else { continue };

        let bindings: FxHashMap<Symbol, Type> = generics.iter().copied().zip(request.type_args.iter().cloned()).collect();
        let instance_name = interner.intern(&mangled_instance_name(request.function, &request.type_args, interner));
        let instance = specialize_function(generic_function, &bindings, instance_name);
        out.push((request.clone(), instance));
    }
    out
}

#[cfg(test)]
mod tests {
    use mlc_intern::Interner;
    use mlc_ty::{Primitive, Type};

    use super::mangled_instance_name;

    #[test]
    fn mangles_instance_name_with_double_underscore() {
        let interner = Interner::new();
        let id = interner.intern("id");
        let name = mangled_instance_name(id, &[Type::Primitive(Primitive::Int)], &interner);
        assert_eq!(name, "id__int");
    }

    #[test]
    fn never_produces_the_bare_generic_name() {
        let interner = Interner::new();
        let id = interner.intern("id");
        let name = mangled_instance_name(id, &[Type::Primitive(Primitive::String)], &interner);
        assert_ne!(name, "id");
    }
}
