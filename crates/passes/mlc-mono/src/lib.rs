//! Monomorphization: finds every call site that instantiates a generic
//! function with concrete type arguments, clones and specializes that
//! function once per unique instantiation, rewrites the call sites to
//! target the concrete instance, and drops the now-unreferenced generic
//! templates from the program.
//!
//! Partial specialization never happens: a call site whose argument types
//! don't pin down every generic parameter is reported through
//! [`mlc_diag::LowerError::UnresolvedGenericParameter`] and left untouched
//! rather than emitted as a best-effort guess.

pub mod collect;
pub mod specialize;
pub mod unify;

use mlc_diag::Diagnostics;
use mlc_hir::Decl;
use mlc_intern::{Interner, Symbol};
use mlc_mir::{Operand, Program as MirProgram, Terminator};
use mlc_ty::Type;
use rustc_hash::FxHashMap;
use tracing::debug;

pub use collect::{collect_generic_functions, collect_instantiation_requests, GenericFunctionInfo, InstantiationRequest};
pub use specialize::{mangled_instance_name, specialize_all};

/// Runs the full monomorphization pass over a lowered program.
#[must_use]
pub fn monomorphize_program(hir_program: &mlc_hir::Program, mut mir: MirProgram, interner: &Interner, diagnostics: &mut Diagnostics) -> MirProgram {
    let generic_functions = collect_generic_functions(hir_program);
    if generic_functions.is_empty() {
        return mir;
    }

    let requests = collect_instantiation_requests(&mir, &generic_functions, interner, diagnostics);
    debug!(count = requests.len(), "collected generic instantiation requests");

    let generic_mir_functions: FxHashMap<Symbol, mlc_mir::MirFunction> =
        mir.functions.iter().filter(|function| generic_functions.contains_key(&function.name)).map(|function| (function.name, function.clone())).collect();
    let generics_by_function: FxHashMap<Symbol, Vec<Symbol>> =
        generic_functions.iter().map(|(name, info)| (*name, info.generics.clone())).collect();

    let instances = specialize_all(&generic_mir_functions, &requests, &generics_by_function, interner);

    let mut instance_map: FxHashMap<(Symbol, Vec<Type>), Symbol> = FxHashMap::default();
    for (request, instance) in &instances {
        instance_map.insert((request.function, request.type_args.clone()), instance.name);
    }

    rewrite_calls_to_instances(&mut mir, &generic_functions, &instance_map);

    mir.functions.retain(|function| !generic_functions.contains_key(&function.name));
    mir.functions.extend(instances.into_iter().map(|(_, instance)| instance));

    specialize_structs(hir_program, &mut mir, interner);

    mir
}

/// Re-derives each call site's argument types exactly as `collect` did and
/// rewrites the callee to the concrete instance that was specialized for
/// those types. A call whose instance wasn't found (the inference for that
/// site failed and was already reported) is left pointing at the
/// about-to-be-removed generic template, which is deliberate: the program is
/// already in an error state and no further guess is made on its behalf.
fn rewrite_calls_to_instances(mir: &mut MirProgram, generic_functions: &FxHashMap<Symbol, GenericFunctionInfo>, instance_map: &FxHashMap<(Symbol, Vec<Type>), Symbol>) {
    for function in &mut mir.functions {
        let locals = function.locals.clone();
        for block in &mut function.blocks {
            let Terminator::Call { func: Operand::FunctionRef(name), args, .. } = &mut block.terminator else { continue };
            if !generic_functions.contains_key(name) {
                continue;
            }
            let arg_types: Vec<Type> = args.iter().map(|arg| local_table_operand_type(arg, &locals)).collect();
            if let Some(instance_name) = instance_map.get(&(*name, arg_types)) {
                *name = *instance_name;
            }
        }
    }
}

fn local_table_operand_type(operand: &Operand, locals: &[mlc_mir::Local]) -> Type {
    match operand {
        Operand::Copy(place) | Operand::Move(place) => locals
            .iter()
            .find(|local| local.id == place.local)
            .map_or(Type::Primitive(mlc_ty::Primitive::Error), |local| local.ty.clone()),
        Operand::Constant(constant) => constant.ty.clone(),
        Operand::FunctionRef(_) => Type::Primitive(mlc_ty::Primitive::Error),
    }
}

/// Best-effort specialization of generic struct layouts: for every concrete
/// `Type::Struct { type_args: non-empty, .. }` observed among the program's
/// (now-monomorphized) local types, emits a [`mlc_mir::MirStruct`] with the
/// mangled name and substituted field types, if the base struct is generic
/// and an instance with that mangled name doesn't already exist. This does
/// not rewrite `AggregateKind::Struct` names elsewhere in the program; HIR
/// lowering is expected to have already named struct literals by their
/// concrete mangled form when a struct is constructed at a known type.
fn specialize_structs(hir_program: &mlc_hir::Program, mir: &mut MirProgram, interner: &Interner) {
    let mut generic_structs: FxHashMap<Symbol, (Vec<Symbol>, Vec<(Symbol, Type)>)> = FxHashMap::default();
    for decl in &hir_program.decls {
        if let Decl::Struct(struct_decl) = decl {
            if !struct_decl.generics.is_empty() {
                let fields = struct_decl.fields.iter().map(|field| (field.name, field.ty.clone())).collect();
                generic_structs.insert(struct_decl.name, (struct_decl.generics.clone(), fields));
            }
        }
    }
    if generic_structs.is_empty() {
        return;
    }

    let mut existing: rustc_hash::FxHashSet<Symbol> = mir.structs.iter().map(|s| s.name).collect();
    let mut seen_instantiations: rustc_hash::FxHashSet<(Symbol, Vec<Type>)> = rustc_hash::FxHashSet::default();

    for function in &mir.functions {
        for local in &function.locals {
            collect_struct_instantiations(&local.ty, &generic_structs, &mut seen_instantiations);
        }
    }

    for (base_name, type_args) in seen_instantiations {
        let Some((generics, fields)) = generic_structs.get(&base_name) else { continue };
        let mangled = mlc_ty::Type::Struct { name: base_name, type_args: type_args.clone() }.mangled_name(interner);
        let mangled_symbol = interner.intern(&mangled);
        if !existing.insert(mangled_symbol) {
            continue;
        }
        let bindings: FxHashMap<Symbol, Type> = generics.iter().copied().zip(type_args).collect();
        let specialized_fields = fields.iter().map(|(_, ty)| substitute_struct_field(ty, &bindings)).collect();
        mir.structs.push(mlc_mir::MirStruct { name: mangled_symbol, fields: specialized_fields });
    }
}

fn collect_struct_instantiations(ty: &Type, generic_structs: &FxHashMap<Symbol, (Vec<Symbol>, Vec<(Symbol, Type)>)>, out: &mut rustc_hash::FxHashSet<(Symbol, Vec<Type>)>) {
    match ty {
        Type::Struct { name, type_args } if !type_args.is_empty() && generic_structs.contains_key(name) => {
            out.insert((*name, type_args.clone()));
            for arg in type_args {
                collect_struct_instantiations(arg, generic_structs, out);
            }
        }
        Type::Pointer(inner) | Type::Array { element: inner, .. } => collect_struct_instantiations(inner, generic_structs, out),
        _ => {}
    }
}

fn substitute_struct_field(ty: &Type, bindings: &FxHashMap<Symbol, Type>) -> Type {
    match ty {
        Type::Generic(name) => bindings.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Pointer(inner) => Type::Pointer(Box::new(substitute_struct_field(inner, bindings))),
        Type::Array { element, size } => Type::Array { element: Box::new(substitute_struct_field(element, bindings)), size: *size },
        Type::Struct { name, type_args } => {
            Type::Struct { name: *name, type_args: type_args.iter().map(|arg| substitute_struct_field(arg, bindings)).collect() }
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use mlc_diag::Diagnostics;
    use mlc_hir::{Block, Decl, Expr, ExprKind, Function, Literal, Param, Program, Stmt, StmtKind};
    use mlc_intern::Interner;
    use mlc_mir::{BasicBlock, BasicBlockId, Constant, ConstKind, Local, LocalId, MirFunction, Operand, Program as MirProgram, Terminator};
    use mlc_span::FileSpan;
    use mlc_ty::{Primitive, Type};

    use super::monomorphize_program;

    fn span() -> FileSpan {
        FileSpan::synthetic(mlc_span::FileId(0))
    }

    #[test]
    fn specializes_a_generic_function_and_drops_the_template() {
        let interner = Interner::new();
        let id = interner.intern("id");
        let t = interner.intern("T");
        let x = interner.intern("x");
        let caller = interner.intern("main");

        let hir_program = Program {
            decls: vec![Decl::Function(Function {
                name: id,
                params: vec![Param { name: x, ty: Type::Generic(t) }],
                return_type: Type::Generic(t),
                generics: vec![t],
                body: Some(Block {
                    stmts: vec![Stmt { kind: StmtKind::Return(Some(Expr { kind: ExprKind::Literal(Literal::Void), ty: Type::Generic(t), span: span() })), span: span() }],
                }),
                is_export: false,
                is_extern: false,
                is_variadic: false,
                span: span(),
            })],
        };

        let generic_function = MirFunction {
            name: id,
            module_path: vec![],
            is_export: false,
            is_extern: false,
            is_variadic: false,
            locals: vec![
                Local { id: LocalId(0), name: None, ty: Type::Generic(t), mutable: true, user_origin: false, is_static: false, closure_info: None },
                Local { id: LocalId(1), name: Some(x), ty: Type::Generic(t), mutable: true, user_origin: true, is_static: false, closure_info: None },
            ],
            entry_block: BasicBlockId(0),
            blocks: vec![BasicBlock { id: BasicBlockId(0), statements: vec![], terminator: Terminator::Return }],
        };

        let call_function = MirFunction {
            name: caller,
            module_path: vec![],
            is_export: false,
            is_extern: false,
            is_variadic: false,
            locals: vec![Local { id: LocalId(0), name: None, ty: Type::Primitive(Primitive::Void), mutable: true, user_origin: false, is_static: false, closure_info: None }],
            entry_block: BasicBlockId(0),
            blocks: vec![BasicBlock {
                id: BasicBlockId(0),
                statements: vec![],
                terminator: Terminator::Call {
                    func: Operand::FunctionRef(id),
                    args: vec![Operand::Constant(Constant { kind: ConstKind::Int(5), ty: Type::Primitive(Primitive::Int) })],
                    destination: None,
                    success: BasicBlockId(0),
                    unwind: None,
                    interface_name: None,
                    method_name: None,
                    is_virtual: false,
                },
            }],
        };

        let mir = MirProgram { functions: vec![generic_function, call_function], ..MirProgram::default() };
        let mut diagnostics = Diagnostics::new();
        let result = monomorphize_program(&hir_program, mir, &interner, &mut diagnostics);

        assert!(!result.functions.iter().any(|f| f.name == id));

        if let Some(instance) = result.functions.iter().find(|f| f.name != caller) {
            assert_eq!(interner.resolve(&instance.name), "id__int");
        } else {
            assert!(false, "expected a specialized instance alongside the caller");
        }

        if let Some(caller_function) = result.functions.iter().find(|f| f.name == caller) {
            if let Terminator::Call { func: Operand::FunctionRef(called), .. } = &caller_function.blocks[0].terminator {
                assert_eq!(interner.resolve(called), "id__int");
            } else {
                assert!(false, "expected the caller's terminator to still be a call");
            }
        } else {
            assert!(false, "expected the caller function to survive monomorphization");
        }
        assert!(!diagnostics.has_errors());
    }
}
