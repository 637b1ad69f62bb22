//! Scans a lowered MIR program for call sites that target a known generic
//! function and infers the concrete type arguments each site needs.

use mlc_diag::Diagnostics;
use mlc_hir::Decl;
use mlc_intern::{Interner, Symbol};
use mlc_mir::{Operand, Program as MirProgram, Terminator};
use mlc_span::FileSpan;
use mlc_ty::Type;
use rustc_hash::FxHashMap;

use crate::unify::infer_generic_types;

/// What's known about one generic function's signature, gathered from the
/// HIR before MIR lowering erases the `generics` list.
#[derive(Debug, Clone)]
pub struct GenericFunctionInfo {
    pub generics: Vec<Symbol>,
    pub params: Vec<Type>,
    pub span: FileSpan,
}

/// Collects every `Decl::Function` (top-level or impl method) that declares
/// its own generic parameters.
#[must_use]
pub fn collect_generic_functions(program: &mlc_hir::Program) -> FxHashMap<Symbol, GenericFunctionInfo> {
    let mut out = FxHashMap::default();
    for decl in &program.decls {
        match decl {
            Decl::Function(function) if !function.generics.is_empty() => {
                insert_generic_function(&mut out, function);
            }
            Decl::Impl(impl_decl) => {
                for method in &impl_decl.methods {
                    if !method.generics.is_empty() {
                        insert_generic_function(&mut out, method);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn insert_generic_function(out: &mut FxHashMap<Symbol, GenericFunctionInfo>, function: &mlc_hir::Function) {
    out.insert(
        function.name,
        GenericFunctionInfo {
            generics: function.generics.clone(),
            params: function.params.iter().map(|param| param.ty.clone()).collect(),
            span: function.span,
        },
    );
}

/// One call site that needs a concrete instantiation of a generic function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstantiationRequest {
    pub function: Symbol,
    pub type_args: Vec<Type>,
}

/// Walks every call terminator in `mir`, resolving each argument operand's
/// type from the calling function's own local table, and infers the type
/// arguments needed at every call site that targets a generic function.
/// A call whose argument types don't pin down every generic parameter is
/// reported and skipped; it never produces a partially-specialized instance.
#[must_use]
pub fn collect_instantiation_requests(
    mir: &MirProgram,
    generic_functions: &FxHashMap<Symbol, GenericFunctionInfo>,
    interner: &Interner,
    diagnostics: &mut Diagnostics,
) -> Vec<InstantiationRequest> {
    let mut seen = rustc_hash::FxHashSet::default();
    let mut requests = Vec::new();

    for function in &mir.functions {
        for block in &function.blocks {
            let Terminator::Call { func: Operand::FunctionRef(name), args, .. } = &block.terminator else {
                continue;
            };
            let Some(info) = generic_functions.get(name) else { continue };

            let arg_types: Vec<Type> = args.iter().map(|arg| operand_type(arg, function)).collect();
            match infer_generic_types(&info.generics, &info.params, &arg_types, *name, info.span, interner) {
                Ok(type_args) => {
                    let request = InstantiationRequest { function: *name, type_args };
                    if seen.insert(request.clone()) {
                        requests.push(request);
                    }
                }
                Err(error) => diagnostics.report_error(&error, info.span, Some(function.name)),
            }
        }
    }

    requests
}

/// The type of one call argument, resolved from the calling function's local
/// table. Only the local's declared type is used; a place with field/index
/// projections resolves to its root local's type, which is exact for the
/// common case of a bare-variable argument and a documented simplification
/// for a projected one.
pub(crate) fn operand_type(operand: &Operand, function: &mlc_mir::MirFunction) -> Type {
    match operand {
        Operand::Copy(place) | Operand::Move(place) => {
            function.local(place.local).map_or(Type::Primitive(mlc_ty::Primitive::Error), |local| local.ty.clone())
        }
        Operand::Constant(constant) => constant.ty.clone(),
        Operand::FunctionRef(_) => Type::Primitive(mlc_ty::Primitive::Error),
    }
}

#[cfg(test)]
mod tests {
    use mlc_diag::Diagnostics;
    use mlc_intern::Interner;
    use mlc_mir::{BasicBlock, BasicBlockId, Constant, ConstKind, Local, LocalId, MirFunction, Operand, Program as MirProgram, Terminator};
    use mlc_span::FileSpan;
    use mlc_ty::{Primitive, Type};

    use super::{collect_instantiation_requests, GenericFunctionInfo};

    fn span() -> FileSpan {
        FileSpan::synthetic(mlc_span::FileId(0))
    }

    #[test]
    fn infers_type_args_from_a_constant_call_argument() {
        let interner = Interner::new();
        let id = interner.intern("id");
        let t = interner.intern("T");
        let caller = interner.intern("main");

        let call_function = MirFunction {
            name: caller,
            module_path: vec![],
            is_export: false,
            is_extern: false,
            is_variadic: false,
            locals: vec![Local {
                id: LocalId(0),
                name: None,
                ty: Type::Primitive(Primitive::Void),
                mutable: true,
                user_origin: false,
                is_static: false,
                closure_info: None,
            }],
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
        let mir = MirProgram { functions: vec![call_function], ..MirProgram::default() };

        let mut generics = rustc_hash::FxHashMap::default();
        generics.insert(id, GenericFunctionInfo { generics: vec![t], params: vec![Type::Generic(t)], span: span() });

        let mut diagnostics = Diagnostics::new();
        let requests = collect_instantiation_requests(&mir, &generics, &interner, &mut diagnostics);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].function, id);
        assert_eq!(requests[0].type_args, vec![Type::Primitive(Primitive::Int)]);
        assert!(!diagnostics.has_errors());
    }
}
