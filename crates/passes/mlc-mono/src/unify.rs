//! Structural unification between a generic function's declared parameter
//! types and the concrete argument types observed at one call site.

use mlc_diag::LowerError;
use mlc_intern::{Interner, Symbol};
use mlc_span::FileSpan;
use mlc_ty::Type;
use rustc_hash::FxHashMap;

/// Walks `pattern` and `concrete` together, binding every [`Type::Generic`]
/// occurrence in `pattern` to the structurally-corresponding piece of
/// `concrete`. The first binding for a given name wins; a later, differing
/// occurrence of the same generic name is left alone rather than reported,
/// since a genuine mismatch there is a type error that belongs to an earlier
/// pass, not to monomorphization.
fn unify_into(pattern: &Type, concrete: &Type, bindings: &mut FxHashMap<Symbol, Type>) {
    match (pattern, concrete) {
        (Type::Generic(name), _) => {
            bindings.entry(*name).or_insert_with(|| concrete.clone());
        }
        (Type::Pointer(inner_pattern), Type::Pointer(inner_concrete)) => {
            unify_into(inner_pattern, inner_concrete, bindings);
        }
        (Type::Array { element: pattern_elem, .. }, Type::Array { element: concrete_elem, .. }) => {
            unify_into(pattern_elem, concrete_elem, bindings);
        }
        (
            Type::Struct { name: pattern_name, type_args: pattern_args },
            Type::Struct { name: concrete_name, type_args: concrete_args },
        ) if pattern_name == concrete_name => {
            for (pattern_arg, concrete_arg) in pattern_args.iter().zip(concrete_args) {
                unify_into(pattern_arg, concrete_arg, bindings);
            }
        }
        (
            Type::Function { params: pattern_params, return_type: pattern_ret, .. },
            Type::Function { params: concrete_params, return_type: concrete_ret, .. },
        ) => {
            for (pattern_param, concrete_param) in pattern_params.iter().zip(concrete_params) {
                unify_into(pattern_param, concrete_param, bindings);
            }
            unify_into(pattern_ret, concrete_ret, bindings);
        }
        _ => {}
    }
}

/// Infers concrete types for `generics` from the declared `params` and the
/// observed `arg_types` at one call site, in declaration order. Returns
/// [`LowerError::UnresolvedGenericParameter`] for the first generic that no
/// argument position pins down, per the hard-error-on-unresolved-generic
/// policy: a partially-specialized instance is never emitted.
pub fn infer_generic_types(
    generics: &[Symbol],
    params: &[Type],
    arg_types: &[Type],
    function_name: Symbol,
    span: FileSpan,
    interner: &Interner,
) -> Result<Vec<Type>, LowerError> {
    let mut bindings = FxHashMap::default();
    for (param, arg) in params.iter().zip(arg_types) {
        unify_into(param, arg, &mut bindings);
    }

    generics
        .iter()
        .map(|generic| {
            bindings.get(generic).cloned().ok_or_else(|| LowerError::UnresolvedGenericParameter {
                function: interner.resolve(&function_name),
                parameter: interner.resolve(generic),
                span,
            })
        })
        .collect()
}
