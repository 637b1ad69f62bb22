//! Pass 1 of HIR lowering: walk the typed AST once and build the lookup
//! tables pass 2 needs, without producing any HIR yet.

use mlc_diag::{Diagnostics, LowerError};
use mlc_intern::{Interner, Symbol};
use mlc_span::FileSpan;
use mlc_ty::Type;
use rustc_hash::FxHashMap;

use crate::ast::{Decl, EnumDecl, ImplDecl, ImplKind, Program, StructDecl};

#[derive(Debug, Default)]
pub struct CollectedInfo {
    pub struct_defs: FxHashMap<Symbol, StructDecl>,
    pub func_names: rustc_hash::FxHashSet<Symbol>,
    /// `EnumName::Variant` (flattened to one symbol) -> tag value.
    pub enum_values: FxHashMap<Symbol, i64>,
    pub types_with_default_ctor: rustc_hash::FxHashSet<Symbol>,
    /// `target_type -> { interface -> mangled impl method set }`.
    pub impl_info: FxHashMap<Symbol, FxHashMap<Symbol, Symbol>>,
    /// Import alias table: source path (flattened) -> canonical builtin
    /// name, e.g. `std::io::println` -> `__println__`.
    pub import_aliases: FxHashMap<Symbol, Symbol>,
}

/// Runs pass 1 over the whole program, flattening namespaces as it goes.
pub fn collect(program: &Program, interner: &Interner, diagnostics: &mut Diagnostics) -> CollectedInfo {
    let mut info = CollectedInfo::default();
    collect_decls(&program.decls, &[], interner, &mut info, diagnostics);
    info
}

fn collect_decls(
    decls: &[Decl],
    namespace: &[Symbol],
    interner: &Interner,
    info: &mut CollectedInfo,
    diagnostics: &mut Diagnostics,
) {
    for decl in decls {
        match decl {
            Decl::Module { path, decls } => {
                let mut nested = namespace.to_vec();
                nested.extend(path.iter().copied());
                collect_decls(decls, &nested, interner, info, diagnostics);
            }
            Decl::Function(function) => {
                let flattened = flatten_name(namespace, function.name, interner);
                info.func_names.insert(flattened);
            }
            Decl::Struct(struct_decl) => {
                info.struct_defs.insert(struct_decl.name, struct_decl.clone());
                if struct_decl.has_default_ctor {
                    info.types_with_default_ctor.insert(struct_decl.name);
                }
            }
            Decl::Interface(_) => {}
            Decl::Impl(impl_decl) => collect_impl(impl_decl, interner, info),
            Decl::Enum(enum_decl) => collect_enum(enum_decl, interner, info, diagnostics),
            Decl::Typedef { .. } | Decl::GlobalVar { .. } | Decl::ExternBlock { .. } | Decl::Macro(_) => {}
            Decl::Import { path, span } | Decl::Use { path, span } => {
                collect_import(path, *span, interner, info);
            }
        }
    }
}

fn flatten_name(namespace: &[Symbol], name: Symbol, interner: &Interner) -> Symbol {
    if namespace.is_empty() {
        return name;
    }
    let mut text = namespace.iter().map(|segment| interner.resolve(segment)).collect::<Vec<_>>().join("_");
    text.push('_');
    text.push_str(&interner.resolve(&name));
    interner.intern(&text)
}

fn collect_impl(impl_decl: &ImplDecl, interner: &Interner, info: &mut CollectedInfo) {
    let target_name = interner.resolve(&impl_decl.target_type);
    let entry = info.impl_info.entry(impl_decl.target_type).or_default();
    for function in &impl_decl.functions {
        let mangled = match function.kind {
            ImplKind::Method => interner.intern(&mlc_ty::mangle_member(&target_name, &interner.resolve(&function.function.name))),
            ImplKind::Operator(op) => interner.intern(&format!("{target_name}__op_{}", op.mangled_suffix())),
            ImplKind::Constructor => match function.ctor_index {
                Some(0) | None => interner.intern(&format!("{target_name}__ctor")),
                Some(index) => interner.intern(&format!("{target_name}__ctor_{index}")),
            },
            ImplKind::Destructor => interner.intern(&format!("{target_name}__dtor")),
        };
        if let Some(interface) = impl_decl.interface {
            entry.insert(interface, mangled);
        }
    }
}

fn collect_enum(enum_decl: &EnumDecl, interner: &Interner, info: &mut CollectedInfo, diagnostics: &mut Diagnostics) {
    let enum_name = interner.resolve(&enum_decl.name);
    let mut seen_tags: FxHashMap<i64, Vec<Symbol>> = FxHashMap::default();
    let mut next_auto_tag = 0i64;
    for variant in &enum_decl.variants {
        let tag = variant.explicit_tag.unwrap_or(next_auto_tag);
        next_auto_tag = tag + 1;
        let qualified = interner.intern(&format!("{enum_name}::{}", interner.resolve(&variant.name)));
        info.enum_values.insert(qualified, tag);
        seen_tags.entry(tag).or_default().push(variant.name);
    }
    for (tag, variants) in seen_tags {
        if variants.len() > 1 {
            let names = variants.iter().map(|symbol| interner.resolve(symbol)).collect::<Vec<_>>();
            diagnostics.report_error(
                &LowerError::DuplicateEnumTag {
                    enum_name: enum_name.clone(),
                    variants: names,
                    tag,
                    span: enum_decl.span,
                },
                enum_decl.span,
                None,
            );
        }
    }
}

fn collect_import(path: &[Symbol], span: FileSpan, interner: &Interner, info: &mut CollectedInfo) {
    let flattened_text = path.iter().map(|segment| interner.resolve(segment)).collect::<Vec<_>>().join("::");
    let flattened = interner.intern(&flattened_text);
    let canonical = match flattened_text.as_str() {
        "std::io::println" => Some("__println__"),
        "std::io::print" => Some("__print__"),
        _ => None,
    };
    if let Some(canonical) = canonical {
        info.import_aliases.insert(flattened, interner.intern(canonical));
    }
    let _ = span;
}

/// Resolves a field/method type, used elsewhere by lowering to implement
/// `sizeof`/`alignof` over struct layouts.
#[must_use]
pub fn struct_field_types(struct_decl: &StructDecl) -> Vec<Type> {
    struct_decl.fields.iter().map(|(_, ty)| ty.clone()).collect()
}
