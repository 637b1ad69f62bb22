//! Builds the program-wide [`ProgramInfo`] tables MIR lowering needs about
//! every declaration before any one function's body can be lowered.

use mlc_hir::{Decl, Program};
use mlc_intern::Interner;
use mlc_mir::ConstKind;

use crate::context::ProgramInfo;

#[must_use]
pub fn build(program: &Program, interner: &Interner) -> ProgramInfo {
    let mut info = ProgramInfo::default();

    for decl in &program.decls {
        if let Decl::Struct(struct_decl) = decl {
            let fields = struct_decl.fields.iter().map(|field| (field.name, field.ty.clone())).collect();
            info.struct_fields.insert(struct_decl.name, fields);
        }
    }

    for decl in &program.decls {
        if let Decl::Enum(enum_decl) = decl {
            let variants = enum_decl.variants.iter().map(|variant| variant.name).collect();
            info.enum_variants.insert(enum_decl.name, variants);
        }
    }

    for decl in &program.decls {
        if let Decl::Interface(interface) = decl {
            let methods = interface.methods.iter().map(|method| method.name).collect();
            info.interface_methods.insert(interface.name, methods);
        }
    }

    for decl in &program.decls {
        let Decl::Impl(impl_decl) = decl else { continue };
        let Some(interface_name) = impl_decl.interface else { continue };
        let type_name = impl_decl.target_type;
        let Some(order) = info.interface_methods.get(&interface_name).cloned() else { continue };
        let mut vtable = Vec::with_capacity(order.len());
        for method_name in order {
            let suffix = interner.resolve(&method_name);
            if let Some(method) = impl_decl.methods.iter().find(|candidate| interner.resolve(&candidate.name).ends_with(suffix.as_str())) {
                vtable.push(method.name);
            }
        }
        info.vtables.insert((type_name, interface_name), vtable);
    }

    for decl in &program.decls {
        let Decl::Impl(impl_decl) = decl else { continue };
        let type_name = impl_decl.target_type;
        for method in &impl_decl.methods {
            let method_text = interner.resolve(&method.name);
            if method_text.ends_with("__dtor") {
                info.destructors.insert(type_name, method.name);
            }
        }
    }

    for decl in &program.decls {
        let Decl::GlobalVar(global) = decl else { continue };
        if !global.is_const {
            continue;
        }
        let Some(init) = &global.init else { continue };
        if let mlc_hir::ExprKind::Literal(literal) = &init.kind {
            if let Some(kind) = literal_to_const(literal) {
                info.const_globals.insert(global.name, kind);
            }
        }
    }

    info
}

fn literal_to_const(literal: &mlc_hir::Literal) -> Option<ConstKind> {
    Some(match literal {
        mlc_hir::Literal::Int(v) => ConstKind::Int(*v),
        mlc_hir::Literal::UInt(v) => ConstKind::UInt(*v),
        mlc_hir::Literal::Float(v) => ConstKind::Float(*v),
        mlc_hir::Literal::Bool(v) => ConstKind::Bool(*v),
        mlc_hir::Literal::Char(v) => ConstKind::Char(*v),
        mlc_hir::Literal::String(v) => ConstKind::String(v.clone()),
        mlc_hir::Literal::Void => ConstKind::Void,
    })
}
