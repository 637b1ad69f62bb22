//! MIR lowering: turns one [`mlc_hir::Function`] at a time into an
//! [`mlc_mir::MirFunction`], threading a program-wide [`ProgramInfo`]
//! through every function so field offsets, vtables, and destructors
//! resolve consistently.

pub mod context;
pub mod expr;
pub mod program_info;
pub mod stmt;

use mlc_diag::Diagnostics;
use mlc_hir::{Decl, Function as HirFunction};
use mlc_intern::Interner;
use mlc_mir::{Local, MirBuilder, MirEnum, MirFunction, MirGlobalVar, MirStruct, Program as MirProgram, Terminator};

pub use context::{FunctionContext, ProgramInfo};

#[must_use]
#[tracing::instrument(skip_all, fields(function = %interner.resolve(&function.name)))]
pub fn lower_function(function: &HirFunction, program: &ProgramInfo, interner: &Interner, diagnostics: &mut Diagnostics) -> MirFunction {
    let mut builder = MirBuilder::new(function.name, vec![]);
    builder.set_export(function.is_export);
    builder.set_extern(function.is_extern);
    builder.set_variadic(function.is_variadic);

    let return_slot = builder.reserve_local();
    builder.push_local(Local {
        id: return_slot,
        name: None,
        ty: function.return_type.clone(),
        mutable: true,
        user_origin: false,
        is_static: false,
        closure_info: None,
    });

    let mut ctx = FunctionContext::new(builder, program, function.name);
    for param in &function.params {
        let id = ctx.builder.reserve_local();
        ctx.builder.push_local(Local {
            id,
            name: Some(param.name),
            ty: param.ty.clone(),
            mutable: true,
            user_origin: true,
            is_static: false,
            closure_info: None,
        });
        ctx.register_local(param.name, id, param.ty.clone());
    }

    if let Some(body) = &function.body {
        stmt::lower_block(&mut ctx, interner, diagnostics, body);
        if ctx.builder.current_terminator_is_unreachable() {
            let (defers, destructors) = ctx.all_outstanding();
            stmt::flush_defers_and_destructors(&mut ctx, interner, diagnostics, defers, destructors);
            ctx.builder.set_terminator(Terminator::Return);
        }
    }

    ctx.builder.finish()
}

/// Lowers a whole HIR program to MIR. Functions are lowered independently;
/// the [`ProgramInfo`] gathered up front is what lets one function's body
/// reference another struct's fields or vtable without re-deriving them.
#[must_use]
#[tracing::instrument(skip_all)]
pub fn lower_program(program: &mlc_hir::Program, interner: &Interner, diagnostics: &mut Diagnostics) -> MirProgram {
    let info = program_info::build(program, interner);
    let mut mir_program = MirProgram::default();

    for decl in &program.decls {
        match decl {
            Decl::Function(function) => mir_program.functions.push(lower_function(function, &info, interner, diagnostics)),
            Decl::Impl(impl_decl) => {
                for method in &impl_decl.methods {
                    mir_program.functions.push(lower_function(method, &info, interner, diagnostics));
                }
            }
            Decl::ExternBlock(extern_block) => {
                for function in &extern_block.decls {
                    mir_program.functions.push(lower_function(function, &info, interner, diagnostics));
                }
                mir_program.imports.push(extern_block.abi);
            }
            Decl::Struct(struct_decl) => {
                let fields = info.struct_fields.get(&struct_decl.name).map(|fields| fields.iter().map(|(_, ty)| ty.clone()).collect()).unwrap_or_default();
                mir_program.structs.push(MirStruct { name: struct_decl.name, fields });
            }
            Decl::Enum(enum_decl) => {
                let variants = enum_decl.variants.iter().map(|variant| (variant.name, variant.tag)).collect();
                mir_program.enums.push(MirEnum { name: enum_decl.name, variants });
            }
            Decl::GlobalVar(global) => {
                let init = global
                    .init
                    .as_ref()
                    .and_then(|expr| match &expr.kind {
                        mlc_hir::ExprKind::Literal(literal) => literal_to_constant(literal, &global.ty),
                        _ => None,
                    });
                mir_program.global_vars.push(MirGlobalVar { name: global.name, ty: global.ty.clone(), init });
            }
            Decl::Interface(_) | Decl::Typedef { .. } | Decl::Import(_) => {}
        }
    }

    tracing::debug!(functions = mir_program.functions.len(), structs = mir_program.structs.len(), "lowered program to MIR");
    mir_program
}

fn literal_to_constant(literal: &mlc_hir::Literal, ty: &mlc_ty::Type) -> Option<mlc_mir::Constant> {
    let kind = match literal {
        mlc_hir::Literal::Int(v) => mlc_mir::ConstKind::Int(*v),
        mlc_hir::Literal::UInt(v) => mlc_mir::ConstKind::UInt(*v),
        mlc_hir::Literal::Float(v) => mlc_mir::ConstKind::Float(*v),
        mlc_hir::Literal::Bool(v) => mlc_mir::ConstKind::Bool(*v),
        mlc_hir::Literal::Char(v) => mlc_mir::ConstKind::Char(*v),
        mlc_hir::Literal::String(v) => mlc_mir::ConstKind::String(v.clone()),
        mlc_hir::Literal::Void => mlc_mir::ConstKind::Void,
    };
    Some(mlc_mir::Constant { kind, ty: ty.clone() })
}
