//! Post-monomorphization structural verification: the defensive pass that
//! checks the invariants every other pass is already supposed to uphold by
//! construction. A violation here means a lowering bug, not a user error,
//! so it surfaces as [`InternalError`] rather than a [`mlc_diag::Diagnostic`].

use mlc_diag::InternalError;
use mlc_intern::Interner;
use mlc_mir::{BasicBlockId, MirFunction, Operand, Place, PlaceElem, Program, Terminator};
use mlc_ty::Type;

use crate::config::RuntimeSymbols;

/// Verifies every invariant base spec §8's "Quantified invariants" names:
/// one terminator per block (true by construction via [`mlc_mir::MirBuilder`]
/// but checked anyway), every jump/call-success/unwind target is a real
/// block in the same function, every place's projection chain is
/// well-formed against its root local's type, and every `FunctionRef`
/// resolves to an emitted function or a known runtime symbol.
pub fn verify_program(program: &Program, runtime_symbols: &RuntimeSymbols, interner: &Interner) -> Result<(), InternalError> {
    for function in &program.functions {
        verify_function(function, program, runtime_symbols, interner)?;
    }
    Ok(())
}

fn verify_function(function: &MirFunction, program: &Program, runtime_symbols: &RuntimeSymbols, interner: &Interner) -> Result<(), InternalError> {
    let function_name = interner.resolve(&function.name);

    for block in &function.blocks {
        let targets = terminator_targets(&block.terminator);
        for target in targets {
            if function.block(target).is_none() {
                return Err(InternalError::DanglingJumpTarget { function: function_name.clone(), block: block.id.0, target: target.0 });
            }
        }

        if let Terminator::Call { func, .. } = &block.terminator {
            verify_function_ref(func, program, runtime_symbols, interner)?;
        }

        verify_virtual_call(&block.terminator, &function_name)?;

        for statement in &block.statements {
            if let mlc_mir::Statement::Assign { place, .. } = statement {
                verify_place(place, function, program, &function_name)?;
            }
        }
    }

    Ok(())
}

fn terminator_targets(terminator: &Terminator) -> Vec<BasicBlockId> {
    match terminator {
        Terminator::Goto(target) => vec![*target],
        Terminator::SwitchInt { targets, otherwise, .. } => targets.values().copied().chain(std::iter::once(*otherwise)).collect(),
        Terminator::Call { success, unwind, .. } => std::iter::once(*success).chain(*unwind).collect(),
        Terminator::Return | Terminator::Unreachable => vec![],
    }
}

fn verify_function_ref(func: &Operand, program: &Program, runtime_symbols: &RuntimeSymbols, interner: &Interner) -> Result<(), InternalError> {
    let Operand::FunctionRef(name) = func else { return Ok(()) };
    let resolved = interner.resolve(name);
    if program.functions.iter().any(|candidate| candidate.name == *name) || runtime_symbols.contains(&resolved) {
        return Ok(());
    }
    Err(InternalError::UnresolvedFunctionRef { name: resolved })
}

/// A virtual call must name the interface/method it dispatches through and
/// pass the receiver's whole fat pointer `{data_ptr, vtable_ptr}` as its
/// first argument, not a field projected out of it — the backend needs the
/// vtable half to find the callee.
fn verify_virtual_call(terminator: &Terminator, function_name: &str) -> Result<(), InternalError> {
    let Terminator::Call { is_virtual: true, interface_name, method_name, args, .. } = terminator else { return Ok(()) };

    if interface_name.is_none() || method_name.is_none() {
        return Err(InternalError::InvalidVirtualCall {
            function: function_name.to_owned(),
            detail: "virtual call is missing its interface_name/method_name".to_owned(),
        });
    }

    match args.first() {
        Some(Operand::Copy(place) | Operand::Move(place)) if place.projection.is_empty() => Ok(()),
        _ => Err(InternalError::InvalidVirtualCall {
            function: function_name.to_owned(),
            detail: "virtual call's first argument must be the receiver's whole fat pointer place".to_owned(),
        }),
    }
}

fn verify_place(place: &Place, function: &MirFunction, program: &Program, function_name: &str) -> Result<(), InternalError> {
    let Some(root) = function.local(place.local) else {
        return Err(InternalError::MalformedPlace { function: function_name.to_owned(), detail: format!("local {} does not exist", place.local.0) });
    };

    let mut current = root.ty.clone();
    for elem in &place.projection {
        current = match (elem, &current) {
            (PlaceElem::Deref, Type::Pointer(inner)) => (**inner).clone(),
            (PlaceElem::Deref, Type::Interface(_)) => current.clone(),
            (PlaceElem::Index(_), Type::Array { element, .. }) => (**element).clone(),
            (PlaceElem::Field(index), Type::Struct { name, .. }) => {
                let Some(struct_def) = program.structs.iter().find(|candidate| candidate.name == *name) else {
                    return Ok(()); // a monomorphized struct not yet registered; not this pass's concern
                };
                let Some(field_ty) = struct_def.fields.get(*index) else {
                    return Err(InternalError::MalformedPlace {
                        function: function_name.to_owned(),
                        detail: format!("field index {index} out of range for struct with {} fields", struct_def.fields.len()),
                    });
                };
                field_ty.clone()
            }
            (PlaceElem::Field(_), Type::Interface(_)) => current.clone(),
            _ => {
                return Err(InternalError::MalformedPlace {
                    function: function_name.to_owned(),
                    detail: format!("projection {elem:?} is not valid on type {current:?}"),
                });
            }
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use mlc_intern::Interner;
    use mlc_mir::{BasicBlock, BasicBlockId, Local, LocalId, MirFunction, Operand, Program, Terminator};
    use mlc_ty::{Primitive, Type};

    use super::verify_program;
    use crate::config::RuntimeSymbols;

    #[test]
    fn accepts_a_return_only_function() {
        let interner = Interner::new();
        let function = MirFunction {
            name: interner.intern("f"),
            module_path: vec![],
            is_export: false,
            is_extern: false,
            is_variadic: false,
            locals: vec![Local { id: LocalId(0), name: None, ty: Type::Primitive(Primitive::Void), mutable: true, user_origin: false, is_static: false, closure_info: None }],
            entry_block: BasicBlockId(0),
            blocks: vec![BasicBlock { id: BasicBlockId(0), statements: vec![], terminator: Terminator::Return }],
        };
        let program = Program { functions: vec![function], ..Program::default() };
        assert!(verify_program(&program, &RuntimeSymbols::default(), &interner).is_ok());
    }

    #[test]
    fn rejects_a_goto_to_a_nonexistent_block() {
        let interner = Interner::new();
        let function = MirFunction {
            name: interner.intern("f"),
            module_path: vec![],
            is_export: false,
            is_extern: false,
            is_variadic: false,
            locals: vec![Local { id: LocalId(0), name: None, ty: Type::Primitive(Primitive::Void), mutable: true, user_origin: false, is_static: false, closure_info: None }],
            entry_block: BasicBlockId(0),
            blocks: vec![BasicBlock { id: BasicBlockId(0), statements: vec![], terminator: Terminator::Goto(BasicBlockId(9)) }],
        };
        let program = Program { functions: vec![function], ..Program::default() };
        assert!(verify_program(&program, &RuntimeSymbols::default(), &interner).is_err());
    }

    #[test]
    fn accepts_a_call_to_a_known_runtime_symbol() {
        let interner = Interner::new();
        let function = MirFunction {
            name: interner.intern("f"),
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
                    func: Operand::FunctionRef(interner.intern("cm_println_int")),
                    args: vec![],
                    destination: None,
                    success: BasicBlockId(0),
                    unwind: None,
                    interface_name: None,
                    method_name: None,
                    is_virtual: false,
                },
            }],
        };
        let program = Program { functions: vec![function], ..Program::default() };
        assert!(verify_program(&program, &RuntimeSymbols::default(), &interner).is_ok());
    }

    #[test]
    fn accepts_a_virtual_call_with_a_whole_fat_pointer_first_argument() {
        let interner = Interner::new();
        let shape = interner.intern("Shape");
        let area = interner.intern("area");
        let function = MirFunction {
            name: interner.intern("f"),
            module_path: vec![],
            is_export: false,
            is_extern: false,
            is_variadic: false,
            locals: vec![
                Local { id: LocalId(0), name: None, ty: Type::Primitive(Primitive::Void), mutable: true, user_origin: false, is_static: false, closure_info: None },
                Local { id: LocalId(1), name: None, ty: Type::Interface(shape), mutable: true, user_origin: true, is_static: false, closure_info: None },
            ],
            entry_block: BasicBlockId(0),
            blocks: vec![BasicBlock {
                id: BasicBlockId(0),
                statements: vec![],
                terminator: Terminator::Call {
                    func: Operand::FunctionRef(area),
                    args: vec![Operand::Copy(mlc_mir::Place::from_local(LocalId(1)))],
                    destination: None,
                    success: BasicBlockId(0),
                    unwind: None,
                    interface_name: Some(shape),
                    method_name: Some(area),
                    is_virtual: true,
                },
            }],
        };
        let program = Program { functions: vec![function], ..Program::default() };
        assert!(verify_program(&program, &RuntimeSymbols::default(), &interner).is_ok());
    }

    #[test]
    fn rejects_a_virtual_call_with_only_the_data_ptr_field_as_first_argument() {
        let interner = Interner::new();
        let shape = interner.intern("Shape");
        let area = interner.intern("area");
        let function = MirFunction {
            name: interner.intern("f"),
            module_path: vec![],
            is_export: false,
            is_extern: false,
            is_variadic: false,
            locals: vec![
                Local { id: LocalId(0), name: None, ty: Type::Primitive(Primitive::Void), mutable: true, user_origin: false, is_static: false, closure_info: None },
                Local { id: LocalId(1), name: None, ty: Type::Interface(shape), mutable: true, user_origin: true, is_static: false, closure_info: None },
            ],
            entry_block: BasicBlockId(0),
            blocks: vec![BasicBlock {
                id: BasicBlockId(0),
                statements: vec![],
                terminator: Terminator::Call {
                    func: Operand::FunctionRef(area),
                    args: vec![Operand::Copy(mlc_mir::Place::from_local(LocalId(1)).project(mlc_mir::PlaceElem::Field(0)))],
                    destination: None,
                    success: BasicBlockId(0),
                    unwind: None,
                    interface_name: Some(shape),
                    method_name: Some(area),
                    is_virtual: true,
                },
            }],
        };
        let program = Program { functions: vec![function], ..Program::default() };
        assert!(verify_program(&program, &RuntimeSymbols::default(), &interner).is_err());
    }

    #[test]
    fn rejects_a_virtual_call_missing_its_interface_name() {
        let interner = Interner::new();
        let area = interner.intern("area");
        let function = MirFunction {
            name: interner.intern("f"),
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
                    func: Operand::FunctionRef(area),
                    args: vec![Operand::Copy(mlc_mir::Place::from_local(LocalId(0)))],
                    destination: None,
                    success: BasicBlockId(0),
                    unwind: None,
                    interface_name: None,
                    method_name: Some(area),
                    is_virtual: true,
                },
            }],
        };
        let program = Program { functions: vec![function], ..Program::default() };
        assert!(verify_program(&program, &RuntimeSymbols::default(), &interner).is_err());
    }

    #[test]
    fn rejects_a_call_to_an_unresolvable_function_ref() {
        let interner = Interner::new();
        let function = MirFunction {
            name: interner.intern("f"),
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
                    func: Operand::FunctionRef(interner.intern("nonexistent")),
                    args: vec![],
                    destination: None,
                    success: BasicBlockId(0),
                    unwind: None,
                    interface_name: None,
                    method_name: None,
                    is_virtual: false,
                },
            }],
        };
        let program = Program { functions: vec![function], ..Program::default() };
        assert!(verify_program(&program, &RuntimeSymbols::default(), &interner).is_err());
    }
}
