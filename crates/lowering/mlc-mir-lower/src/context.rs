//! Per-function MIR lowering state: scopes, defer/destructor stacks, the
//! loop-frame stack, and the block cursor.

use mlc_hir::Block as HirBlock;
use mlc_intern::Symbol;
use mlc_mir::{BasicBlockId, LocalId, MirBuilder};
use mlc_ty::Type;
use rustc_hash::FxHashMap;

/// Program-wide, read-only information MIR lowering needs about every
/// declaration, gathered once before lowering any one function's body.
#[derive(Debug, Default)]
pub struct ProgramInfo {
    pub struct_fields: FxHashMap<Symbol, Vec<(Symbol, Type)>>,
    /// Enum name -> its variants in declaration order, the tagged-union
    /// aggregate's `variant_idx` convention.
    pub enum_variants: FxHashMap<Symbol, Vec<Symbol>>,
    /// Interface method order, the vtable layout convention.
    pub interface_methods: FxHashMap<Symbol, Vec<Symbol>>,
    /// `(struct, interface) -> mangled method name` in interface method order.
    pub vtables: FxHashMap<(Symbol, Symbol), Vec<Symbol>>,
    /// A type is destructor-bearing if its nominal name (or the base of a
    /// mangled generic instantiation) appears here.
    pub destructors: FxHashMap<Symbol, Symbol>,
    pub const_globals: FxHashMap<Symbol, mlc_mir::ConstKind>,
}

impl ProgramInfo {
    /// The bare field-type table `Type::size_align` wants, derived from
    /// `struct_fields`'s `(name, type)` pairs.
    #[must_use]
    pub fn size_align_table(&self) -> FxHashMap<Symbol, Vec<Type>> {
        self.struct_fields.iter().map(|(name, fields)| (*name, fields.iter().map(|(_, ty)| ty.clone()).collect())).collect()
    }

    /// A variant's ordinal position within its enum's declared variant
    /// list, the index `AggregateKind::Enum` lays the payload out by. Falls
    /// back to `None` for an enum not found in `enum_variants` (always
    /// populated by `program_info::build`, but defensive for hand-built
    /// test fixtures).
    #[must_use]
    pub fn variant_index(&self, enum_name: Symbol, variant: Symbol) -> Option<usize> {
        self.enum_variants.get(&enum_name)?.iter().position(|candidate| *candidate == variant)
    }
}

pub struct LoopFrame {
    pub header: BasicBlockId,
    pub exit: BasicBlockId,
    pub continue_target: BasicBlockId,
}

pub struct FunctionContext<'a> {
    pub builder: MirBuilder,
    pub program: &'a ProgramInfo,
    scopes: Vec<FxHashMap<Symbol, LocalId>>,
    locals_ty: FxHashMap<LocalId, Type>,
    defers: Vec<Vec<HirBlock>>,
    destructors: Vec<Vec<(LocalId, Symbol)>>,
    loop_stack: Vec<LoopFrame>,
    pub in_must_block: bool,
    pub function_name: Symbol,
}

impl<'a> FunctionContext<'a> {
    #[must_use]
    pub fn new(builder: MirBuilder, program: &'a ProgramInfo, function_name: Symbol) -> Self {
        Self {
            builder,
            program,
            scopes: vec![FxHashMap::default()],
            locals_ty: FxHashMap::default(),
            defers: vec![Vec::new()],
            destructors: vec![Vec::new()],
            loop_stack: Vec::new(),
            in_must_block: false,
            function_name,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
        self.defers.push(Vec::new());
        self.destructors.push(Vec::new());
    }

    /// Pops the innermost scope, returning its defer bodies (LIFO order,
    /// i.e. last-registered first) and destructor-bearing locals (also
    /// LIFO) so the caller can emit them before continuing.
    pub fn pop_scope(&mut self) -> (Vec<HirBlock>, Vec<(LocalId, Symbol)>) {
        self.scopes.pop();
        let mut defers = self.defers.pop().unwrap_or_default();
        defers.reverse();
        let mut destructors = self.destructors.pop().unwrap_or_default();
        destructors.reverse();
        (defers, destructors)
    }

    /// All outstanding defers/destructors across every open scope, deepest
    /// first, as `return` must flush them all before its terminator.
    pub fn all_outstanding(&self) -> (Vec<HirBlock>, Vec<(LocalId, Symbol)>) {
        let mut defers = Vec::new();
        for frame in self.defers.iter().rev() {
            defers.extend(frame.iter().rev().cloned());
        }
        let mut destructors = Vec::new();
        for frame in self.destructors.iter().rev() {
            destructors.extend(frame.iter().rev().copied());
        }
        (defers, destructors)
    }

    pub fn register_local(&mut self, name: Symbol, id: LocalId, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, id);
        }
        self.locals_ty.insert(id, ty);
    }

    /// Registers `alias` as referring to the same local as `existing`,
    /// without allocating storage: the zero-cost-alias path for `let y =
    /// move x`.
    pub fn register_alias(&mut self, alias: Symbol, existing: LocalId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(alias, existing);
        }
    }

    #[must_use]
    pub fn resolve_local(&self, name: Symbol) -> Option<LocalId> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name).copied())
    }

    #[must_use]
    pub fn local_type(&self, id: LocalId) -> Option<Type> {
        self.locals_ty.get(&id).cloned()
    }

    pub fn push_defer(&mut self, body: HirBlock) {
        if let Some(frame) = self.defers.last_mut() {
            frame.push(body);
        }
    }

    pub fn push_destructor(&mut self, local: LocalId, type_name: Symbol) {
        if let Some(frame) = self.destructors.last_mut() {
            frame.push((local, type_name));
        }
    }

    pub fn enter_loop(&mut self, header: BasicBlockId, exit: BasicBlockId, continue_target: BasicBlockId) {
        self.loop_stack.push(LoopFrame { header, exit, continue_target });
    }

    pub fn exit_loop(&mut self) {
        self.loop_stack.pop();
    }

    #[must_use]
    pub fn current_loop(&self) -> Option<&LoopFrame> {
        self.loop_stack.last()
    }

    /// Resolves a type's destructor, preferring an exact nominal match,
    /// then a mangled-base match (`Base__T1__T2` -> `Base`), then a bare
    /// generic-form match (`Base<T>` -> `Base`).
    #[must_use]
    pub fn destructor_for(&self, type_name: &str, interner: &mlc_intern::Interner) -> Option<Symbol> {
        let symbol = interner.intern(type_name);
        if let Some(dtor) = self.program.destructors.get(&symbol) {
            return Some(*dtor);
        }
        let mangled_base = type_name.split("__").next().unwrap_or(type_name);
        let mangled_base_symbol = interner.intern(mangled_base);
        if let Some(dtor) = self.program.destructors.get(&mangled_base_symbol) {
            return Some(*dtor);
        }
        let generic_base = type_name.split('<').next().unwrap_or(type_name);
        let generic_base_symbol = interner.intern(generic_base);
        self.program.destructors.get(&generic_base_symbol).copied()
    }
}
