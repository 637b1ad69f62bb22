//! MIR: a control-flow graph of basic blocks and three-address statements,
//! the output of MIR lowering and the input (post-monomorphization) to the
//! codegen backend.

use std::ops::Index;

use indexmap::IndexMap;
use mlc_intern::Symbol;
use mlc_ty::Type;

/// Local-variable id within one function. Index 0 is always the return
/// slot; argument locals occupy `1..=param_count`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

/// Basic-block id within one function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasicBlockId(pub usize);

#[derive(Debug, Clone)]
pub struct Local {
    pub id: LocalId,
    pub name: Option<Symbol>,
    pub ty: Type,
    pub mutable: bool,
    /// True if this local corresponds to a source-level `let`/parameter
    /// rather than a compiler-synthesized temporary.
    pub user_origin: bool,
    pub is_static: bool,
    pub closure_info: Option<ClosureInfo>,
}

#[derive(Debug, Clone)]
pub struct ClosureInfo {
    pub captures: Vec<LocalId>,
}

/// A place: a root local plus a left-to-right projection chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Place {
    pub local: LocalId,
    pub projection: Vec<PlaceElem>,
}

impl Place {
    #[must_use]
    pub const fn from_local(local: LocalId) -> Self {
        Self { local, projection: Vec::new() }
    }

    #[must_use]
    pub fn project(mut self, elem: PlaceElem) -> Self {
        self.projection.push(elem);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaceElem {
    Field(usize),
    /// The dynamic index value is held in a local, not embedded as a
    /// constant, so that multi-dimensional indexing collapses into one
    /// place with successive `Index` projections instead of materializing
    /// intermediate row-copy temporaries.
    Index(LocalId),
    Deref,
}

#[derive(Debug, Clone)]
pub enum ConstKind {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Char(char),
    String(String),
    Void,
}

#[derive(Debug, Clone)]
pub struct Constant {
    pub kind: ConstKind,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub enum Operand {
    Copy(Place),
    Move(Place),
    Constant(Constant),
    /// A reference to a function by its (already mangled, if applicable)
    /// name: a local MIR function, an extern declaration, or a runtime
    /// library symbol.
    FunctionRef(Symbol),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl From<mlc_hir::BinOp> for BinOp {
    fn from(op: mlc_hir::BinOp) -> Self {
        match op {
            mlc_hir::BinOp::Add => Self::Add,
            mlc_hir::BinOp::Sub => Self::Sub,
            mlc_hir::BinOp::Mul => Self::Mul,
            mlc_hir::BinOp::Div => Self::Div,
            mlc_hir::BinOp::Mod => Self::Mod,
            mlc_hir::BinOp::Eq => Self::Eq,
            mlc_hir::BinOp::Ne => Self::Ne,
            mlc_hir::BinOp::Lt => Self::Lt,
            mlc_hir::BinOp::Le => Self::Le,
            mlc_hir::BinOp::Gt => Self::Gt,
            mlc_hir::BinOp::Ge => Self::Ge,
            mlc_hir::BinOp::BitAnd => Self::BitAnd,
            mlc_hir::BinOp::BitOr => Self::BitOr,
            mlc_hir::BinOp::BitXor => Self::BitXor,
            mlc_hir::BinOp::Shl => Self::Shl,
            mlc_hir::BinOp::Shr => Self::Shr,
            // Logical And/Or never reach MIR as a binary_op: they lower to
            // the short-circuit diamond CFG instead (see mlc-mir-lower).
            mlc_hir::BinOp::And => Self::BitAnd,
            mlc_hir::BinOp::Or => Self::BitOr,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone)]
pub enum AggregateKind {
    Tuple,
    Struct(Symbol),
    Enum { enum_name: Symbol, variant_idx: usize },
    Array(Type),
}

#[derive(Debug, Clone)]
pub enum RValue {
    Use(Operand),
    BinaryOp { op: BinOp, lhs: Operand, rhs: Operand, result_type: Type },
    UnaryOp { op: UnOp, operand: Operand },
    Ref { place: Place, is_mut: bool },
    Cast { operand: Operand, target_type: Type },
    Aggregate { kind: AggregateKind, operands: Vec<Operand> },
    /// Converts `operand` to its string representation per a `cm_*_to_string`
    /// runtime symbol chosen by `operand`'s type, tagged with the original
    /// interpolation format spec (e.g. `:.2` in `{x:.2}`).
    FormatConvert { operand: Operand, spec: Option<String> },
}

#[derive(Debug, Clone)]
pub enum Statement {
    Assign { place: Place, value: RValue },
    StorageLive(LocalId),
    StorageDead(LocalId),
    Nop,
    Asm { code: String, operands: Vec<Operand>, clobbers: Vec<String>, no_opt: bool },
}

#[derive(Debug, Clone)]
pub enum Terminator {
    Goto(BasicBlockId),
    SwitchInt { discriminant: Operand, targets: IndexMap<i128, BasicBlockId>, otherwise: BasicBlockId },
    Return,
    Unreachable,
    Call {
        func: Operand,
        args: Vec<Operand>,
        destination: Option<Place>,
        success: BasicBlockId,
        unwind: Option<BasicBlockId>,
        interface_name: Option<Symbol>,
        method_name: Option<Symbol>,
        is_virtual: bool,
    },
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BasicBlockId,
    pub statements: Vec<Statement>,
    pub terminator: Terminator,
}

#[derive(Debug, Clone)]
pub struct MirFunction {
    pub name: Symbol,
    pub module_path: Vec<Symbol>,
    pub is_export: bool,
    pub is_extern: bool,
    pub is_variadic: bool,
    pub locals: Vec<Local>,
    pub entry_block: BasicBlockId,
    pub blocks: Vec<BasicBlock>,
}

impl MirFunction {
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.locals.iter().filter(|local| local.user_origin && local.id.0 != 0).count()
    }

    #[must_use]
    pub fn block(&self, id: BasicBlockId) -> Option<&BasicBlock> {
        self.blocks.iter().find(|block| block.id == id)
    }

    #[must_use]
    pub fn local(&self, id: LocalId) -> Option<&Local> {
        self.locals.iter().find(|local| local.id == id)
    }
}

impl Index<BasicBlockId> for MirFunction {
    type Output = BasicBlock;

    fn index(&self, index: BasicBlockId) -> &Self::Output {
        self.block(index).expect("block id produced by this function's own builder")
    }
}

#[derive(Debug, Clone)]
pub struct MirStruct {
    pub name: Symbol,
    pub fields: Vec<Type>,
}

#[derive(Debug, Clone)]
pub struct MirEnum {
    pub name: Symbol,
    pub variants: Vec<(Symbol, i64)>,
}

#[derive(Debug, Clone)]
pub struct MirGlobalVar {
    pub name: Symbol,
    pub ty: Type,
    pub init: Option<Constant>,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub functions: Vec<MirFunction>,
    pub structs: Vec<MirStruct>,
    pub enums: Vec<MirEnum>,
    pub global_vars: Vec<MirGlobalVar>,
    pub imports: Vec<Symbol>,
}

/// Incrementally builds one [`MirFunction`], mirroring the corpus's
/// block-cursor builder pattern: a current block is appended to until a
/// terminator is set, then the cursor moves on.
pub struct MirBuilder {
    function: MirFunction,
    current_block: BasicBlockId,
    next_local: u32,
}

impl MirBuilder {
    #[must_use]
    pub fn new(name: Symbol, module_path: Vec<Symbol>) -> Self {
        let entry = BasicBlockId(0);
        Self {
            function: MirFunction {
                name,
                module_path,
                is_export: false,
                is_extern: false,
                is_variadic: false,
                locals: Vec::new(),
                entry_block: entry,
                blocks: vec![BasicBlock { id: entry, statements: Vec::new(), terminator: Terminator::Unreachable }],
            },
            current_block: entry,
            next_local: 0,
        }
    }

    pub fn set_export(&mut self, value: bool) {
        self.function.is_export = value;
    }

    pub fn set_extern(&mut self, value: bool) {
        self.function.is_extern = value;
    }

    pub fn set_variadic(&mut self, value: bool) {
        self.function.is_variadic = value;
    }

    /// Allocates the next local id without registering it; used by callers
    /// that build the `Local` record themselves.
    pub fn reserve_local(&mut self) -> LocalId {
        let id = LocalId(self.next_local);
        self.next_local += 1;
        id
    }

    pub fn push_local(&mut self, local: Local) {
        self.function.locals.push(local);
    }

    #[must_use]
    pub fn new_block(&mut self) -> BasicBlockId {
        let id = BasicBlockId(self.function.blocks.len());
        self.function.blocks.push(BasicBlock { id, statements: Vec::new(), terminator: Terminator::Unreachable });
        id
    }

    pub fn switch_to_block(&mut self, id: BasicBlockId) {
        self.current_block = id;
    }

    #[must_use]
    pub const fn current_block(&self) -> BasicBlockId {
        self.current_block
    }

    pub fn push_statement(&mut self, statement: Statement) {
        self.function.blocks[self.current_block.0].statements.push(statement);
    }

    pub fn set_terminator(&mut self, terminator: Terminator) {
        self.function.blocks[self.current_block.0].terminator = terminator;
    }

    #[must_use]
    pub fn current_terminator_is_unreachable(&self) -> bool {
        matches!(self.function.blocks[self.current_block.0].terminator, Terminator::Unreachable)
    }

    #[must_use]
    pub fn finish(self) -> MirFunction {
        self.function
    }
}

#[cfg(test)]
mod tests {
    use mlc_intern::Interner;
    use mlc_ty::{Primitive, Type};

    use super::{BasicBlockId, Local, LocalId, MirBuilder, Terminator};

    #[test]
    fn builder_starts_with_one_unreachable_entry_block() {
        let interner = Interner::new();
        let name = interner.intern("f");
        let builder = MirBuilder::new(name, vec![]);
        assert_eq!(builder.current_block(), BasicBlockId(0));
        assert!(builder.current_terminator_is_unreachable());
    }

    #[test]
    fn new_block_ids_are_sequential() {
        let interner = Interner::new();
        let mut builder = MirBuilder::new(interner.intern("f"), vec![]);
        let first = builder.new_block();
        let second = builder.new_block();
        assert_eq!(first, BasicBlockId(1));
        assert_eq!(second, BasicBlockId(2));
    }

    #[test]
    fn finished_function_keeps_every_block_terminated() {
        let interner = Interner::new();
        let mut builder = MirBuilder::new(interner.intern("f"), vec![]);
        builder.push_local(Local {
            id: LocalId(0),
            name: None,
            ty: Type::Primitive(Primitive::Void),
            mutable: true,
            user_origin: false,
            is_static: false,
            closure_info: None,
        });
        builder.set_terminator(Terminator::Return);
        let function = builder.finish();
        assert!(matches!(function.blocks[0].terminator, Terminator::Return));
    }
}
