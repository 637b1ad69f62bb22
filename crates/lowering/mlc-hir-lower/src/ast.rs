//! The typed AST contract consumed from the typechecker (an external
//! collaborator, out of scope for this crate). Every node here already has
//! a resolved type (possibly `error`) and a well-formed span; HIR lowering
//! is purely a desugaring and restructuring pass over this shape, it never
//! re-derives types.

use mlc_intern::Symbol;
use mlc_span::FileSpan;
use mlc_ty::Type;

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone)]
pub enum Decl {
    Module { path: Vec<Symbol>, decls: Vec<Decl> },
    Function(Function),
    Struct(StructDecl),
    Interface(InterfaceDecl),
    Impl(ImplDecl),
    Enum(EnumDecl),
    Typedef { name: Symbol, target: Type, span: FileSpan },
    GlobalVar { name: Symbol, ty: Type, init: Option<Expr>, is_const: bool, span: FileSpan },
    Import { path: Vec<Symbol>, span: FileSpan },
    Use { path: Vec<Symbol>, span: FileSpan },
    ExternBlock { abi: Symbol, decls: Vec<Function>, span: FileSpan },
    /// A macro whose expansion the typechecker has already resolved to
    /// either a constant value or a lambda body.
    Macro(MacroDecl),
}

#[derive(Debug, Clone)]
pub enum MacroDecl {
    ConstInt { name: Symbol, value: i64, span: FileSpan },
    ConstString { name: Symbol, value: String, span: FileSpan },
    ConstBool { name: Symbol, value: bool, span: FileSpan },
    Lambda(Function),
}

#[derive(Debug, Clone)]
pub struct Function {
    /// Unqualified name; namespace qualification is carried separately in
    /// `namespace` so lowering can flatten `a::b::f` -> `a_b_f`.
    pub name: Symbol,
    pub namespace: Vec<Symbol>,
    pub params: Vec<(Symbol, Type)>,
    pub return_type: Type,
    pub generics: Vec<Symbol>,
    pub body: Option<Block>,
    pub is_export: bool,
    pub is_extern: bool,
    pub is_variadic: bool,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: Symbol,
    pub generics: Vec<Symbol>,
    pub fields: Vec<(Symbol, Type)>,
    pub auto_impls: Vec<Symbol>,
    pub has_default_ctor: bool,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: Symbol,
    pub generics: Vec<Symbol>,
    pub methods: Vec<(Symbol, Vec<(Symbol, Type)>, Type)>,
    pub span: FileSpan,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImplKind {
    Method,
    Operator(OperatorKind),
    Constructor,
    Destructor,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OperatorKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl OperatorKind {
    #[must_use]
    pub const fn mangled_suffix(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImplFunction {
    pub kind: ImplKind,
    pub function: Function,
    /// Index for overloaded constructors: `Type__ctor`, `Type__ctor_1`, ...
    pub ctor_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ImplDecl {
    pub target_type: Symbol,
    pub interface: Option<Symbol>,
    pub generics: Vec<Symbol>,
    pub functions: Vec<ImplFunction>,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Symbol,
    pub variants: Vec<EnumVariantDecl>,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct EnumVariantDecl {
    pub name: Symbol,
    /// `None` means the variant's tag is assigned by declaration order.
    pub explicit_tag: Option<i64>,
    pub payload: Vec<Type>,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Block,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompoundOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Let { name: Symbol, ty: Type, init: Option<Expr>, is_const: bool, is_static: bool, is_move: bool },
    Assign { target: Expr, value: Expr },
    CompoundAssign { target: Expr, op: CompoundOp, value: Expr },
    Return(Option<Expr>),
    If { cond: Expr, then_branch: Block, else_branch: Option<Block> },
    While { cond: Expr, body: Block },
    For { init: Option<Box<Stmt>>, cond: Option<Expr>, update: Option<Expr>, body: Block },
    Loop { body: Block },
    Switch { discriminant: Expr, cases: Vec<SwitchCase>, default: Option<Block> },
    Break,
    Continue,
    Block(Block),
    Defer { body: Block },
    Asm { code: String, operands: Vec<(Symbol, String, Option<Expr>)>, clobbers: Vec<String>, is_must: bool },
    MustBlock { body: Block },
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Char(char),
    /// A raw source string, not yet scanned for `{...}` interpolation
    /// placeholders.
    String(String),
    Void,
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
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Box<Expr>>,
    pub body: Box<Expr>,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(Literal),
    EnumVariant { enum_name: Symbol, variant: Symbol },
    Variable(Symbol),
    Wildcard,
}

#[derive(Debug, Clone)]
pub struct FieldInit {
    pub field: Symbol,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(Symbol),
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Unary { op: UnOp, operand: Box<Expr> },
    Call { callee: Symbol, args: Vec<Expr>, is_indirect: bool },
    Index { object: Box<Expr>, index: Box<Expr> },
    Slice { object: Box<Expr>, start: Option<Box<Expr>>, end: Option<Box<Expr>>, step: Option<Box<Expr>> },
    /// Covers both field access (`args: None`) and method calls
    /// (`args: Some(..)`).
    Member { object: Box<Expr>, name: Symbol, args: Option<Vec<Expr>> },
    Ternary { cond: Box<Expr>, then_branch: Box<Expr>, else_branch: Box<Expr> },
    Match { scrutinee: Box<Expr>, arms: Vec<MatchArm> },
    StructLiteral { struct_name: Symbol, fields: Vec<FieldInit> },
    ArrayLiteral { elements: Vec<Expr> },
    Cast { operand: Box<Expr>, target: Type },
    SizeOf(Type),
    AlignOf(Type),
    TypeNameOf(Type),
    TypeOf(Box<Expr>),
    Lambda { params: Vec<(Symbol, Type)>, return_type: Type, body: Box<Block> },
}
