//! Top-level HIR declarations.

use mlc_intern::Symbol;
use mlc_span::FileSpan;
use mlc_ty::Type;

use crate::stmt::Block;

/// One top-level declaration in a HIR [`crate::Program`].
#[derive(Debug, Clone)]
pub enum Decl {
    Function(Function),
    Struct(Struct),
    Interface(Interface),
    Impl(Impl),
    Enum(Enum),
    Typedef { name: Symbol, target: Type, span: FileSpan },
    GlobalVar(GlobalVar),
    Import(Import),
    ExternBlock(ExternBlock),
}

#[derive(Debug, Clone)]
pub struct Function {
    /// Already namespace-flattened, e.g. `a::b::f` -> `a_b_f`, and, for impl
    /// methods, mangled as `Type__method` by impl-block lowering.
    pub name: Symbol,
    pub params: Vec<Param>,
    pub return_type: Type,
    pub generics: Vec<Symbol>,
    pub body: Option<Block>,
    pub is_export: bool,
    pub is_extern: bool,
    pub is_variadic: bool,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Symbol,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Struct {
    pub name: Symbol,
    pub generics: Vec<Symbol>,
    pub fields: Vec<Param>,
    /// Auto-derived trait impls this struct is declared with, e.g. `Eq`,
    /// `Ord`. `is_css` (copyable-struct-storage) is true iff this list
    /// contains only auto impls that don't require a user destructor.
    pub auto_impls: Vec<Symbol>,
    pub span: FileSpan,
}

impl Struct {
    /// True when this struct needs no per-instance destructor call: it has
    /// no auto-derived impl that requires field-by-field teardown.
    #[must_use]
    pub fn is_css(&self, drop_marker: Symbol) -> bool {
        !self.auto_impls.contains(&drop_marker)
    }
}

#[derive(Debug, Clone)]
pub struct Interface {
    pub name: Symbol,
    pub generics: Vec<Symbol>,
    /// Method signatures in declaration order; this order is the vtable
    /// layout convention used by interface dispatch.
    pub methods: Vec<InterfaceMethod>,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct InterfaceMethod {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub return_type: Type,
}

/// An `impl` block, already split by lowering into its constituent pieces:
/// methods (`Type__method`), operator overloads (`Type__op_<opcode>`),
/// constructors (`Type__ctor`, `Type__ctor_N`), and the destructor
/// (`Type__dtor`) all show up as ordinary [`Function`] declarations with
/// the mangled names baked in; this node only records which interface (if
/// any) the impl satisfies, for vtable construction.
#[derive(Debug, Clone)]
pub struct Impl {
    pub target_type: Symbol,
    pub interface: Option<Symbol>,
    pub generics: Vec<Symbol>,
    pub methods: Vec<Function>,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct Enum {
    pub name: Symbol,
    pub variants: Vec<EnumVariant>,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: Symbol,
    pub tag: i64,
    pub payload: Vec<Type>,
}

#[derive(Debug, Clone)]
pub struct GlobalVar {
    pub name: Symbol,
    pub ty: Type,
    pub init: Option<crate::expr::Expr>,
    pub is_const: bool,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub path: Vec<Symbol>,
    /// Alias this import is registered under, for builtin std-lib rewrites
    /// such as `std::io::println` -> `__println__`.
    pub alias_target: Option<Symbol>,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct ExternBlock {
    pub abi: Symbol,
    pub decls: Vec<Function>,
    pub span: FileSpan,
}
