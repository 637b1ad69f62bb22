//! The structural type model shared by HIR and MIR: immutable value terms
//! compared by structure, plus typedef/enum resolution and name mangling.

use std::fmt::Write as _;

use mlc_intern::{Interner, Symbol};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Primitive scalar kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Bool,
    Char,
    Tiny,
    Short,
    Int,
    Long,
    UTiny,
    UShort,
    UInt,
    ULong,
    Float,
    Double,
    String,
    Void,
    /// The well-formed placeholder type assigned to an ill-typed expression.
    Error,
}

impl Primitive {
    /// Size and alignment in bytes, both equal for every primitive here.
    #[must_use]
    pub const fn size_align(self) -> (u32, u32) {
        match self {
            Self::Bool | Self::Char | Self::Tiny | Self::UTiny => (1, 1),
            Self::Short | Self::UShort => (2, 2),
            Self::Int | Self::UInt | Self::Float => (4, 4),
            Self::Long | Self::ULong | Self::Double | Self::String => (8, 8),
            Self::Void | Self::Error => (0, 1),
        }
    }
}

/// A structural type term. Two `Type`s are equal iff they are structurally
/// identical; there is no nominal identity beyond struct/interface/generic
/// names, which are themselves compared by symbol equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Primitive(Primitive),
    Pointer(Box<Type>),
    /// `size = None` denotes a slice.
    Array { element: Box<Type>, size: Option<u64> },
    Function { params: Vec<Type>, return_type: Box<Type>, variadic: bool },
    Struct { name: Symbol, type_args: Vec<Type> },
    Interface(Symbol),
    Generic(Symbol),
    LiteralUnion(Vec<LiteralKind>),
}

/// The kind of a literal appearing in a `literal_union`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    Int,
    Float,
    Bool,
    Char,
    String,
}

impl LiteralKind {
    /// The dominant literal kind a `literal_union` collapses to: the widest
    /// numeric kind wins, otherwise the first non-numeric kind observed.
    #[must_use]
    pub fn dominant(kinds: &[Self]) -> Self {
        if kinds.contains(&Self::Float) {
            Self::Float
        } else if kinds.contains(&Self::Int) {
            Self::Int
        } else {
            kinds.first().copied().unwrap_or(Self::Int)
        }
    }

    #[must_use]
    pub const fn resolved_type(self) -> Type {
        match self {
            Self::Int => Type::Primitive(Primitive::Int),
            Self::Float => Type::Primitive(Primitive::Double),
            Self::Bool => Type::Primitive(Primitive::Bool),
            Self::Char => Type::Primitive(Primitive::Char),
            Self::String => Type::Primitive(Primitive::String),
        }
    }
}

/// Mangles an impl member onto its receiver type: `(Point, x)` -> `Point__x`.
/// The one place this `Type__member` convention is spelled out; impl-block
/// lowering, method-call lowering, and destructor/vtable lookups all route
/// through this instead of re-deriving the separator themselves.
#[must_use]
pub fn mangle_member(type_name: &str, member: &str) -> String {
    format!("{type_name}__{member}")
}

impl Type {
    /// Mangles a struct/generic instantiation name: `Pair<int,string>` ->
    /// `Pair__int__string`. Non-struct types mangle to their canonical
    /// source-like spelling so that generic names built from them compose
    /// the same way.
    #[must_use]
    pub fn mangled_name(&self, interner: &Interner) -> String {
        let mut out = String::new();
        self.write_mangled(interner, &mut out);
        out
    }

    fn write_mangled(&self, interner: &Interner, out: &mut String) {
        match self {
            Self::Primitive(primitive) => {
                let _ = write!(out, "{}", primitive_name(*primitive));
            }
            Self::Pointer(inner) => {
                out.push_str("ptr_");
                inner.write_mangled(interner, out);
            }
            Self::Array { element, size } => {
                out.push_str("arr_");
                element.write_mangled(interner, out);
                if let Some(size) = size {
                    let _ = write!(out, "_{size}");
                }
            }
            Self::Function { params, return_type, .. } => {
                out.push_str("fn_");
                for param in params {
                    param.write_mangled(interner, out);
                    out.push('_');
                }
                return_type.write_mangled(interner, out);
            }
            Self::Struct { name, type_args } => {
                out.push_str(&interner.resolve(name));
                for arg in type_args {
                    out.push_str("__");
                    arg.write_mangled(interner, out);
                }
            }
            Self::Interface(name) | Self::Generic(name) => {
                out.push_str(&interner.resolve(name));
            }
            Self::LiteralUnion(kinds) => {
                LiteralKind::dominant(kinds).resolved_type().write_mangled(interner, out);
            }
        }
    }

    /// Size and alignment in bytes, given a struct field-layout table.
    #[must_use]
    pub fn size_align(&self, structs: &FxHashMap<Symbol, Vec<Type>>) -> (u32, u32) {
        match self {
            Self::Primitive(primitive) => primitive.size_align(),
            Self::Pointer(_) | Self::Function { .. } => (8, 8),
            Self::Array { element, size: Some(count) } => {
                let (elem_size, elem_align) = element.size_align(structs);
                (elem_size * u32::try_from(*count).unwrap_or(u32::MAX), elem_align)
            }
            // A slice is represented as a fat {ptr, len} pair at runtime.
            Self::Array { size: None, .. } => (16, 8),
            Self::Struct { name, .. } => {
                let fields = structs.get(name).cloned().unwrap_or_default();
                let mut total = 0u32;
                let mut max_align = 1u32;
                for field in &fields {
                    let (field_size, field_align) = field.size_align(structs);
                    max_align = max_align.max(field_align);
                    total += field_size;
                }
                (total, max_align)
            }
            Self::Interface(_) => (16, 8), // fat pointer {data_ptr, vtable_ptr}
            Self::Generic(_) => (0, 1),
            Self::LiteralUnion(kinds) => {
                LiteralKind::dominant(kinds).resolved_type().size_align(structs)
            }
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Primitive(Primitive::Error))
    }
}

const fn primitive_name(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Bool => "bool",
        Primitive::Char => "char",
        Primitive::Tiny => "tiny",
        Primitive::Short => "short",
        Primitive::Int => "int",
        Primitive::Long => "long",
        Primitive::UTiny => "utiny",
        Primitive::UShort => "ushort",
        Primitive::UInt => "uint",
        Primitive::ULong => "ulong",
        Primitive::Float => "float",
        Primitive::Double => "double",
        Primitive::String => "string",
        Primitive::Void => "void",
        Primitive::Error => "error",
    }
}

/// Registered typedef aliases, resolved by repeated substitution.
#[derive(Debug, Default)]
pub struct TypedefTable {
    aliases: FxHashMap<Symbol, Type>,
}

impl TypedefTable {
    #[must_use]
    pub fn new() -> Self {
        Self { aliases: FxHashMap::default() }
    }

    pub fn register(&mut self, name: Symbol, target: Type) {
        self.aliases.insert(name, target);
    }

    /// Resolves `ty` to a non-alias type by recursive substitution.
    /// A typedef cycle resolves to `error` rather than looping forever.
    #[must_use]
    pub fn resolve(&self, ty: &Type) -> Type {
        self.resolve_bounded(ty, self.aliases.len() + 1)
    }

    fn resolve_bounded(&self, ty: &Type, fuel: usize) -> Type {
        if fuel == 0 {
            return Type::Primitive(Primitive::Error);
        }
        match ty {
            Type::Generic(name) => match self.aliases.get(name) {
                Some(target) => self.resolve_bounded(target, fuel - 1),
                None => ty.clone(),
            },
            Type::Pointer(inner) => {
                Type::Pointer(Box::new(self.resolve_bounded(inner, fuel - 1)))
            }
            Type::Array { element, size } => Type::Array {
                element: Box::new(self.resolve_bounded(element, fuel - 1)),
                size: *size,
            },
            other => other.clone(),
        }
    }
}

/// How an enum resolves in the MIR type model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumResolution {
    /// Enum has no payload-bearing variants: resolves to a plain `int`.
    Discriminant,
    /// At least one variant carries a payload: resolves to a synthetic
    /// `__TaggedUnion_<EnumName>` struct `{tag: int, payload: union}`.
    TaggedUnion { synthetic_name: String },
}

#[must_use]
pub fn resolve_enum(enum_name: &str, has_payload_variant: bool) -> EnumResolution {
    if has_payload_variant {
        EnumResolution::TaggedUnion { synthetic_name: format!("__TaggedUnion_{enum_name}") }
    } else {
        EnumResolution::Discriminant
    }
}
