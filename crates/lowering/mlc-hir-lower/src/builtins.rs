//! Fixed dispatch tables for the method calls and bare identifiers that
//! lowering rewrites into runtime-library builtin calls.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReceiverKind {
    Array,
    Slice,
    String,
}

/// Method calls on arrays/slices/strings that rewrite to a runtime builtin.
/// Returns the builtin's symbol name; the caller is responsible for
/// prepending the receiver (and, for arrays, its element size/length) to
/// the argument list per spec §4.2.
#[must_use]
pub fn rewrite_method_name(receiver: ReceiverKind, method: &str) -> Option<&'static str> {
    match (receiver, method) {
        (ReceiverKind::Array | ReceiverKind::Slice, "forEach") => Some("__builtin_array_forEach_i32"),
        (ReceiverKind::Array | ReceiverKind::Slice, "reduce") => Some("__builtin_array_reduce_i32"),
        (ReceiverKind::Array | ReceiverKind::Slice, "some") => Some("__builtin_array_some_i32"),
        (ReceiverKind::Array | ReceiverKind::Slice, "every") => Some("__builtin_array_every_i32"),
        (ReceiverKind::Array | ReceiverKind::Slice, "findIndex") => Some("__builtin_array_findIndex_i32"),
        (ReceiverKind::Array | ReceiverKind::Slice, "indexOf") => Some("__builtin_array_indexOf_i32"),
        (ReceiverKind::Array | ReceiverKind::Slice, "includes") => Some("__builtin_array_includes_i32"),
        (ReceiverKind::Array | ReceiverKind::Slice, "push") => Some("cm_slice_push_i32"),
        (ReceiverKind::Array | ReceiverKind::Slice, "pop") => Some("cm_slice_pop_i32"),
        (ReceiverKind::Array | ReceiverKind::Slice, "delete") => Some("cm_slice_delete"),
        (ReceiverKind::Array | ReceiverKind::Slice, "clear") => Some("cm_slice_clear"),
        (ReceiverKind::Array | ReceiverKind::Slice, "len") => Some("cm_slice_len"),
        (ReceiverKind::Array | ReceiverKind::Slice, "cap") => Some("cm_slice_cap"),
        (ReceiverKind::String, "len") => Some("__builtin_string_len"),
        (ReceiverKind::String, "charAt") => Some("__builtin_string_charAt"),
        (ReceiverKind::String, "substring") => Some("__builtin_string_substring"),
        (ReceiverKind::String, "indexOf") => Some("__builtin_string_indexOf"),
        (ReceiverKind::String, "toUpperCase") => Some("__builtin_string_toUpperCase"),
        (ReceiverKind::String, "toLowerCase") => Some("__builtin_string_toLowerCase"),
        (ReceiverKind::String, "trim") => Some("__builtin_string_trim"),
        (ReceiverKind::String, "startsWith") => Some("__builtin_string_startsWith"),
        (ReceiverKind::String, "endsWith") => Some("__builtin_string_endsWith"),
        (ReceiverKind::String, "includes") => Some("__builtin_string_includes"),
        (ReceiverKind::String, "repeat") => Some("__builtin_string_repeat"),
        (ReceiverKind::String, "replace") => Some("__builtin_string_replace"),
        _ => None,
    }
}

/// Width-tagged slice-push/pop runtime symbol for a given element type
/// name, e.g. `i8`, `i32`, `f64`, `ptr`, `slice`.
#[must_use]
pub fn slice_push_symbol(elem_width_tag: &str) -> String {
    format!("cm_slice_push_{elem_width_tag}")
}

#[must_use]
pub fn slice_pop_symbol(elem_width_tag: &str) -> String {
    format!("cm_slice_pop_{elem_width_tag}")
}

/// Fixed identifiers intercepted before ordinary call-lowering.
pub const INTERCEPTED_CALLS: &[&str] = &[
    "println",
    "print",
    "__builtin_array_slice",
    "cm_array_equal",
    "cm_println_format",
    "cm_print_format",
    "__builtin_slice_len",
    "__builtin_slice_cap",
    "__builtin_slice_push",
    "__builtin_slice_pop",
    "__builtin_slice_delete",
    "__builtin_slice_clear",
];

#[must_use]
pub fn is_intercepted_call(name: &str) -> bool {
    INTERCEPTED_CALLS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::{rewrite_method_name, ReceiverKind};

    #[test]
    fn rewrites_string_method() {
        assert_eq!(
            rewrite_method_name(ReceiverKind::String, "toUpperCase"),
            Some("__builtin_string_toUpperCase")
        );
    }

    #[test]
    fn unrecognized_method_returns_none() {
        assert_eq!(rewrite_method_name(ReceiverKind::String, "frobnicate"), None);
    }
}
