//! Pipeline configuration: the toggles an embedder can set without forking
//! the crate. CLI/config-file parsing is out of scope; this is a plain
//! struct an embedding driver builds by hand.

/// The runtime library's symbol table, represented as data so a host can
/// remap names (e.g. for a different ABI or a test double) without forking
/// this crate.
#[derive(Debug, Clone)]
pub struct RuntimeSymbols {
    known: Vec<String>,
}

impl RuntimeSymbols {
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.known.iter().any(|candidate| candidate == name)
    }
}

impl Default for RuntimeSymbols {
    fn default() -> Self {
        let mut known: Vec<String> = [
            "cm_println_string", "cm_println_int", "cm_println_uint", "cm_println_double", "cm_println_bool", "cm_println_char",
            "cm_println_format", "cm_print_format", "cm_format_string", "cm_string_concat",
            "cm_int_to_string", "cm_uint_to_string", "cm_double_to_string", "cm_bool_to_string", "cm_char_to_string",
            "cm_slice_new", "cm_slice_delete", "cm_slice_clear", "cm_slice_len", "cm_slice_cap",
            "cm_array_to_slice", "cm_array_equal",
            "__builtin_array_slice", "__print__", "__println__",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();

        for width in ["i8", "i32", "i64", "f32", "f64", "ptr", "slice"] {
            known.push(format!("cm_slice_push_{width}"));
            known.push(format!("cm_slice_pop_{width}"));
            known.push(format!("cm_slice_get_{width}"));
        }
        for op in [
            "len", "charAt", "substring", "indexOf", "toUpperCase", "toLowerCase", "trim", "startsWith", "endsWith", "includes", "repeat", "replace",
        ] {
            known.push(format!("__builtin_string_{op}"));
        }
        for op in ["forEach", "reduce", "some", "every", "findIndex", "indexOf", "includes"] {
            known.push(format!("__builtin_array_{op}_i32"));
        }

        Self { known }
    }
}

/// Pipeline-wide behavior toggles.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Detect and report two enum variants sharing an explicit tag.
    pub check_enum_tag_collisions: bool,
    /// Always `true` in this reimplementation: a generic call site whose
    /// type arguments can't be inferred is a hard error, never a silent
    /// `int` default. Kept as a named field so an embedder can see the
    /// decision was made deliberately.
    pub hard_error_on_unresolved_generic: bool,
    pub runtime_symbol_table: RuntimeSymbols,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            check_enum_tag_collisions: true,
            hard_error_on_unresolved_generic: true,
            runtime_symbol_table: RuntimeSymbols::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RuntimeSymbols;

    #[test]
    fn recognizes_a_typed_println_symbol() {
        let table = RuntimeSymbols::default();
        assert!(table.contains("cm_println_int"));
        assert!(!table.contains("cm_nonexistent_symbol"));
    }
}
