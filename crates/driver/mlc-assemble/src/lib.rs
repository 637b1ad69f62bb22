//! The pipeline driver: wires HIR lowering, MIR lowering, and
//! monomorphization into one `assemble_program` call, runs the
//! post-monomorphization structural verification pass, and is the only
//! crate in this workspace that installs a `tracing` subscriber.

pub mod config;
pub mod verify;

use anyhow::{bail, Context, Result};
use mlc_diag::Diagnostics;
use mlc_intern::Interner;
use mlc_mir::Program as MirProgram;

pub use config::{PipelineConfig, RuntimeSymbols};

/// Installs a `tracing-subscriber` reading its filter from `RUST_LOG`
/// (`EnvFilter`), defaulting to `warn` when unset. Library crates in this
/// workspace only ever depend on `tracing`'s facade; wiring up a concrete
/// subscriber implementation is this crate's job alone, and an embedding
/// backend that already owns a subscriber should skip this and install its
/// own instead.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    drop(tracing_subscriber::fmt().with_env_filter(filter).try_init());
}

/// Runs HIR lowering, MIR lowering, and monomorphization over a typed AST,
/// then verifies the result's structural invariants. Returns the finished
/// MIR program the backend consumes, or an error carrying whichever stage
/// failed: lowering errors are recoverable and only ever reach here as
/// diagnostics (never an `Err`), so an `Err` here always means the
/// post-monomorphization verification pass caught an internal invariant
/// violation.
pub fn assemble_program(
    ast_program: &mlc_hir_lower::ast::Program,
    interner: &Interner,
    diagnostics: &mut Diagnostics,
    config: &PipelineConfig,
) -> Result<MirProgram> {
    let hir_program = mlc_hir_lower::lower_program(ast_program, interner, diagnostics);
    let mir_program = mir_from_hir(&hir_program, interner, diagnostics, config);
    verify::verify_program(&mir_program, &config.runtime_symbol_table, interner).context("post-monomorphization verification failed")?;
    if diagnostics.has_errors() {
        bail!("lowering reported {} recoverable error(s)", diagnostics.entries().iter().filter(|entry| entry.severity == mlc_diag::Severity::Error).count());
    }
    Ok(mir_program)
}

/// The HIR-to-MIR leg alone: MIR lowering followed by monomorphization.
/// Exposed separately from [`assemble_program`] so a caller that already
/// holds a [`mlc_hir::Program`] (as opposed to a typed AST) can drive just
/// this half of the pipeline.
#[must_use]
pub fn mir_from_hir(hir_program: &mlc_hir::Program, interner: &Interner, diagnostics: &mut Diagnostics, config: &PipelineConfig) -> MirProgram {
    let _ = config.check_enum_tag_collisions; // enforced during HIR lowering's enum-collection pass
    let mir_program = mlc_mir_lower::lower_program(hir_program, interner, diagnostics);
    mlc_mono::monomorphize_program(hir_program, mir_program, interner, diagnostics)
}

#[cfg(test)]
mod tests {
    use mlc_diag::Diagnostics;
    use mlc_intern::Interner;

    use super::{mir_from_hir, PipelineConfig};

    #[test]
    fn empty_program_assembles_to_an_empty_mir_program() {
        let interner = Interner::new();
        let mut diagnostics = Diagnostics::new();
        let hir_program = mlc_hir::Program::default();
        let config = PipelineConfig::default();
        let mir_program = mir_from_hir(&hir_program, &interner, &mut diagnostics, &config);
        assert!(mir_program.functions.is_empty());
        assert!(!diagnostics.has_errors());
    }
}
