use std::error::Error;
use vergen_git2::{BuildBuilder, CargoBuilder, Emitter, Git2Builder};

fn main() -> Result<(), Box<dyn Error>> {
    // Embedded migrations are read at compile time
    println!("cargo:rerun-if-changed=migrations");

    // Static musl builds need libpq compiled from source
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.contains("musl") && std::env::var_os("CARGO_FEATURE_BUNDLED_POSTGRES").is_none() {
        println!("cargo:warning=musl target without bundled-postgres; linking libpq will likely fail");
        println!("cargo:warning=Use: cargo build --features bundled-postgres");
    }

    emit_version_info()
}

/// Emit VERGEN_GIT_DESCRIBE and friends for `skycount --version`
///
/// Outside a git checkout vergen emits placeholder values instead of failing the build.
fn emit_version_info() -> Result<(), Box<dyn Error>> {
    let build = BuildBuilder::default().build_timestamp(true).build()?;
    let cargo = CargoBuilder::default().target_triple(true).build()?;
    let git = Git2Builder::default()
        .describe(true, true, None)
        .sha(true)
        .build()?;

    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&cargo)?
        .add_instructions(&git)?
        .emit()?;
    Ok(())
}
