use crate::Result;
use crate::utils;

/// Runs `cargo check` on the library crates (with and without the `log`
/// feature) and on every demo.
///
/// # Errors
///
/// Returns an error if discovery fails or any check fails.
pub fn check_all() -> Result<()> {
    utils::print_header("Checking workspace crates and demos...");

    for name in utils::get_library_crates()? {
        utils::print_step("Checking", &name);
        utils::run_cargo(&name, &["check", "--all-targets"])?;
        utils::run_cargo(&name, &["check", "--no-default-features"])?;
        utils::print_step_success(&name);
    }

    for demo in utils::get_demos()? {
        utils::print_step("Checking", &demo);
        utils::run_cargo(&demo, &["check"])?;
        utils::print_step_success(&demo);
    }

    utils::print_success("✓ All checks passed!");
    Ok(())
}
