use crate::Result;
use crate::utils;

/// Builds every demo under `demos/`.
///
/// # Errors
///
/// Returns an error if any demo fails to build.
pub fn build_demos() -> Result<()> {
    utils::print_header("Building demos...");

    let demos = utils::get_demos()?;

    if demos.is_empty() {
        utils::print_warning("⚠ No demos found");
        return Ok(());
    }

    for demo in demos {
        utils::print_step("Building", &demo);

        if let Err(err) = utils::run_cargo(&demo, &["build"]) {
            utils::print_step_error(&format!("✗ Failed to build {demo}"));
            return Err(err);
        }

        utils::print_step_success(&demo);
    }

    utils::print_success("✓ All demos built successfully!");
    Ok(())
}
