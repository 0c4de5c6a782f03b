use crate::Result;
use crate::utils;

/// Cleans the workspace target directory and the one of every demo.
/// Failures to clean a demo are ignored.
///
/// # Errors
///
/// Returns an error if cleaning the workspace fails.
pub fn clean_all() -> Result<()> {
    utils::print_header("Cleaning all build artifacts...");

    utils::run_cargo(".", &["clean"])?;

    for demo in utils::get_demos()? {
        let _ = utils::run_cargo(&demo, &["clean"]);
    }

    utils::print_success("✓ All build artifacts cleaned!");
    Ok(())
}
