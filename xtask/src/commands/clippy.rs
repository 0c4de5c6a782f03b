use crate::Result;
use crate::utils;

const LINTS: [&str; 5] = ["--", "-D", "clippy::all", "-D", "clippy::pedantic"];

/// Runs Clippy with `clippy::all` and `clippy::pedantic` denied on the
/// library crates (all features and no default features), `xtask` and every
/// demo.
///
/// # Errors
///
/// Returns an error if discovery fails or Clippy reports any issue.
pub fn run_clippy() -> Result<()> {
    utils::print_header("Running Clippy with strict linting on all code...");

    for name in utils::get_workspace_crates()? {
        for features in ["--all-features", "--no-default-features"] {
            utils::print_step("Clippy", &format!("{name} ({features})"));

            let mut args = vec!["clippy", features];
            args.extend_from_slice(&LINTS);

            if let Err(err) = utils::run_cargo(&name, &args) {
                utils::print_step_error(&format!("✗ Clippy found issues in {name}"));
                return Err(err);
            }
        }
        utils::print_step_success(&name);
    }

    for demo in utils::get_demos()? {
        utils::print_step("Clippy", &demo);

        let mut args = vec!["clippy"];
        args.extend_from_slice(&LINTS);
        utils::run_cargo(&demo, &args)?;

        utils::print_step_success(&demo);
    }

    utils::print_success("✓ All Clippy checks passed!");
    Ok(())
}
