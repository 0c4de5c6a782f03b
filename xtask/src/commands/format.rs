use crate::Result;
use crate::utils;

fn all_projects() -> Result<Vec<String>> {
    let mut projects = utils::get_workspace_crates()?;
    projects.extend(utils::get_demos()?);

    Ok(projects)
}

/// # Errors
///
/// Returns an error if any project is not formatted.
pub fn check_formatting() -> Result<()> {
    utils::print_header("Checking code formatting for crates and demos...");

    for project in all_projects()? {
        utils::print_step("Checking format", &project);
        utils::run_cargo(&project, &["fmt", "--check"])?;
        utils::print_step_success(&project);
    }

    utils::print_success("✓ All formatting checks passed!");
    Ok(())
}

/// # Errors
///
/// Returns an error if `cargo fmt` fails on any project.
pub fn fix_formatting() -> Result<()> {
    utils::print_header("Fixing code formatting for crates and demos...");

    for project in all_projects()? {
        utils::print_step("Fixing format", &project);
        utils::run_cargo(&project, &["fmt"])?;
        utils::print_step_success(&project);
    }

    utils::print_success("✓ All formatting issues fixed!");
    Ok(())
}
