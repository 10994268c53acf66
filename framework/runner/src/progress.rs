use indicatif::{ProgressBar, ProgressStyle};

/// A progress bar counting collected task results for one scenario.
///
/// Returns a hidden bar when progress output is disabled so callers never need to branch.
pub fn start_progress(scenario_name: &str, expected: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(expected);
    match ProgressStyle::with_template(
        "{spinner:.green} {prefix} [{wide_bar:.cyan/blue}] {pos}/{len} tasks [{elapsed_precise}]",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => log::warn!("Failed to set progress style: {e}"),
    }
    pb.set_prefix(scenario_name.to_string());
    pb
}
