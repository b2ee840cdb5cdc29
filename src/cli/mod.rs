pub mod doctor;
pub mod re_embed;
pub mod recommend;

use indicatif::ProgressStyle;

/// Bar style shared by long-running commands.
fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}
