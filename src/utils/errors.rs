//! User-Friendly Error Formatting
//!
//! Provides user-friendly error messages with troubleshooting hints
//! for common error scenarios.

use std::fmt::Write;

use crate::multimon::MultiMonitorError;
use crate::splits::{NotationError, StoreError};
use crate::topology::SourceError;

/// Kind of failure, picked from the error chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Store,
    Notation,
    Topology,
    Config,
    Generic,
}

fn categorize(error: &anyhow::Error) -> Category {
    for cause in error.chain() {
        if cause.is::<StoreError>() {
            return Category::Store;
        }
        if cause.is::<NotationError>() {
            return Category::Notation;
        }
        if cause.is::<SourceError>() || cause.is::<MultiMonitorError>() {
            return Category::Topology;
        }
        if cause.is::<toml::de::Error>() {
            return Category::Config;
        }
    }

    if error.to_string().contains("config") {
        Category::Config
    } else {
        Category::Generic
    }
}

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    match categorize(error) {
        Category::Store => format_store_error(&mut output),
        Category::Notation => format_notation_error(&mut output),
        Category::Topology => format_topology_error(&mut output),
        Category::Config => format_config_error(&mut output),
        Category::Generic => format_generic_error(&mut output, &error.to_string()),
    }

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();

    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(
        &mut output,
        "  - Run with --verbose for detailed logs: splitrandr -vv <command>"
    )
    .ok();
    writeln!(
        &mut output,
        "  - Inspect the stored configuration: splitrandr dump-config"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn format_store_error(output: &mut String) {
    writeln!(output, "Split Configuration Store Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not read or write the split configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. File or directory not writable").ok();
    writeln!(output, "     → Check permissions of ~/.config/fakexrandr.bin").ok();
    writeln!(output, "     → Use --store to point at another location").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Display name too long").ok();
    writeln!(output, "     → NAME is limited to 128 bytes").ok();
    writeln!(output).ok();
    writeln!(output, "  3. EDID fingerprint too long").ok();
    writeln!(output, "     → EDID is limited to 768 hex digits").ok();
}

fn format_notation_error(output: &mut String) {
    writeln!(output, "Configuration Input Error").ok();
    writeln!(output).ok();
    writeln!(output, "The configuration blocks could not be parsed.").ok();
    writeln!(output).ok();
    writeln!(output, "Expected Format (blocks separated by blank lines):").ok();
    writeln!(output).ok();
    writeln!(output, "  NAME=\"DP-1\"").ok();
    writeln!(output, "  EDID=00ffffffffffff00...").ok();
    writeln!(output, "  WIDTH=3360").ok();
    writeln!(output, "  HEIGHT=1050").ok();
    writeln!(output, "  SPLITS=\"V 1680 N N\"").ok();
    writeln!(output).ok();
    writeln!(output, "Splits:").ok();
    writeln!(output, "  N            → no split").ok();
    writeln!(output, "  H <y> A B    → A above B, cut at y pixels").ok();
    writeln!(output, "  V <x> A B    → A left of B, cut at x pixels").ok();
    writeln!(output).ok();
    writeln!(output, "  → Start from: splitrandr show-available --topology ...").ok();
}

fn format_topology_error(output: &mut String) {
    writeln!(output, "Display Topology Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not obtain the physical display topology.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Snapshot file missing or unreadable").ok();
    writeln!(output, "     → Check the path given to --topology").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Snapshot is not valid JSON").ok();
    writeln!(
        output,
        "     → Expected {{\"topology\": {{...}}, \"properties\": {{...}}}}"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  3. Property refers to an unknown output").ok();
    writeln!(output, "     → Property keys are output ids in decimal").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration File Error").ok();
    writeln!(output).ok();
    writeln!(output, "The configuration file could not be loaded.").ok();
    writeln!(output).ok();
    writeln!(output, "  → Check TOML syntax").ok();
    writeln!(output, "  → Known sections: [store], [synthesis], [logging]").ok();
    writeln!(output, "  → Omit the file to run with defaults").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "An error occurred:").ok();
    writeln!(output).ok();
    writeln!(output, "  {}", error).ok();
}
