use std::io::{BufRead, Write};

use crate::error::ConfigError;

/// A well-known JWST pointing that can be selected by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub key: &'static str,
    /// Catalog name sent to the archive name resolver
    pub name: &'static str,
    pub description: &'static str,
}

pub const DEFAULT_TARGET_KEY: &str = "SMACS";

pub const TARGETS: [Target; 8] = [
    Target {
        key: "SMACS",
        name: "SMACS J0723.3-7327",
        description: "Galaxy cluster SMACS 0723",
    },
    Target {
        key: "CARINA",
        name: "NGC 3372",
        description: "Carina Nebula",
    },
    Target {
        key: "CARTWHEEL",
        name: "ESO 350-40",
        description: "Cartwheel Galaxy",
    },
    Target {
        key: "PILLARS",
        name: "M16",
        description: "Pillars of Creation in Eagle Nebula",
    },
    Target {
        key: "STEPHAN",
        name: "Stephan's Quintet",
        description: "Compact galaxy group HCG 92",
    },
    Target {
        key: "SOUTHERN",
        name: "NGC 7469",
        description: "Southern Ring Nebula",
    },
    Target {
        key: "ORION",
        name: "NGC 1976",
        description: "Orion Nebula",
    },
    Target {
        key: "PANDORA",
        name: "Pandora Cluster",
        description: "Abell 2744 galaxy cluster",
    },
];

fn target_keys() -> String {
    TARGETS.iter().map(|t| t.key).collect::<Vec<_>>().join("/")
}

/// Look up a target by key, case-insensitive. Blank input selects the default.
pub fn find_target(key: &str) -> Result<&'static Target, ConfigError> {
    let key = key.trim();
    let key = if key.is_empty() { DEFAULT_TARGET_KEY } else { key };

    TARGETS
        .iter()
        .find(|t| t.key.eq_ignore_ascii_case(key))
        .ok_or_else(|| ConfigError::UnknownTarget(key.to_string(), target_keys()))
}

/// List the available targets and read a selection from `input`
pub fn prompt_for_target<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<&'static Target> {
    writeln!(output, "Available targets:")?;
    for target in &TARGETS {
        writeln!(output, "{}: {}", target.key, target.description)?;
    }
    write!(
        output,
        "Select target ({}) [default={}]: ",
        target_keys(),
        DEFAULT_TARGET_KEY
    )?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    Ok(find_target(&line)?)
}
