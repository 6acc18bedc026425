use std::process::Command;

use anyhow::{Context, Result};

/// A `cargo check` invocation of one crate with one feature selection.
struct FeatureSet {
    package: &'static str,
    no_default: bool,
    features: &'static [&'static str],
}

const FEATURE_COMBINATIONS: &[FeatureSet] = &[
    FeatureSet { package: "chatline-common", no_default: false, features: &[] },
    FeatureSet { package: "chatline-common", no_default: true, features: &[] },
    FeatureSet { package: "chatline-common", no_default: true, features: &["test-utils"] },
    FeatureSet { package: "chatline-infra", no_default: false, features: &[] },
    FeatureSet { package: "chatline-infra", no_default: true, features: &[] },
];

impl FeatureSet {
    fn label(&self) -> String {
        let mut parts = Vec::new();
        parts.push(if self.no_default { "no-default" } else { "default" }.to_string());
        parts.extend(self.features.iter().map(ToString::to_string));
        format!("{} [{}]", self.package, parts.join(","))
    }
}

/// Check that every supported feature combination compiles.
pub fn test_feature_matrix() -> Result<()> {
    println!("Testing {} feature combinations...", FEATURE_COMBINATIONS.len());

    for (index, set) in FEATURE_COMBINATIONS.iter().enumerate() {
        let label = set.label();
        println!("\n[{}/{}] cargo check {label}", index + 1, FEATURE_COMBINATIONS.len());

        let mut command = Command::new("cargo");
        command.arg("check").arg("-p").arg(set.package).arg("--all-targets");

        if set.no_default {
            command.arg("--no-default-features");
        }
        if !set.features.is_empty() {
            command.arg("--features").arg(set.features.join(","));
        }

        let status =
            command.status().with_context(|| format!("Failed to run cargo check for '{label}'"))?;

        if !status.success() {
            anyhow::bail!("Feature combination '{label}' failed to compile");
        }

        println!("✅ {label} compiled successfully");
    }

    println!("\n✅ All {} feature combinations compile successfully!", FEATURE_COMBINATIONS.len());

    Ok(())
}
