//! Release notes composition
//!
//! Notes are a pure function of their inputs: a header picked by the beta
//! flag, the operator's custom text when it has any non-whitespace content,
//! and an integrity footer. Custom text is trusted operator input and is
//! inserted verbatim.

use serde::{Deserialize, Serialize};

/// Section templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesTemplates {
    pub beta_header: String,
    pub stable_header: String,
    /// Heading placed above the custom text
    pub custom_heading: String,
    /// Placeholders: `{sha256}`, `{run_url}`, `{checksum_file}`, `{attestation_file}`
    pub footer: String,
}

impl Default for NotesTemplates {
    fn default() -> Self {
        Self {
            beta_header: "## Beta Release\n\n\
                This is a pre-release build for testing. It may contain bugs or unfinished \
                features; please report any problems you run into."
                .to_string(),
            stable_header: "## Stable Release\n\nThis release is recommended for all users."
                .to_string(),
            custom_heading: "### What's Changed".to_string(),
            footer: "### Verify Your Download\n\n\
                **SHA256:** `{sha256}`\n\n\
                Compare against `{checksum_file}` and `{attestation_file}` attached to this release.\n\n\
                Build logs: {run_url}"
                .to_string(),
        }
    }
}

/// Everything the composer reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesInput<'a> {
    pub beta: bool,
    pub custom: &'a str,
    pub sha256: &'a str,
    pub run_url: &'a str,
    pub checksum_file: &'a str,
    pub attestation_file: &'a str,
}

/// Composed release notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseNotes {
    text: String,
}

impl ReleaseNotes {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Compose release notes
pub fn compose_notes(input: &NotesInput<'_>, templates: &NotesTemplates) -> ReleaseNotes {
    let header = if input.beta {
        &templates.beta_header
    } else {
        &templates.stable_header
    };

    let mut sections: Vec<String> = vec![header.trim_end().to_string()];

    if !input.custom.trim().is_empty() {
        sections.push(format!("{}\n\n{}", templates.custom_heading, input.custom));
    }

    let footer = templates
        .footer
        .replace("{sha256}", input.sha256)
        .replace("{run_url}", input.run_url)
        .replace("{checksum_file}", input.checksum_file)
        .replace("{attestation_file}", input.attestation_file);
    sections.push(footer);

    let mut text = sections.join("\n\n");
    if !text.ends_with('\n') {
        text.push('\n');
    }

    ReleaseNotes { text }
}
