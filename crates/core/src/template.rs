//! Template descriptors and on-disk discovery.
//!
//! Templates live side by side in one directory and are recognised by the
//! `template_` filename prefix. Two of them are mandatory; every other
//! prefixed file is an optional auxiliary template.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::CoreError;
use crate::naming::split_display_name;

/// Filename prefix shared by every template.
pub const TEMPLATE_PREFIX: &str = "template_";

/// Filename of the mandatory case template.
pub const CASE_TEMPLATE_FILE: &str = "template_Case.sim";

/// Filename of the mandatory macro template.
pub const MACRO_TEMPLATE_FILE: &str = "template_Macro.java";

/// What a template produces and which substitution passes apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateRole {
    /// Simulation case file, one per case, consumed by the batch executor.
    Case,
    /// Macro driving the simulation tool, paired with the case file.
    Macro,
    /// Operator-supplied template, instantiated independently of execution.
    Auxiliary,
}

impl TemplateRole {
    pub fn is_required(self) -> bool {
        matches!(self, Self::Case | Self::Macro)
    }
}

/// A template file and the role it plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescriptor {
    pub role: TemplateRole,
    /// Filename with the `template_` prefix stripped, e.g. `Macro.java`.
    pub display_name: String,
    pub source_path: PathBuf,
}

impl TemplateDescriptor {
    /// Describe the template at `source_path`, deriving the display name
    /// from its filename.
    pub fn new(role: TemplateRole, source_path: impl Into<PathBuf>) -> Self {
        let source_path = source_path.into();
        let file_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let display_name = file_name
            .strip_prefix(TEMPLATE_PREFIX)
            .unwrap_or(&file_name)
            .to_string();
        Self {
            role,
            display_name,
            source_path,
        }
    }

    /// Display name without extension, e.g. `Macro`.
    pub fn base_name(&self) -> &str {
        split_display_name(&self.display_name).0
    }

    /// Display name extension without the dot, e.g. `java`.
    pub fn extension(&self) -> &str {
        split_display_name(&self.display_name).1
    }

    /// The literal a template uses to refer to itself, e.g. `template_Macro`.
    pub fn self_reference(&self) -> String {
        format!("{TEMPLATE_PREFIX}{}", self.base_name())
    }
}

/// The templates of one run.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub case: TemplateDescriptor,
    pub macro_template: TemplateDescriptor,
    pub auxiliary: Vec<TemplateDescriptor>,
}

impl TemplateSet {
    /// Locate every template in `dir`.
    ///
    /// Fails with [`CoreError::MissingTemplate`] when either required
    /// template is absent. Zero auxiliary templates is not an error.
    pub fn discover(dir: &Path) -> Result<Self, CoreError> {
        let [case, macro_template] = required_templates(dir)?;
        let auxiliary = discover_auxiliary(dir)?;
        Ok(Self {
            case,
            macro_template,
            auxiliary,
        })
    }

    /// The case and macro templates, in that order.
    pub fn required(&self) -> [TemplateDescriptor; 2] {
        [self.case.clone(), self.macro_template.clone()]
    }
}

/// Resolve the case and macro templates in `dir`.
pub fn required_templates(dir: &Path) -> Result<[TemplateDescriptor; 2], CoreError> {
    let case = required_template(dir, TemplateRole::Case, CASE_TEMPLATE_FILE)?;
    let macro_template = required_template(dir, TemplateRole::Macro, MACRO_TEMPLATE_FILE)?;
    Ok([case, macro_template])
}

fn required_template(
    dir: &Path,
    role: TemplateRole,
    file_name: &str,
) -> Result<TemplateDescriptor, CoreError> {
    let path = dir.join(file_name);
    let descriptor = TemplateDescriptor::new(role, &path);
    if !path.is_file() {
        return Err(CoreError::MissingTemplate {
            display_name: descriptor.display_name,
            path,
        });
    }
    Ok(descriptor)
}

/// Every regular `template_*` file in `dir` other than the required ones,
/// sorted by filename.
pub fn discover_auxiliary(dir: &Path) -> Result<Vec<TemplateDescriptor>, CoreError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(dir, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(TEMPLATE_PREFIX)
            || name == CASE_TEMPLATE_FILE
            || name == MACRO_TEMPLATE_FILE
        {
            continue;
        }
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|p| TemplateDescriptor::new(TemplateRole::Auxiliary, p))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
