//! Case instantiation: one substituted copy of every template per case.
//!
//! All template sources are loaded before the first file is written, so a
//! missing template aborts the run with the output directory untouched.
//! Once writing starts, a failure only marks the affected case.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::CoreError;
use crate::naming::{
    case_file_name, case_identifier, derived_file_name, normalize_path, split_display_name,
};
use crate::params::ParameterTable;
use crate::rules::ReplacementRuleSet;
use crate::substitution::{self, CaseContext};
use crate::template::{TemplateDescriptor, TemplateRole, CASE_TEMPLATE_FILE, TEMPLATE_PREFIX};

/// A file written by the instantiator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub role: TemplateRole,
    pub case_id: String,
}

/// A file that could not be written for one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseFailure {
    pub case_id: String,
    pub role: TemplateRole,
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of one instantiation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstantiationReport {
    /// Number of cases the parameter table resolved to.
    pub case_count: usize,
    /// Written files, in ascending case order and template order within a case.
    pub generated: Vec<GeneratedFile>,
    pub failures: Vec<CaseFailure>,
}

impl InstantiationReport {
    /// Generated files of `role`, in case order.
    pub fn files(&self, role: TemplateRole) -> impl Iterator<Item = &GeneratedFile> {
        self.generated.iter().filter(move |f| f.role == role)
    }

    /// Matched `(case files, macro files)` for every case that produced both
    /// and had no write failure.
    ///
    /// Both lists always have the same length.
    pub fn execution_pairs(&self) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let failed: HashSet<&str> = self.failures.iter().map(|f| f.case_id.as_str()).collect();

        let mut cases = Vec::new();
        let mut macros = Vec::new();
        for case_file in self.files(TemplateRole::Case) {
            if failed.contains(case_file.case_id.as_str()) {
                continue;
            }
            let macro_file = self
                .files(TemplateRole::Macro)
                .find(|m| m.case_id == case_file.case_id);
            if let Some(macro_file) = macro_file {
                cases.push(case_file.path.clone());
                macros.push(macro_file.path.clone());
            }
        }
        (cases, macros)
    }

    /// Identifiers of cases with at least one write failure.
    pub fn failed_cases(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.failures.iter().map(|f| f.case_id.as_str()).collect();
        ids.dedup();
        ids
    }
}

/// Template content as loaded from disk.
///
/// Non-UTF-8 templates (binary case files) are copied verbatim.
enum TemplateSource {
    Text(String),
    Binary(Vec<u8>),
}

/// Writes instantiated templates into one output directory.
pub struct CaseInstantiator {
    output_dir: PathBuf,
}

impl CaseInstantiator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory if needed and return its absolute path.
    ///
    /// The path is made absolute without resolving symlinks, so Windows
    /// paths keep their drive form (`C:\...`) instead of the verbatim
    /// `\\?\` prefix.
    pub fn prepare_output_dir(&self) -> Result<PathBuf, CoreError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| CoreError::io(&self.output_dir, e))?;
        std::path::absolute(&self.output_dir).map_err(|e| CoreError::io(&self.output_dir, e))
    }

    /// Generate one copy of every template in `templates` per case.
    pub fn instantiate(
        &self,
        templates: &[TemplateDescriptor],
        params: &ParameterTable,
        rules: &ReplacementRuleSet,
    ) -> Result<InstantiationReport, CoreError> {
        let case_count = params.validate()?;
        let sources = load_sources(templates)?;
        let output_dir = self.prepare_output_dir()?;

        let case_ext = templates
            .iter()
            .find(|t| t.role == TemplateRole::Case)
            .map(|t| t.extension().to_string())
            .unwrap_or_else(|| default_case_extension().to_string());

        let mut report = InstantiationReport {
            case_count,
            ..Default::default()
        };

        for case_index in 0..case_count {
            let case_id = case_identifier(case_index, case_count);
            let save_path = normalize_path(&output_dir.join(case_file_name(&case_id, &case_ext)));

            for (template, source) in templates.iter().zip(&sources) {
                let file_name = output_file_name(template, &case_id);
                let path = output_dir.join(&file_name);
                let output_stem = split_display_name(&file_name).0;

                let ctx = CaseContext {
                    case_index,
                    case_id: &case_id,
                    output_stem,
                    save_path: &save_path,
                };

                let written = match source {
                    TemplateSource::Text(content) => std::fs::write(
                        &path,
                        substitution::render(content, template, &ctx, params, rules),
                    ),
                    TemplateSource::Binary(bytes) => std::fs::write(&path, bytes),
                };

                match written {
                    Ok(()) => report.generated.push(GeneratedFile {
                        path,
                        role: template.role,
                        case_id: case_id.clone(),
                    }),
                    Err(e) => report.failures.push(CaseFailure {
                        case_id: case_id.clone(),
                        role: template.role,
                        path,
                        error: e.to_string(),
                    }),
                }
            }
        }

        Ok(report)
    }
}

/// Output filename for `template` in case `case_id`.
pub fn output_file_name(template: &TemplateDescriptor, case_id: &str) -> String {
    match template.role {
        TemplateRole::Case => case_file_name(case_id, template.extension()),
        TemplateRole::Macro | TemplateRole::Auxiliary => {
            derived_file_name(&template.display_name, case_id)
        }
    }
}

fn default_case_extension() -> &'static str {
    let display = CASE_TEMPLATE_FILE
        .strip_prefix(TEMPLATE_PREFIX)
        .unwrap_or(CASE_TEMPLATE_FILE);
    split_display_name(display).1
}

fn load_sources(templates: &[TemplateDescriptor]) -> Result<Vec<TemplateSource>, CoreError> {
    templates
        .iter()
        .map(|template| {
            let bytes = std::fs::read(&template.source_path).map_err(|e| {
                if template.role.is_required() {
                    CoreError::MissingTemplate {
                        display_name: template.display_name.clone(),
                        path: template.source_path.clone(),
                    }
                } else {
                    CoreError::io(&template.source_path, e)
                }
            })?;
            Ok(match String::from_utf8(bytes) {
                Ok(text) => TemplateSource::Text(text),
                Err(e) => TemplateSource::Binary(e.into_bytes()),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::params::CellValue;
    use crate::template::MACRO_TEMPLATE_FILE;

    fn write_template(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).expect("write template");
        path
    }

    fn required(dir: &Path, case_body: &str, macro_body: &str) -> Vec<TemplateDescriptor> {
        vec![
            TemplateDescriptor::new(
                TemplateRole::Case,
                write_template(dir, CASE_TEMPLATE_FILE, case_body),
            ),
            TemplateDescriptor::new(
                TemplateRole::Macro,
                write_template(dir, MACRO_TEMPLATE_FILE, macro_body),
            ),
        ]
    }

    fn temps(values: &[i64]) -> ParameterTable {
        let mut t = ParameterTable::new();
        t.insert("T", values.iter().copied().map(CellValue::Int).collect());
        t
    }

    #[test]
    fn output_names_by_role() {
        let case = TemplateDescriptor::new(TemplateRole::Case, "template_Case.sim");
        let mac = TemplateDescriptor::new(TemplateRole::Macro, "template_Macro.java");
        let aux = TemplateDescriptor::new(TemplateRole::Auxiliary, "template_Report.txt");
        assert_eq!(output_file_name(&case, "Case1"), "Case1.sim");
        assert_eq!(output_file_name(&mac, "Case1"), "Macro_Case1.java");
        assert_eq!(output_file_name(&aux, "Case01"), "Report_Case01.txt");
    }

    #[test]
    fn default_case_extension_is_sim() {
        assert_eq!(default_case_extension(), "sim");
    }

    #[test]
    fn generates_pairs_in_case_order() {
        let src = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        let templates = required(src.path(), "t = T", "CaseName");

        let report = CaseInstantiator::new(out.path())
            .instantiate(&templates, &temps(&[1, 2, 3]), &ReplacementRuleSet::default())
            .expect("instantiate");

        assert_eq!(report.case_count, 3);
        assert!(report.failures.is_empty());
        let ids: Vec<&str> = report
            .files(TemplateRole::Case)
            .map(|f| f.case_id.as_str())
            .collect();
        assert_eq!(ids, vec!["Case1", "Case2", "Case3"]);

        let (cases, macros) = report.execution_pairs();
        assert_eq!(cases.len(), macros.len());
        assert_eq!(cases.len(), 3);
        assert!(macros[2].ends_with("Macro_Case3.java"));
        assert_eq!(
            std::fs::read_to_string(&cases[1]).expect("read"),
            "t = 2"
        );
    }

    #[test]
    fn missing_required_template_writes_nothing() {
        let src = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        let out_dir = out.path().join("cases");
        let templates = vec![
            TemplateDescriptor::new(
                TemplateRole::Case,
                write_template(src.path(), CASE_TEMPLATE_FILE, "x"),
            ),
            TemplateDescriptor::new(TemplateRole::Macro, src.path().join(MACRO_TEMPLATE_FILE)),
        ];

        let err = CaseInstantiator::new(&out_dir)
            .instantiate(&templates, &temps(&[1]), &ReplacementRuleSet::default())
            .expect_err("missing macro");

        assert_matches!(err, CoreError::MissingTemplate { .. });
        assert!(!out_dir.exists());
    }

    #[test]
    fn empty_table_is_rejected() {
        let src = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        let templates = required(src.path(), "x", "y");

        let err = CaseInstantiator::new(out.path())
            .instantiate(&templates, &ParameterTable::new(), &ReplacementRuleSet::default())
            .expect_err("empty table");
        assert_matches!(err, CoreError::Validation(_));
    }

    #[test]
    fn creates_nested_output_dir() {
        let src = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        let nested = out.path().join("a").join("b");
        let templates = required(src.path(), "x", "y");

        let instantiator = CaseInstantiator::new(&nested);
        instantiator
            .instantiate(&templates, &temps(&[1]), &ReplacementRuleSet::default())
            .expect("first run");
        instantiator
            .instantiate(&templates, &temps(&[1]), &ReplacementRuleSet::default())
            .expect("second run over existing dir");
        assert!(nested.join("Case1.sim").is_file());
    }

    #[test]
    fn binary_template_copied_verbatim() {
        let src = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        let bytes: Vec<u8> = vec![0xff, 0xfe, b'T', 0x00, b'C'];
        let case_path = src.path().join(CASE_TEMPLATE_FILE);
        std::fs::write(&case_path, &bytes).expect("write binary");
        let templates = vec![
            TemplateDescriptor::new(TemplateRole::Case, case_path),
            TemplateDescriptor::new(
                TemplateRole::Macro,
                write_template(src.path(), MACRO_TEMPLATE_FILE, "T"),
            ),
        ];

        CaseInstantiator::new(out.path())
            .instantiate(&templates, &temps(&[9]), &ReplacementRuleSet::default())
            .expect("instantiate");

        assert_eq!(std::fs::read(out.path().join("Case1.sim")).expect("read"), bytes);
        assert_eq!(
            std::fs::read_to_string(out.path().join("Macro_Case1.java")).expect("read"),
            "9"
        );
    }

    #[test]
    fn save_path_is_plain_absolute() {
        let src = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        let templates = required(src.path(), "x", "SavePath");

        CaseInstantiator::new(out.path())
            .instantiate(&templates, &temps(&[1]), &ReplacementRuleSet::default())
            .expect("instantiate");

        let save_path =
            std::fs::read_to_string(out.path().join("Macro_Case1.java")).expect("read");
        assert!(!save_path.starts_with("//?/"), "verbatim prefix in {save_path}");
        assert!(!save_path.contains('\\'));
        assert!(Path::new(&save_path).is_absolute());
        assert!(save_path.ends_with("/Case1.sim"));
        assert_eq!(
            save_path,
            normalize_path(
                &std::path::absolute(out.path())
                    .expect("absolute")
                    .join("Case1.sim")
            )
        );
    }

    #[test]
    fn write_failure_marks_only_that_case() {
        let src = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        let templates = required(src.path(), "x", "y");
        // A directory squatting on Case2's macro filename makes that write fail.
        std::fs::create_dir(out.path().join("Macro_Case2.java")).expect("mkdir");

        let report = CaseInstantiator::new(out.path())
            .instantiate(&templates, &temps(&[1, 2, 3]), &ReplacementRuleSet::default())
            .expect("instantiate");

        assert_eq!(report.failed_cases(), vec!["Case2"]);
        let (cases, macros) = report.execution_pairs();
        assert_eq!(cases.len(), 2);
        assert_eq!(macros.len(), 2);
        assert!(cases.iter().all(|c| !c.ends_with("Case2.sim")));
        assert!(out.path().join("Case3.sim").is_file());
    }
}
