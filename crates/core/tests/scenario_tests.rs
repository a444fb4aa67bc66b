//! End-to-end instantiation scenarios over real template directories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use simbatch_core::instantiate::CaseInstantiator;
use simbatch_core::naming::normalize_path;
use simbatch_core::params::{CellValue, ParameterTable};
use simbatch_core::rules::ReplacementRuleSet;
use simbatch_core::template::{TemplateRole, TemplateSet, CASE_TEMPLATE_FILE, MACRO_TEMPLATE_FILE};

const MACRO_TEMPLATE: &str = "\
// CaseName
String savePath = \"SavePath\";
String macroName = \"template_Macro\";
double temperature = T;
";

fn template_dir(case: &str, aux: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    std::fs::write(dir.path().join(CASE_TEMPLATE_FILE), case).expect("write case template");
    std::fs::write(dir.path().join(MACRO_TEMPLATE_FILE), MACRO_TEMPLATE)
        .expect("write macro template");
    for (name, content) in aux {
        std::fs::write(dir.path().join(name), content).expect("write auxiliary template");
    }
    dir
}

fn ints(values: &[i64]) -> Vec<CellValue> {
    values.iter().copied().map(CellValue::Int).collect()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read generated file")
}

fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    std::fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| {
            let path = entry.expect("dir entry").path();
            let bytes = std::fs::read(&path).expect("read file");
            (path, bytes)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Test: required templates for two temperatures
// ---------------------------------------------------------------------------

#[test]
fn two_temperatures_produce_paired_case_and_macro_files() {
    let templates_dir = template_dir("inlet_temperature = T", &[]);
    let out = tempfile::tempdir().expect("create output dir");
    let templates = TemplateSet::discover(templates_dir.path()).expect("discover");
    let mut params = ParameterTable::new();
    params.insert("T", ints(&[300, 350]));

    let report = CaseInstantiator::new(out.path())
        .instantiate(&templates.required(), &params, &ReplacementRuleSet::default())
        .expect("instantiate");

    assert_eq!(report.case_count, 2);
    assert!(report.failures.is_empty());
    assert_eq!(read(&out.path().join("Case1.sim")), "inlet_temperature = 300");
    assert_eq!(read(&out.path().join("Case2.sim")), "inlet_temperature = 350");

    // The parameter pass also runs over the substituted save path.
    let abs_out = std::path::absolute(out.path()).expect("absolute path");
    let save_path = normalize_path(&abs_out.join("Case1.sim")).replace('T', "300");
    let macro1 = read(&out.path().join("Macro_Case1.java"));
    assert_eq!(
        macro1,
        format!(
            "// Case1\nString savePath = \"{save_path}\";\n\
             String macroName = \"Macro_Case1\";\ndouble temperature = 300;\n"
        )
    );

    let (cases, macros) = report.execution_pairs();
    assert_eq!(cases.len(), 2);
    assert_eq!(macros.len(), 2);
    assert!(cases[0].ends_with("Case1.sim"));
    assert!(macros[0].ends_with("Macro_Case1.java"));
    assert!(cases[1].ends_with("Case2.sim"));
    assert!(macros[1].ends_with("Macro_Case2.java"));
}

// ---------------------------------------------------------------------------
// Test: auxiliary template with zero-padded identifiers
// ---------------------------------------------------------------------------

#[test]
fn auxiliary_report_uses_padded_identifier() {
    let templates_dir = template_dir(
        "",
        &[("template_Report.txt", "Case: CaseName\nFile: template_Report\n")],
    );
    let out = tempfile::tempdir().expect("create output dir");
    let templates = TemplateSet::discover(templates_dir.path()).expect("discover");
    let mut params = ParameterTable::new();
    params.insert("Velocity", ints(&(1..=12).collect::<Vec<_>>()));
    let rules = ReplacementRuleSet::with_overrides([("CaseName", "CASE_NUMBER")]);

    let report = CaseInstantiator::new(out.path())
        .instantiate(&templates.auxiliary, &params, &rules)
        .expect("instantiate");

    assert_eq!(report.case_count, 12);
    assert_eq!(report.files(TemplateRole::Auxiliary).count(), 12);
    assert_eq!(
        read(&out.path().join("Report_Case01.txt")),
        "Case: Case01\nFile: Report_Case01\n"
    );
    assert_eq!(
        read(&out.path().join("Report_Case12.txt")),
        "Case: Case12\nFile: Report_Case12\n"
    );
}

// ---------------------------------------------------------------------------
// Test: shortest column decides the case count
// ---------------------------------------------------------------------------

#[test]
fn shortest_column_truncates_cases() {
    let templates_dir = template_dir("A B C", &[]);
    let out = tempfile::tempdir().expect("create output dir");
    let templates = TemplateSet::discover(templates_dir.path()).expect("discover");
    let mut params = ParameterTable::new();
    params.insert("A", ints(&[1, 2, 3, 4, 5]));
    params.insert("B", ints(&[10, 20, 30]));
    params.insert("C", ints(&[100, 200, 300, 400, 500]));

    let report = CaseInstantiator::new(out.path())
        .instantiate(&templates.required(), &params, &ReplacementRuleSet::default())
        .expect("instantiate");

    assert_eq!(report.case_count, 3);
    let case_ids: Vec<&str> = report
        .files(TemplateRole::Case)
        .map(|f| f.case_id.as_str())
        .collect();
    assert_eq!(case_ids, vec!["Case1", "Case2", "Case3"]);
    assert_eq!(read(&out.path().join("Case3.sim")), "3 30 300");
    assert!(!out.path().join("Case4.sim").exists());
}

// ---------------------------------------------------------------------------
// Test: every placeholder is substituted
// ---------------------------------------------------------------------------

#[test]
fn no_placeholder_survives() {
    let templates_dir = template_dir(
        "inlet = INLET_TEMP\noutlet = OUTLET_P\nfluid = FLUID_NAME\n",
        &[],
    );
    let out = tempfile::tempdir().expect("create output dir");
    let templates = TemplateSet::discover(templates_dir.path()).expect("discover");
    let mut params = ParameterTable::new();
    params.insert("INLET_TEMP", ints(&[300, 310, 320]));
    params.insert(
        "OUTLET_P",
        vec![CellValue::Float(1.5), CellValue::Float(2.0), CellValue::Int(3)],
    );
    params.insert(
        "FLUID_NAME",
        ["water", "air", "oil"]
            .iter()
            .map(|s| CellValue::Text(s.to_string()))
            .collect(),
    );

    let report = CaseInstantiator::new(out.path())
        .instantiate(&templates.required(), &params, &ReplacementRuleSet::default())
        .expect("instantiate");

    for file in report.files(TemplateRole::Case) {
        let content = read(&file.path);
        for placeholder in params.placeholders() {
            assert!(
                !content.contains(placeholder),
                "{placeholder} left in {}",
                file.path.display()
            );
        }
    }
    assert_eq!(
        read(&out.path().join("Case2.sim")),
        "inlet = 310\noutlet = 2.0\nfluid = air\n"
    );
}

// ---------------------------------------------------------------------------
// Test: regeneration is byte-identical
// ---------------------------------------------------------------------------

#[test]
fn regeneration_is_byte_identical() {
    let templates_dir = template_dir(
        "T at CaseName",
        &[("template_Notes.md", "# CaseName\nT\n")],
    );
    let out = tempfile::tempdir().expect("create output dir");
    let output_dir = out.path().join("batch_cases");
    let templates = TemplateSet::discover(templates_dir.path()).expect("discover");
    let mut params = ParameterTable::new();
    params.insert("T", ints(&[280, 290, 300]));
    let rules = ReplacementRuleSet::default();

    let mut all = templates.required().to_vec();
    all.extend(templates.auxiliary.iter().cloned());

    let instantiator = CaseInstantiator::new(&output_dir);
    instantiator
        .instantiate(&all, &params, &rules)
        .expect("first run");
    let first = snapshot(&output_dir);

    std::fs::remove_dir_all(&output_dir).expect("clear output");
    instantiator
        .instantiate(&all, &params, &rules)
        .expect("second run");
    let second = snapshot(&output_dir);

    assert_eq!(first.len(), 9);
    assert_eq!(first, second);
}
