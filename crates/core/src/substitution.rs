//! Ordered placeholder substitution for one generated file.
//!
//! Substitution is expressed as a plan: a list of literal `pattern ->
//! replacement` passes, each applied to the whole current content before
//! the next one runs. The plan order is fixed:
//!
//! 1. `CaseName` -> case identifier (all roles).
//! 2. Macro only: the template self reference (`template_Macro`) -> the
//!    generated macro file stem.
//! 3. Macro only: `SavePath` -> absolute path of the generated case file.
//! 4. Every parameter placeholder, in declaration order -> its value for
//!    this case (all roles).
//! 5. Auxiliary only: every replacement rule in order, then the template
//!    self reference -> the generated file stem.
//!
//! Later passes see text produced by earlier ones. A parameter value that
//! contains another placeholder name is substituted again when that
//! placeholder's pass runs.

use crate::params::ParameterTable;
use crate::rules::{ReplacementRuleSet, CASE_NAME_PLACEHOLDER};
use crate::template::{TemplateDescriptor, TemplateRole};

/// Placeholder a macro uses for the path it saves the case to.
pub const SAVE_PATH_PLACEHOLDER: &str = "SavePath";

/// Per-file values the passes substitute.
#[derive(Debug, Clone, Copy)]
pub struct CaseContext<'a> {
    pub case_index: usize,
    pub case_id: &'a str,
    /// Stem of the file being generated, e.g. `Macro_Case1`.
    pub output_stem: &'a str,
    /// Normalized absolute path of this case's generated case file.
    pub save_path: &'a str,
}

/// One literal replacement pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub pattern: String,
    pub replacement: String,
}

impl Substitution {
    fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Build the ordered pass list for `template` and case `ctx`.
pub fn plan(
    template: &TemplateDescriptor,
    ctx: &CaseContext<'_>,
    params: &ParameterTable,
    rules: &ReplacementRuleSet,
) -> Vec<Substitution> {
    let mut passes = vec![Substitution::new(CASE_NAME_PLACEHOLDER, ctx.case_id)];

    if template.role == TemplateRole::Macro {
        passes.push(Substitution::new(template.self_reference(), ctx.output_stem));
        passes.push(Substitution::new(SAVE_PATH_PLACEHOLDER, ctx.save_path));
    }

    passes.extend(
        params
            .row(ctx.case_index)
            .map(|(placeholder, value)| Substitution::new(placeholder, value.to_string())),
    );

    if template.role == TemplateRole::Auxiliary {
        passes.extend(
            rules
                .iter()
                .map(|(old, new)| Substitution::new(old, new.resolve(ctx.case_id))),
        );
        passes.push(Substitution::new(template.self_reference(), ctx.output_stem));
    }

    passes
}

/// Apply `passes` to `content` in order.
///
/// Passes with an empty pattern are skipped.
pub fn apply(content: &str, passes: &[Substitution]) -> String {
    let mut out = content.to_string();
    for pass in passes {
        if pass.pattern.is_empty() {
            continue;
        }
        out = out.replace(&pass.pattern, &pass.replacement);
    }
    out
}

/// Render one generated file.
pub fn render(
    content: &str,
    template: &TemplateDescriptor,
    ctx: &CaseContext<'_>,
    params: &ParameterTable,
    rules: &ReplacementRuleSet,
) -> String {
    apply(content, &plan(template, ctx, params, rules))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
