//! Classifier: applies the inclusion policy to parsed templates and subjects.
//!
//! Produces the qualified subject list (one profile each) and the profile
//! registry, both ordered by name so every emitter downstream is
//! deterministic.

use crate::document::{Document, Value};
use crate::policy::{CategoryRule, KeyNames, Policy};
use crate::source::ParsedSource;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ──────────────────────────────────────────────
// Templates
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cost {
    pub resource: String,
    pub amount: f64,
}

/// Format an amount the way the game files spell floats: integral values
/// keep one decimal place (`2.0`), everything else uses the shortest form.
/// Decimal exponents below -4 or from 16 up switch to scientific notation
/// with a signed two-digit exponent (`1e-05`, `1.5e+20`).
pub fn format_amount(amount: f64) -> String {
    let sci = format!("{:e}", amount);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if !(-4..16).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else if amount.fract() == 0.0 {
        format!("{:.1}", amount)
    } else {
        format!("{}", amount)
    }
}

impl Cost {
    pub fn amount_text(&self) -> String {
        format_amount(self.amount)
    }
}

/// A resource template: a named cost vector plus the markers that decide
/// whether it can carry upkeep.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    /// Resource costs in declaration order.
    pub costs: Vec<Cost>,
    pub no_upkeep: bool,
    pub produces_output: bool,
    pub category: Option<String>,
}

impl Template {
    pub fn from_document(name: &str, doc: &Document, keys: &KeyNames) -> Self {
        let costs = doc
            .iter()
            .filter(|(k, _)| !keys.meta.contains(*k))
            .filter_map(|(k, v)| {
                let amount = v.as_scalar()?.parse::<f64>().ok()?;
                if !amount.is_finite() || amount < 0.0 {
                    tracing::debug!(template = name, resource = k, amount, "ignoring cost");
                    return None;
                }
                Some(Cost {
                    resource: k.to_owned(),
                    amount,
                })
            })
            .collect();
        Template {
            name: name.to_owned(),
            costs,
            no_upkeep: doc.scalar(&keys.no_upkeep) == Some(keys.truthy.as_str()),
            produces_output: keys.output.iter().any(|k| doc.contains_key(k)),
            category: doc.scalar(&keys.category).map(str::to_owned),
        }
    }

    /// Non-empty costs, not consumed downstream, no output.
    pub fn is_eligible(&self) -> bool {
        !self.costs.is_empty() && !self.no_upkeep && !self.produces_output
    }
}

// ──────────────────────────────────────────────
// Subjects
// ──────────────────────────────────────────────

/// A declared subject, borrowed from the parsed source.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub name: &'a str,
    pub file: &'a str,
    pub document: &'a Document,
}

/// Which lifecycle hook sub-blocks a subject already declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Hooks {
    pub pre_build: bool,
    pub post_destroy: bool,
}

impl Hooks {
    pub fn any(&self) -> bool {
        self.pre_build || self.post_destroy
    }
}

impl<'a> Subject<'a> {
    pub fn is_grouped(&self, keys: &KeyNames) -> bool {
        self.document.contains_key(&keys.group)
    }

    pub fn is_foreign(&self, keys: &KeyNames) -> bool {
        self.document.scalar(&keys.foreign) == Some(keys.truthy.as_str())
    }

    pub fn hooks(&self, keys: &KeyNames) -> Hooks {
        Hooks {
            pre_build: self.document.contains_key(&keys.pre_build),
            post_destroy: self.document.contains_key(&keys.post_destroy),
        }
    }

    /// External template names, in declared order. Accepts both the block
    /// form `refs = { a b }` and scalar occurrences `refs = a`.
    pub fn references(&self, keys: &KeyNames) -> Vec<&'a str> {
        let Some(value) = self.document.get(&keys.references) else {
            return Vec::new();
        };
        let mut names = Vec::new();
        for occurrence in value.occurrences() {
            match occurrence {
                Value::Block(block) => names.extend(block.keys()),
                Value::Scalar(name) => names.push(name.as_str()),
                _ => {}
            }
        }
        names
    }

    /// Inline template definitions, in declared order.
    pub fn inline_templates(&self, keys: &KeyNames) -> Vec<Template> {
        let Some(container) = self.document.block(&keys.inline) else {
            return Vec::new();
        };
        container
            .iter()
            .filter_map(|(name, v)| {
                v.as_block()
                    .map(|doc| Template::from_document(name, doc, keys))
            })
            .collect()
    }

    fn matches(&self, rule: &CategoryRule) -> bool {
        let Some(block) = self.document.block(&rule.block) else {
            return false;
        };
        rule.markers.iter().any(|marker| match rule.threshold {
            None => block.contains_key(marker),
            Some(threshold) => block
                .scalar(marker)
                .and_then(|v| v.parse::<f64>().ok())
                .is_some_and(|v| v > threshold),
        })
    }
}

// ──────────────────────────────────────────────
// Classification output
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    External,
    Inline,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::External => "external",
            Provenance::Inline => "inline",
        }
    }
}

/// How the generated output treats a qualified subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Foreign: profile only, never tracked in a list.
    Untracked,
    /// No hook sub-blocks yet: a new hook declaration is emitted.
    Additive,
    /// Existing hook sub-blocks are patched in place.
    Patch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualifiedEntity {
    pub name: String,
    pub file: String,
    /// Template name of the assigned profile.
    pub profile: String,
    pub provenance: Provenance,
    pub tags: BTreeSet<String>,
    /// Tracking list; `None` for foreign subjects.
    pub list: Option<String>,
    pub foreign: bool,
    pub hooks: Hooks,
}

impl QualifiedEntity {
    pub fn route(&self) -> Route {
        if self.foreign {
            Route::Untracked
        } else if self.hooks.any() {
            Route::Patch
        } else {
            Route::Additive
        }
    }

    /// `" (trade)"`-style suffix for generated comments; empty without tags.
    pub fn tag_suffix(&self) -> String {
        if self.tags.is_empty() {
            String::new()
        } else {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            format!(" ({})", tags.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub template: String,
    pub costs: Vec<Cost>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Excluded,
    Grouped,
    NoEligibleTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Sorted by name.
    pub qualified: Vec<QualifiedEntity>,
    /// Template name to profile, first writer wins.
    pub registry: BTreeMap<String, Profile>,
    pub skipped: Vec<Skipped>,
    /// Excluded names declared in the subject sources, sorted.
    pub excluded_found: Vec<String>,
    pub excluded_missing: Vec<String>,
    pub subject_count: usize,
    pub template_count: usize,
    pub eligible_template_count: usize,
}

// ──────────────────────────────────────────────
// Classification pass
// ──────────────────────────────────────────────

/// Top-level block declarations across a source family. A name declared
/// twice in one file is skipped; a later file overrides an earlier one while
/// keeping its first position.
fn declarations(source: &ParsedSource) -> Vec<(&str, &str, &Document)> {
    let mut out: Vec<(&str, &str, &Document)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for file in &source.files {
        for (name, value) in file.document.iter() {
            let doc = match value {
                Value::Block(doc) => doc,
                Value::Repeated(_) => {
                    tracing::warn!(file = %file.id, name, "declared more than once, skipping");
                    continue;
                }
                _ => continue,
            };
            match position.get(name) {
                Some(&i) => out[i] = (name, file.id.as_str(), doc),
                None => {
                    position.insert(name, out.len());
                    out.push((name, file.id.as_str(), doc));
                }
            }
        }
    }
    out
}

fn pick_template(
    subject: &Subject<'_>,
    templates: &HashMap<&str, Template>,
    keys: &KeyNames,
) -> Option<(Template, Provenance)> {
    for name in subject.references(keys) {
        match templates.get(name) {
            Some(t) if t.is_eligible() => return Some((t.clone(), Provenance::External)),
            Some(_) => {}
            None => tracing::debug!(subject = subject.name, template = name, "unknown template"),
        }
    }
    subject
        .inline_templates(keys)
        .into_iter()
        .find(|t| {
            t.is_eligible() && t.category.as_deref() == Some(keys.maintenance_category.as_str())
        })
        .map(|t| (t, Provenance::Inline))
}

pub fn classify(
    templates: &ParsedSource,
    subjects: &ParsedSource,
    policy: &Policy,
) -> Classification {
    let keys = &policy.keys;
    let template_map: HashMap<&str, Template> = declarations(templates)
        .into_iter()
        .map(|(name, _, doc)| (name, Template::from_document(name, doc, keys)))
        .collect();

    let mut out = Classification {
        template_count: template_map.len(),
        eligible_template_count: template_map.values().filter(|t| t.is_eligible()).count(),
        ..Classification::default()
    };

    let subjects: Vec<Subject<'_>> = declarations(subjects)
        .into_iter()
        .map(|(name, file, document)| Subject {
            name,
            file,
            document,
        })
        .collect();
    out.subject_count = subjects.len();

    let declared: BTreeSet<&str> = subjects.iter().map(|s| s.name).collect();
    for name in &policy.exclude {
        if declared.contains(name.as_str()) {
            out.excluded_found.push(name.clone());
        } else {
            out.excluded_missing.push(name.clone());
        }
    }
    if !out.excluded_missing.is_empty() {
        tracing::warn!(
            count = out.excluded_missing.len(),
            "excluded subjects not declared in the sources"
        );
    }

    for subject in &subjects {
        let reason = if policy.exclude.contains(subject.name) {
            Some(SkipReason::Excluded)
        } else if subject.is_grouped(keys) {
            Some(SkipReason::Grouped)
        } else {
            None
        };
        if let Some(reason) = reason {
            tracing::debug!(subject = subject.name, ?reason, "skipped");
            out.skipped.push(Skipped {
                name: subject.name.to_owned(),
                reason,
            });
            continue;
        }

        let Some((template, provenance)) = pick_template(subject, &template_map, keys) else {
            tracing::debug!(subject = subject.name, "no eligible template");
            out.skipped.push(Skipped {
                name: subject.name.to_owned(),
                reason: SkipReason::NoEligibleTemplate,
            });
            continue;
        };

        out.registry
            .entry(template.name.clone())
            .or_insert_with(|| Profile {
                template: template.name.clone(),
                costs: template.costs.clone(),
            });

        let foreign = subject.is_foreign(keys);
        let (tags, list): (BTreeSet<String>, Option<String>) = if foreign {
            (BTreeSet::from(["foreign".to_string()]), None)
        } else {
            let matched: Vec<&CategoryRule> =
                policy.categories.iter().filter(|r| subject.matches(r)).collect();
            let list = matched
                .first()
                .map(|r| r.list.clone())
                .unwrap_or_else(|| policy.naming.default_list());
            (matched.iter().map(|r| r.tag.clone()).collect(), Some(list))
        };

        tracing::debug!(
            subject = subject.name,
            template = %template.name,
            provenance = provenance.as_str(),
            "qualified"
        );
        out.qualified.push(QualifiedEntity {
            name: subject.name.to_owned(),
            file: subject.file.to_owned(),
            profile: template.name,
            provenance,
            tags,
            list,
            foreign,
            hooks: subject.hooks(keys),
        });
    }

    out.qualified.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::info!(
        subjects = out.subject_count,
        qualified = out.qualified.len(),
        profiles = out.registry.len(),
        "classified"
    );
    out
}

// ──────────────────────────────────────────────
// Summary
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUse {
    pub subject: String,
    pub provenance: Provenance,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub template: String,
    pub costs: Vec<Cost>,
    pub subjects: Vec<ProfileUse>,
}

/// Run totals for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub templates: usize,
    pub eligible_templates: usize,
    pub subjects: usize,
    pub qualified: usize,
    /// Qualified with no category tag.
    pub regular: usize,
    pub additive: usize,
    pub patch: usize,
    pub foreign: usize,
    pub categories: BTreeMap<String, usize>,
    pub excluded_found: usize,
    pub excluded_missing: Vec<String>,
    pub resources: BTreeSet<String>,
    pub profiles: Vec<ProfileSummary>,
}

impl Classification {
    pub fn summary(&self) -> Summary {
        let count = |route: Route| self.qualified.iter().filter(|q| q.route() == route).count();
        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        for tag in self.qualified.iter().flat_map(|q| &q.tags) {
            *categories.entry(tag.clone()).or_default() += 1;
        }
        let profiles = self
            .registry
            .values()
            .map(|p| ProfileSummary {
                template: p.template.clone(),
                costs: p.costs.clone(),
                subjects: self
                    .qualified
                    .iter()
                    .filter(|q| q.profile == p.template)
                    .map(|q| ProfileUse {
                        subject: q.name.clone(),
                        provenance: q.provenance,
                        tags: q.tags.clone(),
                    })
                    .collect(),
            })
            .collect();
        Summary {
            templates: self.template_count,
            eligible_templates: self.eligible_template_count,
            subjects: self.subject_count,
            qualified: self.qualified.len(),
            regular: self.qualified.iter().filter(|q| q.tags.is_empty()).count(),
            additive: count(Route::Additive),
            patch: count(Route::Patch),
            foreign: count(Route::Untracked),
            categories,
            excluded_found: self.excluded_found.len(),
            excluded_missing: self.excluded_missing.clone(),
            resources: self
                .registry
                .values()
                .flat_map(|p| p.costs.iter().map(|c| c.resource.clone()))
                .collect(),
            profiles,
        }
    }
}
