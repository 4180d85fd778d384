//! Code emitters: one pure function per artifact kind.
//!
//! Every emitter walks subjects and profiles in name order, so identical
//! classification output always renders to identical text.

use crate::error::CodegenError;
use upkeep_core::classify::{Classification, QualifiedEntity, Route};
use upkeep_core::inject::{inject_hooks, track_statements, untrack_statements};
use upkeep_core::locate::locate_block;
use upkeep_core::policy::Policy;
use upkeep_core::source::ParsedSource;

const GENERATOR: &str = "upkeep generate";
const SUBJECT_REF: &str = "building_type";
const RESOURCE_REF: &str = "goods";
const CONTAINER_TYPE_REF: &str = "international_organization_type";
const CONTAINER_REF: &str = "international_organization";

fn header(description: &[&str]) -> Vec<String> {
    let mut lines = vec![format!("# Auto-generated by {}", GENERATOR)];
    lines.extend(description.iter().map(|d| format!("# {}", d)));
    lines.push(String::new());
    lines
}

fn tracked<'a>(
    classification: &'a Classification,
    route: Route,
) -> impl Iterator<Item = (&'a QualifiedEntity, &'a str)> {
    classification
        .qualified
        .iter()
        .filter(move |q| q.route() == route)
        .filter_map(|q| q.list.as_deref().map(|list| (q, list)))
}

/// Hook declarations for qualified subjects with neither hook sub-block.
pub fn additive_hooks(classification: &Classification, policy: &Policy) -> String {
    let keys = &policy.keys;
    let mut lines = header(&["INJECT blocks: manage location tracking list on build/destroy"]);

    for (q, list) in tracked(classification, Route::Additive) {
        let [add, built] = track_statements(list, &policy.naming);
        let [remove, destroyed] = untrack_statements(list, &policy.naming);
        lines.push(format!("# {} uses {}{}", q.name, q.profile, q.tag_suffix()));
        lines.push(format!("INJECT:{} = {{", q.name));
        lines.push(format!("\t{} = {{", keys.pre_build));
        lines.push(format!("\t\t{}", add));
        lines.push(format!("\t\t{}", built));
        lines.push("\t}".to_string());
        lines.push(format!("\t{} = {{", keys.post_destroy));
        lines.push(format!("\t\t{}", remove));
        lines.push(format!("\t\t{}", destroyed));
        lines.push("\t}".to_string());
        lines.push("}".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Replacement declarations for qualified subjects that already declare a
/// hook sub-block, patched through the hook injector.
///
/// A subject whose declaration cannot be located or patched gets a warning
/// marker line instead of a declaration; the run continues.
pub fn patch_declarations(
    classification: &Classification,
    subjects: &ParsedSource,
    policy: &Policy,
) -> Result<String, CodegenError> {
    let mut lines = header(&["REPLACE blocks for subjects with existing lifecycle hooks"]);

    for (q, list) in tracked(classification, Route::Patch) {
        let file = subjects
            .file(&q.file)
            .ok_or_else(|| CodegenError::MissingSource {
                subject: q.name.clone(),
                file: q.file.clone(),
            })?;

        let span = match locate_block(&file.text, &q.name) {
            Ok(span) => span,
            Err(e) => {
                tracing::warn!(subject = %q.name, file = %q.file, error = %e, "locator miss");
                lines.push(format!(
                    "# WARNING: Could not extract raw text for {}",
                    q.name
                ));
                lines.push(String::new());
                continue;
            }
        };

        match inject_hooks(&q.name, span.slice(&file.text), list, policy) {
            Ok(patched) => {
                lines.push(format!(
                    "# {} uses {} (REPLACE due to existing {}){}",
                    q.name,
                    q.profile,
                    policy.keys.pre_build,
                    q.tag_suffix()
                ));
                lines.push(format!("REPLACE:{}", patched));
            }
            Err(e) => {
                tracing::warn!(subject = %q.name, error = %e, "cannot patch declaration");
                lines.push(format!("# WARNING: Could not patch {}: {}", q.name, e));
            }
        }
        lines.push(String::new());
    }

    Ok(lines.join("\n"))
}

/// One inert container declaration per registered profile.
pub fn containers(classification: &Classification, policy: &Policy) -> String {
    let mut lines = header(&[
        "Hidden international organizations used as variable map containers.",
        &format!(
            "Each container hosts a {} variable map for one profile.",
            policy.naming.costs_map()
        ),
    ]);

    for template in classification.registry.keys() {
        lines.push(format!("{} = {{", policy.naming.container(template)));
        lines.push("\tunique = yes".to_string());
        lines.push("\thas_target = no".to_string());
        lines.push("\tshow_on_diplomatic_map = no".to_string());
        lines.push("\tcreate_visible_trigger = { always = no }".to_string());
        lines.push("\tauto_disband_trigger = { always = no }".to_string());
        lines.push("}".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Zero-valued opinion stubs, one per container.
pub fn biases(classification: &Classification, policy: &Policy) -> String {
    let mut lines = header(&["Opinion biases for hidden profile containers (value 0)."]);

    for template in classification.registry.keys() {
        lines.push(format!(
            "io_opinion_{} = {{",
            policy.naming.container(template)
        ));
        lines.push("\tvalue = 0".to_string());
        lines.push("}".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Empty localization entries for every container.
pub fn localization(classification: &Classification, policy: &Policy) -> String {
    let mut lines = vec!["\u{feff}l_english:".to_string()];

    for template in classification.registry.keys() {
        let io = policy.naming.container(template);
        lines.push(format!(" {}: \"\"", io));
        lines.push(format!(" {}_desc: \"\"", io));
        lines.push(format!(" diplomatic_status_{}_name: \"\"", io));
        lines.push(format!(" diplomatic_status_{}_tooltip: \"\"", io));
        lines.push(format!(" {}_list_who_tt: \"\"", io));
        lines.push(format!(" io_opinion_{}: \"\"", io));
    }

    lines.join("\n")
}

/// The global stamping effect followed by the init dispatch effect.
pub fn bulk_init(classification: &Classification, policy: &Policy) -> String {
    let naming = &policy.naming;
    let containers_list = naming.containers_list();
    let profiles_map = naming.profiles_map();
    let mut lines = header(&["Container creation, profile lookup and init dispatch"]);

    lines.push("# Create profile containers and populate their cost maps,".to_string());
    lines.push(format!(
        "# then stamp global map {} (subject type -> container).",
        profiles_map
    ));
    lines.push("# Called once at game start.".to_string());
    lines.push(format!("{} = {{", naming.stamp_effect()));
    lines.push("\t# Clean up containers and stale global state from a previous init".to_string());
    lines.push("\tevery_in_global_list = {".to_string());
    lines.push(format!("\t\tvariable = {}", containers_list));
    lines.push("\t\tdestroy_international_organization = prev".to_string());
    lines.push("\t}".to_string());
    lines.push(format!(
        "\tclear_global_variable_list = {}",
        containers_list
    ));
    lines.push(format!("\tclear_global_variable_map = {}", profiles_map));
    lines.push(String::new());
    lines.push(
        "\t# Create all containers and fill cost maps inside the creation scope".to_string(),
    );
    lines.push("\trandom_country = {".to_string());
    lines.push("\t\tlimit = { is_real_country = yes }".to_string());

    for profile in classification.registry.values() {
        let costs: Vec<String> = profile
            .costs
            .iter()
            .map(|c| format!("{} {}", c.resource, c.amount_text()))
            .collect();
        lines.push(format!(
            "\t\t# PM: {} ({})",
            profile.template,
            costs.join(", ")
        ));
        lines.push("\t\tcreate_international_organization = {".to_string());
        lines.push(format!(
            "\t\t\ttype = {}:{}",
            CONTAINER_TYPE_REF,
            naming.container(&profile.template)
        ));
        for cost in &profile.costs {
            lines.push(format!(
                "\t\t\tadd_to_variable_map = {{ name = {} key = {}:{} value = {} }}",
                naming.costs_map(),
                RESOURCE_REF,
                cost.resource,
                cost.amount_text()
            ));
        }
        lines.push("\t\t}".to_string());
    }

    lines.push("\t}".to_string());
    lines.push(String::new());
    lines.push("\t# Parent map: subject type -> container".to_string());

    for q in &classification.qualified {
        let suffix = q.tag_suffix();
        let comment = if suffix.is_empty() {
            String::new()
        } else {
            format!("  # {}", suffix.trim())
        };
        lines.push(format!(
            "\tadd_to_global_variable_map = {{ name = {} key = {}:{} value = {}:{} }}{}",
            profiles_map,
            SUBJECT_REF,
            q.name,
            CONTAINER_REF,
            naming.container(&q.profile),
            comment
        ));
    }

    lines.push(String::new());
    lines.push("\t# Global list of all containers (for monthly cache clearing)".to_string());
    for template in classification.registry.keys() {
        lines.push(format!(
            "\tadd_to_global_variable_list = {{ name = {} target = {}:{} }}",
            containers_list,
            CONTAINER_REF,
            naming.container(template)
        ));
    }

    lines.push("}".to_string());
    lines.push(String::new());

    let scope = naming.scope();
    lines.push("# Init dispatch: add pre-existing instances to their location list".to_string());
    lines.push("# Scope: building (called via every_buildings_in_location)".to_string());
    for rule in &policy.categories {
        lines.push(format!("# {} subjects go to {}.", rule.tag, rule.list));
    }
    lines.push(format!(
        "# Everything else goes to {}.",
        naming.default_list()
    ));
    lines.push("# Foreign and excluded subjects have no location list.".to_string());
    lines.push(format!("{} = {{", naming.init_effect()));
    lines.push(format!("\tsave_temporary_scope_as = {}", scope));

    let dispatch = classification
        .qualified
        .iter()
        .filter_map(|q| q.list.as_deref().map(|list| (q, list)));
    for (i, (q, list)) in dispatch.enumerate() {
        let keyword = if i == 0 { "if" } else { "else_if" };
        lines.push(format!("\t{} = {{", keyword));
        lines.push(format!(
            "\t\tlimit = {{ building_type = {}:{} }}",
            SUBJECT_REF,
            q.name
        ));
        lines.push(format!(
            "\t\tlocation = {{ add_to_variable_list = {{ name = {} target = scope:{} }} }}",
            list, scope
        ));
        lines.push("\t}".to_string());
    }

    lines.push("}".to_string());
    lines.push(String::new());

    lines.join("\n")
}

/// Modifier injections marking every excluded subject present in the input.
pub fn exclusion_markers(classification: &Classification, policy: &Policy) -> String {
    let mut lines = header(&["Exclusion modifier for subjects whose upkeep is never tracked"]);

    for name in &classification.excluded_found {
        lines.push(format!("INJECT:{} = {{", name));
        lines.push("\tmodifier = {".to_string());
        lines.push(format!("\t\t{} = yes", policy.naming.exclusion_modifier()));
        lines.push("\t}".to_string());
        lines.push("}".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}
