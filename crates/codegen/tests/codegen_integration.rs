//! Integration tests for the full generation flow: parsed sources through
//! classification to rendered artifacts.

use std::path::Path;
use upkeep_codegen::{generate_artifacts, ArtifactKind, Generation};
use upkeep_core::classify::Provenance;
use upkeep_core::policy::Policy;
use upkeep_core::source::{parse_source, FileSystemProvider, ParsedSource};

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> &'static Path {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/codegen -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
}

fn scenario_policy() -> Policy {
    let mut policy = Policy::minimal();
    policy.keys.references = "possible_templates".to_string();
    policy.keys.maintenance_category = "maintenance".to_string();
    policy
}

fn generate(subjects: &str) -> Generation {
    let templates = ParsedSource::from_texts([(
        "templates.txt",
        "T = { category = maintenance  grain = 2.0 }",
    )]);
    let subjects = ParsedSource::from_texts([("subjects.txt", subjects)]);
    generate_artifacts(&templates, &subjects, &scenario_policy()).expect("generation failed")
}

fn text(generation: &Generation, kind: ArtifactKind) -> &str {
    &generation.artifact(kind).expect("artifact").text
}

#[test]
fn external_reference_without_hooks_goes_additive() {
    let g = generate("S = { possible_templates = { T } }");

    let q = &g.classification.qualified;
    assert_eq!(q.len(), 1);
    assert_eq!(q[0].name, "S");
    assert_eq!(q[0].profile, "T");
    assert_eq!(q[0].provenance, Provenance::External);

    let additive = text(&g, ArtifactKind::AdditiveHooks);
    assert!(additive.contains("INJECT:S = {"));
    assert!(additive
        .contains("add_to_variable_list = { name = epbm_building_types target = prev }"));
    assert!(additive
        .contains("remove_list_variable = { name = epbm_building_types target = prev }"));

    let containers = text(&g, ArtifactKind::Containers);
    assert_eq!(containers.matches(" = {\n\tunique = yes").count(), 1);
    assert!(containers.contains("epbm_pm_T = {"));

    let init = text(&g, ArtifactKind::BulkInit);
    let dispatch = &init[init.find("epbm_init_building = {").expect("dispatch")..];
    assert_eq!(dispatch.matches("\tif = {").count(), 1);
    assert!(!dispatch.contains("else_if"));
    assert!(dispatch.contains("limit = { building_type = building_type:S }"));

    assert!(!text(&g, ArtifactKind::PatchDeclarations).contains("REPLACE:"));
}

#[test]
fn existing_hooks_are_patched_exactly_once() {
    let g = generate(
        "S2 = {\n\tpossible_templates = { T }\n\ton_built = {\n\t\tbuilt_flag = yes\n\t}\n\ton_destroyed = {\n\t\tdestroyed_flag = yes\n\t}\n}\n",
    );

    assert!(!text(&g, ArtifactKind::AdditiveHooks).contains("INJECT:S2"));
    let patch = text(&g, ArtifactKind::PatchDeclarations);
    assert_eq!(patch.matches("REPLACE:S2 = {").count(), 1);
    for snippet in [
        "location = { add_to_variable_list = { name = epbm_building_types target = prev } }",
        "epbm_on_building_built = yes",
        "location = { remove_list_variable = { name = epbm_building_types target = prev } }",
        "epbm_on_building_destroyed = yes",
    ] {
        assert_eq!(patch.matches(snippet).count(), 1, "{}", snippet);
    }
    assert!(patch.contains("\t\tbuilt_flag = yes"));
    assert!(patch.contains("\t\tdestroyed_flag = yes"));
}

#[test]
fn generation_is_deterministic() {
    let subjects =
        "B = { possible_templates = { T } }\nA = { possible_templates = { T } on_built = { } }";
    let first = generate(subjects);
    let second = generate(subjects);
    assert_eq!(first.artifacts, second.artifacts);
}

#[test]
fn every_kind_is_rendered_once() {
    let g = generate("S = { possible_templates = { T } }");
    let kinds: Vec<ArtifactKind> = g.artifacts.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, ArtifactKind::ALL.to_vec());
    assert_eq!(
        g.artifact(ArtifactKind::PatchDeclarations).unwrap().file_name,
        "epbm_generated_replace.txt"
    );
}

#[test]
fn fixture_sources_generate_all_routes() {
    let root = workspace_root().join("fixtures");
    let policy = Policy::default();
    let templates = parse_source(
        &[root.join("templates")],
        &FileSystemProvider,
        &policy.sources,
    )
    .expect("templates");
    let subjects: ParsedSource = parse_source(
        &[root.join("subjects")],
        &FileSystemProvider,
        &policy.sources,
    )
    .expect("subjects");

    let g = generate_artifacts(&templates, &subjects, &policy).expect("generation failed");
    let summary = g.classification.summary();
    assert!(summary.additive > 0);
    assert!(summary.patch > 0);
    assert!(summary.foreign > 0);
    assert!(summary.excluded_found > 0);

    let patch = text(&g, ArtifactKind::PatchDeclarations);
    assert!(patch.contains("REPLACE:"));
    assert!(!patch.contains("# WARNING"));
    assert!(text(&g, ArtifactKind::ExclusionMarkers).contains("epbm_crown_building = yes"));
}
