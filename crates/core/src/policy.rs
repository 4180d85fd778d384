//! Classification policy: exclusion set, marker vocabulary, category rules
//! and generated-identifier naming.
//!
//! Every section has serde defaults, so a TOML file only needs to state what
//! it overrides.
//!
//! # Example
//!
//! ```toml
//! exclude = ["barracks", "castle"]
//!
//! [keys]
//! references = "possible_templates"
//! maintenance_category = "maintenance"
//!
//! [[categories]]
//! tag = "trade"
//! list = "epbm_trade_types"
//! block = "modifier"
//! markers = ["local_merchant_capacity"]
//!
//! [naming]
//! prefix = "epbm"
//! ```

use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Subjects whose upkeep is paid directly and never tracked.
const DEFAULT_EXCLUDE: &[&str] = &[
    "ablaq_palace", "admiralty", "alhambra", "amsterdam_admiralty", "armory",
    "art_school", "arts_academy", "bailiff", "bajang_ratu",
    "barcelona_royal_shipyard", "barracks", "bastion",
    "bavarian_academy_of_sciences", "bey_fortress", "brethren_marsh",
    "calmecac", "camara_comptos", "cantonments", "castel_sant_angelo",
    "castle", "cawa_barracks", "chancery", "city_guard", "coastal_fort",
    "conscription_center", "copenhagen_dockyard", "dock", "dry_dock",
    "enderun_academy", "fortress", "fortezza_di_sant_andrea",
    "friesland_admiralty", "gallowglass_sept", "ghilman_barracks",
    "grand_shipyard", "great_enclosure", "great_hill_complex",
    "great_valley_complex", "hexamilion_wall", "house_of_parliament",
    "hsa_burgtor", "imperial_halic_shipyards", "janissary_barracks",
    "jurchen_barracks", "kastellet", "kilwan_shipwrights",
    "korean_gunnery_coastal_defense", "korean_gunnery_land_defense",
    "kremlin", "kronborg", "kurmina_headquarter", "kurultai",
    "mamluk_barracks", "naval_base", "naval_battery", "north_sea_shipyards",
    "oma_nizwa_fort", "order_headquarters", "ostrog", "peel_towers",
    "pirate_stronghold", "pirate_tavern", "pukara_building",
    "qalat_al_mashwar", "rahdar", "red_fort", "regimental_camp",
    "repaired_great_wall_of_china", "republican_assembly",
    "rotterdam_admiralty", "royal_academy_of_arts",
    "royal_atarazanas_seville", "royal_court", "royal_garden",
    "royal_society", "ruined_great_wall_of_china",
    "segovia_artillery_academy", "sergeantry", "shipyard", "sofa_barracks",
    "star_fort", "stockade", "supreme_court", "tambo", "telpochcalli",
    "the_bock_fortifications", "theodosian_walls", "thema_headquarters",
    "tower_of_belem", "training_fields", "uffizi", "venetian_arsenal",
    "venetian_palaces", "walls_of_benin", "walls_of_ston", "war_college",
    "warrior_temple", "west_friesland_admiralty", "zazzau_walls",
    "zeeland_admiralty", "zwinger",
    "ambras_castle", "belvedere_palace", "berlin_palace",
    "coastal_settlements", "construction_center", "counting_house",
    "doges_palace", "eghabho_nore_mansion", "el_escorial_palace",
    "forbidden_city", "fortress_church", "fortress_granary",
    "galley_barracks", "general_archive_of_simancas", "grand_apartment",
    "guich_garrison", "imperial_city_of_hue", "kalari", "kings_manor",
    "lieutenancy", "local_governor", "minting_office",
    "moscow_artillery_yard", "munich_residenz_founding", "naval_governor",
    "novodevichy_convent", "oma_falaj", "papal_archives",
    "protected_harbor", "quirinal_palace", "ribat", "ribeira_das_naus",
    "rock_of_monaco", "safaviyya_order_hall", "sanssouci",
    "schonbrunn_palace", "sco_palace_of_holyroodhouse", "seljuk_mint",
    "the_cipher_secretary", "versailles", "viceroyalty", "zhixian",
];

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Subject names never tracked.
    pub exclude: BTreeSet<String>,
    pub keys: KeyNames,
    /// Category rules in priority order; the first match picks the list.
    pub categories: Vec<CategoryRule>,
    pub naming: Naming,
    pub inject: InjectOptions,
    pub sources: SourceOptions,
}

impl Default for Policy {
    fn default() -> Self {
        let naming = Naming::default();
        Policy {
            exclude: set(DEFAULT_EXCLUDE),
            keys: KeyNames::default(),
            categories: vec![
                CategoryRule {
                    tag: "trade".to_string(),
                    list: naming.list("trade_types"),
                    block: "modifier".to_string(),
                    markers: vec![
                        "local_merchant_capacity".to_string(),
                        "merchant_capacity_from_building".to_string(),
                    ],
                    threshold: None,
                },
                CategoryRule {
                    tag: "fort".to_string(),
                    list: naming.list("fort_types"),
                    block: "modifier".to_string(),
                    markers: vec!["fort_level".to_string()],
                    threshold: Some(0.0),
                },
            ],
            naming,
            inject: InjectOptions::default(),
            sources: SourceOptions::default(),
        }
    }
}

impl Policy {
    pub fn from_toml_str(text: &str) -> Result<Self, PolicyError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Policy with no exclusions and no category rules.
    pub fn minimal() -> Self {
        Policy {
            exclude: BTreeSet::new(),
            categories: Vec::new(),
            ..Policy::default()
        }
    }
}

/// Well-known key names treated as markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyNames {
    /// Group assignment; a subject carrying it is never tracked.
    pub group: String,
    pub foreign: String,
    /// Scalar value that turns a marker on.
    pub truthy: String,
    /// Block listing external template references.
    pub references: String,
    /// Block holding inline template definitions.
    pub inline: String,
    pub category: String,
    /// Category an inline template must carry to be eligible.
    pub maintenance_category: String,
    pub no_upkeep: String,
    /// Any of these keys marks a template as producing output.
    pub output: Vec<String>,
    /// Template keys that are never resources.
    pub meta: BTreeSet<String>,
    pub pre_build: String,
    pub post_destroy: String,
}

impl Default for KeyNames {
    fn default() -> Self {
        KeyNames {
            group: "estate".to_string(),
            foreign: "is_foreign".to_string(),
            truthy: "yes".to_string(),
            references: "possible_production_methods".to_string(),
            inline: "unique_production_methods".to_string(),
            category: "category".to_string(),
            maintenance_category: "building_maintenance".to_string(),
            no_upkeep: "no_upkeep".to_string(),
            output: vec!["produced".to_string(), "output".to_string()],
            meta: set(&["category", "no_upkeep", "potential", "produced", "output"]),
            pre_build: "on_built".to_string(),
            post_destroy: "on_destroyed".to_string(),
        }
    }
}

/// Tags a subject and routes it to a tracking list when one of `markers`
/// appears inside its `block` sub-block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub tag: String,
    pub list: String,
    pub block: String,
    pub markers: Vec<String>,
    /// When set, the marker's numeric value must exceed it; otherwise
    /// presence is enough.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// Generated identifiers, all derived from one prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Naming {
    pub prefix: String,
}

impl Default for Naming {
    fn default() -> Self {
        Naming {
            prefix: "epbm".to_string(),
        }
    }
}

impl Naming {
    pub fn list(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    pub fn default_list(&self) -> String {
        self.list("building_types")
    }

    /// Container entity hosting the cost map of `template`.
    pub fn container(&self, template: &str) -> String {
        format!("{}_pm_{}", self.prefix, template)
    }

    /// Inline template identifier after collision renaming.
    pub fn renamed(&self, template: &str) -> String {
        format!("{}_{}", self.prefix, template)
    }

    pub fn built_effect(&self) -> String {
        format!("{}_on_building_built", self.prefix)
    }

    pub fn destroyed_effect(&self) -> String {
        format!("{}_on_building_destroyed", self.prefix)
    }

    pub fn stamp_effect(&self) -> String {
        format!("{}_stamp_globals", self.prefix)
    }

    pub fn init_effect(&self) -> String {
        format!("{}_init_building", self.prefix)
    }

    pub fn profiles_map(&self) -> String {
        format!("{}_profiles", self.prefix)
    }

    pub fn containers_list(&self) -> String {
        format!("{}_all_ios", self.prefix)
    }

    pub fn costs_map(&self) -> String {
        format!("{}_goods", self.prefix)
    }

    pub fn scope(&self) -> String {
        format!("{}_bldg", self.prefix)
    }

    pub fn exclusion_modifier(&self) -> String {
        format!("{}_crown_building", self.prefix)
    }

    /// Marker used in generated comments.
    pub fn banner(&self) -> String {
        self.prefix.to_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectOptions {
    /// Identifiers inside the inline container that keep their name. The
    /// container key itself is always preserved.
    pub preserved: BTreeSet<String>,
}

impl Default for InjectOptions {
    fn default() -> Self {
        InjectOptions {
            preserved: set(&["category", "potential", "no_upkeep"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    /// File names skipped when a directory is expanded.
    pub skip: BTreeSet<String>,
    pub extension: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        SourceOptions {
            skip: set(&["readme.txt", "00_unique_buildings_to_make_obsolete.txt"]),
            extension: "txt".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_the_default_policy() {
        assert_eq!(Policy::from_toml_str("").unwrap(), Policy::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let policy = Policy::from_toml_str(
            r#"
exclude = ["castle"]

[keys]
references = "possible_templates"
"#,
        )
        .unwrap();
        assert_eq!(policy.exclude, set(&["castle"]));
        assert_eq!(policy.keys.references, "possible_templates");
        assert_eq!(policy.keys.inline, "unique_production_methods");
        assert_eq!(policy.categories.len(), 2);
    }

    #[test]
    fn category_rules_decode_in_order() {
        let policy = Policy::from_toml_str(
            r#"
[[categories]]
tag = "fort"
list = "x_fort_types"
block = "modifier"
markers = ["fort_level"]
threshold = 0.0

[[categories]]
tag = "trade"
list = "x_trade_types"
block = "modifier"
markers = ["local_merchant_capacity"]
"#,
        )
        .unwrap();
        let tags: Vec<&str> = policy.categories.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, vec!["fort", "trade"]);
        assert_eq!(policy.categories[0].threshold, Some(0.0));
        assert_eq!(policy.categories[1].threshold, None);
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        let err = Policy::from_toml_str("exclude = 3").unwrap_err();
        assert!(matches!(err, PolicyError::Decode(_)));
    }

    #[test]
    fn naming_follows_prefix() {
        let naming = Naming {
            prefix: "up".to_string(),
        };
        assert_eq!(naming.container("maint_a"), "up_pm_maint_a");
        assert_eq!(naming.default_list(), "up_building_types");
        assert_eq!(naming.built_effect(), "up_on_building_built");
        assert_eq!(naming.banner(), "UP");
    }

    #[test]
    fn default_policy_round_trips_through_toml() {
        let text = toml::to_string(&Policy::default()).unwrap();
        assert_eq!(Policy::from_toml_str(&text).unwrap(), Policy::default());
    }
}
