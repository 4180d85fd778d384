//! Human-readable rendering of a classification summary.

use upkeep_core::classify::{format_amount, Summary};

/// Format the summary as text: totals first, then the profile mapping.
pub fn summary_text(summary: &Summary) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Templates: {} ({} eligible)",
        summary.templates,
        summary.eligible_templates
    ));
    lines.push(format!("Subjects: {}", summary.subjects));
    lines.push(format!("Qualified subjects: {}", summary.qualified));
    lines.push(format!("  Regular: {}", summary.regular));
    for (tag, count) in &summary.categories {
        lines.push(format!("  {}: {}", capitalize(tag), count));
    }
    lines.push(format!("  Excluded: {}", summary.excluded_found));
    if !summary.excluded_missing.is_empty() {
        lines.push(format!(
            "  WARNING: {} excluded subjects not found: {}",
            summary.excluded_missing.len(),
            summary.excluded_missing.join(", ")
        ));
    }
    lines.push(format!("Profiles: {}", summary.profiles.len()));
    lines.push(format!("INJECT blocks: {}", summary.additive));
    lines.push(format!("REPLACE blocks: {}", summary.patch));
    let resources: Vec<&str> = summary.resources.iter().map(String::as_str).collect();
    lines.push(format!(
        "Distinct resources: {} ({})",
        resources.len(),
        resources.join(", ")
    ));

    if !summary.profiles.is_empty() {
        lines.push(String::new());
        lines.push("Profile to subjects:".to_string());
    }
    for profile in &summary.profiles {
        let costs: Vec<String> = profile
            .costs
            .iter()
            .map(|c| format!("{}={}", c.resource, format_amount(c.amount)))
            .collect();
        lines.push(format!(
            "  {} ({} subjects): [{}]",
            profile.template,
            profile.subjects.len(),
            costs.join(", ")
        ));
        for used in &profile.subjects {
            let tags = if used.tags.is_empty() {
                String::new()
            } else {
                let tags: Vec<&str> = used.tags.iter().map(String::as_str).collect();
                format!(" ({})", tags.join(", "))
            };
            lines.push(format!(
                "    - {} ({}){}",
                used.subject,
                used.provenance.as_str(),
                tags
            ));
        }
    }

    lines.join("\n")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
