//! upkeep-codegen: renders classification output into the generated script
//! artifacts.
//!
//! Each [`Artifact`] is pure text plus its file name and encoding; writing
//! it anywhere is left to the caller.

pub mod artifact;
pub mod emit;
mod error;

pub use artifact::{Artifact, ArtifactKind, Encoding};
pub use error::CodegenError;

use upkeep_core::classify::{classify, Classification};
use upkeep_core::policy::Policy;
use upkeep_core::source::ParsedSource;

/// Classification plus every artifact rendered from it.
#[derive(Debug, Clone)]
pub struct Generation {
    pub classification: Classification,
    pub artifacts: Vec<Artifact>,
}

impl Generation {
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }
}

/// Render every artifact kind from an existing classification, in
/// [`ArtifactKind::ALL`] order.
pub fn emit_artifacts(
    classification: &Classification,
    subjects: &ParsedSource,
    policy: &Policy,
) -> Result<Vec<Artifact>, CodegenError> {
    let mut artifacts = Vec::with_capacity(ArtifactKind::ALL.len());
    for kind in ArtifactKind::ALL {
        let text = match kind {
            ArtifactKind::AdditiveHooks => emit::additive_hooks(classification, policy),
            ArtifactKind::PatchDeclarations => {
                emit::patch_declarations(classification, subjects, policy)?
            }
            ArtifactKind::Containers => emit::containers(classification, policy),
            ArtifactKind::BulkInit => emit::bulk_init(classification, policy),
            ArtifactKind::ExclusionMarkers => emit::exclusion_markers(classification, policy),
            ArtifactKind::Biases => emit::biases(classification, policy),
            ArtifactKind::Localization => emit::localization(classification, policy),
        };
        artifacts.push(Artifact::new(kind, &policy.naming, text));
    }
    Ok(artifacts)
}

/// Classify parsed templates and subjects under `policy`, then render all
/// artifacts.
pub fn generate_artifacts(
    templates: &ParsedSource,
    subjects: &ParsedSource,
    policy: &Policy,
) -> Result<Generation, CodegenError> {
    let classification = classify(templates, subjects, policy);
    let artifacts = emit_artifacts(&classification, subjects, policy)?;
    tracing::info!(artifacts = artifacts.len(), "generated artifacts");
    Ok(Generation {
        classification,
        artifacts,
    })
}
