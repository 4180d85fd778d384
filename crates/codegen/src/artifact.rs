//! Generated artifact model: what each output file is called and how it is
//! encoded on disk.

use serde::Serialize;
use upkeep_core::policy::Naming;

/// Byte-order-mark convention for an artifact file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// UTF-8 with a leading BOM, the convention of the input declarations.
    Utf8Bom,
    Utf8,
}

impl Encoding {
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8Bom => {
                let mut bytes = Vec::with_capacity(text.len() + 3);
                bytes.extend_from_slice("\u{feff}".as_bytes());
                bytes.extend_from_slice(text.as_bytes());
                bytes
            }
            Encoding::Utf8 => text.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// New hook declarations for subjects without hook sub-blocks.
    AdditiveHooks,
    /// Full replacement declarations for subjects whose hooks were patched.
    PatchDeclarations,
    /// One inert container declaration per profile.
    Containers,
    /// Global stamping and init dispatch effects.
    BulkInit,
    ExclusionMarkers,
    Biases,
    Localization,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 7] = [
        ArtifactKind::AdditiveHooks,
        ArtifactKind::PatchDeclarations,
        ArtifactKind::Containers,
        ArtifactKind::BulkInit,
        ArtifactKind::ExclusionMarkers,
        ArtifactKind::Biases,
        ArtifactKind::Localization,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ArtifactKind::AdditiveHooks => "additive_hooks",
            ArtifactKind::PatchDeclarations => "patch_declarations",
            ArtifactKind::Containers => "containers",
            ArtifactKind::BulkInit => "bulk_init",
            ArtifactKind::ExclusionMarkers => "exclusion_markers",
            ArtifactKind::Biases => "biases",
            ArtifactKind::Localization => "localization",
        }
    }

    pub fn file_name(&self, naming: &Naming) -> String {
        let p = &naming.prefix;
        match self {
            ArtifactKind::AdditiveHooks => format!("{}_generated_inject.txt", p),
            ArtifactKind::PatchDeclarations => format!("{}_generated_replace.txt", p),
            ArtifactKind::Containers => format!("{}_generated_ios.txt", p),
            ArtifactKind::BulkInit => format!("{}_generated_init_effects.txt", p),
            ArtifactKind::ExclusionMarkers => format!("{}_generated_crown_inject.txt", p),
            ArtifactKind::Biases => format!("{}_generated_biases.txt", p),
            ArtifactKind::Localization => format!("{}_ios_l_english.yml", p),
        }
    }

    /// Localization text carries its own BOM; everything else gets one on
    /// write.
    pub fn encoding(&self) -> Encoding {
        match self {
            ArtifactKind::Localization => Encoding::Utf8,
            _ => Encoding::Utf8Bom,
        }
    }
}

/// One generated text fragment, ready to be written verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub file_name: String,
    #[serde(skip)]
    pub text: String,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, naming: &Naming, text: String) -> Self {
        Artifact {
            kind,
            file_name: kind.file_name(naming),
            text,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.kind.encoding()
    }

    /// File contents with the encoding's BOM applied.
    pub fn bytes(&self) -> Vec<u8> {
        self.encoding().encode(&self.text)
    }
}
