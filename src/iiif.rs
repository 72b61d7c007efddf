//! IIIF Presentation API 2.x document model.
//!
//! Only the subset the archive viewer consumes: one manifest, one sequence,
//! one canvas per page image, each painted by a single image annotation
//! backed by a level-2 image service. Every identifier is derived from the
//! URL prefix plus the record id or the image basename, so regeneration is
//! byte-stable.

use serde::{Deserialize, Serialize};

pub const PRESENTATION_CONTEXT: &str = "http://iiif.io/api/presentation/2/context.json";
pub const IMAGE_CONTEXT: &str = "http://iiif.io/api/image/2/context.json";
pub const LEVEL2_PROFILE: &str = "http://iiif.io/api/image/2/profiles/level2.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub label: String,
    pub description: String,
    #[serde(rename = "viewingHint")]
    pub viewing_hint: String,
    pub metadata: Vec<MetadataEntry>,
    pub sequences: Vec<Sequence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub label: String,
    pub canvases: Vec<Canvas>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub images: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub motivation: String,
    pub resource: ImageResource,
    /// Id of the canvas this annotation paints.
    pub on: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResource {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub service: ImageService,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageService {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub profile: String,
}

impl Manifest {
    /// Empty manifest for `record_id` with the default sequence attached.
    pub fn new(url_prefix: &str, record_id: &str, label: &str, description: &str) -> Self {
        Self {
            context: PRESENTATION_CONTEXT.to_string(),
            id: format!("{url_prefix}/manifest/{record_id}"),
            kind: "sc:Manifest".to_string(),
            label: label.to_string(),
            description: description.to_string(),
            viewing_hint: "individuals".to_string(),
            metadata: Vec::new(),
            sequences: vec![Sequence {
                id: format!("{url_prefix}/sequence/{record_id}"),
                kind: "sc:Sequence".to_string(),
                label: "Default sequence".to_string(),
                canvases: Vec::new(),
            }],
        }
    }

    pub fn canvases(&self) -> impl Iterator<Item = &Canvas> {
        self.sequences.iter().flat_map(|s| s.canvases.iter())
    }
}

impl Canvas {
    /// A canvas for one page image, painted by its image-service resource.
    pub fn for_image(url_prefix: &str, basename: &str, width: u32, height: u32) -> Self {
        let canvas_id = format!("{url_prefix}/canvas/{basename}");
        let service_id = format!("{url_prefix}/image-service/{basename}");
        Self {
            id: canvas_id.clone(),
            kind: "sc:Canvas".to_string(),
            label: basename.to_string(),
            width,
            height,
            images: vec![Annotation {
                id: format!("{url_prefix}/annotation/{basename}"),
                kind: "oa:Annotation".to_string(),
                motivation: "sc:painting".to_string(),
                resource: ImageResource {
                    id: format!("{service_id}/full/full/0/default.jpg"),
                    kind: "dctypes:Image".to_string(),
                    format: "image/jpeg".to_string(),
                    width,
                    height,
                    service: ImageService {
                        context: IMAGE_CONTEXT.to_string(),
                        id: service_id,
                        profile: LEVEL2_PROFILE.to_string(),
                    },
                },
                on: canvas_id,
            }],
        }
    }
}

/// Metadata-list label for a record field: first letter upper-cased, the
/// rest lower-cased (`institutional_stamp` → `Institutional_stamp`).
pub fn capitalize_label(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
