use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One node of a page's content tree. The `kind` tag is the discriminant;
/// adding a kind extends this enum and the exhaustive renderer match, so a
/// new kind is a compile-time-checked change rather than a registry lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading {
        #[serde(default = "default_heading_level")]
        level: u8,
        #[serde(default)]
        text: String,
    },
    Paragraph {
        #[serde(default)]
        text: String,
    },
    Image {
        #[serde(default)]
        src: String,
        #[serde(default)]
        alt: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Quote {
        #[serde(default)]
        text: String,
        #[serde(default)]
        attribution: Option<String>,
    },
    Gallery {
        #[serde(default)]
        images: Vec<GalleryImage>,
    },
    Timeline {
        #[serde(default)]
        entries: Vec<TimelineEntry>,
    },
    Columns {
        #[serde(default)]
        children: Vec<Block>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: String,
}

fn default_heading_level() -> u8 {
    2
}

/// The parsed root of a page's content tree. The root carries page-level
/// props; nodes whose kind is not registered are omitted during parsing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageContent {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

impl PageContent {
    /// Parses a persisted content tree, skipping nodes that are unknown or
    /// malformed. Never fails: a shrunk registry or damaged tree degrades to
    /// fewer blocks, not an error.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let title = value
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string);

        let blocks = value
            .get("blocks")
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().filter_map(Block::from_value).collect())
            .unwrap_or_default();

        Self { title, blocks }
    }
}

impl Block {
    /// Parses a single node, returning `None` for unknown kinds and for
    /// nodes whose props do not fit their kind. Container kinds recurse so
    /// one unrenderable child does not drop its siblings.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Block> {
        let kind = value.get("kind").and_then(Value::as_str)?;

        if kind == "columns" {
            let children = value
                .get("children")
                .and_then(Value::as_array)
                .map(|nodes| nodes.iter().filter_map(Block::from_value).collect())
                .unwrap_or_default();
            return Some(Block::Columns { children });
        }

        serde_json::from_value(value.clone()).ok()
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Paragraph { .. } => "paragraph",
            Block::Image { .. } => "image",
            Block::Quote { .. } => "quote",
            Block::Gallery { .. } => "gallery",
            Block::Timeline { .. } => "timeline",
            Block::Columns { .. } => "columns",
        }
    }
}

/// Editable-field kinds an editing client can render a form control for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    LongText,
    Choice,
    Number,
    NestedList,
    Blocks,
}

/// One editable field of a block kind, in display order.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub label: &'static str,
}

/// A block kind's schema plus the props a freshly inserted block starts with.
#[derive(Debug, Clone, Serialize)]
pub struct BlockSpec {
    pub kind: &'static str,
    pub label: &'static str,
    pub fields: Vec<FieldSpec>,
    pub defaults: Value,
}

fn field(name: &'static str, kind: FieldKind, label: &'static str) -> FieldSpec {
    FieldSpec { name, kind, label }
}

/// The fixed block-kind registry, in editor display order.
#[must_use]
pub fn registry() -> Vec<BlockSpec> {
    vec![
        BlockSpec {
            kind: "heading",
            label: "Heading",
            fields: vec![
                field("text", FieldKind::Text, "Text"),
                field("level", FieldKind::Number, "Level"),
            ],
            defaults: json!({"kind": "heading", "level": 2, "text": "Heading"}),
        },
        BlockSpec {
            kind: "paragraph",
            label: "Paragraph",
            fields: vec![field("text", FieldKind::LongText, "Text")],
            defaults: json!({"kind": "paragraph", "text": ""}),
        },
        BlockSpec {
            kind: "image",
            label: "Image",
            fields: vec![
                field("src", FieldKind::Text, "Image URL"),
                field("alt", FieldKind::Text, "Alt text"),
                field("caption", FieldKind::Text, "Caption"),
            ],
            defaults: json!({"kind": "image", "src": "", "alt": "", "caption": null}),
        },
        BlockSpec {
            kind: "quote",
            label: "Quote",
            fields: vec![
                field("text", FieldKind::LongText, "Quote"),
                field("attribution", FieldKind::Text, "Attribution"),
            ],
            defaults: json!({"kind": "quote", "text": "", "attribution": null}),
        },
        BlockSpec {
            kind: "gallery",
            label: "Photo gallery",
            fields: vec![field("images", FieldKind::NestedList, "Images")],
            defaults: json!({"kind": "gallery", "images": []}),
        },
        BlockSpec {
            kind: "timeline",
            label: "Timeline",
            fields: vec![field("entries", FieldKind::NestedList, "Entries")],
            defaults: json!({"kind": "timeline", "entries": []}),
        },
        BlockSpec {
            kind: "columns",
            label: "Columns",
            fields: vec![field("children", FieldKind::Blocks, "Columns")],
            defaults: json!({"kind": "columns", "children": []}),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        let value = json!({
            "title": "About",
            "blocks": [
                {"kind": "heading", "level": 1, "text": "About Us"},
                {"kind": "paragraph", "text": "Founded in 1897."},
                {"kind": "timeline", "entries": [
                    {"date": "1897", "heading": "Mill opens", "body": "..."}
                ]}
            ]
        });

        let content = PageContent::from_value(&value);
        assert_eq!(content.title.as_deref(), Some("About"));
        assert_eq!(content.blocks.len(), 3);
        assert_eq!(content.blocks[0].kind(), "heading");
        assert!(matches!(
            &content.blocks[2],
            Block::Timeline { entries } if entries[0].date == "1897"
        ));
    }

    #[test]
    fn test_unknown_kind_skipped() {
        let value = json!({
            "blocks": [
                {"kind": "paragraph", "text": "kept"},
                {"kind": "hero_banner", "image": "x.jpg"},
                {"kind": "paragraph", "text": "also kept"}
            ]
        });

        let content = PageContent::from_value(&value);
        assert_eq!(content.blocks.len(), 2);
    }

    #[test]
    fn test_malformed_node_skipped() {
        let value = json!({
            "blocks": [
                {"text": "no kind at all"},
                {"kind": 7},
                {"kind": "heading", "level": "not a number"},
                {"kind": "paragraph", "text": "fine"}
            ]
        });

        let content = PageContent::from_value(&value);
        assert_eq!(content.blocks.len(), 1);
        assert_eq!(content.blocks[0].kind(), "paragraph");
    }

    #[test]
    fn test_columns_recurse_and_keep_known_children() {
        let value = json!({
            "blocks": [{
                "kind": "columns",
                "children": [
                    {"kind": "paragraph", "text": "left"},
                    {"kind": "widget", "x": 1},
                    {"kind": "quote", "text": "right"}
                ]
            }]
        });

        let content = PageContent::from_value(&value);
        let Block::Columns { children } = &content.blocks[0] else {
            panic!("expected columns");
        };
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(PageContent::from_value(&json!({})), PageContent::default());
        assert_eq!(
            PageContent::from_value(&Value::Null),
            PageContent::default()
        );
    }

    #[test]
    fn test_missing_props_take_defaults() {
        let block = Block::from_value(&json!({"kind": "heading"})).unwrap();
        assert_eq!(block, Block::Heading { level: 2, text: String::new() });
    }

    #[test]
    fn test_registry_defaults_parse_to_their_own_kind() {
        for spec in registry() {
            let block = Block::from_value(&spec.defaults)
                .unwrap_or_else(|| panic!("defaults for {} do not parse", spec.kind));
            assert_eq!(block.kind(), spec.kind);
        }
    }

    #[test]
    fn test_registry_fields_are_named_uniquely() {
        for spec in registry() {
            let mut names: Vec<_> = spec.fields.iter().map(|f| f.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), spec.fields.len(), "{} has duplicate fields", spec.kind);
        }
    }

    #[test]
    fn test_serialized_block_round_trips() {
        let block = Block::Quote {
            text: "We remember".to_string(),
            attribution: Some("Parish record".to_string()),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["kind"], "quote");
        assert_eq!(Block::from_value(&value).unwrap(), block);
    }
}
