pub mod block;
pub mod render;
pub mod slug;

pub use block::{Block, BlockSpec, FieldKind, FieldSpec, PageContent, registry};
pub use render::{escape_html, render_block, render_content, render_document};
pub use slug::{is_valid_slug, slugify};
