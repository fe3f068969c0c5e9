//! Wiki engine: generation client, markup and rendering, persistence and
//! effect execution.
mod engine;
mod gemini;
mod generate;
mod html;
mod markup;
mod persist;
mod render;
mod types;

pub use engine::EngineHandle;
pub use gemini::GeminiGenerator;
pub use generate::{ArticleStream, Generator, GeneratorSettings, SourceSet};
pub use html::{sources_to_html, to_html};
pub use markup::{decode_wiki_href, transform_wiki_links, wiki_href, WIKI_LINK_PREFIX};
pub use persist::{
    ensure_store_dir, AtomicFileWriter, FileStore, KeyValueStore, MemoryStore, PersistError,
};
pub use render::{render_document, Activation, Block, Document, Inline, LinkControl, LinkTarget};
pub use types::{EngineEvent, GenerationError, GroundingSource, PartialArticle, RequestId};
