pub mod crc;
pub mod chunk;
pub mod scanner;
pub mod container;
pub mod metadata;
pub mod search;

pub use chunk::{Chunk, ChunkError, ChunkType, extract_resolution, extract_text};
pub use container::{ContainerError, ReadOptions, read_description, read_resolution, write_description};
pub use metadata::{decode_file, decode_text, MetadataError, ScreenshotMetadata};
pub use scanner::{find_chunk, ChunkLocation};
pub use search::{search_directory, MetadataCache, SearchQuery};
