//! Output shapes returned by generation providers.

use serde::{Deserialize, Serialize};

/// A file handle that carries its download location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub url: String,
}

/// Every output shape a provider is known to return, resolved once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationOutput {
    SingleUrl(String),
    SingleFileRef(FileRef),
    UrlArray(Vec<String>),
    FileRefArray(Vec<FileRef>),
}

impl GenerationOutput {
    pub fn into_urls(self) -> Vec<String> {
        match self {
            GenerationOutput::SingleUrl(url) => vec![url],
            GenerationOutput::SingleFileRef(file) => vec![file.url],
            GenerationOutput::UrlArray(urls) => urls,
            GenerationOutput::FileRefArray(files) => files.into_iter().map(|f| f.url).collect(),
        }
    }
}
