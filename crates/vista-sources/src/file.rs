use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use vista_types::{FetchContext, Source, SourceData, SourceError, SourceResult};

use crate::fragment::section;

/// Reads its fragment from disk on every fetch.
#[derive(Clone, Debug)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    simplified_path: Option<PathBuf>,
}

impl FileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            simplified_path: None,
        }
    }

    pub fn with_simplified(mut self, path: impl Into<PathBuf>) -> Self {
        self.simplified_path = Some(path.into());
        self
    }
}

#[async_trait]
impl Source for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, ctx: &FetchContext) -> SourceResult<SourceData> {
        ctx.run(async {
            let html = tokio::fs::read_to_string(&self.path).await?;
            debug!(
                source = %self.name,
                path = %self.path.display(),
                bytes = html.len(),
                "file read"
            );
            let mut data = SourceData::new(section(&self.name, &html));
            if let Some(path) = &self.simplified_path {
                let lite = tokio::fs::read_to_string(path).await?;
                data = data.with_simplified(section(&self.name, &lite));
            }
            Ok::<_, SourceError>(data)
        })
        .await
    }
}
