use async_trait::async_trait;

use vista_types::{FetchContext, Source, SourceData, SourceResult};

use crate::fragment::section;

/// A source with fixed content. Useful for notes, banners and tests.
#[derive(Clone, Debug)]
pub struct StaticSource {
    name: String,
    data: SourceData,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, html: &str) -> Self {
        let name = name.into();
        let data = SourceData::new(section(&name, html));
        Self { name, data }
    }

    pub fn with_simplified(mut self, html: &str) -> Self {
        self.data = self.data.with_simplified(section(&self.name, html));
        self
    }

    pub fn with_summary(mut self, lines: Vec<String>) -> Self {
        self.data.summary = lines;
        self
    }
}

#[async_trait]
impl Source for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _ctx: &FetchContext) -> SourceResult<SourceData> {
        Ok(self.data.clone())
    }
}
