use std::collections::BTreeMap;
use std::path::Path;

use crate::image_pipeline::common::error::Result;

/// Flat mapping of `Group:TagName` to its textual value.
pub type TagMap = BTreeMap<String, String>;

pub trait MetadataSource {
    fn read_tags(&self, path: &Path) -> Result<TagMap>;
}

/// Serves a fixed tag set regardless of path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTags {
    tags: TagMap,
}

impl InMemoryTags {
    pub fn new(tags: TagMap) -> Self {
        Self { tags }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

impl MetadataSource for InMemoryTags {
    fn read_tags(&self, _path: &Path) -> Result<TagMap> {
        Ok(self.tags.clone())
    }
}
