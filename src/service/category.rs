//! Result categories
//!
//! Each kind of analysis result lives in its own cache. The payload type
//! decides the category through [`CategoryResult`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::LruCache;
use crate::models::{
    CommandLineInfo, DllInfo, MalwareDetection, NetworkConnectionInfo, ProcessInfo,
};
use crate::service::CachingService;

// == Category ==
/// Kind of analysis result, one cache per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Processes,
    CommandLines,
    #[serde(rename = "DLLs")]
    Dlls,
    Networks,
    Malware,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Processes,
        Category::CommandLines,
        Category::Dlls,
        Category::Networks,
        Category::Malware,
    ];

    /// Label used in cache keys, logs and the statistics export.
    pub fn label(self) -> &'static str {
        match self {
            Category::Processes => "Processes",
            Category::CommandLines => "CommandLines",
            Category::Dlls => "DLLs",
            Category::Networks => "Networks",
            Category::Malware => "Malware",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// == Category Result ==
/// Binds a result record type to its category cache.
pub trait CategoryResult: Clone + Send + Sync + 'static {
    const CATEGORY: Category;

    /// The cache holding result sets of this type.
    fn cache(service: &CachingService) -> &LruCache<Vec<Self>>;
}

impl CategoryResult for ProcessInfo {
    const CATEGORY: Category = Category::Processes;

    fn cache(service: &CachingService) -> &LruCache<Vec<Self>> {
        &service.processes
    }
}

impl CategoryResult for CommandLineInfo {
    const CATEGORY: Category = Category::CommandLines;

    fn cache(service: &CachingService) -> &LruCache<Vec<Self>> {
        &service.command_lines
    }
}

impl CategoryResult for DllInfo {
    const CATEGORY: Category = Category::Dlls;

    fn cache(service: &CachingService) -> &LruCache<Vec<Self>> {
        &service.dlls
    }
}

impl CategoryResult for NetworkConnectionInfo {
    const CATEGORY: Category = Category::Networks;

    fn cache(service: &CachingService) -> &LruCache<Vec<Self>> {
        &service.networks
    }
}

impl CategoryResult for MalwareDetection {
    const CATEGORY: Category = Category::Malware;

    fn cache(service: &CachingService) -> &LruCache<Vec<Self>> {
        &service.malware
    }
}
