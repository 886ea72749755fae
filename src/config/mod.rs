//! Configuration management.

use serde::Deserialize;

/// Main configuration for promptcluster.
#[derive(Debug, Clone, Default)]
pub struct PromptclusterConfig {
    /// Cluster assignment settings.
    pub clustering: ClusteringConfig,
    /// Similarity cache settings.
    pub cache: CacheConfig,
    /// Drift detection settings.
    pub drift: DriftConfig,
}

/// Cluster assignment settings.
#[derive(Debug, Clone)]
pub struct ClusteringConfig {
    /// Minimum similarity score required to join an existing cluster.
    pub similarity_threshold: f32,
    /// Minimum confidence for downstream consumers to act on an assignment.
    pub confidence_threshold: f32,
    /// Candidate count requested from vector search.
    ///
    /// Deliberately generous: candidate gathering optimizes for recall, the
    /// threshold decision happens afterwards.
    pub candidate_limit: usize,
    /// Score floor for vector search, looser than the assignment threshold.
    pub search_score_floor: f32,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            confidence_threshold: 0.7,
            candidate_limit: 50,
            search_score_floor: 0.5,
        }
    }
}

impl ClusteringConfig {
    /// Sets the similarity threshold.
    #[must_use]
    pub const fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Sets the candidate limit.
    #[must_use]
    pub const fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit;
        self
    }

    /// Sets the search score floor.
    #[must_use]
    pub const fn with_search_score_floor(mut self, floor: f32) -> Self {
        self.search_score_floor = floor;
        self
    }
}

/// Similarity cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for cached similarity scores, in seconds.
    pub ttl_secs: u64,
    /// Maximum number of cached entries.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // 1 day
            ttl_secs: 24 * 60 * 60,
            capacity: 4096,
        }
    }
}

/// Drift detection settings.
#[derive(Debug, Clone)]
pub struct DriftConfig {
    /// How many of the newest cluster prompts to analyze.
    pub recent_prompts: usize,
    /// Minimum prompts required before drift analysis is meaningful.
    pub min_prompts: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            recent_prompts: 20,
            min_prompts: 5,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Clustering section.
    pub clustering: Option<ConfigFileClustering>,
    /// Cache section.
    pub cache: Option<ConfigFileCache>,
    /// Drift section.
    pub drift: Option<ConfigFileDrift>,
}

/// Clustering section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileClustering {
    /// Similarity threshold.
    pub similarity_threshold: Option<f32>,
    /// Confidence threshold.
    pub confidence_threshold: Option<f32>,
    /// Candidate limit.
    pub candidate_limit: Option<usize>,
    /// Search score floor.
    pub search_score_floor: Option<f32>,
}

/// Cache section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileCache {
    /// TTL in seconds.
    pub ttl_secs: Option<u64>,
    /// Entry capacity.
    pub capacity: Option<usize>,
}

/// Drift section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDrift {
    /// Recent prompt window.
    pub recent_prompts: Option<usize>,
    /// Minimum prompt count.
    pub min_prompts: Option<usize>,
}

impl PromptclusterConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(&file))
    }

    /// Builds a configuration from a parsed config file, filling gaps with
    /// defaults.
    #[must_use]
    pub fn from_config_file(file: &ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(c) = &file.clustering {
            if let Some(v) = c.similarity_threshold {
                config.clustering.similarity_threshold = v;
            }
            if let Some(v) = c.confidence_threshold {
                config.clustering.confidence_threshold = v;
            }
            if let Some(v) = c.candidate_limit {
                config.clustering.candidate_limit = v;
            }
            if let Some(v) = c.search_score_floor {
                config.clustering.search_score_floor = v;
            }
        }
        if let Some(c) = &file.cache {
            if let Some(v) = c.ttl_secs {
                config.cache.ttl_secs = v;
            }
            if let Some(v) = c.capacity {
                config.cache.capacity = v;
            }
        }
        if let Some(d) = &file.drift {
            if let Some(v) = d.recent_prompts {
                config.drift.recent_prompts = v;
            }
            if let Some(v) = d.min_prompts {
                config.drift.min_prompts = v;
            }
        }

        config
    }

    /// Loads configuration from environment variables over defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("PROMPTCLUSTER_SIMILARITY_THRESHOLD") {
            if let Ok(parsed) = v.parse::<f32>() {
                self.clustering.similarity_threshold = parsed.clamp(0.0, 1.0);
            }
        }
        if let Ok(v) = std::env::var("PROMPTCLUSTER_CANDIDATE_LIMIT") {
            if let Ok(parsed) = v.parse::<usize>() {
                self.clustering.candidate_limit = parsed.max(1);
            }
        }
        if let Ok(v) = std::env::var("PROMPTCLUSTER_SEARCH_SCORE_FLOOR") {
            if let Ok(parsed) = v.parse::<f32>() {
                self.clustering.search_score_floor = parsed.clamp(0.0, 1.0);
            }
        }
        if let Ok(v) = std::env::var("PROMPTCLUSTER_CACHE_TTL_SECS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.cache.ttl_secs = parsed;
            }
        }
        self
    }
}
