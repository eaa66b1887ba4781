//! Tunable limits and collaborators for analysis runs.

use crate::decompiler::Decompiler;

/// Default cap on nested archive recursion.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Default cap on the number of staged artifacts per run.
pub const DEFAULT_MAX_ARTIFACTS: usize = 512;

/// Default staging byte budget per run.
pub const DEFAULT_STAGING_BUDGET: u64 = 256 * 1024 * 1024;

/// Configuration shared by every run of one [`crate::AnalysisPipeline`].
///
/// The limits exist to bound adversarial inputs; hitting one truncates the
/// run with a warning detection instead of failing it. The decompiler is
/// opt-in so a default configuration never spawns external processes.
///
/// # Examples
///
/// ```rust,no_run
/// use pyscope::decompiler::Decompiler;
/// use pyscope::pipeline::AnalysisConfig;
///
/// let config = AnalysisConfig::default().with_decompiler(Decompiler::new());
/// assert_eq!(config.max_depth, 5);
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Maximum nesting depth for archives inside archives.
    pub max_depth: usize,
    /// Maximum number of artifacts staged per run.
    pub max_artifacts: usize,
    /// Staging byte budget per run.
    pub staging_budget: u64,
    /// Optional external bytecode decompiler.
    pub decompiler: Option<Decompiler>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_artifacts: DEFAULT_MAX_ARTIFACTS,
            staging_budget: DEFAULT_STAGING_BUDGET,
            decompiler: None,
        }
    }
}

impl AnalysisConfig {
    /// Sets the archive recursion depth cap.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the artifact count cap.
    #[must_use]
    pub fn with_max_artifacts(mut self, max_artifacts: usize) -> Self {
        self.max_artifacts = max_artifacts;
        self
    }

    /// Sets the staging byte budget.
    #[must_use]
    pub fn with_staging_budget(mut self, staging_budget: u64) -> Self {
        self.staging_budget = staging_budget;
        self
    }

    /// Enables bytecode decompilation through `decompiler`.
    #[must_use]
    pub fn with_decompiler(mut self, decompiler: Decompiler) -> Self {
        self.decompiler = Some(decompiler);
        self
    }
}
