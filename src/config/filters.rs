//! Extension points applied once while building a rule set.
//!
//! "filter dirs" sees the raw directory lines before normalization and may add
//! or remove entries. "filter levels" sees the default severity mask and may
//! replace it. Filters run in registration order.

use crate::config::rules::RuleSet;
use crate::config::settings::Settings;
use crate::config::types::SeverityMask;

pub type DirsFilter = Box<dyn Fn(Vec<String>) -> Vec<String> + Send + Sync>;
pub type LevelsFilter = Box<dyn Fn(SeverityMask) -> SeverityMask + Send + Sync>;

#[derive(Default)]
pub struct Extensions {
    dirs: Vec<DirsFilter>,
    levels: Vec<LevelsFilter>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_dirs<F>(mut self, filter: F) -> Self
    where
        F: Fn(Vec<String>) -> Vec<String> + Send + Sync + 'static,
    {
        self.dirs.push(Box::new(filter));
        self
    }

    pub fn filter_levels<F>(mut self, filter: F) -> Self
    where
        F: Fn(SeverityMask) -> SeverityMask + Send + Sync + 'static,
    {
        self.levels.push(Box::new(filter));
        self
    }

    pub fn apply_dirs(&self, dirs: Vec<String>) -> Vec<String> {
        self.dirs.iter().fold(dirs, |acc, filter| filter(acc))
    }

    pub fn apply_levels(&self, mask: SeverityMask) -> SeverityMask {
        self.levels.iter().fold(mask, |acc, filter| filter(acc))
    }

    pub fn build_rules(&self, settings: &Settings) -> RuleSet {
        let dirs = self.apply_dirs(settings.dir_lines());
        let mask = self.apply_levels(SeverityMask::default());
        RuleSet::new(dirs, mask)
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("dirs", &self.dirs.len())
            .field("levels", &self.levels.len())
            .finish()
    }
}
