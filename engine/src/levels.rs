use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Upper bound on distinct gem kinds; matches the shipped sprite set.
pub const MAX_GEM_KINDS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// How many distinct gem kinds the grid draws from at this difficulty.
    pub fn gem_kind_count(self) -> u8 {
        match self {
            Difficulty::Easy => 3,
            Difficulty::Medium => 4,
            Difficulty::Hard => 6,
        }
    }
}

/// One score band and the countdown budget that applies inside it.
/// `max_score` is exclusive; `None` marks the terminal unbounded band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelConfig {
    pub level: u32,
    pub min_score: u32,
    pub max_score: Option<u32>,
    pub time_limit_secs: u32,
}

const EASY_LEVELS: [LevelConfig; 4] = [
    LevelConfig { level: 1, min_score: 0, max_score: Some(200_000), time_limit_secs: 25 },
    LevelConfig { level: 2, min_score: 200_000, max_score: Some(400_000), time_limit_secs: 15 },
    LevelConfig { level: 3, min_score: 400_000, max_score: Some(600_000), time_limit_secs: 8 },
    LevelConfig { level: 4, min_score: 600_000, max_score: None, time_limit_secs: 5 },
];

const MEDIUM_LEVELS: [LevelConfig; 4] = [
    LevelConfig { level: 1, min_score: 0, max_score: Some(80_000), time_limit_secs: 25 },
    LevelConfig { level: 2, min_score: 80_000, max_score: Some(160_000), time_limit_secs: 15 },
    LevelConfig { level: 3, min_score: 160_000, max_score: Some(240_000), time_limit_secs: 8 },
    LevelConfig { level: 4, min_score: 240_000, max_score: None, time_limit_secs: 5 },
];

const HARD_LEVELS: [LevelConfig; 4] = [
    LevelConfig { level: 1, min_score: 0, max_score: Some(20_000), time_limit_secs: 25 },
    LevelConfig { level: 2, min_score: 20_000, max_score: Some(40_000), time_limit_secs: 15 },
    LevelConfig { level: 3, min_score: 40_000, max_score: Some(60_000), time_limit_secs: 8 },
    LevelConfig { level: 4, min_score: 60_000, max_score: None, time_limit_secs: 5 },
];

fn builtin_entries(difficulty: Difficulty) -> &'static [LevelConfig] {
    match difficulty {
        Difficulty::Easy => &EASY_LEVELS,
        Difficulty::Medium => &MEDIUM_LEVELS,
        Difficulty::Hard => &HARD_LEVELS,
    }
}

/// Ordered score bands for one difficulty. Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTable {
    entries: Vec<LevelConfig>,
}

impl LevelTable {
    pub fn builtin(difficulty: Difficulty) -> Self {
        Self {
            entries: builtin_entries(difficulty).to_vec(),
        }
    }

    /// Build a table from caller-supplied bands, falling back to the
    /// built-in table for `difficulty` when the list is unusable.
    pub fn from_entries(entries: Vec<LevelConfig>, difficulty: Difficulty) -> Self {
        let mut entries: Vec<LevelConfig> = entries
            .into_iter()
            .map(|mut cfg| {
                cfg.time_limit_secs = cfg.time_limit_secs.max(1);
                cfg
            })
            .collect();
        entries.sort_unstable_by_key(|cfg| cfg.min_score);
        if entries.is_empty() {
            return Self::builtin(difficulty);
        }
        Self { entries }
    }

    /// First band whose `[min_score, max_score)` contains `score`,
    /// else the last band.
    pub fn level_for_score(&self, score: u32) -> LevelConfig {
        for cfg in &self.entries {
            let above_min = score >= cfg.min_score;
            let below_max = cfg.max_score.is_none_or(|max| score < max);
            if above_min && below_max {
                return *cfg;
            }
        }
        *self.entries.last().expect("level table is never empty")
    }

    pub fn entries(&self) -> &[LevelConfig] {
        &self.entries
    }
}

/// Tunable level bands for every difficulty, loadable from disk so designers
/// can iterate without a rebuild. Missing sections fall back to built-ins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelOverrides {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_easy")]
    pub easy: Vec<LevelConfig>,
    #[serde(default = "default_medium")]
    pub medium: Vec<LevelConfig>,
    #[serde(default = "default_hard")]
    pub hard: Vec<LevelConfig>,
}

fn default_version() -> u32 {
    1
}

fn default_easy() -> Vec<LevelConfig> {
    EASY_LEVELS.to_vec()
}

fn default_medium() -> Vec<LevelConfig> {
    MEDIUM_LEVELS.to_vec()
}

fn default_hard() -> Vec<LevelConfig> {
    HARD_LEVELS.to_vec()
}

impl Default for LevelOverrides {
    fn default() -> Self {
        Self {
            version: default_version(),
            easy: default_easy(),
            medium: default_medium(),
            hard: default_hard(),
        }
    }
}

impl LevelOverrides {
    pub fn table(&self, difficulty: Difficulty) -> LevelTable {
        let entries = match difficulty {
            Difficulty::Easy => self.easy.clone(),
            Difficulty::Medium => self.medium.clone(),
            Difficulty::Hard => self.hard.clone(),
        };
        LevelTable::from_entries(entries, difficulty)
    }
}

#[derive(Debug, Clone)]
pub struct LevelStore {
    path: PathBuf,
}

impl LevelStore {
    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("BLOSSOM_LEVELS_PATH") {
            return Self {
                path: PathBuf::from(explicit),
            };
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("blossom-match");
        path.push("levels.json");
        Self { path }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> LevelOverrides {
        let Ok(bytes) = fs::read(&self.path) else {
            return LevelOverrides::default();
        };
        serde_json::from_slice::<LevelOverrides>(&bytes).unwrap_or_default()
    }

    pub fn save(&self, overrides: &LevelOverrides) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(overrides)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}
