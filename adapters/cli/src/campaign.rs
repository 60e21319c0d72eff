use std::{fs, num::NonZeroU32, path::Path};

use anyhow::{Context, Result};
use lucky_draw_core::{ManualRoundSchedule, DEFAULT_MISS_THRESHOLD, MANUAL_ROUND_PERIOD};
use serde::Deserialize;

/// Campaign-wide settings shared by every round, read from TOML.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CampaignConfig {
    /// Miss counter at which participants are guaranteed a win.
    pub(crate) miss_threshold: u32,
    /// Uids guaranteed to win on manual rounds.
    pub(crate) manual_guaranteed_ids: Vec<String>,
    /// Whether participants who already won stay in the draw.
    pub(crate) allow_repeat_wins: bool,
    /// Rounds between two manual rounds.
    pub(crate) manual_round_period: u32,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            miss_threshold: DEFAULT_MISS_THRESHOLD,
            manual_guaranteed_ids: Vec::new(),
            allow_repeat_wins: true,
            manual_round_period: MANUAL_ROUND_PERIOD.get(),
        }
    }
}

impl CampaignConfig {
    /// Reads the campaign file at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read campaign config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse campaign config at {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("invalid campaign toml")?;
        let _ = config.schedule()?;
        Ok(config)
    }

    /// Manual round schedule described by the configuration.
    pub(crate) fn schedule(&self) -> Result<ManualRoundSchedule> {
        let period = NonZeroU32::new(self.manual_round_period)
            .context("manual_round_period must be at least 1")?;
        Ok(ManualRoundSchedule::every(period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = CampaignConfig::parse("").expect("defaults parse");
        assert_eq!(config, CampaignConfig::default());
        assert_eq!(
            config.schedule().expect("schedule"),
            ManualRoundSchedule::default()
        );
    }

    #[test]
    fn parses_every_field() {
        let config = CampaignConfig::parse(
            r#"
            miss_threshold = 3
            manual_guaranteed_ids = ["U001", "U007"]
            allow_repeat_wins = false
            manual_round_period = 4
            "#,
        )
        .expect("config parses");

        assert_eq!(config.miss_threshold, 3);
        assert_eq!(config.manual_guaranteed_ids, vec!["U001", "U007"]);
        assert!(!config.allow_repeat_wins);
        assert!(config.schedule().expect("schedule").is_manual_round(8));
    }

    #[test]
    fn rejects_zero_period() {
        let error = CampaignConfig::parse("manual_round_period = 0").expect_err("zero period");
        assert!(format!("{error:#}").contains("manual_round_period"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(CampaignConfig::parse("lucky_count = 3").is_err());
    }
}
