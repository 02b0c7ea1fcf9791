use crate::debounce::DEFAULT_DEBOUNCE;
use crate::form::FormKind;
use crate::mail::DEFAULT_ENDPOINT;
use crate::rate_limit::DEFAULT_COOLDOWN;
use crate::submitter::{Destination, RetryPolicy};
use crate::validation::{parse_time, BusinessHours};
use anyhow::{anyhow, Context, Result};
use chrono::Weekday;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_VAR: &str = "FORMRELAY_CONFIG_PATH";

/// Upper bound on configured retries
pub const MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub business_hours: BusinessHoursConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MailConfig {
    pub endpoint: String,
    pub service_id: String,
    pub booking_template: String,
    pub contact_template: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            service_id: "YOUR_EMAILJS_SERVICE_ID".to_string(),
            booking_template: "YOUR_BOOKING_TEMPLATE_ID".to_string(),
            contact_template: "YOUR_CONTACT_TEMPLATE_ID".to_string(),
        }
    }
}

impl MailConfig {
    pub fn destination(&self, kind: FormKind) -> Destination {
        let template = match kind {
            FormKind::Booking => &self.booking_template,
            FormKind::Contact => &self.contact_template,
        };
        Destination::new(&self.service_id, template)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SubmissionConfig {
    pub cooldown_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub debounce_ms: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN.as_millis() as u64,
            max_retries: RetryPolicy::default().max_retries,
            retry_base_delay_ms: RetryPolicy::default().base_delay.as_millis() as u64,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl SubmissionConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Retry policy, with `max_retries` capped at [`MAX_RETRIES`]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.min(MAX_RETRIES),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BusinessHoursConfig {
    /// Opening time, HH:MM
    pub start: String,
    /// Closing time (exclusive), HH:MM
    pub end: String,
    /// Open weekdays, 0 = Sunday through 6 = Saturday
    pub days: Vec<u8>,
}

impl Default for BusinessHoursConfig {
    fn default() -> Self {
        Self { start: "08:00".to_string(), end: "16:00".to_string(), days: vec![1, 2, 3, 4, 5, 6] }
    }
}

impl BusinessHoursConfig {
    pub fn to_business_hours(&self) -> Result<BusinessHours> {
        let start = parse_time(&self.start)
            .ok_or_else(|| anyhow!("Invalid business hours start '{}'", self.start))?;
        let end = parse_time(&self.end)
            .ok_or_else(|| anyhow!("Invalid business hours end '{}'", self.end))?;
        if start >= end {
            return Err(anyhow!(
                "Business hours start {} must be before end {}",
                self.start,
                self.end
            ));
        }
        let days = self
            .days
            .iter()
            .map(|&d| weekday_from_number(d).ok_or_else(|| anyhow!("Invalid weekday number {}", d)))
            .collect::<Result<Vec<_>>>()?;
        Ok(BusinessHours { start, end, days })
    }
}

fn weekday_from_number(day: u8) -> Option<Weekday> {
    match day {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        // If config doesn't exist, create default
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save_to(config_path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(config_path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.business_hours.to_business_hours().context("Invalid [business_hours] section")?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }
}

/// Config file location, overridable through `FORMRELAY_CONFIG_PATH`
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let proj_dirs = ProjectDirs::from("com", "formrelay", "formrelay")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}
