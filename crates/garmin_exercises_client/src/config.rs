use std::time::Duration;

use crate::ExercisesError;
use crate::catalog::SourceCatalog;
use crate::retry::RetryPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub video_base_url: String,
    pub locale: String,
    /// Detail lookups in flight at once.
    pub concurrency: usize,
    /// Pause each worker takes before issuing a detail request.
    pub request_spacing: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub verify_media: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://connect.garmin.com".into(),
            video_base_url: "https://connectvideo.garmin.com".into(),
            locale: "en-US".into(),
            concurrency: 4,
            request_spacing: Duration::from_millis(250),
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
            verify_media: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ExercisesError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, ExercisesError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let concurrency: usize =
            parse_or(&mut get, "GARMIN_EXERCISES_CONCURRENCY", defaults.concurrency)?;
        if concurrency == 0 {
            return Err(ExercisesError::Config(
                "GARMIN_EXERCISES_CONCURRENCY must be at least 1".into(),
            ));
        }
        Ok(Self {
            base_url: get("GARMIN_EXERCISES_BASE_URL").unwrap_or(defaults.base_url),
            video_base_url: get("GARMIN_EXERCISES_VIDEO_BASE_URL")
                .unwrap_or(defaults.video_base_url),
            locale: get("GARMIN_EXERCISES_LOCALE").unwrap_or(defaults.locale),
            concurrency,
            request_spacing: Duration::from_millis(parse_or(
                &mut get,
                "GARMIN_EXERCISES_REQUEST_SPACING_MS",
                defaults.request_spacing.as_millis() as u64,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                &mut get,
                "GARMIN_EXERCISES_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            max_retries: parse_or(
                &mut get,
                "GARMIN_EXERCISES_MAX_RETRIES",
                defaults.max_retries,
            )?,
            verify_media: parse_or(
                &mut get,
                "GARMIN_EXERCISES_VERIFY_MEDIA",
                defaults.verify_media,
            )?,
        })
    }

    pub fn catalog(&self) -> SourceCatalog {
        SourceCatalog::new(&self.base_url, &self.video_base_url, self.locale.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }
}

fn parse_or<F, T>(get: &mut F, key: &str, default: T) -> Result<T, ExercisesError>
where
    F: FnMut(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ExercisesError::Config(format!("{key}={raw:?}: {e}"))),
    }
}
