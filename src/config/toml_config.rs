use crate::core::retry::RetryPolicy;
use crate::utils::error::{RenewalError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_retry_delay_ms,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalConfig {
    pub service: ServiceConfig,
    pub opportunity_service: OpportunityServiceConfig,
    pub retry: Option<RetryConfig>,
    pub store: Option<StoreConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub app_source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityServiceConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub json: Option<bool>,
}

impl RenewalConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RenewalError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RenewalError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPPORTUNITY_API_KEY})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RenewalError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 呼叫商機服務時帶上的 appSource
    pub fn app_source(&self) -> &str {
        self.service
            .app_source
            .as_deref()
            .unwrap_or(&self.service.name)
    }

    pub fn endpoint(&self) -> &str {
        &self.opportunity_service.endpoint
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.opportunity_service
            .timeout_seconds
            .map(Duration::from_secs)
    }

    pub fn headers(&self) -> HashMap<String, String> {
        self.opportunity_service.headers.clone().unwrap_or_default()
    }

    /// 取得重試策略，未設定時預設重試一次
    pub fn retry_policy(&self) -> RetryPolicy {
        let default = RetryPolicy::default();
        match &self.retry {
            Some(retry) => RetryPolicy::new(
                retry.max_attempts.unwrap_or(default.max_attempts),
                retry
                    .delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(default.delay),
            ),
            None => default,
        }
    }

    pub fn snapshot_path(&self) -> Option<&str> {
        self.store.as_ref().and_then(|s| s.snapshot_path.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("service.name", &self.service.name)?;
        validate_non_empty_string("service.app_source", self.app_source())?;
        validate_url("opportunity_service.endpoint", self.endpoint())?;

        if let Some(timeout) = self.opportunity_service.timeout_seconds {
            validate_range("opportunity_service.timeout_seconds", timeout, 1, 300)?;
        }

        if let Some(headers) = &self.opportunity_service.headers {
            for (key, value) in headers {
                if value.starts_with("${") {
                    return Err(RenewalError::InvalidConfigValueError {
                        field: format!("opportunity_service.headers.{}", key),
                        value: value.clone(),
                        reason: "Environment variable is not set".to_string(),
                    });
                }
            }
        }

        if let Some(retry) = &self.retry {
            if let Some(attempts) = retry.max_attempts {
                validate_range("retry.max_attempts", attempts, 1, 10)?;
            }
            if let Some(delay_ms) = retry.delay_ms {
                validate_retry_delay_ms("retry.delay_ms", delay_ms)?;
            }
        }

        if let Some(path) = self.snapshot_path() {
            validate_path("store.snapshot_path", path)?;
        }

        Ok(())
    }
}

impl Validate for RenewalConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[service]
name = "renewal-forecast"

[opportunity_service]
endpoint = "https://opportunities.example.com/api"
timeout_seconds = 10

[retry]
max_attempts = 3
delay_ms = 50

[store]
snapshot_path = "./data/snapshot.json"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = RenewalConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.service.name, "renewal-forecast");
        assert_eq!(config.app_source(), "renewal-forecast");
        assert_eq!(config.endpoint(), "https://opportunities.example.com/api");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(3, Duration::from_millis(50))
        );
        assert_eq!(config.snapshot_path(), Some("./data/snapshot.json"));
        assert!(!config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = RenewalConfig::from_toml_str(
            r#"
[service]
name = "svc"
app_source = "event-processing"

[opportunity_service]
endpoint = "http://localhost:8080"
"#,
        )
        .unwrap();

        assert_eq!(config.app_source(), "event-processing");
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.headers().is_empty());
        assert!(config.snapshot_path().is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RENEWAL_TEST_API_KEY", "secret-key");

        let config = RenewalConfig::from_toml_str(
            r#"
[service]
name = "svc"

[opportunity_service]
endpoint = "https://opportunities.example.com"
headers = { "X-Openline-API-KEY" = "${RENEWAL_TEST_API_KEY}" }
"#,
        )
        .unwrap();
        assert_eq!(
            config.headers().get("X-Openline-API-KEY").map(String::as_str),
            Some("secret-key")
        );
        assert!(config.validate().is_ok());

        std::env::remove_var("RENEWAL_TEST_API_KEY");
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let config = RenewalConfig::from_toml_str(
            r#"
[service]
name = "svc"

[opportunity_service]
endpoint = "https://opportunities.example.com"
headers = { "X-Openline-API-KEY" = "${RENEWAL_TEST_SURELY_UNSET_VAR}" }
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(RenewalError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let bad_endpoint = BASIC.replace("https://opportunities.example.com/api", "invalid-url");
        let config = RenewalConfig::from_toml_str(&bad_endpoint).unwrap();
        assert!(config.validate().is_err());

        let bad_attempts = BASIC.replace("max_attempts = 3", "max_attempts = 0");
        let config = RenewalConfig::from_toml_str(&bad_attempts).unwrap();
        assert!(config.validate().is_err());

        let slow_retry = BASIC.replace("delay_ms = 50", "delay_ms = 600000");
        let config = RenewalConfig::from_toml_str(&slow_retry).unwrap();
        assert!(matches!(
            config.validate(),
            Err(RenewalError::InvalidConfigValueError { field, .. }) if field == "retry.delay_ms"
        ));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            RenewalConfig::from_toml_str("[service"),
            Err(RenewalError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = RenewalConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.service.name, "renewal-forecast");
    }
}
