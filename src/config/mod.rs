pub mod toml_config;

pub use toml_config::RenewalConfig;

#[cfg(feature = "cli")]
use crate::core::trigger::RenewalOperation;
#[cfg(feature = "cli")]
use crate::utils::error::{RenewalError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{validate_entity_id, validate_path, Validate};
#[cfg(feature = "cli")]
use chrono::{DateTime, Utc};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "renewal-forecast")]
#[command(about = "Recalculate renewal dates and ARR forecasts for contracts")]
pub struct CliArgs {
    #[arg(long, default_value = "renewal-forecast.toml")]
    pub config: String,

    /// 覆寫配置中的快照路徑
    #[arg(long)]
    pub snapshot: Option<String>,

    #[arg(long, default_value = "")]
    pub tenant: String,

    #[arg(long = "contract", value_delimiter = ',')]
    pub contracts: Vec<String>,

    #[arg(long, value_enum, default_value = "next-cycle-date-and-arr")]
    pub operation: RenewalOperation,

    /// JSON lines 事件檔，每行一個 RenewalEvent
    #[arg(long, conflicts_with = "contracts")]
    pub events: Option<String>,

    #[arg(long, help = "Evaluate as of this RFC 3339 instant instead of the wall clock")]
    pub now: Option<DateTime<Utc>>,

    #[arg(long, help = "Print the opportunity commands instead of sending them")]
    pub dry_run: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliArgs {
    fn validate(&self) -> Result<()> {
        validate_path("config", &self.config)?;

        if let Some(events) = &self.events {
            return validate_path("events", events);
        }

        validate_entity_id("tenant", &self.tenant)?;
        if self.contracts.is_empty() {
            return Err(RenewalError::MissingConfigError {
                field: "contract".to_string(),
            });
        }
        for contract_id in &self.contracts {
            validate_entity_id("contract", contract_id)?;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contracts_and_operation() {
        let args = CliArgs::try_parse_from([
            "renewal-forecast",
            "--tenant",
            "acme",
            "--contract",
            "c-1,c-2",
            "--contract",
            "c-3",
            "--operation",
            "arr",
            "--now",
            "2024-06-01T00:00:00Z",
        ])
        .unwrap();

        assert_eq!(args.contracts, vec!["c-1", "c-2", "c-3"]);
        assert_eq!(args.operation, RenewalOperation::Arr);
        assert!(args.now.is_some());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_missing_tenant_or_contract_fails_validation() {
        let args = CliArgs::try_parse_from(["renewal-forecast", "--contract", "c-1"]).unwrap();
        assert!(args.validate().is_err());

        let args = CliArgs::try_parse_from(["renewal-forecast", "--tenant", "acme"]).unwrap();
        assert!(matches!(
            args.validate(),
            Err(RenewalError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_padded_contract_id_fails_validation() {
        let args = CliArgs::try_parse_from([
            "renewal-forecast",
            "--tenant",
            "acme",
            "--contract",
            "c-1, c-2",
        ])
        .unwrap();
        assert!(matches!(
            args.validate(),
            Err(RenewalError::InvalidConfigValueError { field, .. }) if field == "contract"
        ));
    }

    #[test]
    fn test_events_file_replaces_contract_list() {
        let args =
            CliArgs::try_parse_from(["renewal-forecast", "--events", "events.jsonl"]).unwrap();
        assert!(args.validate().is_ok());
        assert_eq!(args.operation, RenewalOperation::NextCycleDateAndArr);
    }
}
