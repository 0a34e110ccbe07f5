use chrono::Utc;
use clap::Parser;
use renewal_forecast::core::renewal::{BatchSummary, RenewalHandler};
use renewal_forecast::domain::ports::{FixedClock, OpportunityWriter};
use renewal_forecast::utils::error::{ErrorSeverity, RenewalError};
use renewal_forecast::utils::{logger, validation::validate_required_field, validation::Validate};
use renewal_forecast::{
    CliArgs, HttpOpportunityClient, RecordingOpportunityWriter, RenewalConfig, RenewalEvent,
    SnapshotStore,
};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let config = match RenewalConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(args.verbose);
            fail(&e);
        }
    };

    // 初始化日誌
    logger::init_logger(args.verbose, args.json_logs || config.json_logs());

    tracing::info!("Starting renewal-forecast ({})", config.service.name);
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    // 驗證配置
    if let Err(e) = args.validate().and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    let snapshot_path = args
        .snapshot
        .clone()
        .or_else(|| config.snapshot_path().map(str::to_string));
    let store = match validate_required_field("store.snapshot_path", &snapshot_path)
        .and_then(SnapshotStore::from_file)
    {
        Ok(store) => store,
        Err(e) => fail(&e),
    };

    let now = args.now.unwrap_or_else(Utc::now);
    tracing::info!("🕒 Evaluating renewals as of {}", now.to_rfc3339());

    let result = if args.dry_run {
        tracing::info!("🧪 Dry run: commands are recorded, not sent");
        let writer = RecordingOpportunityWriter::new();
        let handler = RenewalHandler::with_clock(store, writer, FixedClock(now))
            .with_retry_policy(config.retry_policy());
        let summary = execute(&handler, &args).await;
        print_commands(handler.writer());
        summary
    } else {
        let mut writer = match HttpOpportunityClient::new(config.endpoint(), config.app_source()) {
            Ok(client) => client.with_headers(config.headers()),
            Err(e) => fail(&e),
        };
        if let Some(timeout) = config.request_timeout() {
            writer = writer.with_timeout(timeout);
        }
        let handler = RenewalHandler::with_clock(store, writer, FixedClock(now))
            .with_retry_policy(config.retry_policy());
        execute(&handler, &args).await
    };

    match result {
        Ok(summary) => report(&summary),
        Err(e) => fail(&e),
    }
}

async fn execute<W: OpportunityWriter>(
    handler: &RenewalHandler<SnapshotStore, W, FixedClock>,
    args: &CliArgs,
) -> Result<BatchSummary, RenewalError> {
    let Some(events_path) = &args.events else {
        return Ok(handler
            .process_batch(&args.tenant, &args.contracts, args.operation)
            .await);
    };

    let events = read_events(events_path)?;
    tracing::info!("📥 {} events loaded from {}", events.len(), events_path);

    let mut summary = BatchSummary::default();
    for event in &events {
        let outcome = handler
            .handle(&event.tenant, &event.contract_id, event.trigger)
            .await;
        summary.record(&event.contract_id, &outcome);
    }
    Ok(summary)
}

/// 讀取 JSON lines 事件檔，空白行略過
fn read_events(path: &str) -> Result<Vec<RenewalEvent>, RenewalError> {
    let content = std::fs::read_to_string(path)?;
    let events = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect::<Result<Vec<RenewalEvent>, _>>()?;

    if events.is_empty() {
        return Err(RenewalError::InvalidState {
            message: format!("no events in {}", path),
        });
    }
    Ok(events)
}

fn print_commands(writer: &RecordingOpportunityWriter) {
    for command in writer.commands() {
        match serde_json::to_string(&command) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Could not serialize {:?}: {}", command, e),
        }
    }
}

fn report(summary: &BatchSummary) {
    println!(
        "📊 {} contracts: {} completed, {} skipped, {} create requested, {} failed",
        summary.total(),
        summary.completed,
        summary.skipped,
        summary.create_requested,
        summary.failed.len()
    );

    if summary.failed.is_empty() {
        tracing::info!("✅ Renewal recalculation completed successfully!");
        return;
    }

    for (contract_id, message) in &summary.failed {
        eprintln!("❌ {}: {}", contract_id, message);
    }
    // 失敗的合約會在下一次觸發時重新計算
    std::process::exit(2);
}

fn fail(e: &RenewalError) -> ! {
    tracing::error!(
        "❌ renewal-forecast failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
