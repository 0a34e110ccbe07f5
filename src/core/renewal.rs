use crate::core::arr::calculate_max_arr;
use crate::core::cycle_date::next_cycle_date;
use crate::core::likelihood::{adjust_by_likelihood, decide_likelihood_transition};
use crate::core::retry::{call_with_retry, RetryPolicy};
use crate::core::trigger::{RenewalOperation, RenewalTrigger};
use crate::domain::model::{Contract, Opportunity, RenewalLikelihood};
use crate::domain::ports::{
    Clock, ContractReader, OpportunityReader, OpportunityWriter, ServiceLineItemReader,
    SystemClock,
};
use crate::utils::error::RenewalError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalStep {
    LoadContract,
    LoadOpportunity,
    CreateOpportunity,
    CloseOpportunity,
    NextCycleDate,
    LoadServiceLineItems,
    CalculateArr,
    UpdateAmounts,
    UpdateLikelihood,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ContractNotFound,
    NotFrequencyBased,
    NoRenewalOpportunity,
}

/// 單一合約重新計算後實際送出的變更
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenewalReport {
    pub opportunity_id: String,
    pub opportunity_closed: bool,
    pub renewed_at: Option<DateTime<Utc>>,
    pub renewed_at_changed: bool,
    pub amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub likelihood_changed_to: Option<RenewalLikelihood>,
}

impl RenewalReport {
    fn new(opportunity_id: &str) -> Self {
        Self {
            opportunity_id: opportunity_id.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenewalOutcome {
    Skipped(SkipReason),
    OpportunityCreateRequested,
    Completed(RenewalReport),
    Failed { step: RenewalStep, message: String },
}

impl RenewalOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub completed: usize,
    pub skipped: usize,
    pub create_requested: usize,
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn record(&mut self, contract_id: &str, outcome: &RenewalOutcome) {
        match outcome {
            RenewalOutcome::Completed(_) => self.completed += 1,
            RenewalOutcome::Skipped(_) => self.skipped += 1,
            RenewalOutcome::OpportunityCreateRequested => self.create_requested += 1,
            RenewalOutcome::Failed { message, .. } => {
                self.failed.push((contract_id.to_string(), message.clone()))
            }
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.skipped + self.create_requested + self.failed.len()
    }
}

struct StepFailure {
    step: RenewalStep,
    error: RenewalError,
}

fn at(step: RenewalStep) -> impl FnOnce(RenewalError) -> StepFailure {
    move |error| StepFailure { step, error }
}

enum Loaded {
    Ready(Contract, Opportunity),
    Done(RenewalOutcome),
}

/// Recomputes the active renewal opportunity of a contract and pushes the
/// changes to the opportunity service.
///
/// Every entry point returns a [`RenewalOutcome`]; read and write failures
/// are logged and reported, never propagated, so one bad contract cannot
/// stop a batch.
pub struct RenewalHandler<R, W, K = SystemClock> {
    repository: R,
    writer: W,
    clock: K,
    retry: RetryPolicy,
}

impl<R, W> RenewalHandler<R, W, SystemClock> {
    pub fn new(repository: R, writer: W) -> Self {
        Self::with_clock(repository, writer, SystemClock)
    }
}

impl<R, W, K> RenewalHandler<R, W, K> {
    pub fn with_clock(repository: R, writer: W, clock: K) -> Self {
        Self {
            repository,
            writer,
            clock,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<R, W, K> RenewalHandler<R, W, K>
where
    R: ContractReader + OpportunityReader + ServiceLineItemReader,
    W: OpportunityWriter,
    K: Clock,
{
    pub async fn handle(
        &self,
        tenant: &str,
        contract_id: &str,
        trigger: RenewalTrigger,
    ) -> RenewalOutcome {
        tracing::debug!("Contract {} triggered by {:?}", contract_id, trigger);
        self.run(tenant, contract_id, trigger.operation()).await
    }

    pub async fn run(
        &self,
        tenant: &str,
        contract_id: &str,
        operation: RenewalOperation,
    ) -> RenewalOutcome {
        let span = tracing::info_span!(
            "renewal",
            tenant = %tenant,
            contract_id = %contract_id,
            operation = operation.as_str()
        );

        async {
            let outcome = match operation {
                RenewalOperation::NextCycleDateAndArr => {
                    self.next_cycle_date_and_arr(tenant, contract_id).await
                }
                RenewalOperation::NextCycleDate => self.next_cycle_date(tenant, contract_id).await,
                RenewalOperation::Arr => self.arr(tenant, contract_id).await,
                RenewalOperation::Likelihood => self.likelihood(tenant, contract_id).await,
            };
            match &outcome {
                RenewalOutcome::Failed { step, message } => {
                    tracing::error!("❌ Renewal update failed at {:?}: {}", step, message)
                }
                other => tracing::info!("✅ Renewal update finished: {:?}", other),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    pub async fn update_renewal_next_cycle_date_and_arr(
        &self,
        tenant: &str,
        contract_id: &str,
    ) -> RenewalOutcome {
        self.run(tenant, contract_id, RenewalOperation::NextCycleDateAndArr)
            .await
    }

    pub async fn update_renewal_next_cycle_date(
        &self,
        tenant: &str,
        contract_id: &str,
    ) -> RenewalOutcome {
        self.run(tenant, contract_id, RenewalOperation::NextCycleDate)
            .await
    }

    pub async fn update_renewal_arr(&self, tenant: &str, contract_id: &str) -> RenewalOutcome {
        self.run(tenant, contract_id, RenewalOperation::Arr).await
    }

    pub async fn update_renewal_likelihood(
        &self,
        tenant: &str,
        contract_id: &str,
    ) -> RenewalOutcome {
        self.run(tenant, contract_id, RenewalOperation::Likelihood)
            .await
    }

    /// 依序處理多個合約，單一合約失敗不影響其他合約
    pub async fn process_batch(
        &self,
        tenant: &str,
        contract_ids: &[String],
        operation: RenewalOperation,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for contract_id in contract_ids {
            let outcome = self.run(tenant, contract_id, operation).await;
            summary.record(contract_id, &outcome);
        }
        tracing::info!(
            "📊 Batch finished: {} completed, {} skipped, {} create requested, {} failed",
            summary.completed,
            summary.skipped,
            summary.create_requested,
            summary.failed.len()
        );
        summary
    }

    async fn next_cycle_date_and_arr(&self, tenant: &str, contract_id: &str) -> RenewalOutcome {
        let now = self.clock.now();
        let (contract, opportunity) = match self.load(tenant, contract_id, now).await {
            Loaded::Ready(contract, opportunity) => (contract, opportunity),
            Loaded::Done(outcome) => return outcome,
        };

        let mut report = RenewalReport::new(&opportunity.id);
        let result = async {
            self.apply_next_cycle_date(tenant, &contract, &opportunity, now, &mut report)
                .await?;
            self.apply_arr(tenant, &contract, &opportunity, now, &mut report)
                .await
        }
        .await;

        finish(report, result)
    }

    async fn next_cycle_date(&self, tenant: &str, contract_id: &str) -> RenewalOutcome {
        let now = self.clock.now();
        let (contract, opportunity) = match self.load(tenant, contract_id, now).await {
            Loaded::Ready(contract, opportunity) => (contract, opportunity),
            Loaded::Done(outcome) => return outcome,
        };

        let mut report = RenewalReport::new(&opportunity.id);
        let result = self
            .apply_next_cycle_date(tenant, &contract, &opportunity, now, &mut report)
            .await;
        finish(report, result)
    }

    async fn arr(&self, tenant: &str, contract_id: &str) -> RenewalOutcome {
        let now = self.clock.now();
        let (contract, opportunity) = match self.load(tenant, contract_id, now).await {
            Loaded::Ready(contract, opportunity) => (contract, opportunity),
            Loaded::Done(outcome) => return outcome,
        };

        let mut report = RenewalReport::new(&opportunity.id);
        let result = self
            .apply_arr(tenant, &contract, &opportunity, now, &mut report)
            .await;
        finish(report, result)
    }

    async fn likelihood(&self, tenant: &str, contract_id: &str) -> RenewalOutcome {
        let opportunity = match self
            .repository
            .get_active_renewal_opportunity_for_contract(tenant, contract_id)
            .await
        {
            Ok(Some(opportunity)) => opportunity,
            Ok(None) => {
                tracing::info!("No open renewal opportunity found for contract {}", contract_id);
                return RenewalOutcome::Skipped(SkipReason::NoRenewalOpportunity);
            }
            Err(e) => return failed(RenewalStep::LoadOpportunity, e),
        };

        let contract = match self.repository.get_contract_by_id(tenant, contract_id).await {
            Ok(contract) => contract,
            Err(RenewalError::NotFound { .. }) => {
                tracing::info!("Contract {} not found, nothing to do", contract_id);
                return RenewalOutcome::Skipped(SkipReason::ContractNotFound);
            }
            Err(e) => return failed(RenewalStep::LoadContract, e),
        };

        let mut report = RenewalReport::new(&opportunity.id);
        let decided = decide_likelihood_transition(
            contract.ended_at,
            opportunity.renewal_likelihood,
            opportunity.renewed_at,
        );

        if let Some(likelihood) = decided {
            tracing::info!(
                "Renewal likelihood of opportunity {} changes {:?} -> {:?}",
                opportunity.id,
                opportunity.renewal_likelihood,
                likelihood
            );
            let writer = &self.writer;
            let opportunity_id = opportunity.id.as_str();
            let result = call_with_retry(self.retry, "UpdateRenewalOpportunity", move || {
                writer.update_renewal_likelihood(tenant, opportunity_id, likelihood)
            })
            .await;
            if let Err(e) = result {
                return failed(RenewalStep::UpdateLikelihood, e);
            }
            report.likelihood_changed_to = Some(likelihood);
        }

        RenewalOutcome::Completed(report)
    }

    /// 載入合約與進行中的續約商機；缺少商機時視情況要求建立
    async fn load(&self, tenant: &str, contract_id: &str, now: DateTime<Utc>) -> Loaded {
        let contract = match self.repository.get_contract_by_id(tenant, contract_id).await {
            Ok(contract) => contract,
            Err(RenewalError::NotFound { .. }) => {
                tracing::info!("Contract {} not found, nothing to do", contract_id);
                return Loaded::Done(RenewalOutcome::Skipped(SkipReason::ContractNotFound));
            }
            Err(e) => return Loaded::Done(failed(RenewalStep::LoadContract, e)),
        };

        if !contract.renewal_cycle.is_frequency_based() {
            tracing::debug!(
                "Contract {} renewal cycle {:?} is not frequency based",
                contract_id,
                contract.renewal_cycle
            );
            return Loaded::Done(RenewalOutcome::Skipped(SkipReason::NotFrequencyBased));
        }

        let opportunity = match self
            .repository
            .get_active_renewal_opportunity_for_contract(tenant, contract_id)
            .await
        {
            Ok(opportunity) => opportunity,
            Err(e) => return Loaded::Done(failed(RenewalStep::LoadOpportunity, e)),
        };

        match opportunity {
            Some(opportunity) => Loaded::Ready(contract, opportunity),
            None if contract.is_ended(now) => {
                tracing::debug!("Contract {} ended without renewal opportunity", contract_id);
                Loaded::Done(RenewalOutcome::Skipped(SkipReason::NoRenewalOpportunity))
            }
            None => {
                let writer = &self.writer;
                let result = call_with_retry(self.retry, "CreateRenewalOpportunity", move || {
                    writer.create_renewal_opportunity(tenant, contract_id)
                })
                .await;
                match result {
                    Ok(()) => {
                        tracing::info!("Renewal opportunity create requested for {}", contract_id);
                        Loaded::Done(RenewalOutcome::OpportunityCreateRequested)
                    }
                    Err(e) => Loaded::Done(failed(RenewalStep::CreateOpportunity, e)),
                }
            }
        }
    }

    async fn apply_next_cycle_date(
        &self,
        tenant: &str,
        contract: &Contract,
        opportunity: &Opportunity,
        now: DateTime<Utc>,
        report: &mut RenewalReport,
    ) -> Result<(), StepFailure> {
        let writer = &self.writer;
        let opportunity_id = opportunity.id.as_str();

        if contract.is_ended(now) {
            call_with_retry(self.retry, "CloseLooseOpportunity", move || {
                writer.close_loose_opportunity(tenant, opportunity_id)
            })
            .await
            .map_err(at(RenewalStep::CloseOpportunity))?;
            tracing::info!("Contract ended, renewal opportunity {} closed", opportunity_id);
            report.opportunity_closed = true;
            return Ok(());
        }

        let renewed_at = next_cycle_date(
            contract.service_started_at,
            contract.renewal_cycle,
            contract.renewal_periods,
            now,
        );
        report.renewed_at = renewed_at;

        if renewed_at == opportunity.renewed_at {
            tracing::debug!("Next cycle date unchanged ({:?})", renewed_at);
            return Ok(());
        }

        call_with_retry(self.retry, "UpdateRenewalOpportunityNextCycleDate", move || {
            writer.update_renewal_opportunity_next_cycle_date(tenant, opportunity_id, renewed_at)
        })
        .await
        .map_err(at(RenewalStep::NextCycleDate))?;
        report.renewed_at_changed = true;
        Ok(())
    }

    async fn apply_arr(
        &self,
        tenant: &str,
        contract: &Contract,
        opportunity: &Opportunity,
        now: DateTime<Utc>,
        report: &mut RenewalReport,
    ) -> Result<(), StepFailure> {
        if contract.is_ended(now) {
            tracing::debug!("Contract {} ended, ARR left unchanged", contract.id);
            return Ok(());
        }

        let items = self
            .repository
            .get_all_for_contract(tenant, &contract.id)
            .await
            .map_err(at(RenewalStep::LoadServiceLineItems))?;
        tracing::debug!("{} service line items loaded", items.len());

        let calculation =
            calculate_max_arr(contract, &items, now).map_err(at(RenewalStep::CalculateArr))?;
        let max_amount = calculation.max_arr;
        let amount = adjust_by_likelihood(max_amount, opportunity.renewal_likelihood)
            .map_err(at(RenewalStep::CalculateArr))?;

        let writer = &self.writer;
        let opportunity_id = opportunity.id.as_str();
        call_with_retry(self.retry, "UpdateOpportunity", move || {
            writer.update_opportunity_amounts(tenant, opportunity_id, amount, max_amount)
        })
        .await
        .map_err(at(RenewalStep::UpdateAmounts))?;

        report.amount = Some(amount);
        report.max_amount = Some(max_amount);
        Ok(())
    }
}

fn failed(step: RenewalStep, error: RenewalError) -> RenewalOutcome {
    tracing::error!(
        "{:?} failed: {} (Category: {:?})",
        step,
        error,
        error.category()
    );
    RenewalOutcome::Failed {
        step,
        message: error.to_string(),
    }
}

fn finish(report: RenewalReport, result: Result<(), StepFailure>) -> RenewalOutcome {
    match result {
        Ok(()) => RenewalOutcome::Completed(report),
        Err(StepFailure { step, error }) => failed(step, error),
    }
}
