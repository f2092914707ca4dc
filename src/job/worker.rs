// =====================================================
// SHARED JOB WORKER
// Everything a job builds once, plus the per-range retry shell
// =====================================================

use crate::data::{ColumnMapping, PartitionRange, PkFactory};
use crate::error::{MigrationError, MigrationResult};
use crate::feature::{ConstantColumns, ExplodeMap, Guardrail};
use crate::job::context::LogContext;
use crate::job::counters::{AttemptCounters, JobCounter};
use crate::job::failure_log::FailedPartitionLog;
use crate::job::rate_limiter::RateLimiters;
use crate::properties::MigrationProperties;
use crate::statement::{
    OriginSelectStatement, TableSession, TargetSelectStatement, TargetUpsertStatement,
};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A unit of work handed to a job: a token range, or a batch of serialized
/// primary keys.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkUnit {
    Range(PartitionRange),
    Keys(Vec<String>),
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkUnit::Range(range) => write!(f, "range {}", range),
            WorkUnit::Keys(keys) => write!(f, "batch of {} key(s)", keys.len()),
        }
    }
}

/// One job strategy. The runner drives every unit through it.
#[async_trait::async_trait]
pub trait UnitProcessor: Send + Sync {
    fn worker(&self) -> &JobWorker;

    fn accepts(&self, unit: &WorkUnit) -> bool;

    /// `Err` is either fatal (configuration) or a range that failed on
    /// every attempt; row-level problems never surface here.
    async fn process_unit(&self, unit: WorkUnit) -> MigrationResult<()>;
}

/// Job-lifetime state shared by every unit: mapping, codec, statements,
/// limiters, counters, features and the failure log.
pub struct JobWorker {
    properties: MigrationProperties,
    origin: Arc<dyn TableSession>,
    target: Arc<dyn TableSession>,
    mapping: Arc<ColumnMapping>,
    pk_factory: PkFactory,
    origin_select: OriginSelectStatement,
    target_select: TargetSelectStatement,
    target_upsert: TargetUpsertStatement,
    limiters: RateLimiters,
    counters: JobCounter,
    guardrail: Guardrail,
    failure_log: FailedPartitionLog,
    is_counter_table: bool,
}

impl JobWorker {
    pub fn build(
        properties: MigrationProperties,
        origin: Arc<dyn TableSession>,
        target: Arc<dyn TableSession>,
    ) -> MigrationResult<Self> {
        properties.validate().map_err(MigrationError::Config)?;
        let origin_schema = origin.schema().clone();
        let target_schema = target.schema().clone();
        origin_schema.validate().map_err(MigrationError::Config)?;
        target_schema.validate().map_err(MigrationError::Config)?;

        let constants = ConstantColumns::build(&properties.constant_columns, &target_schema)?;
        let explode = properties
            .explode_map
            .as_ref()
            .map(|spec| ExplodeMap::build(spec, &origin_schema, &target_schema))
            .transpose()?;
        let mapping = Arc::new(ColumnMapping::build(
            &origin_schema,
            &target_schema,
            &constants,
            explode.as_ref(),
        )?);

        let origin_select = OriginSelectStatement::build(&origin_schema, &properties)?;
        let pk_factory = PkFactory::new(
            &origin_schema,
            &target_schema,
            Arc::clone(&mapping),
            explode.map(Arc::new),
            origin_select.write_metadata().clone(),
            properties.null_timestamp_pk_default,
        )?;
        let target_select = TargetSelectStatement::build(&target_schema);
        let target_upsert = TargetUpsertStatement::build(
            &target_schema,
            Arc::clone(&mapping),
            origin_select.write_metadata(),
        );

        log::info!("CQL -- origin select by range: {}", origin_select.range_cql());
        log::info!("CQL -- origin select by pk: {}", origin_select.pk_cql());
        log::info!("CQL -- target select by range: {}", target_select.cql());
        log::info!("CQL -- target upsert: {}", target_upsert.cql());

        Ok(Self {
            limiters: RateLimiters::from_properties(&properties),
            counters: JobCounter::new(properties.job_kind, properties.print_stats_after),
            guardrail: Guardrail::build(&properties, &origin_schema),
            failure_log: FailedPartitionLog::new(
                properties.failed_partitions_path(&origin_schema.keyspace_table),
            ),
            is_counter_table: target_schema.is_counter_table(),
            properties,
            origin,
            target,
            mapping,
            pk_factory,
            origin_select,
            target_select,
            target_upsert,
        })
    }

    pub fn properties(&self) -> &MigrationProperties {
        &self.properties
    }

    pub fn origin(&self) -> &dyn TableSession {
        self.origin.as_ref()
    }

    pub fn target(&self) -> &dyn TableSession {
        self.target.as_ref()
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn pk_factory(&self) -> &PkFactory {
        &self.pk_factory
    }

    pub fn origin_select(&self) -> &OriginSelectStatement {
        &self.origin_select
    }

    pub fn target_select(&self) -> &TargetSelectStatement {
        &self.target_select
    }

    pub fn target_upsert(&self) -> &TargetUpsertStatement {
        &self.target_upsert
    }

    pub fn limiters(&self) -> &RateLimiters {
        &self.limiters
    }

    pub fn counters(&self) -> &JobCounter {
        &self.counters
    }

    pub fn guardrail(&self) -> &Guardrail {
        &self.guardrail
    }

    pub fn failure_log(&self) -> &FailedPartitionLog {
        &self.failure_log
    }

    pub fn is_counter_table(&self) -> bool {
        self.is_counter_table
    }

    /// Runs `attempt` on `range` up to `maxRetries + 1` times. Each attempt
    /// gets fresh counters, merged into the job totals only on success. The
    /// range goes to the failure log when the last attempt fails.
    pub async fn run_range<F, Fut>(&self, range: PartitionRange, attempt: F) -> MigrationResult<()>
    where
        F: Fn(PartitionRange, LogContext, Arc<AttemptCounters>) -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        let max_attempts = self.properties.max_attempts();
        let mut last_error = String::new();

        for attempt_number in 1..=max_attempts {
            let context = LogContext::range(range, attempt_number);
            log::info!("{} Processing min: {} max: {}", context, range.min, range.max);
            let counters = Arc::new(AttemptCounters::default());

            let result = attempt(range, context.clone(), Arc::clone(&counters)).await;
            match result {
                Ok(()) => {
                    self.counters.merge(&counters);
                    self.counters.print_counts(&context, false);
                    return Ok(());
                }
                Err(e) => {
                    log::error!(
                        "{} Error with PartitionRange -- Processing min: {} max: {} -- Attempt# {}: {}",
                        context,
                        range.min,
                        range.max,
                        attempt_number,
                        e
                    );
                    if attempt_number == max_attempts {
                        if let Err(log_error) = self.failure_log.append(&range).await {
                            log::error!("{} {}", context, log_error);
                        }
                    }
                    self.counters.print_counts(&context, false);
                    last_error = e;
                }
            }
        }

        Err(MigrationError::RangeExhausted {
            range: range.to_string(),
            attempts: max_attempts,
            reason: last_error,
        })
    }
}
