//! Scheduler / Timer Loop (spec §2.9, §4.9): the only component that
//! reasons about wall-clock time. Everything it does is expressed as
//! the same idempotent primitives `dlb-engine` and `dlb-assign` use
//! elsewhere — a conditional update or a `complete_cell` call — so
//! running [`sweep`] concurrently from several workers, or at any
//! frequency, never duplicates an effect (spec §4.9: "it never
//! duplicates an effect").
//!
//! [`run`] wraps [`sweep`] in a `tokio::time::interval` loop, the same
//! shape the reference architecture uses for its own background
//! tasks: a `tokio::spawn`ed `loop { interval.tick().await; ... }`,
//! with unexpected errors logged rather than propagated so one bad
//! tick never kills the loop (spec §7: "Unexpected exceptions inside
//! the Scheduler are logged but do not abort the loop").
use dlb_assign::Assigner;
use dlb_core::Id;
use dlb_core::SCHEDULER_TICK;
use dlb_core::TRANSIENT_RETRY_BACKOFF;
use dlb_dto::AuditKind;
use dlb_dto::AuditRecord;
use dlb_dto::NotificationEvent;
use dlb_engine::CompletionOutcome;
use dlb_engine::EngineError;
use dlb_engine::TierOutcome;
use dlb_model::Cell;
use dlb_model::CellStatus;
use dlb_model::Deliberation;
use dlb_model::Phase;
use dlb_store::Store;
use std::time::SystemTime;

/// Everything one [`sweep`] pass produced: notifications for the
/// external sink and audit records for the external chain recorder
/// (spec §6 "Outputs emitted").
#[derive(Debug, Default)]
pub struct SweepReport {
    pub notifications: Vec<NotificationEvent>,
    pub audit: Vec<AuditRecord>,
}

impl SweepReport {
    fn merge(&mut self, other: SweepReport) {
        self.notifications.extend(other.notifications);
        self.audit.extend(other.audit);
    }
}

/// Spawns the background loop. Runs forever; ticks every
/// [`dlb_core::SCHEDULER_TICK`] and logs (rather than propagates) any
/// error a single pass raises, matching the reference architecture's
/// own "log and keep going" background-task style.
pub fn spawn(store: Store, assigner: Assigner) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SCHEDULER_TICK);
        loop {
            interval.tick().await;
            match sweep(&store, &assigner).await {
                Ok(report) => {
                    for event in &report.notifications {
                        log::info!("scheduler event: {event:?}");
                    }
                }
                Err(err) => log::error!("scheduler sweep failed: {err}"),
            }
        }
    })
}

/// One full scan, per spec §4.9's five responsibilities. Idempotent
/// and safe to call from multiple workers or at any cadence.
pub async fn sweep(store: &Store, assigner: &Assigner) -> Result<SweepReport, EngineError> {
    let mut report = SweepReport::default();
    let now = SystemTime::now();

    sweep_submissions(store, assigner, now, &mut report).await?;
    sweep_expired_cells(store, assigner, now, &mut report).await?;
    sweep_accumulations(store, assigner, now, &mut report).await?;

    Ok(report)
}

/// Evaluates SUBMISSION→VOTING triggers for every open deliberation
/// and fires the transition for any that qualify (spec §4.9 bullet 1).
async fn sweep_submissions(
    store: &Store,
    assigner: &Assigner,
    now: SystemTime,
    report: &mut SweepReport,
) -> Result<(), EngineError> {
    for deliberation in list_deliberations(store, Phase::Submission).await? {
        if deliberation.is_halted() {
            continue;
        }
        let idea_count = count_rows(store, "ideas", "deliberation_id", deliberation.id()).await?;
        let participant_count =
            count_rows(store, "memberships", "deliberation_id", deliberation.id()).await?;
        if !dlb_engine::submission_triggers_met(
            &deliberation,
            idea_count as u32,
            participant_count as u32,
            now,
        ) {
            continue;
        }
        match with_retry(|| dlb_engine::start_voting(store, assigner, &deliberation)).await {
            Ok(true) => {
                report
                    .notifications
                    .push(NotificationEvent::PhaseChanged {
                        deliberation_id: deliberation.id(),
                        phase: Phase::Voting,
                    });
                report.audit.push(AuditRecord::new(
                    AuditKind::Phase,
                    deliberation.id(),
                    dlb_fingerprint::tag("phase", deliberation.id()),
                    "submission -> voting",
                ));
            }
            Ok(false) => {}
            Err(err) if err.is_fatal() => halt(store, deliberation.id(), &err).await?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Force-completes every VOTING cell whose deadline has passed (spec
/// §4.9 bullet 2) and hands each completion straight to the Tier
/// Controller (bullet 3), collecting whatever notifications result.
async fn sweep_expired_cells(
    store: &Store,
    assigner: &Assigner,
    now: SystemTime,
    report: &mut SweepReport,
) -> Result<(), EngineError> {
    let rows = store
        .query(
            "SELECT id, deliberation_id FROM cells \
             WHERE status = $1 AND voting_deadline IS NOT NULL AND voting_deadline <= $2",
            &[&CellStatus::Voting.to_string(), &now],
        )
        .await?;

    for row in rows {
        let cell_id: Id<Cell> = Id::from(row.get::<_, uuid::Uuid>(0));
        let deliberation_id: Id<Deliberation> = Id::from(row.get::<_, uuid::Uuid>(1));
        let Some(deliberation) = fetch_deliberation(store, deliberation_id).await? else {
            continue;
        };
        if deliberation.is_halted() {
            continue;
        }
        match with_retry(|| dlb_engine::complete_cell(store, assigner, &deliberation, cell_id, now))
            .await
        {
            Ok(Some(outcome)) => report.merge(outcome_report(&deliberation, outcome)),
            Ok(None) => {}
            Err(err) if err.is_fatal() => halt(store, deliberation_id, &err).await?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Fires the ACCUMULATING→VOTING challenge-round transition once
/// `accumulationTimeoutMs` has elapsed and at least one challenger has
/// arrived (spec §4.9 bullet 4, §4.8).
async fn sweep_accumulations(
    store: &Store,
    assigner: &Assigner,
    now: SystemTime,
    report: &mut SweepReport,
) -> Result<(), EngineError> {
    for deliberation in list_deliberations(store, Phase::Accumulating).await? {
        if deliberation.is_halted() {
            continue;
        }
        let Some(deadline) = deliberation.accumulation_ends_at() else {
            continue;
        };
        if now < deadline {
            continue;
        }
        let pending = store
            .query_opt(
                "SELECT 1 FROM ideas WHERE deliberation_id = $1 AND status = $2 LIMIT 1",
                &[
                    &deliberation.id().inner(),
                    &dlb_model::IdeaStatus::Pending.to_string(),
                ],
            )
            .await?;
        if pending.is_none() {
            continue;
        }
        match with_retry(|| dlb_engine::start_challenge_round(store, assigner, &deliberation))
            .await
        {
            Ok(Some(cell)) => {
                report
                    .notifications
                    .push(NotificationEvent::ChallengeRoundStarted {
                        deliberation_id: deliberation.id(),
                        challenge_round: deliberation.challenge_round() + 1,
                        cell_id: cell,
                    });
            }
            Ok(None) => {}
            Err(err) if err.is_fatal() => halt(store, deliberation.id(), &err).await?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn outcome_report(deliberation: &Deliberation, outcome: CompletionOutcome) -> SweepReport {
    let mut report = SweepReport::default();
    report.notifications.push(NotificationEvent::CellCompleted {
        deliberation_id: deliberation.id(),
        cell_id: outcome.cell.cell,
        tier: outcome.cell.tier,
        winner_ids: outcome.cell.winners.clone(),
        loser_ids: outcome.cell.losers.clone(),
    });
    report.audit.push(AuditRecord::new(
        AuditKind::Cell,
        deliberation.id(),
        dlb_fingerprint::tag("cell", outcome.cell.cell),
        format!("tier {} completed", outcome.cell.tier),
    ));
    match outcome.tier {
        TierOutcome::Champion(idea) => {
            report
                .notifications
                .push(NotificationEvent::ChampionDeclared {
                    deliberation_id: deliberation.id(),
                    idea_id: idea,
                    challenge_round: deliberation.challenge_round(),
                });
            report.audit.push(AuditRecord::new(
                AuditKind::Champion,
                deliberation.id(),
                dlb_fingerprint::tag("champion", idea),
                "champion declared",
            ));
        }
        TierOutcome::Advanced { tier, cells, .. } => {
            report.notifications.push(NotificationEvent::TierAdvanced {
                deliberation_id: deliberation.id(),
                tier,
                cell_ids: cells,
            });
            report.audit.push(AuditRecord::new(
                AuditKind::Tier,
                deliberation.id(),
                dlb_fingerprint::tag("tier", deliberation.id()),
                format!("advanced to tier {tier}"),
            ));
        }
        TierOutcome::StillVoting => {}
    }
    report
}

/// Marks a deliberation halted after a `Fatal` engine error, per spec
/// §7: "Fatal ... halts the affected deliberation pending operator
/// review." The Scheduler skips halted deliberations on every later
/// sweep until an operator clears `haltedAt` out of band.
async fn halt(store: &Store, deliberation: Id<Deliberation>, err: &EngineError) -> Result<(), EngineError> {
    log::error!("halting deliberation {deliberation}: {err}");
    store
        .conditional_update(
            "UPDATE deliberations SET halted_at = $1 WHERE id = $2 AND halted_at IS NULL",
            &[&SystemTime::now(), &deliberation.inner()],
        )
        .await?;
    Ok(())
}

/// Retries a `Transient` failure with the bounded backoff of spec §7
/// (3 attempts: 100ms, 400ms, 900ms); `Conflict` and other kinds pass
/// straight through since retrying them is never correct.
async fn with_retry<F, Fut, T>(mut action: F) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, EngineError>>,
{
    let mut attempt = 0;
    loop {
        match action().await {
            Ok(value) => return Ok(value),
            Err(EngineError::Transient(msg)) => {
                if attempt >= TRANSIENT_RETRY_BACKOFF.len() {
                    return Err(EngineError::Transient(msg));
                }
                tokio::time::sleep(TRANSIENT_RETRY_BACKOFF[attempt]).await;
                attempt += 1;
            }
            Err(other) => return Err(other),
        }
    }
}

async fn list_deliberations(store: &Store, phase: Phase) -> Result<Vec<Deliberation>, EngineError> {
    let rows = store
        .query(
            "SELECT * FROM deliberations WHERE phase = $1",
            &[&phase.to_string()],
        )
        .await?;
    Ok(rows.iter().map(Deliberation::from_row).collect())
}

async fn fetch_deliberation(
    store: &Store,
    id: Id<Deliberation>,
) -> Result<Option<Deliberation>, EngineError> {
    let row = store
        .query_opt("SELECT * FROM deliberations WHERE id = $1", &[&id.inner()])
        .await?;
    Ok(row.map(|r| Deliberation::from_row(&r)))
}

async fn count_rows<T>(
    store: &Store,
    table: &str,
    column: &str,
    id: Id<T>,
) -> Result<i64, EngineError> {
    let statement = format!("SELECT count(*) FROM {table} WHERE {column} = $1");
    let row = store
        .query_opt(&statement, &[&id.inner()])
        .await?
        .expect("count(*) always returns a row");
    Ok(row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_report_merge_concatenates() {
        let mut a = SweepReport::default();
        a.notifications.push(NotificationEvent::PhaseChanged {
            deliberation_id: Id::default(),
            phase: Phase::Voting,
        });
        let mut b = SweepReport::default();
        b.notifications.push(NotificationEvent::PhaseChanged {
            deliberation_id: Id::default(),
            phase: Phase::Completed,
        });
        a.merge(b);
        assert_eq!(a.notifications.len(), 2);
    }
}
