use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::database::queries::MeetingStore;

/// Starts the background sweep that moves meetings whose end time has
/// passed into `completed`. The underlying bulk update is idempotent, so
/// a failed tick is simply logged and retried on the next one.
///
/// The returned scheduler handle owns the job; shut it down to stop the
/// sweep (done on process shutdown in `main`).
pub async fn start_meeting_sweeper(
    meetings: Arc<dyn MeetingStore>,
    interval: Duration,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    scheduler
        .add(Job::new_repeated_async(interval, move |_, _| {
            let meetings = meetings.clone();
            Box::pin(async move {
                sweep_once(meetings.as_ref()).await;
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("meeting sweeper started, interval {interval:?}");
    Ok(scheduler)
}

async fn sweep_once(meetings: &dyn MeetingStore) {
    match meetings.complete_elapsed(Utc::now()).await {
        Ok(0) => {}
        Ok(moved) => tracing::info!("marked {moved} elapsed meetings completed"),
        Err(err) => tracing::error!("meeting sweep failed: {err}"),
    }
}
