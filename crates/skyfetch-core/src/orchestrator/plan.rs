//! Split the job list into work to do and work already satisfied.

use crate::checkpoint::CheckpointHandle;
use crate::job::DownloadJob;

#[derive(Debug, Default)]
pub(super) struct Plan {
    pub(super) to_fetch: Vec<DownloadJob>,
    pub(super) already_present: usize,
}

/// A job is satisfied when the checkpoint lists it *or* its file exists.
/// The two can disagree after a crash (file renamed, line not yet appended)
/// or when a directory was copied around; disagreements are logged.
pub(super) fn plan(jobs: Vec<DownloadJob>, checkpoint: &CheckpointHandle) -> Plan {
    let mut plan = Plan::default();
    for job in jobs {
        let in_checkpoint = checkpoint.contains(&job.checkpoint_id());
        let on_disk = job.destination.exists();
        match (in_checkpoint, on_disk) {
            (false, false) => plan.to_fetch.push(job),
            (true, true) => plan.already_present += 1,
            (true, false) => {
                tracing::warn!(
                    key = %job.key,
                    path = %job.destination.display(),
                    "checkpointed but file missing; skipping"
                );
                plan.already_present += 1;
            }
            (false, true) => {
                tracing::warn!(
                    key = %job.key,
                    path = %job.destination.display(),
                    "file present but not checkpointed; skipping"
                );
                plan.already_present += 1;
            }
        }
    }
    plan
}
