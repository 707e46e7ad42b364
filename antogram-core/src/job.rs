//! Registry of pending transport tasks for one simulation run.

use crate::{BitId, Canvas, CoreError, JobId, Point};
use log::{debug, trace};
use ordered_float::OrderedFloat;
use rand::Rng;

/// Score penalty per position in the unclaimed list. Large enough that list
/// order dominates raw distance, which is what produces the writing-order
/// assembly.
pub const ORDER_BIAS: f32 = 1000.0;

/// Upper bound of the random jitter added to the writing-bias sort key.
const WRITING_JITTER: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Available,
    Reserved,
    Completed,
}

/// A reservable unit of work: carry one bit from `source` to `destination`.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    id: JobId,
    pub source: Point,
    pub destination: Point,
    status: JobStatus,
    bit: Option<BitId>,
}

impl Job {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn is_reserved(&self) -> bool {
        self.status == JobStatus::Reserved
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    /// The bit this job ended up carrying, once picked up.
    pub fn bit(&self) -> Option<BitId> {
        self.bit
    }
}

/// Owns every job of the current field.
///
/// Each job is in exactly one of: the unclaimed list (available), reserved
/// by an agent, or completed.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Vec<Job>,
    available: Vec<JobId>,
    completed: usize,
    presorted: bool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an available job and returns its id.
    pub fn create_job(&mut self, source: Point, destination: Point) -> JobId {
        let id = JobId::new(self.jobs.len());
        self.jobs.push(Job {
            id,
            source,
            destination,
            status: JobStatus::Available,
            bit: None,
        });
        self.available.push(id);
        id
    }

    /// Orders the unclaimed jobs roughly left-to-right, top-to-bottom by
    /// destination, with a little jitter so delivery doesn't look like a
    /// raster scan. Runs once per field.
    pub fn presort_for_writing_bias<R: Rng + ?Sized>(
        &mut self,
        canvas: Canvas,
        rng: &mut R,
    ) -> Result<(), CoreError> {
        if self.presorted {
            return Err(CoreError::AlreadyPresorted);
        }
        let width = canvas.width.max(f32::EPSILON);
        let height = canvas.height.max(f32::EPSILON);

        let mut keyed: Vec<(f32, JobId)> = self
            .available
            .iter()
            .map(|&id| {
                let dest = self.jobs[id.index()].destination;
                let key = 2.0 * (dest.x / width) + dest.y / height + rng.gen_range(0.0..WRITING_JITTER);
                (key, id)
            })
            .collect();
        keyed.sort_by_key(|(key, _)| OrderedFloat(*key));

        self.available = keyed.into_iter().map(|(_, id)| id).collect();
        self.presorted = true;
        debug!("Presorted {} jobs for writing order", self.available.len());
        Ok(())
    }

    /// Reserves the best unclaimed job for an agent at `agent_position`.
    ///
    /// Score is the squared distance to the job's source plus
    /// `index * ORDER_BIAS`; the lowest score wins and ties go to the earlier
    /// job.
    pub fn claim_nearest(&mut self, agent_position: Point) -> Option<JobId> {
        let jobs = &self.jobs;
        let (slot, id) = self
            .available
            .iter()
            .enumerate()
            .filter(|(_, id)| jobs[id.index()].status == JobStatus::Available)
            .min_by_key(|(index, id)| {
                let distance_sq = agent_position.distance_squared(jobs[id.index()].source);
                OrderedFloat(distance_sq + *index as f32 * ORDER_BIAS)
            })
            .map(|(slot, id)| (slot, *id))?;

        self.available.remove(slot);
        self.jobs[id.index()].status = JobStatus::Reserved;
        trace!("Job {} reserved", id);
        Some(id)
    }

    /// Records which bit a reserved job is carrying.
    pub fn attach_bit(&mut self, id: JobId, bit: BitId) -> Result<(), CoreError> {
        let job = self.jobs.get_mut(id.index()).ok_or(CoreError::UnknownJob(id))?;
        if job.status != JobStatus::Reserved {
            return Err(CoreError::JobNotReserved(id));
        }
        job.bit = Some(bit);
        Ok(())
    }

    /// Marks a reserved job completed.
    pub fn complete(&mut self, id: JobId) -> Result<(), CoreError> {
        let job = self.jobs.get_mut(id.index()).ok_or(CoreError::UnknownJob(id))?;
        if job.status != JobStatus::Reserved {
            return Err(CoreError::JobNotReserved(id));
        }
        job.status = JobStatus::Completed;
        self.completed += 1;
        trace!("Job {} completed ({}/{})", id, self.completed, self.jobs.len());
        Ok(())
    }

    /// Fraction of jobs completed, 0 when the queue is empty.
    pub fn progress(&self) -> f32 {
        if self.jobs.is_empty() {
            0.0
        } else {
            self.completed as f32 / self.jobs.len() as f32
        }
    }

    /// Drops every job; used when a new field is loaded.
    pub fn reset(&mut self) {
        self.jobs.clear();
        self.available.clear();
        self.completed = 0;
        self.presorted = false;
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id.index())
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn available_len(&self) -> usize {
        self.available.len()
    }

    pub fn completed_len(&self) -> usize {
        self.completed
    }

    /// Whether the writing-bias presort has run for the current field.
    pub fn is_presorted(&self) -> bool {
        self.presorted
    }

    pub fn is_finished(&self) -> bool {
        !self.jobs.is_empty() && self.completed == self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn claim_prefers_list_order_over_distance() {
        let mut queue = JobQueue::new();
        let far = queue.create_job(p(300.0, 300.0), p(0.0, 0.0));
        let near = queue.create_job(p(1.0, 1.0), p(0.0, 0.0));

        // Squared distance to `far` is 180000, far above the 1000 bias.
        assert_eq!(queue.claim_nearest(p(0.0, 0.0)), Some(near));
        assert_eq!(queue.claim_nearest(p(0.0, 0.0)), Some(far));
        assert_eq!(queue.claim_nearest(p(0.0, 0.0)), None);

        let mut queue = JobQueue::new();
        let first = queue.create_job(p(20.0, 0.0), p(0.0, 0.0));
        let _second = queue.create_job(p(0.0, 0.0), p(0.0, 0.0));
        // 400 < 0 + 1000: the earlier job wins despite being further away.
        assert_eq!(queue.claim_nearest(p(0.0, 0.0)), Some(first));
    }

    #[test]
    fn ties_resolve_to_earliest_job() {
        let mut queue = JobQueue::new();
        let a = queue.create_job(p(10.0, 0.0), p(0.0, 0.0));
        let _b = queue.create_job(p(10.0, 0.0), p(0.0, 0.0));
        assert_eq!(queue.claim_nearest(p(10.0, 0.0)), Some(a));
    }

    #[test]
    fn claimed_jobs_are_never_returned_twice() {
        let mut queue = JobQueue::new();
        for i in 0..20 {
            queue.create_job(p(i as f32, 0.0), p(0.0, i as f32));
        }
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = queue.claim_nearest(p(5.0, 5.0)) {
            assert!(queue.job(id).unwrap().is_reserved());
            assert!(seen.insert(id));
        }
        assert_eq!(seen.len(), 20);
        assert_eq!(queue.available_len(), 0);
    }

    #[test]
    fn complete_is_single_shot_and_progress_monotonic() {
        let mut queue = JobQueue::new();
        assert_eq!(queue.progress(), 0.0);
        let a = queue.create_job(p(0.0, 0.0), p(1.0, 1.0));
        let b = queue.create_job(p(0.0, 0.0), p(1.0, 1.0));

        assert_eq!(queue.complete(a), Err(CoreError::JobNotReserved(a)));

        let first = queue.claim_nearest(p(0.0, 0.0)).unwrap();
        queue.complete(first).unwrap();
        assert_eq!(queue.progress(), 0.5);
        assert_eq!(queue.complete(first), Err(CoreError::JobNotReserved(first)));
        assert_eq!(queue.progress(), 0.5);

        let second = queue.claim_nearest(p(0.0, 0.0)).unwrap();
        queue.complete(second).unwrap();
        assert_eq!(queue.progress(), 1.0);
        assert!(queue.is_finished());
        assert_eq!(queue.job(b).unwrap().status(), JobStatus::Completed);
    }

    #[test]
    fn presort_orders_left_to_right_and_runs_once() {
        let mut queue = JobQueue::new();
        let right = queue.create_job(p(0.0, 0.0), p(380.0, 10.0));
        let left = queue.create_job(p(0.0, 0.0), p(20.0, 390.0));
        let middle = queue.create_job(p(0.0, 0.0), p(200.0, 200.0));

        let mut rng = StdRng::seed_from_u64(7);
        let canvas = Canvas::new(400.0, 400.0);
        queue.presort_for_writing_bias(canvas, &mut rng).unwrap();
        assert_eq!(
            queue.presort_for_writing_bias(canvas, &mut rng),
            Err(CoreError::AlreadyPresorted)
        );

        // All sources coincide, so claim order is the presorted order.
        let origin = p(0.0, 0.0);
        assert_eq!(queue.claim_nearest(origin), Some(left));
        assert_eq!(queue.claim_nearest(origin), Some(middle));
        assert_eq!(queue.claim_nearest(origin), Some(right));
    }

    #[test]
    fn reset_clears_everything() {
        let mut queue = JobQueue::new();
        let id = queue.create_job(p(0.0, 0.0), p(1.0, 1.0));
        queue.claim_nearest(p(0.0, 0.0));
        queue.attach_bit(id, BitId::new(3)).unwrap();
        assert_eq!(queue.job(id).unwrap().bit(), Some(BitId::new(3)));
        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.available_len(), 0);
        assert_eq!(queue.completed_len(), 0);
        assert_eq!(queue.progress(), 0.0);
        assert!(queue
            .presort_for_writing_bias(Canvas::new(1.0, 1.0), &mut StdRng::seed_from_u64(1))
            .is_ok());
    }
}
