//! How idle agents find work, and where carried bits go.
//!
//! [`JobQueueTargeting`] drives agents through the shared job queue.
//! [`TargetPoolTargeting`] is the older behaviour: agents chase the nearest
//! loose bit and pick a destination from a pool only after pickup.

use crate::SimulationError;
use antogram_config::TargetingKind;
use antogram_core::{Bit, BitId, Canvas, JobId, JobQueue, Point, PreparedField, SimulationMode};
use log::{debug, trace};
use ordered_float::OrderedFloat;
use rand::RngCore;

/// Work an agent currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Job(JobId),
    Bit(BitId),
}

pub trait TargetingStrategy: Send {
    fn name(&self) -> &'static str;

    /// Takes over the jobs or destinations of a freshly loaded field.
    fn load(
        &mut self,
        field: &PreparedField,
        canvas: Canvas,
        rng: &mut dyn RngCore,
    ) -> Result<(), SimulationError>;

    fn reset(&mut self);

    /// Claims work for an idle agent. Returns the assignment and where to
    /// go to pick it up.
    fn claim(&mut self, position: Point, bits: &[Bit]) -> Option<(Assignment, Point)>;

    /// Where the assignment's bit currently waits, or `None` if the
    /// assignment can no longer be carried out.
    fn source(&self, assignment: Assignment, bits: &[Bit]) -> Option<Point>;

    /// Chooses the bit to lift once the agent has arrived at the source.
    fn select_bit(
        &mut self,
        assignment: Assignment,
        position: Point,
        bits: &[Bit],
        pickup_radius: f32,
    ) -> Result<Option<BitId>, SimulationError>;

    /// Destination for a bit that was just picked up at `position`.
    fn destination(&mut self, assignment: Assignment, bit: &Bit, position: Point) -> Point;

    fn complete(&mut self, assignment: Assignment) -> Result<(), SimulationError>;

    /// Completed fraction in `[0, 1]`.
    fn progress(&self) -> f32;
}

/// Builds the strategy a configuration asks for.
pub fn strategy_for(kind: TargetingKind) -> Box<dyn TargetingStrategy> {
    match kind {
        TargetingKind::JobQueue => Box::new(JobQueueTargeting::new()),
        TargetingKind::TargetPool => Box::new(TargetPoolTargeting::new()),
    }
}

/// Nearest bit that is neither carried nor delivered, optionally within
/// `radius` of `position`.
fn nearest_available_bit(bits: &[Bit], position: Point, radius: Option<f32>) -> Option<BitId> {
    bits.iter()
        .filter(|bit| bit.is_available())
        .map(|bit| (bit.id(), bit.position.distance(position)))
        .filter(|(_, distance)| radius.map_or(true, |r| *distance <= r))
        .min_by_key(|(_, distance)| OrderedFloat(*distance))
        .map(|(id, _)| id)
}

// --- Job queue ---

#[derive(Debug, Default)]
pub struct JobQueueTargeting {
    queue: JobQueue,
}

impl JobQueueTargeting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    fn job_of(&self, assignment: Assignment) -> Result<JobId, SimulationError> {
        match assignment {
            Assignment::Job(id) => Ok(id),
            Assignment::Bit(_) => Err(SimulationError::ForeignAssignment(assignment)),
        }
    }
}

impl TargetingStrategy for JobQueueTargeting {
    fn name(&self) -> &'static str {
        "job_queue"
    }

    fn load(
        &mut self,
        field: &PreparedField,
        canvas: Canvas,
        rng: &mut dyn RngCore,
    ) -> Result<(), SimulationError> {
        self.queue.reset();
        for job in &field.jobs {
            self.queue.create_job(job.source, job.destination);
        }
        if field.mode == SimulationMode::Forward && !self.queue.is_empty() {
            self.queue.presort_for_writing_bias(canvas, rng)?;
        }
        debug!("Job queue loaded with {} jobs", self.queue.len());
        Ok(())
    }

    fn reset(&mut self) {
        self.queue.reset();
    }

    fn claim(&mut self, position: Point, _bits: &[Bit]) -> Option<(Assignment, Point)> {
        let id = self.queue.claim_nearest(position)?;
        let source = self.queue.job(id)?.source;
        Some((Assignment::Job(id), source))
    }

    fn source(&self, assignment: Assignment, _bits: &[Bit]) -> Option<Point> {
        let id = self.job_of(assignment).ok()?;
        self.queue.job(id).map(|job| job.source)
    }

    fn select_bit(
        &mut self,
        assignment: Assignment,
        position: Point,
        bits: &[Bit],
        pickup_radius: f32,
    ) -> Result<Option<BitId>, SimulationError> {
        let id = self.job_of(assignment)?;
        // Jobs are created one per bit in bit order, so the job's own bit is
        // preferred when it is still lying within reach.
        let own = bits
            .get(id.index())
            .filter(|bit| bit.is_available() && bit.position.distance(position) <= pickup_radius)
            .map(Bit::id);

        let selected = own.or_else(|| nearest_available_bit(bits, position, Some(pickup_radius)));
        if let Some(bit) = selected {
            self.queue.attach_bit(id, bit)?;
        }
        Ok(selected)
    }

    fn destination(&mut self, assignment: Assignment, bit: &Bit, position: Point) -> Point {
        self.job_of(assignment)
            .ok()
            .and_then(|id| self.queue.job(id))
            .map(|job| job.destination)
            .or(bit.target)
            .unwrap_or(position)
    }

    fn complete(&mut self, assignment: Assignment) -> Result<(), SimulationError> {
        let id = self.job_of(assignment)?;
        self.queue.complete(id)?;
        Ok(())
    }

    fn progress(&self) -> f32 {
        self.queue.progress()
    }
}

// --- Target pool ---

/// Agents claim loose bits directly; text destinations come from a shared
/// pool, biased towards the top-left so words fill in reading order.
#[derive(Debug, Default)]
pub struct TargetPoolTargeting {
    pool: Vec<Point>,
    canvas: Option<Canvas>,
    claimed: Vec<bool>,
    delivered: usize,
}

impl TargetPoolTargeting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// Removes and returns the pool entry with the lowest
    /// `distance + (x/w + y/h) * w * 0.5`.
    fn take_from_pool(&mut self, position: Point) -> Option<Point> {
        let canvas = self.canvas?;
        let width = canvas.width.max(f32::EPSILON);
        let height = canvas.height.max(f32::EPSILON);

        let (index, _) = self.pool.iter().enumerate().min_by_key(|(_, target)| {
            let bias = (target.x / width + target.y / height) * width * 0.5;
            OrderedFloat(target.distance(position) + bias)
        })?;
        Some(self.pool.swap_remove(index))
    }

    fn bit_of(&self, assignment: Assignment) -> Result<BitId, SimulationError> {
        match assignment {
            Assignment::Bit(id) => Ok(id),
            Assignment::Job(_) => Err(SimulationError::ForeignAssignment(assignment)),
        }
    }
}

impl TargetingStrategy for TargetPoolTargeting {
    fn name(&self) -> &'static str {
        "target_pool"
    }

    fn load(
        &mut self,
        field: &PreparedField,
        canvas: Canvas,
        _rng: &mut dyn RngCore,
    ) -> Result<(), SimulationError> {
        self.pool = field.target_pool.clone();
        self.canvas = Some(canvas);
        self.claimed = vec![false; field.bits.len()];
        self.delivered = 0;
        debug!(
            "Target pool loaded with {} destinations for {} bits",
            self.pool.len(),
            field.bits.len()
        );
        Ok(())
    }

    fn reset(&mut self) {
        self.pool.clear();
        self.claimed.clear();
        self.delivered = 0;
    }

    fn claim(&mut self, position: Point, bits: &[Bit]) -> Option<(Assignment, Point)> {
        let claimed = &self.claimed;
        let bit = bits
            .iter()
            .filter(|bit| bit.is_available() && !claimed.get(bit.id().index()).copied().unwrap_or(true))
            .min_by_key(|bit| OrderedFloat(bit.position.distance_squared(position)))?;

        self.claimed[bit.id().index()] = true;
        trace!("Bit {} claimed directly", bit.id());
        Some((Assignment::Bit(bit.id()), bit.position))
    }

    fn source(&self, assignment: Assignment, bits: &[Bit]) -> Option<Point> {
        let id = self.bit_of(assignment).ok()?;
        bits.get(id.index())
            .filter(|bit| bit.is_available())
            .map(|bit| bit.position)
    }

    fn select_bit(
        &mut self,
        assignment: Assignment,
        position: Point,
        bits: &[Bit],
        pickup_radius: f32,
    ) -> Result<Option<BitId>, SimulationError> {
        let id = self.bit_of(assignment)?;
        let bit = bits.get(id.index()).ok_or(SimulationError::UnknownBit(id))?;
        Ok((bit.is_available() && bit.position.distance(position) <= pickup_radius).then_some(id))
    }

    fn destination(&mut self, _assignment: Assignment, bit: &Bit, position: Point) -> Point {
        // With neither a stored target nor a pool entry the bit stays put
        bit.target
            .or_else(|| self.take_from_pool(position))
            .unwrap_or(position)
    }

    fn complete(&mut self, assignment: Assignment) -> Result<(), SimulationError> {
        self.bit_of(assignment)?;
        self.delivered += 1;
        Ok(())
    }

    fn progress(&self) -> f32 {
        if self.claimed.is_empty() {
            0.0
        } else {
            self.delivered as f32 / self.claimed.len() as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antogram_core::{JobSpec, Rgb};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bit(i: usize, x: f32, y: f32) -> Bit {
        Bit::new(BitId::new(i), Point::new(x, y), Rgb::new(0, 0, 0))
    }

    fn field(mode: SimulationMode, bits: Vec<Bit>, pool: Vec<Point>) -> PreparedField {
        let jobs = bits
            .iter()
            .map(|b| JobSpec {
                source: b.position,
                destination: b.target.unwrap_or(b.position + Point::new(10.0, 10.0)),
            })
            .collect();
        PreparedField {
            mode,
            bits,
            jobs,
            target_pool: pool,
        }
    }

    #[test]
    fn job_queue_prefers_the_jobs_own_bit() {
        let bits = vec![bit(0, 10.0, 10.0), bit(1, 12.0, 10.0)];
        let field = field(SimulationMode::Reverse, bits.clone(), vec![]);
        let mut strategy = JobQueueTargeting::new();
        let mut rng = StdRng::seed_from_u64(1);
        strategy.load(&field, Canvas::new(100.0, 100.0), &mut rng).unwrap();

        let (first, _) = strategy.claim(Point::new(12.0, 10.0), &bits).unwrap();
        let (second, source) = strategy.claim(Point::new(12.0, 10.0), &bits).unwrap();
        assert_ne!(first, second);
        assert_eq!(source, Point::new(12.0, 10.0));

        // standing on bit 1 but working job 0: bit 0 is within reach and wins
        let chosen = strategy
            .select_bit(first, Point::new(12.0, 10.0), &bits, 8.0)
            .unwrap();
        assert_eq!(chosen, Some(BitId::new(0)));
        assert!(strategy.claim(Point::ZERO, &bits).is_none());
    }

    fn claim_order(mode: SimulationMode) -> (Vec<Assignment>, bool) {
        let here = Point::new(10.0, 10.0);
        let bits = vec![
            bit(0, 10.0, 10.0).with_target(Point::new(90.0, 90.0)),
            bit(1, 10.0, 10.0).with_target(Point::new(50.0, 50.0)),
            bit(2, 10.0, 10.0).with_target(Point::new(5.0, 5.0)),
        ];
        let mut strategy = JobQueueTargeting::new();
        let mut rng = StdRng::seed_from_u64(6);
        strategy
            .load(&field(mode, bits.clone(), vec![]), Canvas::new(100.0, 100.0), &mut rng)
            .unwrap();
        let presorted = strategy.queue().is_presorted();
        let order = std::iter::from_fn(|| strategy.claim(here, &bits).map(|(a, _)| a)).collect();
        (order, presorted)
    }

    #[test]
    fn only_forward_fields_are_presorted() {
        let job = |i| Assignment::Job(JobId::new(i));

        let (reverse, presorted) = claim_order(SimulationMode::Reverse);
        assert!(!presorted);
        assert_eq!(reverse, vec![job(0), job(1), job(2)]);

        let (forward, presorted) = claim_order(SimulationMode::Forward);
        assert!(presorted);
        assert_eq!(forward, vec![job(2), job(1), job(0)]);
    }

    #[test]
    fn job_queue_completion_is_counted_once() {
        let bits = vec![bit(0, 1.0, 1.0)];
        let field = field(SimulationMode::Reverse, bits.clone(), vec![]);
        let mut strategy = JobQueueTargeting::new();
        let mut rng = StdRng::seed_from_u64(2);
        strategy.load(&field, Canvas::new(50.0, 50.0), &mut rng).unwrap();

        let (assignment, _) = strategy.claim(Point::ZERO, &bits).unwrap();
        strategy.complete(assignment).unwrap();
        assert!(strategy.complete(assignment).is_err());
        assert_eq!(strategy.progress(), 1.0);
        assert!(matches!(
            strategy.complete(Assignment::Bit(BitId::new(0))),
            Err(SimulationError::ForeignAssignment(_))
        ));
    }

    #[test]
    fn pool_claims_each_bit_once_and_biases_top_left() {
        let bits = vec![bit(0, 50.0, 50.0), bit(1, 60.0, 50.0)];
        let pool = vec![Point::new(90.0, 90.0), Point::new(40.0, 40.0), Point::new(55.0, 52.0)];
        let field = field(SimulationMode::Forward, bits.clone(), pool);
        let mut strategy = TargetPoolTargeting::new();
        let mut rng = StdRng::seed_from_u64(3);
        strategy.load(&field, Canvas::new(100.0, 100.0), &mut rng).unwrap();

        let (a, source_a) = strategy.claim(Point::new(49.0, 50.0), &bits).unwrap();
        let (b, _) = strategy.claim(Point::new(49.0, 50.0), &bits).unwrap();
        assert_eq!(a, Assignment::Bit(BitId::new(0)));
        assert_eq!(b, Assignment::Bit(BitId::new(1)));
        assert_eq!(source_a, Point::new(50.0, 50.0));
        assert!(strategy.claim(Point::ZERO, &bits).is_none());

        // scores from (50,50): (40,40) ~ 14.1 + 40 beats (55,52) ~ 5.4 + 53.5
        let destination = strategy.destination(a, &bits[0], Point::new(50.0, 50.0));
        assert_eq!(destination, Point::new(40.0, 40.0));
        assert_eq!(strategy.pool_len(), 2);
    }

    #[test]
    fn pool_stored_target_wins_and_empty_pool_delivers_in_place() {
        let bits = vec![bit(0, 5.0, 5.0).with_target(Point::new(70.0, 70.0)), bit(1, 6.0, 6.0)];
        let field = field(SimulationMode::Forward, bits.clone(), vec![]);
        let mut strategy = TargetPoolTargeting::new();
        let mut rng = StdRng::seed_from_u64(4);
        strategy.load(&field, Canvas::new(100.0, 100.0), &mut rng).unwrap();

        let here = Point::new(5.0, 5.0);
        assert_eq!(strategy.destination(Assignment::Bit(BitId::new(0)), &bits[0], here), Point::new(70.0, 70.0));
        assert_eq!(strategy.destination(Assignment::Bit(BitId::new(1)), &bits[1], here), here);
    }

    #[test]
    fn pool_source_disappears_once_bit_is_taken() {
        let mut bits = vec![bit(0, 5.0, 5.0)];
        let field = field(SimulationMode::Forward, bits.clone(), vec![]);
        let mut strategy = TargetPoolTargeting::new();
        let mut rng = StdRng::seed_from_u64(5);
        strategy.load(&field, Canvas::new(100.0, 100.0), &mut rng).unwrap();

        let (assignment, _) = strategy.claim(Point::ZERO, &bits).unwrap();
        assert_eq!(strategy.source(assignment, &bits), Some(Point::new(5.0, 5.0)));
        bits[0].pick_up().unwrap();
        assert_eq!(strategy.source(assignment, &bits), None);
    }
}
