use crate::agent::{Agent, AgentState};
use crate::snapshot::{AgentFrame, BitFrame, FrameSnapshot};
use crate::spatial::{separation_force, SpatialGrid};
use crate::targeting::{strategy_for, TargetingStrategy};
use crate::SimulationError;
use antogram_config::{AgentSettings, Config};
use antogram_core::{jitter, AgentId, Bit, Canvas, Point, PreparedField};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// The swarm: bits, agents and the strategy that hands out work.
pub struct Simulation {
    canvas: Canvas,
    settings: AgentSettings,
    separation: bool,
    bits: Vec<Bit>,
    agents: Vec<Agent>,
    strategy: Box<dyn TargetingStrategy>,
    grid: SpatialGrid,
    rng: StdRng,
    frame: u64,
}

impl Simulation {
    /// Spawns `agents.count` agents at random positions. Seeded from
    /// `config.seed` when set.
    pub fn new(config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_strategy(
            config.canvas(),
            config.agents.clone(),
            strategy_for(config.targeting.strategy),
            config.targeting.separation_enabled(),
            rng,
        )
    }

    pub fn with_strategy(
        canvas: Canvas,
        settings: AgentSettings,
        strategy: Box<dyn TargetingStrategy>,
        separation: bool,
        rng: StdRng,
    ) -> Self {
        let mut simulation = Self {
            canvas,
            grid: SpatialGrid::new(settings.separation_radius_bodies * settings.body_length, canvas),
            settings,
            separation,
            bits: Vec::new(),
            agents: Vec::new(),
            strategy,
            rng,
            frame: 0,
        };
        simulation.spawn_agents();
        info!(
            "Simulation created: {} agents, {} targeting, separation {}",
            simulation.agents.len(),
            simulation.strategy.name(),
            if separation { "on" } else { "off" }
        );
        simulation
    }

    fn spawn_agents(&mut self) {
        let canvas = self.canvas;
        let rng = &mut self.rng;
        self.agents = (0..self.settings.count)
            .map(|i| Agent::spawn(AgentId::new(i), canvas, rng))
            .collect();
    }

    /// Replaces the agents, e.g. to place them by hand.
    pub fn replace_agents(&mut self, agents: Vec<Agent>) {
        self.agents = agents;
    }

    // --- Field lifecycle ---

    /// Swaps in a new field: clears the previous bits and work, respawns
    /// the agents and hands jobs or destinations to the strategy.
    pub fn load_field(&mut self, field: PreparedField) -> Result<(), SimulationError> {
        if field.jobs.len() != field.bits.len() {
            return Err(SimulationError::FieldMismatch {
                bits: field.bits.len(),
                jobs: field.jobs.len(),
            });
        }

        self.strategy.reset();
        self.strategy.load(&field, self.canvas, &mut self.rng)?;
        self.bits = field.bits;
        self.spawn_agents();
        self.frame = 0;

        if self.bits.is_empty() {
            warn!("Loaded an empty field; agents will wander");
        } else {
            info!("Loaded {:?} field with {} bits", field.mode, self.bits.len());
        }
        Ok(())
    }

    /// Clears everything and respawns agents for a new canvas size. The
    /// caller rebuilds and reloads the field.
    pub fn resize(&mut self, canvas: Canvas) {
        self.canvas = canvas;
        self.grid = SpatialGrid::new(self.grid.cell_size(), canvas);
        self.strategy.reset();
        self.bits.clear();
        self.spawn_agents();
        self.frame = 0;
        info!("Resized to {}x{}", canvas.width, canvas.height);
    }

    // --- Tick ---

    /// Advances every agent once, in id order.
    pub fn tick(&mut self) -> Result<(), SimulationError> {
        let separations = self.separation_forces();

        let Self {
            canvas,
            settings,
            bits,
            agents,
            strategy,
            rng,
            ..
        } = self;

        for (agent, separation) in agents.iter_mut().zip(separations) {
            update_state(agent, bits, &mut **strategy, settings, rng)?;

            match agent.target() {
                Some(target) => agent.seek(target, separation, settings, rng),
                None => agent.wander(separation, settings, *canvas, rng),
            }
            agent.finish_move(*canvas);

            if let Some(id) = agent.carried() {
                let jaw = agent.jaw_point(settings);
                bit_mut(bits, id)?.follow_jaw(jaw);
            }
        }

        self.frame += 1;
        if self.frame % 300 == 0 {
            debug!(
                "Frame {}: progress {:.1}%",
                self.frame,
                self.strategy.progress() * 100.0
            );
        }
        Ok(())
    }

    /// Per-agent repulsion, gathered from a read-only view before anyone moves.
    fn separation_forces(&mut self) -> Vec<Point> {
        if !self.separation || self.agents.len() < 2 {
            return vec![Point::ZERO; self.agents.len()];
        }
        let positions: Vec<Point> = self.agents.iter().map(|a| a.position).collect();
        self.grid.rebuild(&positions);

        let radius = self.settings.separation_radius_bodies * self.settings.body_length;
        let magnitude = self.settings.max_speed * self.settings.separation_strength;
        let grid = &self.grid;
        (0..positions.len())
            .into_par_iter()
            .map(|i| separation_force(grid, &positions, i, radius, magnitude))
            .collect()
    }

    // --- Queries ---

    pub fn progress(&self) -> f32 {
        self.strategy.progress()
    }

    /// Every bit has been delivered (vacuously true for an empty field).
    pub fn is_complete(&self) -> bool {
        self.bits.iter().all(Bit::is_delivered)
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            frame: self.frame,
            progress: self.progress(),
            bits: self
                .bits
                .iter()
                .map(|bit| BitFrame {
                    x: bit.position.x,
                    y: bit.position.y,
                    color: bit.color,
                    carried: bit.is_carried(),
                })
                .collect(),
            agents: self
                .agents
                .iter()
                .map(|agent| AgentFrame {
                    id: agent.id().raw(),
                    x: agent.position.x,
                    y: agent.position.y,
                    heading: agent.heading(),
                    walk_frame: agent.walk_frame(),
                    carrying: agent.carried().is_some(),
                })
                .collect(),
        }
    }

    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}

fn bit_mut(bits: &mut [Bit], id: antogram_core::BitId) -> Result<&mut Bit, SimulationError> {
    bits.get_mut(id.index()).ok_or(SimulationError::UnknownBit(id))
}

/// One step of the agent's job state machine.
fn update_state<R: Rng + ?Sized>(
    agent: &mut Agent,
    bits: &mut [Bit],
    strategy: &mut dyn TargetingStrategy,
    settings: &AgentSettings,
    rng: &mut R,
) -> Result<(), SimulationError> {
    match agent.state() {
        AgentState::SeekingJob => {
            if agent.assignment().is_none() {
                if let Some((assignment, source)) = strategy.claim(agent.position, bits) {
                    trace!("Agent {} took {:?}", agent.id(), assignment);
                    agent.assign(assignment, source);
                }
            }
        }
        AgentState::GoingToSource => {
            let Some(assignment) = agent.assignment() else {
                agent.release();
                return Ok(());
            };
            let Some(source) = strategy.source(assignment, bits) else {
                // Someone else got there first
                trace!("Agent {} lost {:?}", agent.id(), assignment);
                agent.release();
                return Ok(());
            };
            agent.retarget(source);

            if agent.position.distance(source) < settings.arrival_radius {
                if let Some(id) =
                    strategy.select_bit(assignment, agent.position, bits, settings.pickup_radius)?
                {
                    let bit = bit_mut(bits, id)?;
                    bit.pick_up()?;
                    let destination = strategy.destination(assignment, bit, agent.position);
                    trace!("Agent {} picked up bit {}", agent.id(), id);
                    agent.start_carrying(id, destination);
                }
            }
        }
        AgentState::GoingToDest => {
            let (Some(assignment), Some(id), Some(destination)) =
                (agent.assignment(), agent.carried(), agent.target())
            else {
                agent.release();
                return Ok(());
            };

            if agent.position.distance(destination) < settings.arrival_radius {
                let offset = Point::new(
                    jitter(rng, settings.delivery_jitter),
                    jitter(rng, settings.delivery_jitter),
                );
                bit_mut(bits, id)?.deliver(destination + offset)?;
                strategy.complete(assignment)?;
                trace!("Agent {} delivered bit {}", agent.id(), id);
                agent.release();
            }
        }
    }
    Ok(())
}
