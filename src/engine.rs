//! The layout engine: public orchestrator for simulation runs.
//!
//! `layout()` builds a run from a graph, arms the watchdog, and hands the
//! arena to a dedicated scheduler thread. Exactly one completion callback
//! fires per call: synchronously when the graph has no movable vertices,
//! otherwise once from the scheduler thread when the run ends.
//!
//! # Concurrency
//!
//! The arena is moved into the scheduler thread and recovered by joining
//! it, so exclusive ownership of the particle state is enforced by the
//! compiler rather than a lock. Starting a new run while a prior
//! scheduler thread is still alive blocks briefly on that join; `layout()`
//! never blocks until the new run completes. The callback runs on the
//! scheduler thread; marshaling results to a UI context is the
//! receiver's responsibility.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Bounds, Point};
use crate::graph::{Graph, VertexId};
use crate::schedule::{RateScheduler, RunEnd, StopSignal, StopTrigger, Watchdog, WatchdogHandle};
use crate::sim::{Arena, ForceConfig, ForcedStable, Particle, Traction};

/// Configuration for the layout engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Layout domain particles are clamped into.
    pub bounds: Bounds,
    /// Desired simulation rate; the scheduler clamps it to [5, 50].
    pub steps_per_second: f64,
    /// Wall-clock bound per run; after this the watchdog forces stability.
    pub watchdog_timeout: Duration,
    /// Convergence threshold on per-step displacement.
    pub epsilon: f32,
    /// Seed for the reproducible (non-random) initial placement.
    pub seed: u64,
    /// Force model tuning.
    pub forces: ForceConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            steps_per_second: 25.0,
            watchdog_timeout: Duration::from_secs(10),
            epsilon: 0.1,
            seed: 42,
            forces: ForceConfig::default(),
        }
    }
}

/// How a layout run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every particle's displacement fell below epsilon.
    Stabilized,
    /// The watchdog forced completion before natural convergence.
    WatchdogFired,
    /// A newer `layout()` call stopped this run before it stabilized.
    Superseded,
}

/// Position snapshot delivered to the completion callback.
///
/// Contains every vertex of the laid-out graph: movable vertices at their
/// simulated positions, pinned vertices at their original ones.
#[derive(Debug, Clone)]
pub struct LayoutResult {
    positions: Vec<(VertexId, Point)>,
    outcome: RunOutcome,
}

impl LayoutResult {
    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    /// Iterate over `(vertex, position)` pairs.
    pub fn positions(&self) -> impl Iterator<Item = (VertexId, Point)> + '_ {
        self.positions.iter().copied()
    }

    /// Look up the computed position of one vertex.
    pub fn position_of(&self, id: VertexId) -> Option<Point> {
        self.positions
            .iter()
            .find(|(vid, _)| *vid == id)
            .map(|(_, p)| *p)
    }

    /// Write the computed positions back into a graph.
    ///
    /// Vertices missing from the graph (removed since the run started)
    /// are skipped.
    pub fn apply_to(&self, graph: &mut Graph) {
        for &(id, position) in &self.positions {
            graph.set_position(id, position);
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Handle to the run currently owning the arena.
struct ActiveRun {
    scheduler_stop: StopTrigger,
    scheduler: JoinHandle<Arena>,
    watchdog: WatchdogHandle,
}

/// Public orchestrator. Owns the reusable arena (directly when idle,
/// through the scheduler thread's join handle while running) and enforces
/// the single-active-scheduler discipline by joining the previous run
/// before starting the next.
pub struct LayoutEngine {
    config: LayoutConfig,
    generation: u64,
    forced: Arc<ForcedStable>,
    idle_arena: Option<Arena>,
    active: Option<ActiveRun>,
    /// Gauge of schedulers currently inside their step loop; asserted to
    /// never exceed one.
    active_steppers: Arc<AtomicUsize>,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            config,
            generation: 0,
            forced: Arc::new(ForcedStable::new()),
            idle_arena: None,
            active: None,
            active_steppers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Compute a layout for the graph, invoking `on_complete` exactly once.
    ///
    /// With no movable vertices the callback runs synchronously on the
    /// caller's thread and no scheduler is started. Otherwise any
    /// previous run is stopped and joined first, then a fresh run begins
    /// on a background scheduler thread and the callback fires from that
    /// thread when the run ends.
    ///
    /// `use_random_layout` selects the initial placement: uniform-random
    /// within bounds, or a fixed-seed sequence that is bit-reproducible
    /// across runs.
    pub fn layout<F>(&mut self, graph: &Graph, use_random_layout: bool, on_complete: F)
    where
        F: FnOnce(LayoutResult) + Send + 'static,
    {
        let mut arena = self.reclaim_arena();
        self.generation += 1;
        let generation = self.generation;

        if graph.movable_count() == 0 {
            debug!(generation, "no movable vertices, completing synchronously");
            self.idle_arena = Some(arena);
            on_complete(LayoutResult {
                positions: graph.vertices().map(|(id, pos, _)| (id, pos)).collect(),
                outcome: RunOutcome::Stabilized,
            });
            return;
        }

        arena.reset(
            self.config.bounds,
            self.config.forces,
            self.config.epsilon,
            generation,
        );

        // Seed particles for movable vertices; pinned keep their positions.
        let seeds = seed_positions(
            graph.movable_count(),
            self.config.bounds,
            use_random_layout,
            self.config.seed,
        );
        let mut seeds = seeds.into_iter();
        let mut particle_index: HashMap<VertexId, usize> = HashMap::new();
        let mut movable_ids: Vec<VertexId> = Vec::new();
        let mut pinned: Vec<(VertexId, Point)> = Vec::new();

        for (id, position, is_pinned) in graph.vertices() {
            if is_pinned {
                pinned.push((id, position));
            } else {
                let seed = seeds.next().unwrap_or(position);
                let index =
                    arena.add_particle(Particle::new(seed, self.config.forces.particle_weight));
                particle_index.insert(id, index);
                movable_ids.push(id);
            }
        }

        // Tractions only for edges whose both endpoints are movable.
        for (a, b, weight) in graph.edges() {
            if let (Some(&from), Some(&to)) = (particle_index.get(&a), particle_index.get(&b)) {
                arena.add_traction(Traction::new(
                    from,
                    to,
                    self.config.forces.rest_length,
                    self.config.forces.traction_impact * weight,
                ));
            }
        }

        debug!(
            generation,
            particles = arena.particle_count(),
            tractions = arena.traction_count(),
            random = use_random_layout,
            "starting layout run"
        );

        let watchdog = Watchdog::arm(self.config.watchdog_timeout, generation, self.forced.clone());
        let (signal, trigger) = StopSignal::new();
        let scheduler = RateScheduler::new(self.config.steps_per_second);
        let forced = self.forced.clone();
        let steppers = self.active_steppers.clone();

        let thread = thread::spawn(move || {
            let previous = steppers.fetch_add(1, Ordering::SeqCst);
            debug_assert_eq!(previous, 0, "two schedulers stepping concurrently");

            let end = scheduler.run(&signal, || arena.step());
            let outcome = match end {
                RunEnd::Stable if forced.is_fired_for(generation) => RunOutcome::WatchdogFired,
                RunEnd::Stable => RunOutcome::Stabilized,
                RunEnd::Stopped => RunOutcome::Superseded,
            };
            debug!(generation, ?outcome, "layout run ended");

            let mut positions: Vec<(VertexId, Point)> = movable_ids
                .into_iter()
                .zip(arena.particles())
                .map(|(id, p)| (id, p.position()))
                .collect();
            positions.extend(pinned);

            steppers.fetch_sub(1, Ordering::SeqCst);
            on_complete(LayoutResult { positions, outcome });
            arena
        });

        self.active = Some(ActiveRun {
            scheduler_stop: trigger,
            scheduler: thread,
            watchdog,
        });
    }

    /// Recover exclusive ownership of the arena.
    ///
    /// If a run is active its watchdog is cancelled and its scheduler
    /// stopped and joined; the superseded run's callback fires (with
    /// [`RunOutcome::Superseded`]) before the join returns.
    fn reclaim_arena(&mut self) -> Arena {
        if let Some(run) = self.active.take() {
            run.scheduler_stop.stop();
            run.watchdog.cancel();
            match run.scheduler.join() {
                Ok(arena) => arena,
                // A panicked run forfeits its arena; start over with a fresh one.
                Err(_) => Arena::new(self.forced.clone()),
            }
        } else {
            self.idle_arena
                .take()
                .unwrap_or_else(|| Arena::new(self.forced.clone()))
        }
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LayoutEngine {
    fn drop(&mut self) {
        if let Some(run) = self.active.take() {
            run.scheduler_stop.stop();
            run.watchdog.cancel();
            // Bounded by one scheduler tick; guarantees the callback has
            // fired before the engine is gone.
            let _ = run.scheduler.join();
        }
    }
}

/// Initial particle placement.
///
/// Random mode scatters uniformly within bounds from the thread RNG; the
/// reproducible mode uses a fixed-seed ChaCha8 stream so successive runs
/// over the same graph start from bit-identical positions.
fn seed_positions(count: usize, bounds: Bounds, use_random_layout: bool, seed: u64) -> Vec<Point> {
    if use_random_layout {
        scatter(&mut rand::thread_rng(), count, bounds)
    } else {
        scatter(&mut ChaCha8Rng::seed_from_u64(seed), count, bounds)
    }
}

fn scatter<R: Rng>(rng: &mut R, count: usize, bounds: Bounds) -> Vec<Point> {
    (0..count)
        .map(|_| {
            Point::new(
                rng.gen_range(bounds.min().x..=bounds.max().x),
                rng.gen_range(bounds.min().y..=bounds.max().y),
            )
        })
        .collect()
}
