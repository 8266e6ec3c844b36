//! Fixed-timestep worker thread.
//!
//! The worker runs frames of up to `max_substeps` ticks, stops early once the
//! frame budget is spent, and waits out the rest of the budget on its control
//! channel so a stop request never waits for a full frame.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::error::{PhysicsError, PhysicsResult};
use super::events::UpdatePhysicsDefaults;
use super::{PhysicsConfig, PhysicsWorld};

const THREAD_NAME: &str = "rein2d-physics";

/// Entities plus the simulation context that steps them.
#[derive(Default)]
pub struct Scene {
    pub world: hecs::World,
    pub physics: PhysicsWorld,
}

impl Scene {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            world: hecs::World::new(),
            physics: PhysicsWorld::new(config),
        }
    }

    pub fn tick(&mut self) {
        self.physics.tick(&mut self.world);
    }

    pub fn into_shared(self) -> SharedScene {
        Arc::new(Mutex::new(self))
    }
}

/// A scene shared between the host and the worker.
pub type SharedScene = Arc<Mutex<Scene>>;

/// Lock the scene, recovering from a panic on another thread.
pub fn lock_scene(scene: &SharedScene) -> MutexGuard<'_, Scene> {
    scene.lock().unwrap_or_else(|poisoned| {
        tracing::error!("physics scene lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Monotonic time source for frame budgeting.
pub trait Clock: Send + Sync {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock that moves forward by `step` on every read.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
    step: u64,
}

impl ManualClock {
    pub fn new(step: Duration) -> Self {
        Self {
            nanos: AtomicU64::new(0),
            step: step.as_nanos() as u64,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.fetch_add(self.step, Ordering::Relaxed))
    }
}

/// How many ticks a frame may run and how long it may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePolicy {
    pub substeps: u32,
    pub frame_budget: Duration,
}

impl FramePolicy {
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self {
            substeps: config.max_substeps.max(1),
            frame_budget: config.target_frame_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub ticks: u32,
    pub elapsed: Duration,
}

/// Run one frame: up to `policy.substeps` ticks, stopping once the budget is spent.
///
/// The scene lock is held per tick, so other threads can get in between ticks.
pub fn run_frame(scene: &SharedScene, policy: FramePolicy, clock: &dyn Clock) -> FrameReport {
    let begin = clock.now();
    let mut ticks = 0;

    while ticks < policy.substeps {
        lock_scene(scene).tick();
        ticks += 1;

        let elapsed = clock.now().saturating_sub(begin);
        if elapsed >= policy.frame_budget {
            if ticks < policy.substeps {
                tracing::trace!(ticks, ?elapsed, "physics frame over budget");
            }
            break;
        }
    }

    FrameReport {
        ticks,
        elapsed: clock.now().saturating_sub(begin),
    }
}

/// Control messages for the worker.
#[derive(Debug, Clone)]
pub enum Command {
    Stop,
    UpdateDefaults(UpdatePhysicsDefaults),
}

struct Worker {
    commands: Sender<Command>,
    handle: JoinHandle<()>,
}

/// Decrements the live worker count when the worker closure is dropped,
/// whether the thread ran, panicked or never spawned.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owns the physics worker thread of one scene.
///
/// `start` and `stop` are idempotent. Dropping the scheduler stops the worker.
pub struct PhysicsScheduler {
    scene: SharedScene,
    worker: Option<Worker>,
    live: Arc<AtomicUsize>,
}

impl PhysicsScheduler {
    pub fn new(scene: SharedScene) -> Self {
        Self {
            scene,
            worker: None,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn scene(&self) -> &SharedScene {
        &self.scene
    }

    /// True while the worker thread is alive. A worker that died on a panic
    /// does not count.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Number of worker threads currently alive for this scheduler.
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Spawn the worker. Does nothing if it is already running.
    pub fn start(&mut self) -> PhysicsResult<()> {
        if self.is_running() {
            tracing::debug!("physics worker already running");
            return Ok(());
        }
        self.reap();

        let (commands, receiver) = mpsc::channel();
        let scene = Arc::clone(&self.scene);
        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(Arc::clone(&self.live));

        let handle = std::thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || {
                let _guard = guard;
                tracing::debug!("physics worker started");
                worker_loop(&scene, &receiver, &SystemClock::new());
                halt_bodies(&scene);
                tracing::debug!("physics worker stopped");
            })
            .map_err(PhysicsError::WorkerSpawn)?;

        self.worker = Some(Worker { commands, handle });
        Ok(())
    }

    /// Ask the worker to stop and wait until it has exited. Does nothing if
    /// it is not running.
    pub fn stop(&mut self) {
        if let Some(worker) = &self.worker {
            // A send error means the worker is already gone; join still reaps it.
            let _ = worker.commands.send(Command::Stop);
        }
        self.reap();
    }

    /// Join the worker thread, if any, and forget it.
    fn reap(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.handle.join().is_err() {
            tracing::error!("physics worker panicked");
        }
    }

    /// Push new tunables. Applied by the worker before its next frame, or
    /// directly when the worker is not running.
    pub fn push_defaults(&self, defaults: UpdatePhysicsDefaults) {
        if let Some(worker) = &self.worker {
            if worker
                .commands
                .send(Command::UpdateDefaults(defaults))
                .is_ok()
            {
                return;
            }
        }
        lock_scene(&self.scene).physics.apply_defaults(&defaults);
    }
}

impl Drop for PhysicsScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Flow {
    Continue,
    Exit,
}

fn handle_command(scene: &SharedScene, command: Command) -> Flow {
    match command {
        Command::Stop => Flow::Exit,
        Command::UpdateDefaults(defaults) => {
            lock_scene(scene).physics.apply_defaults(&defaults);
            Flow::Continue
        }
    }
}

fn worker_loop(scene: &SharedScene, commands: &Receiver<Command>, clock: &dyn Clock) {
    loop {
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if let Flow::Exit = handle_command(scene, command) {
                        return;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        let policy = FramePolicy::from_config(lock_scene(scene).physics.config());
        let report = run_frame(scene, policy, clock);

        let remaining = policy.frame_budget.saturating_sub(report.elapsed);
        if remaining.is_zero() {
            continue;
        }
        match commands.recv_timeout(remaining) {
            Ok(command) => {
                if let Flow::Exit = handle_command(scene, command) {
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn halt_bodies(scene: &SharedScene) {
    let mut scene = lock_scene(scene);
    let Scene { world, physics } = &mut *scene;
    physics.reset_velocities(world);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Collider, RigidBody};
    use crate::ecs::components::transform::Transform2d;
    use glam::DVec2;

    #[test]
    fn test_run_frame_runs_all_substeps_under_budget() {
        let scene = Scene::default().into_shared();
        let clock = ManualClock::new(Duration::from_millis(1));
        let policy = FramePolicy {
            substeps: 4,
            frame_budget: Duration::from_millis(20),
        };

        let report = run_frame(&scene, policy, &clock);
        assert_eq!(report.ticks, 4);
        assert_eq!(lock_scene(&scene).physics.clock().ticks, 4);
        assert!(report.elapsed < policy.frame_budget);
    }

    #[test]
    fn test_run_frame_stops_at_budget() {
        let scene = Scene::default().into_shared();
        // Every read costs 8ms: the budget is spent after the second tick.
        let clock = ManualClock::new(Duration::from_millis(8));
        let policy = FramePolicy {
            substeps: 4,
            frame_budget: Duration::from_millis(15),
        };

        let report = run_frame(&scene, policy, &clock);
        assert_eq!(report.ticks, 2);
    }

    #[test]
    fn test_frame_policy_never_zero_substeps() {
        let config = PhysicsConfig {
            max_substeps: 0,
            ..PhysicsConfig::default()
        };
        assert_eq!(FramePolicy::from_config(&config).substeps, 1);
    }

    #[test]
    fn test_stop_resets_velocities() {
        let mut scene = Scene::new(PhysicsConfig {
            gravity: DVec2::ZERO,
            ..PhysicsConfig::default()
        });
        let mut rb = RigidBody::new(1.0);
        rb.linear_velocity = DVec2::new(3.0, 0.0);
        let entity = scene
            .world
            .spawn((Transform2d::identity(), rb, Collider::circle(0.5)));
        scene.physics.attach_body(&scene.world, entity).unwrap();

        let mut scheduler = PhysicsScheduler::new(scene.into_shared());
        scheduler.start().unwrap();
        std::thread::sleep(Duration::from_millis(30));
        scheduler.stop();

        let scene = lock_scene(scheduler.scene());
        let rb = scene.world.get::<&RigidBody>(entity).unwrap();
        assert_eq!(rb.linear_velocity, DVec2::ZERO);
        assert!(scene.physics.clock().ticks > 0);
    }

    #[test]
    fn test_push_defaults_while_stopped_applies_directly() {
        let scheduler = PhysicsScheduler::new(Scene::default().into_shared());
        scheduler.push_defaults(UpdatePhysicsDefaults {
            iteration_count: 3,
            ..UpdatePhysicsDefaults::default()
        });
        assert_eq!(lock_scene(scheduler.scene()).physics.config().iteration_count, 3);
    }
}
