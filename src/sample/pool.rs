use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use log::{debug, info, warn};

use super::{rollout, Trajectory};
use crate::{
    env::Environment,
    error::{Error, Result},
    policy::Policy,
};

/// Everything one worker needs to run rollouts on its own: an environment instance and
/// an independent replica of the policy
pub struct WorkerContext<E, P> {
    pub id: usize,
    pub env: E,
    pub policy: P,
}

impl<E: Environment, P: Policy> WorkerContext<E, P> {
    /// Build a context from a fresh clone of `env` and a copy of `policy`
    pub fn new(id: usize, env: &E, policy: &P) -> Result<Self>
    where
        E: Clone,
    {
        let env = env.clone();
        let policy = policy.copy(&env)?;
        Ok(Self { id, env, policy })
    }

    pub fn rollout(&mut self, max_length: usize) -> Result<Trajectory<E::Info>> {
        rollout(&mut self.env, &self.policy, max_length)
    }
}

struct WorkerChannels<I> {
    tasks: Receiver<usize>,
    params: Receiver<Arc<[f32]>>,
    results: Sender<Result<Trajectory<I>>>,
    acks: Sender<Result<()>>,
}

fn run_worker<E, P>(mut ctx: WorkerContext<E, P>, channels: WorkerChannels<E::Info>)
where
    E: Environment,
    P: Policy,
{
    let WorkerChannels {
        tasks,
        params,
        results,
        acks,
    } = channels;

    loop {
        select! {
            recv(params) -> msg => match msg {
                Ok(params) => {
                    if acks.send(ctx.policy.set_params(&params)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(tasks) -> msg => match msg {
                Ok(max_length) => {
                    let id = ctx.id;
                    let result = panic::catch_unwind(AssertUnwindSafe(|| ctx.rollout(max_length)))
                        .unwrap_or(Err(Error::WorkerPanicked(id)));
                    if let Err(err) = &result {
                        warn!("rollout worker {id} failed: {err}");
                    }
                    if results.send(result).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
        }
    }

    debug!("rollout worker {} stopped", ctx.id);
}

/// A fixed-size pool of worker threads, each owning a [`WorkerContext`]
///
/// Contexts are built once, when the pool is created, and reused by every batch.
/// Rollouts are pulled from a shared queue, so results come back in completion order,
/// not submission order.
pub struct RolloutPool<E: Environment> {
    tasks: Option<Sender<usize>>,
    results: Receiver<Result<Trajectory<E::Info>>>,
    params: Vec<Sender<Arc<[f32]>>>,
    acks: Receiver<Result<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl<E> RolloutPool<E>
where
    E: Environment + Clone + Send + 'static,
    E::Info: Send + 'static,
{
    /// Spawn `workers` threads, each with its own clone of `env` and copy of `policy`
    ///
    /// **Errors** with [`Error::InvalidConfig`] if `workers` is zero
    pub fn new<P>(env: &E, policy: &P, workers: usize) -> Result<Self>
    where
        P: Policy + Send + 'static,
    {
        if workers == 0 {
            return Err(Error::InvalidConfig(String::from(
                "a rollout pool needs at least one worker",
            )));
        }

        let (task_tx, task_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();
        let (ack_tx, ack_rx) = unbounded();

        let mut pool = Self {
            tasks: Some(task_tx),
            results: result_rx,
            params: Vec::with_capacity(workers),
            acks: ack_rx,
            workers: Vec::with_capacity(workers),
        };

        for id in 0..workers {
            let ctx = WorkerContext::new(id, env, policy)?;
            let (params_tx, params_rx) = unbounded();
            let channels = WorkerChannels {
                tasks: task_rx.clone(),
                params: params_rx,
                results: result_tx.clone(),
                acks: ack_tx.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("rollout-worker-{id}"))
                .spawn(move || run_worker(ctx, channels))?;
            pool.params.push(params_tx);
            pool.workers.push(handle);
        }

        info!("started rollout pool with {workers} workers");
        Ok(pool)
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Run `n` rollouts across the pool, blocking until all of them have finished
    ///
    /// If any rollout fails the whole batch fails with the first error received.
    pub fn sample(&mut self, n: usize, max_length: usize) -> Result<Vec<Trajectory<E::Info>>> {
        let tasks = self.tasks.as_ref().ok_or(Error::WorkerDisconnected)?;
        for _ in 0..n {
            tasks.send(max_length).map_err(|_| Error::WorkerDisconnected)?;
        }

        let mut trajectories = Vec::with_capacity(n);
        let mut failure = None;
        for _ in 0..n {
            match self.results.recv() {
                Ok(Ok(trajectory)) => trajectories.push(trajectory),
                Ok(Err(err)) => {
                    failure.get_or_insert(err);
                }
                Err(_) => return Err(Error::WorkerDisconnected),
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(trajectories),
        }
    }

    /// Load `params` into every worker's policy replica, blocking until all have done so
    pub fn sync_params(&mut self, params: &[f32]) -> Result<()> {
        let params: Arc<[f32]> = params.into();
        for tx in &self.params {
            tx.send(Arc::clone(&params))
                .map_err(|_| Error::WorkerDisconnected)?;
        }

        let mut failure = None;
        for _ in 0..self.params.len() {
            match self.acks.recv() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failure.get_or_insert(err);
                }
                Err(_) => return Err(Error::WorkerDisconnected),
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<E: Environment> Drop for RolloutPool<E> {
    fn drop(&mut self) {
        // closing the queues stops the workers
        self.tasks.take();
        self.params.clear();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        info!("rollout pool shut down");
    }
}

/// Run `n` rollouts on a temporary pool of `workers` threads
///
/// Each worker gets its own copy of `env` and `policy`. Results are not in submission order.
pub fn sample_parallel<E, P>(
    env: &E,
    policy: &P,
    n: usize,
    max_length: usize,
    workers: usize,
) -> Result<Vec<Trajectory<E::Info>>>
where
    E: Environment + Clone + Send + 'static,
    E::Info: Send + 'static,
    P: Policy + Send + 'static,
{
    let mut pool = RolloutPool::new(env, policy, workers)?;
    pool.sample(n, max_length)
}
