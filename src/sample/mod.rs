use std::fmt;

use burn::config::Config;
use log::trace;

use crate::{
    env::{Action, Environment, Observation},
    error::{self, Error},
    policy::Policy,
};

mod pool;

pub use pool::{sample_parallel, RolloutPool, WorkerContext};

/// Settings for a single rollout
#[derive(Config, Debug)]
pub struct RolloutConfig {
    /// Maximum number of actions taken before the episode is cut off
    #[config(default = 1000)]
    pub max_length: usize,
    /// Call [`Environment::render`] after every step
    #[config(default = false)]
    pub render: bool,
}

/// One episode of interaction: `T + 1` observations and `T` actions, rewards and infos
#[derive(Debug, Clone)]
pub struct Trajectory<I> {
    obs: Vec<Observation>,
    act: Vec<Action>,
    rew: Vec<f32>,
    info: Vec<I>,
}

impl<I> Trajectory<I> {
    /// **Errors** with [`Error::LengthMismatch`] unless
    /// `obs.len() == act.len() + 1 == rew.len() + 1 == info.len() + 1`
    pub fn new(obs: Vec<Observation>, act: Vec<Action>, rew: Vec<f32>, info: Vec<I>) -> error::Result<Self> {
        let t = act.len();
        for (expected, found) in [(t + 1, obs.len()), (t, rew.len()), (t, info.len())] {
            if expected != found {
                return Err(Error::LengthMismatch { expected, found });
            }
        }
        Ok(Self { obs, act, rew, info })
    }

    pub fn obs(&self) -> &[Observation] {
        &self.obs
    }

    pub fn act(&self) -> &[Action] {
        &self.act
    }

    pub fn rew(&self) -> &[f32] {
        &self.rew
    }

    pub fn info(&self) -> &[I] {
        &self.info
    }

    /// Number of steps `T`
    pub fn len(&self) -> usize {
        self.act.len()
    }

    pub fn is_empty(&self) -> bool {
        self.act.is_empty()
    }

    /// Sum of rewards
    pub fn tot_rew(&self) -> f32 {
        self.rew.iter().sum()
    }
}

impl<I> fmt::Display for Trajectory<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trajectory(len={},r={})", self.len(), self.tot_rew())
    }
}

/// Run one episode of `policy` in `env`, stopping when the environment is done or after
/// `max_length` actions
pub fn rollout<E, P>(env: &mut E, policy: &P, max_length: usize) -> error::Result<Trajectory<E::Info>>
where
    E: Environment,
    P: Policy,
{
    let config = RolloutConfig::new().with_max_length(max_length);
    rollout_with(env, policy, &config)
}

/// Run one episode as configured by `config`
///
/// Environment errors are not handled; they abort the episode and propagate.
pub fn rollout_with<E, P>(env: &mut E, policy: &P, config: &RolloutConfig) -> error::Result<Trajectory<E::Info>>
where
    E: Environment,
    P: Policy,
{
    let mut obs = env.reset().map_err(Error::environment)?;
    let mut obs_list = vec![obs.clone()];
    let mut act_list = Vec::new();
    let mut rew_list = Vec::new();
    let mut info_list = Vec::new();

    while act_list.len() < config.max_length {
        let action = policy.act(&obs)?;
        let step = env.step(&action).map_err(Error::environment)?;
        if config.render {
            env.render();
        }

        obs = step.observation;
        obs_list.push(obs.clone());
        act_list.push(action);
        rew_list.push(step.reward);
        info_list.push(step.info);

        if step.done {
            break;
        }
    }

    let trajectory = Trajectory::new(obs_list, act_list, rew_list, info_list)?;
    trace!("{trajectory}");
    Ok(trajectory)
}

/// Run `n` episodes one after another, returned in the order they were run
pub fn sample<E, P>(env: &mut E, policy: &P, n: usize, max_length: usize) -> error::Result<Vec<Trajectory<E::Info>>>
where
    E: Environment,
    P: Policy,
{
    (0..n).map(|_| rollout(env, policy, max_length)).collect()
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};

    use super::*;
    use crate::{
        env::{
            tests::{FailingEnv, MockEnv},
            ActionSpace,
        },
        policy::{DiscretePolicy, RandomPolicy},
    };

    #[test]
    fn trajectory_validates_lengths() {
        let ok = Trajectory::new(
            vec![vec![0.0], vec![1.0]],
            vec![Action::Discrete(0)],
            vec![1.5],
            vec![()],
        )
        .unwrap();
        assert_eq!(ok.len(), 1, "one step");
        assert_eq!(ok.tot_rew(), 1.5, "total reward");
        assert_eq!(ok.to_string(), "Trajectory(len=1,r=1.5)", "display");

        let bad = Trajectory::new(vec![vec![0.0]], vec![Action::Discrete(0)], vec![1.5], vec![()]);
        assert!(
            matches!(
                bad,
                Err(Error::LengthMismatch {
                    expected: 2,
                    found: 1
                })
            ),
            "missing final observation is rejected"
        );
    }

    #[test]
    fn rollout_stops_when_done() {
        let mut env = MockEnv::new(2, 3, 4);
        let policy = RandomPolicy::new(ActionSpace::Discrete(2));
        let traj = rollout(&mut env, &policy, 100).unwrap();
        assert_eq!(traj.len(), 4, "episode ends at the horizon");
        assert_eq!(traj.obs().len(), 5, "one more observation than actions");
        assert_eq!(traj.info(), [1, 2, 3, 4], "infos recorded in order");
        let expected: f32 = traj
            .act()
            .iter()
            .map(|a| if *a == Action::Discrete(1) { 1.0 } else { 0.0 })
            .sum();
        assert_eq!(traj.tot_rew(), expected, "rewards follow the actions");
    }

    #[test]
    fn rollout_respects_max_length() {
        let mut env = MockEnv::new(2, 3, 1000);
        let policy = RandomPolicy::new(ActionSpace::Discrete(2));
        let traj = rollout(&mut env, &policy, 7).unwrap();
        assert_eq!(traj.len(), 7, "cut off at max_length");
        assert_eq!(traj.obs().len(), traj.act().len() + 1, "length invariant");

        let traj = rollout(&mut env, &policy, 0).unwrap();
        assert!(traj.is_empty(), "no steps with max_length 0");
        assert_eq!(traj.obs().len(), 1, "initial observation only");
    }

    #[test]
    fn rollout_with_render() {
        let mut env = MockEnv::new(2, 3, 3);
        let policy = RandomPolicy::new(ActionSpace::Discrete(2));
        let config = RolloutConfig::new().with_render(true);
        rollout_with(&mut env, &policy, &config).unwrap();
        assert_eq!(env.renders, 3, "rendered after every step");

        rollout(&mut env, &policy, 10).unwrap();
        assert_eq!(env.renders, 3, "plain rollouts do not render");
    }

    #[test]
    fn sample_random_policy() {
        let mut env = MockEnv::new(2, 4, 1000);
        let policy = RandomPolicy::new(env.action_space().clone());
        let trajs = sample(&mut env, &policy, 5, 10).unwrap();
        assert_eq!(trajs.len(), 5, "one trajectory per rollout");
        for traj in &trajs {
            assert!(traj.act().len() <= 10, "at most max_length actions");
            assert_eq!(traj.obs().len(), traj.act().len() + 1, "length invariant");
        }
    }

    #[test]
    fn sample_discrete_policy() {
        let mut env = MockEnv::new(3, 2, 6);
        let policy = DiscretePolicy::<Autodiff<NdArray>>::new(&env, &Default::default()).unwrap();
        let trajs = sample(&mut env, &policy, 3, 100).unwrap();
        assert!(trajs.iter().all(|t| t.len() == 6), "episodes run to the horizon");
        assert!(
            trajs
                .iter()
                .flat_map(|t| t.act())
                .all(|a| env.action_space().contains(a)),
            "actions come from the action space"
        );
    }

    #[test]
    fn environment_errors_propagate() {
        let mut env = FailingEnv::new(3);
        let policy = RandomPolicy::new(ActionSpace::Discrete(2));
        let result = rollout(&mut env, &policy, 10);
        assert!(
            matches!(result, Err(Error::Environment(_))),
            "step error aborts the rollout"
        );
    }
}
