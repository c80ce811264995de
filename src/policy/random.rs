use super::Policy;
use crate::{
    env::{Action, ActionSpace, Environment},
    error::Result,
};

/// Baseline policy that samples uniformly from the action space and ignores observations
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    action_space: ActionSpace,
}

impl RandomPolicy {
    pub fn new(action_space: ActionSpace) -> Self {
        Self { action_space }
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }
}

impl Policy for RandomPolicy {
    fn act(&self, _obs: &[f32]) -> Result<Action> {
        self.action_space.sample()
    }

    fn copy<E: Environment>(&self, env: &E) -> Result<Self> {
        Ok(Self::new(env.action_space().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{env::tests::MockEnv, error::Error};

    #[test]
    fn acts_within_action_space() {
        let policy = RandomPolicy::new(ActionSpace::Discrete(4));
        for _ in 0..20 {
            let action = policy.act(&[]).unwrap();
            assert!(
                policy.action_space().contains(&action),
                "action sampled from the space"
            );
        }
    }

    #[test]
    fn empty_space_is_an_error() {
        let policy = RandomPolicy::new(ActionSpace::Discrete(0));
        assert!(
            matches!(policy.act(&[]), Err(Error::InvalidActionSpace(_))),
            "acting in an empty space fails instead of panicking"
        );
    }

    #[test]
    fn training_surface_not_implemented() {
        let mut policy = RandomPolicy::new(ActionSpace::Discrete(2));
        assert!(
            matches!(policy.params(), Err(Error::NotImplemented("params"))),
            "params"
        );
        assert!(
            matches!(policy.set_params(&[]), Err(Error::NotImplemented(_))),
            "set_params"
        );
        assert!(
            matches!(
                policy.grad_act(&Action::Discrete(0), &[]),
                Err(Error::NotImplemented(_))
            ),
            "grad_act"
        );
        assert!(
            matches!(
                policy.prob_act(&Action::Discrete(0), &[]),
                Err(Error::NotImplemented(_))
            ),
            "prob_act"
        );
    }

    #[test]
    fn copy_uses_env_action_space() {
        let policy = RandomPolicy::new(ActionSpace::Discrete(2));
        let env = MockEnv::new(5, 1, 3);
        let copy = policy.copy(&env).unwrap();
        assert_eq!(
            copy.action_space(),
            &ActionSpace::Discrete(5),
            "copy follows the environment"
        );
    }
}
