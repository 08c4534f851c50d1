//! Local pseudo-identity.
//!
//! No authentication exists. A user id and a display name are generated once
//! per installation and persisted by the client; both are stable across
//! reconnects.

use serde::{Deserialize, Serialize};
use touchline_proto::UserId;

use crate::env::Environment;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Local identity announced in chat rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    /// `user_<unix millis>_<9 base-36 chars>`
    pub user_id: UserId,
    /// Display name, `Fan<0..999>` until changed
    pub username: String,
}

impl UserSession {
    /// Fresh identity from the environment's wall clock and randomness.
    pub fn generate<E: Environment>(env: &E) -> Self {
        Self { user_id: Self::generate_user_id(env), username: Self::generate_username(env) }
    }

    /// Fresh user id.
    pub fn generate_user_id<E: Environment>(env: &E) -> UserId {
        let mut suffix = [0u8; SUFFIX_LEN];
        env.random_bytes(&mut suffix);
        let suffix: String =
            suffix.iter().map(|byte| char::from(BASE36[usize::from(*byte) % 36])).collect();
        format!("user_{}_{suffix}", env.unix_millis())
    }

    /// Fresh default display name.
    pub fn generate_username<E: Environment>(env: &E) -> String {
        format!("Fan{}", env.random_u64() % 1000)
    }

    /// Same identity under a new display name.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[derive(Clone)]
    struct FixedEnv;

    impl Environment for FixedEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = (i * 7) as u8;
            }
        }

        fn unix_millis(&self) -> u64 {
            1_735_689_600_000
        }
    }

    #[test]
    fn user_id_shape() {
        let session = UserSession::generate(&FixedEnv);

        let suffix = session.user_id.strip_prefix("user_1735689600000_").unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
    }

    #[test]
    fn username_shape() {
        let session = UserSession::generate(&FixedEnv);

        let number: u32 = session.username.strip_prefix("Fan").unwrap().parse().unwrap();
        assert!(number < 1000);
    }
}
