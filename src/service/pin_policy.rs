use crate::auth::password::verify_secret;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::pin::PinCredential;
use crate::repo::PinRepo;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PinOutcome {
    Verified,
    Invalid {
        remaining_attempts: u32,
    },
    Blocked {
        #[schema(value_type = String, format = "date-time")]
        until: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct PinPolicy {
    pub max_attempts: u32,
    pub lockout: Duration,
}

impl PinPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.pin_max_attempts.max(1),
            lockout: Duration::minutes(config.pin_lockout_minutes.max(1)),
        }
    }

    pub fn locked_until(&self, cred: &PinCredential, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        cred.locked_until.filter(|until| *until > now)
    }

    /// Applies one verification attempt to the credential.
    pub fn apply(&self, cred: &mut PinCredential, pin_matches: bool, now: DateTime<Utc>) -> PinOutcome {
        if let Some(until) = self.locked_until(cred, now) {
            return PinOutcome::Blocked { until };
        }
        cred.locked_until = None;

        if pin_matches {
            cred.failed_attempts = 0;
            return PinOutcome::Verified;
        }

        cred.failed_attempts += 1;
        if cred.failed_attempts >= self.max_attempts {
            let until = now + self.lockout;
            cred.failed_attempts = 0;
            cred.locked_until = Some(until);
            return PinOutcome::Blocked { until };
        }

        PinOutcome::Invalid {
            remaining_attempts: self.max_attempts - cred.failed_attempts,
        }
    }
}

/// Loads the credential, checks the PIN unless locked, and persists the result.
pub async fn verify_pin(
    repo: &dyn PinRepo,
    policy: PinPolicy,
    employee_id: u64,
    pin: &str,
    now: DateTime<Utc>,
) -> AppResult<PinOutcome> {
    let mut cred = repo
        .get_credential(employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("No PIN configured for this employee"))?;

    if let Some(until) = policy.locked_until(&cred, now) {
        tracing::info!(employee_id, %until, "PIN verification refused, credential locked");
        return Ok(PinOutcome::Blocked { until });
    }

    let matches = verify_secret(pin, &cred.pin_hash).is_ok();
    let outcome = policy.apply(&mut cred, matches, now);

    repo.save_attempts(employee_id, cred.failed_attempts, cred.locked_until)
        .await?;

    match &outcome {
        PinOutcome::Verified => tracing::debug!(employee_id, "PIN verified"),
        PinOutcome::Invalid { remaining_attempts } => {
            tracing::info!(employee_id, remaining_attempts, "Wrong PIN")
        }
        PinOutcome::Blocked { until } => {
            tracing::warn!(employee_id, %until, "PIN locked after repeated failures")
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_secret;
    use crate::repo::memory::MemoryStore;

    fn policy() -> PinPolicy {
        PinPolicy {
            max_attempts: 3,
            lockout: Duration::minutes(15),
        }
    }

    fn t0() -> DateTime<Utc> {
        "2026-03-02T08:00:00Z".parse().unwrap()
    }

    #[test]
    fn non_positive_settings_still_lock() {
        let mut config = crate::config::test_config();
        config.pin_max_attempts = 0;
        config.pin_lockout_minutes = -30;

        let p = PinPolicy::from_config(&config);
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.lockout, Duration::minutes(1));

        let mut cred = PinCredential::new(1, String::new());
        let until = t0() + Duration::minutes(1);
        assert_eq!(p.apply(&mut cred, false, t0()), PinOutcome::Blocked { until });
        assert_eq!(p.locked_until(&cred, t0()), Some(until));
    }

    #[test]
    fn blocks_after_threshold_until_lockout_elapses() {
        let p = policy();
        let mut cred = PinCredential::new(1, String::new());

        assert_eq!(p.apply(&mut cred, false, t0()), PinOutcome::Invalid { remaining_attempts: 2 });
        assert_eq!(p.apply(&mut cred, false, t0()), PinOutcome::Invalid { remaining_attempts: 1 });

        let until = t0() + Duration::minutes(15);
        assert_eq!(p.apply(&mut cred, false, t0()), PinOutcome::Blocked { until });

        // Even the right PIN is refused while locked.
        let later = t0() + Duration::minutes(14);
        assert_eq!(p.apply(&mut cred, true, later), PinOutcome::Blocked { until });

        let after = t0() + Duration::minutes(15);
        assert_eq!(p.apply(&mut cred, true, after), PinOutcome::Verified);
        assert_eq!(cred.locked_until, None);
        assert_eq!(cred.failed_attempts, 0);
    }

    #[test]
    fn success_resets_the_counter() {
        let p = policy();
        let mut cred = PinCredential::new(1, String::new());
        p.apply(&mut cred, false, t0());
        p.apply(&mut cred, false, t0());
        assert_eq!(p.apply(&mut cred, true, t0()), PinOutcome::Verified);
        assert_eq!(p.apply(&mut cred, false, t0()), PinOutcome::Invalid { remaining_attempts: 2 });
    }

    #[actix_web::test]
    async fn verify_pin_persists_attempts() {
        let store = MemoryStore::default();
        let hash = hash_secret("4321").unwrap();
        store.upsert_pin(7, &hash).await.unwrap();

        let outcome = verify_pin(&store, policy(), 7, "0000", t0()).await.unwrap();
        assert_eq!(outcome, PinOutcome::Invalid { remaining_attempts: 2 });
        let cred = store.get_credential(7).await.unwrap().unwrap();
        assert_eq!(cred.failed_attempts, 1);

        let outcome = verify_pin(&store, policy(), 7, "4321", t0()).await.unwrap();
        assert_eq!(outcome, PinOutcome::Verified);
        assert_eq!(store.get_credential(7).await.unwrap().unwrap().failed_attempts, 0);
    }

    #[actix_web::test]
    async fn unknown_employee_is_not_found() {
        let store = MemoryStore::default();
        let err = verify_pin(&store, policy(), 99, "1234", t0()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
