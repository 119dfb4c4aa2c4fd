//! Optimistic content-concurrency check.
//!
//! Every case carries a `content_updated_at` timestamp that changes on
//! each content write. Clients echo back the value they last read; a
//! mismatch means somebody else wrote in between and the caller must
//! re-fetch before retrying. This version is independent of the workflow
//! log's latest-entry versioning.

use chrono::SubsecRound;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// PostgreSQL `TIMESTAMPTZ` keeps microseconds; compare at that precision.
const STORED_SUBSEC_DIGITS: u16 = 6;

/// Normalise a timestamp to the precision storage keeps.
pub fn to_stored_precision(ts: Timestamp) -> Timestamp {
    ts.trunc_subsecs(STORED_SUBSEC_DIGITS)
}

/// Pass when the client's version matches the current content version.
pub fn check_version(
    case_id: DbId,
    client_version: Timestamp,
    current_version: Timestamp,
) -> Result<(), CoreError> {
    if to_stored_precision(client_version) == to_stored_precision(current_version) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Case {case_id} was modified at {current_version} after the submitted version \
             {client_version}; reload the case and retry"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    #[test]
    fn matching_versions_pass() {
        let now = Utc::now();
        assert!(check_version(1, now, now).is_ok());
    }

    #[test]
    fn nanosecond_noise_is_ignored() {
        let stored = to_stored_precision(Utc::now());
        let client = stored + Duration::nanoseconds(300);
        assert!(check_version(1, client, stored).is_ok());
    }

    #[test]
    fn stale_version_conflicts() {
        let current = Utc::now();
        let stale = current - Duration::seconds(3);
        assert_matches!(check_version(1, stale, current), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn future_version_also_conflicts() {
        let current = Utc::now();
        let bogus = current + Duration::seconds(3);
        assert_matches!(check_version(1, bogus, current), Err(CoreError::Conflict(_)));
    }
}
