use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::schemas::{ExpenseId, GroupId};

const GROUP_ID_PREFIX: &str = "group_";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hands out millisecond-timestamp ids.
///
/// Ids issued by one `IdSource` never repeat: when the clock has not moved past
/// the last issued millisecond, the next id is bumped by one. Separate
/// processes sharing a store can still collide within the same millisecond.
pub struct IdSource {
    clock: Arc<dyn Clock>,
    last: AtomicI64,
}

impl IdSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        IdSource {
            clock,
            last: AtomicI64::new(0),
        }
    }

    pub fn group_id(&self) -> GroupId {
        format!("{}{}", GROUP_ID_PREFIX, self.next_millis())
    }

    pub fn expense_id(&self) -> ExpenseId {
        self.next_millis()
    }

    /// ISO-8601 UTC timestamp with millisecond precision, e.g. `2024-05-01T09:30:00.000Z`.
    pub fn created_at(&self) -> String {
        self.clock
            .now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn next_millis(&self) -> i64 {
        let now = self.clock.now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = if now > last { now } else { last + 1 };
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }
}

impl Default for IdSource {
    fn default() -> Self {
        IdSource::new(Arc::new(SystemClock))
    }
}
