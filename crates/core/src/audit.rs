//! Audit bookkeeping as a composed value object.
//!
//! Every aggregate embeds an `AuditInfo` instead of inheriting timestamp/UUID
//! fields from a base entity type. Assigned at construction, touched on every
//! mutation, no virtual dispatch involved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Creation/modification bookkeeping embedded in each aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Actor identity, when the calling layer provides one.
    pub created_by: Option<String>,
}

impl AuditInfo {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    pub fn created_by(now: DateTime<Utc>, actor: impl Into<String>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            created_by: Some(actor.into()),
        }
    }

    /// Record a mutation at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl ValueObject for AuditInfo {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_moves_updated_at_only() {
        let t0 = Utc::now();
        let mut audit = AuditInfo::new(t0);
        let t1 = t0 + chrono::Duration::seconds(5);

        audit.touch(t1);

        assert_eq!(audit.created_at, t0);
        assert_eq!(audit.updated_at, t1);
    }
}
