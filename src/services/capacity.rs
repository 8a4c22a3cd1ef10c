//! Location-level volume accounting.
//!
//! Owns the invariant `0 <= used_volume <= capacity_volume` for every
//! warehouse location. Mutations are serialized per location id through a
//! lock registry, independent of which order is asking, since multiple
//! orders can target the same location.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, EntityTrait, TransactionTrait};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::warehouse_locations::{self, Entity as LocationEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Computes the new used volume after an allocation, rejecting
/// over-allocation. Errors leave no mutation behind.
pub fn allocate_volume(
    capacity: Decimal,
    used: Decimal,
    volume: Decimal,
) -> Result<Decimal, ServiceError> {
    let new_used = used + volume;
    if new_used > capacity {
        return Err(ServiceError::InsufficientCapacity(format!(
            "allocation of {} exceeds capacity. Capacity: {}, used: {}",
            volume, capacity, used
        )));
    }
    Ok(new_used)
}

/// Computes the new used volume after a release, rejecting releases larger
/// than what is currently allocated.
pub fn release_volume(used: Decimal, volume: Decimal) -> Result<Decimal, ServiceError> {
    if volume > used {
        return Err(ServiceError::OverRelease(format!(
            "cannot release {} from a location with only {} in use",
            volume, used
        )));
    }
    Ok(used - volume)
}

/// Serializes and persists capacity changes per warehouse location.
#[derive(Clone)]
pub struct CapacityLedger {
    db: Arc<DbPool>,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    event_sender: Option<EventSender>,
}

impl CapacityLedger {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self {
            db,
            locks: Arc::new(DashMap::new()),
            event_sender,
        }
    }

    fn lock_handle(&self, location_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(location_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquires the per-location mutex. Hold the guard across the
    /// transaction commit that touches the location.
    pub async fn lock(&self, location_id: Uuid) -> OwnedMutexGuard<()> {
        self.lock_handle(location_id).lock_owned().await
    }

    /// Allocates volume inside the caller's transaction. The caller must
    /// hold the location lock until that transaction commits.
    pub async fn allocate_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        location_id: Uuid,
        volume: Decimal,
    ) -> Result<warehouse_locations::Model, ServiceError> {
        let location = LocationEntity::find_by_id(location_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse location {} not found", location_id))
            })?;

        if volume.is_zero() {
            return Ok(location);
        }

        let new_used = allocate_volume(location.capacity_volume, location.used_volume, volume)?;

        let mut active: warehouse_locations::ActiveModel = location.into();
        active.used_volume = Set(new_used);
        let updated = active.update(conn).await?;

        Ok(updated)
    }

    /// Releases volume inside the caller's transaction; same locking
    /// contract as [`CapacityLedger::allocate_in`].
    pub async fn release_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        location_id: Uuid,
        volume: Decimal,
    ) -> Result<warehouse_locations::Model, ServiceError> {
        let location = LocationEntity::find_by_id(location_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse location {} not found", location_id))
            })?;

        if volume.is_zero() {
            return Ok(location);
        }

        let new_used = release_volume(location.used_volume, volume)?;

        let mut active: warehouse_locations::ActiveModel = location.into();
        active.used_volume = Set(new_used);
        let updated = active.update(conn).await?;

        Ok(updated)
    }

    /// Standalone allocation: lock, transact, commit, emit.
    #[instrument(skip(self))]
    pub async fn allocate(
        &self,
        location_id: Uuid,
        volume: Decimal,
    ) -> Result<warehouse_locations::Model, ServiceError> {
        let _guard = self.lock(location_id).await;

        let txn = self.db.begin().await?;
        let updated = self.allocate_in(&txn, location_id, volume).await?;
        txn.commit().await?;

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::CapacityAllocated {
                    location_id,
                    volume,
                })
                .await;
        }

        info!(
            "Allocated {} at location {}: {}/{} in use",
            volume, updated.code, updated.used_volume, updated.capacity_volume
        );

        Ok(updated)
    }

    /// Standalone release: lock, transact, commit, emit.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        location_id: Uuid,
        volume: Decimal,
    ) -> Result<warehouse_locations::Model, ServiceError> {
        let _guard = self.lock(location_id).await;

        let txn = self.db.begin().await?;
        let updated = self.release_in(&txn, location_id, volume).await?;
        txn.commit().await?;

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::CapacityReleased {
                    location_id,
                    volume,
                })
                .await;
        }

        info!(
            "Released {} at location {}: {}/{} in use",
            volume, updated.code, updated.used_volume, updated.capacity_volume
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn allocation_within_capacity_succeeds() {
        assert_eq!(allocate_volume(dec!(5), dec!(0), dec!(4)).unwrap(), dec!(4));
        // Filling a location to the brim is allowed.
        assert_eq!(allocate_volume(dec!(5), dec!(4), dec!(1)).unwrap(), dec!(5));
    }

    #[test]
    fn over_allocation_is_rejected_without_mutation() {
        let used = dec!(4);
        let err = allocate_volume(dec!(5), used, dec!(2)).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientCapacity(_)));
        // The caller's view of used volume is untouched by a failed attempt.
        assert_eq!(used, dec!(4));
    }

    #[test]
    fn release_within_used_succeeds() {
        assert_eq!(release_volume(dec!(4), dec!(4)).unwrap(), dec!(0));
        assert_eq!(release_volume(dec!(4), dec!(1)).unwrap(), dec!(3));
    }

    #[test]
    fn over_release_is_rejected() {
        assert!(matches!(
            release_volume(dec!(2), dec!(3)),
            Err(ServiceError::OverRelease(_))
        ));
    }
}
