//! Admission control for new jobs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::AdmissionPolicy;
use crate::error::{WorkerError, WorkerResult};

/// Gates job creation. Admission never waits: a full controller rejects.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    semaphore: Option<Arc<Semaphore>>,
    capacity: Option<usize>,
    in_flight: Arc<AtomicUsize>,
}

/// Held for the processing lifetime of one job; releases its slot on drop.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: Option<OwnedSemaphorePermit>,
    in_flight: Arc<AtomicUsize>,
}

impl AdmissionController {
    pub fn new(policy: AdmissionPolicy) -> Self {
        let (semaphore, capacity) = match policy {
            AdmissionPolicy::Unbounded => (None, None),
            AdmissionPolicy::Bounded(n) => (Some(Arc::new(Semaphore::new(n.get()))), Some(n.get())),
        };

        Self {
            semaphore,
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Claim a slot, or fail with `ServerBusy` when every slot is taken.
    pub fn try_admit(&self) -> WorkerResult<AdmissionPermit> {
        let permit = match &self.semaphore {
            Some(semaphore) => Some(
                Arc::clone(semaphore)
                    .try_acquire_owned()
                    .map_err(|_| WorkerError::ServerBusy(self.in_flight()))?,
            ),
            None => None,
        };

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(AdmissionPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Jobs currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn bounded(n: usize) -> AdmissionController {
        AdmissionController::new(AdmissionPolicy::Bounded(NonZeroUsize::new(n).unwrap()))
    }

    #[test]
    fn test_bounded_rejects_when_full() {
        let admission = bounded(2);
        let a = admission.try_admit().unwrap();
        let _b = admission.try_admit().unwrap();
        assert!(matches!(admission.try_admit(), Err(WorkerError::ServerBusy(2))));

        drop(a);
        assert_eq!(admission.in_flight(), 1);
        assert!(admission.try_admit().is_ok());
    }

    #[test]
    fn test_unbounded_counts_in_flight() {
        let admission = AdmissionController::new(AdmissionPolicy::Unbounded);
        let permits: Vec<_> = (0..16).map(|_| admission.try_admit().unwrap()).collect();
        assert_eq!(admission.in_flight(), 16);
        assert_eq!(admission.capacity(), None);
        drop(permits);
        assert_eq!(admission.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_admission_at_capacity_one() {
        let admission = bounded(1);

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let admission = admission.clone();
                tokio::spawn(async move { admission.try_admit().ok() })
            })
            .collect();

        let mut granted = Vec::new();
        for handle in handles {
            if let Some(permit) = handle.await.unwrap() {
                granted.push(permit);
            }
        }

        assert_eq!(granted.len(), 1);
        assert!(admission.try_admit().is_err());

        drop(granted);
        assert!(admission.try_admit().is_ok());
    }
}
