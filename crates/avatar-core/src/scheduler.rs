//! Cooperative driver scheduler on a virtual millisecond clock.
//!
//! Two driver variants share one cancellable handle type: a one-shot delayed
//! callback and a repeating per-frame callback. The scheduler never runs
//! callbacks itself; it reports which drivers are due and the coordinator
//! dispatches them to their owning loop, one at a time.

use fnv::FnvHashMap;
use smallvec::SmallVec;

/// Identifies which loop owns a driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoopKind {
    Blink,
    Breath,
    Lights,
    Equalizer,
    MouthSignal,
}

impl LoopKind {
    pub const ALL: [LoopKind; 5] = [
        LoopKind::Blink,
        LoopKind::Breath,
        LoopKind::Lights,
        LoopKind::Equalizer,
        LoopKind::MouthSignal,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            LoopKind::Blink => 0,
            LoopKind::Breath => 1,
            LoopKind::Lights => 2,
            LoopKind::Equalizer => 3,
            LoopKind::MouthSignal => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverId(u64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DriverKind {
    OneShot { due_ms: f64 },
    Frame,
}

/// Cancellable handle to a scheduled driver. Deliberately not `Clone`: the
/// loop holding it is the only party able to cancel it.
#[derive(Debug, PartialEq, Eq)]
pub struct DriverHandle {
    id: DriverId,
    owner: LoopKind,
}

impl DriverHandle {
    #[inline]
    pub fn id(&self) -> DriverId {
        self.id
    }

    #[inline]
    pub fn owner(&self) -> LoopKind {
        self.owner
    }
}

/// A one-shot driver that came due.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Firing {
    pub id: DriverId,
    pub owner: LoopKind,
    pub at_ms: f64,
}

#[derive(Clone, Copy, Debug)]
struct DriverEntry {
    owner: LoopKind,
    kind: DriverKind,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: f64,
    next_id: u64,
    drivers: FnvHashMap<DriverId, DriverEntry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.now_ms
    }

    /// Arm a one-shot driver firing `delay_ms` after the current time.
    pub fn after(&mut self, owner: LoopKind, delay_ms: f64) -> DriverHandle {
        let due_ms = self.now_ms + delay_ms.max(0.0);
        self.insert(owner, DriverKind::OneShot { due_ms })
    }

    /// Arm a driver that runs once per host frame until cancelled.
    pub fn every_frame(&mut self, owner: LoopKind) -> DriverHandle {
        self.insert(owner, DriverKind::Frame)
    }

    fn insert(&mut self, owner: LoopKind, kind: DriverKind) -> DriverHandle {
        let id = DriverId(self.next_id);
        self.next_id += 1;
        self.drivers.insert(id, DriverEntry { owner, kind });
        DriverHandle { id, owner }
    }

    /// Cancel a driver. Returns false if it had already fired or been cancelled.
    pub fn cancel(&mut self, handle: DriverHandle) -> bool {
        self.drivers.remove(&handle.id).is_some()
    }

    pub fn is_pending(&self, handle: &DriverHandle) -> bool {
        self.drivers.contains_key(&handle.id)
    }

    #[inline]
    pub fn is_live(&self, id: DriverId) -> bool {
        self.drivers.contains_key(&id)
    }

    pub fn kind_of(&self, handle: &DriverHandle) -> Option<DriverKind> {
        self.drivers.get(&handle.id).map(|e| e.kind)
    }

    pub fn due_at(&self, handle: &DriverHandle) -> Option<f64> {
        match self.kind_of(handle)? {
            DriverKind::OneShot { due_ms } => Some(due_ms),
            DriverKind::Frame => None,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.drivers.len()
    }

    pub fn pending_for(&self, owner: LoopKind) -> usize {
        self.drivers.values().filter(|e| e.owner == owner).count()
    }

    /// Remove and return the earliest one-shot due at or before `until_ms`.
    /// The clock moves to the firing's due time so the callback observes it
    /// as "now". Ties fire in arming order.
    pub fn pop_due(&mut self, until_ms: f64) -> Option<Firing> {
        let (id, owner, due_ms) = self
            .drivers
            .iter()
            .filter_map(|(id, e)| match e.kind {
                DriverKind::OneShot { due_ms } if due_ms <= until_ms => {
                    Some((*id, e.owner, due_ms))
                }
                _ => None,
            })
            .min_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)))?;
        self.drivers.remove(&id);
        self.now_ms = self.now_ms.max(due_ms);
        Some(Firing {
            id,
            owner,
            at_ms: due_ms,
        })
    }

    /// Move the clock forward. The clock never runs backwards.
    pub fn advance_to(&mut self, now_ms: f64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Live frame drivers in arming order.
    pub fn frame_drivers(&self) -> SmallVec<[(DriverId, LoopKind); 8]> {
        let mut out: SmallVec<[(DriverId, LoopKind); 8]> = self
            .drivers
            .iter()
            .filter(|(_, e)| e.kind == DriverKind::Frame)
            .map(|(id, e)| (*id, e.owner))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    pub fn clear(&mut self) {
        self.drivers.clear();
    }
}

/// Cancel whatever driver `slot` holds. Safe to call on an empty slot.
pub fn cancel_slot(slot: &mut Option<DriverHandle>, scheduler: &mut Scheduler) {
    if let Some(handle) = slot.take() {
        scheduler.cancel(handle);
    }
}
