use std::sync::{atomic::{AtomicBool, AtomicU64, Ordering}, Arc, Mutex, PoisonError};

use cardio_tracker_lib::RawFix;
use tokio::sync::mpsc;

use crate::{ManualClock, TrackerError};

const FIX_QUEUE_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// A live feed of fixes from a location source. Fixes stop arriving once it
/// is handed back through [`LocationSource::unsubscribe`] or dropped.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    fixes: mpsc::Receiver<RawFix>,
    clock: Option<ManualClock>,
}

impl Subscription {
    pub fn new(id: u64, fixes: mpsc::Receiver<RawFix>) -> Self {
        Self { id, fixes, clock: None }
    }

    /// Moves `clock` to each fix's timestamp at the moment the fix is handed out.
    pub fn following_clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancel safe, a fix is never lost when the returned future is dropped.
    pub async fn next(&mut self) -> Option<RawFix> {
        let fix = self.fixes.recv().await?;
        if let Some(clock) = &self.clock {
            clock.set(fix.timestamp);
        }
        Some(fix)
    }

    pub fn close(&mut self) {
        self.fixes.close();
    }
}

/// The device GPS, or anything that can stand in for it.
#[async_trait::async_trait]
pub trait LocationSource: Send + Sync {
    async fn request_permission(&self) -> Permission;

    async fn subscribe(&self) -> Result<Subscription, TrackerError>;

    /// Must not return before the source has stopped delivering to `subscription`.
    fn unsubscribe(&self, mut subscription: Subscription) {
        subscription.close();
    }
}

#[derive(Debug)]
struct ChannelShared {
    granted: AtomicBool,
    next_id: AtomicU64,
    subscriber: Mutex<Option<(u64, mpsc::Sender<RawFix>)>>,
}

/// A location source fed by hand through its [`FixFeed`].
/// Platform glue pushes fixes from the OS callback into the feed.
#[derive(Debug, Clone)]
pub struct ChannelLocationSource {
    shared: Arc<ChannelShared>,
}

#[derive(Debug, Clone)]
pub struct FixFeed {
    shared: Arc<ChannelShared>,
}

impl ChannelLocationSource {
    pub fn new(permission: Permission) -> (Self, FixFeed) {
        let shared = Arc::new(ChannelShared {
            granted: AtomicBool::new(permission == Permission::Granted),
            next_id: AtomicU64::new(0),
            subscriber: Mutex::new(None),
        });

        (Self { shared: shared.clone() }, FixFeed { shared })
    }
}

#[async_trait::async_trait]
impl LocationSource for ChannelLocationSource {
    async fn request_permission(&self) -> Permission {
        if self.shared.granted.load(Ordering::Relaxed) {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn subscribe(&self) -> Result<Subscription, TrackerError> {
        let (tx, rx) = mpsc::channel(FIX_QUEUE_SIZE);
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subscriber = self.shared.subscriber.lock().unwrap_or_else(PoisonError::into_inner);
        if subscriber.is_some() {
            return Err(TrackerError::Subscription("location feed already has a subscriber".into()));
        }
        *subscriber = Some((id, tx));

        Ok(Subscription::new(id, rx))
    }

    fn unsubscribe(&self, mut subscription: Subscription) {
        let mut subscriber = self.shared.subscriber.lock().unwrap_or_else(PoisonError::into_inner);
        if subscriber.as_ref().is_some_and(|(id, _)| *id == subscription.id()) {
            subscriber.take();
        }
        subscription.close();
    }
}

impl FixFeed {
    pub fn set_permission(&self, permission: Permission) {
        self.shared.granted.store(permission == Permission::Granted, Ordering::Relaxed);
    }

    pub fn is_subscribed(&self) -> bool {
        self.shared.subscriber.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Delivers a fix to the current subscriber. Returns false when nobody is listening.
    pub async fn push(&self, fix: RawFix) -> bool {
        let sender = self.shared.subscriber.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, tx)| tx.clone());

        match sender {
            Some(tx) => tx.send(fix).await.is_ok(),
            None => false,
        }
    }
}
