use std::time::Duration;

use iced::advanced::subscription::{Hasher, Recipe};
use iced::futures::stream::{self, BoxStream};
use iced_futures::subscription::Event;

use crate::state::Message;

/// Which cycle a timer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickKind {
    /// Full telemetry refresh
    Stats,
    /// Audio bars only
    Audio,
}

impl TickKind {
    fn message(self) -> Message {
        match self {
            TickKind::Stats => Message::Tick,
            TickKind::Audio => Message::AudioTick,
        }
    }
}

/// Periodic timer for one render cycle.
///
/// The interval is part of the hash, so changing it in the settings restarts
/// the timer with the new period instead of keeping the old stream alive.
pub struct TickTimer {
    kind: TickKind,
    interval: Duration,
}

impl TickTimer {
    pub fn new(kind: TickKind, interval_ms: u64) -> Self {
        Self {
            kind,
            interval: Duration::from_millis(interval_ms.max(1)),
        }
    }
}

impl Recipe for TickTimer {
    type Output = Message;

    fn hash(&self, state: &mut Hasher) {
        use std::hash::Hash;
        std::any::TypeId::of::<Self>().hash(state);
        self.kind.hash(state);
        self.interval.hash(state);
    }

    fn stream(self: Box<Self>, _input: BoxStream<'static, Event>) -> BoxStream<'static, Self::Output> {
        let TickTimer { kind, interval } = *self;
        let stream = stream::unfold((), move |()| async move {
            tokio::time::sleep(interval).await;
            Some((kind.message(), ()))
        });
        Box::pin(stream)
    }
}

pub fn ticks(kind: TickKind, interval_ms: u64) -> iced::Subscription<Message> {
    iced_futures::subscription::from_recipe(TickTimer::new(kind, interval_ms))
}
