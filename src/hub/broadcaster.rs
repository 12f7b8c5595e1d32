use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use log::{info, warn, error, debug};

use crate::error::{DeliveryError, HubError};

pub const PRICE_FLOOR: f64 = 100.0;
pub const PRICE_CEILING: f64 = 200.0;
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum HubState {
    Stopped,
    Running,
}

/// Broadcast payload. `price` carries exactly two decimals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: String,
}

impl PriceUpdate {
    pub fn new(symbol: &str, price: f64) -> Self {
        // Truncate so a draw just under the ceiling never prints as 200.00.
        let cents = (price * 100.0).floor() / 100.0;
        Self {
            symbol: symbol.to_string(),
            price: format!("{:.2}", cents),
        }
    }

    pub fn random(symbol: &str) -> Self {
        let price = rand::thread_rng().gen_range(PRICE_FLOOR..PRICE_CEILING);
        Self::new(symbol, price)
    }
}

struct Subscriber {
    joined_at: DateTime<Utc>,
    sender: mpsc::Sender<PriceUpdate>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub delivered: usize,
    pub dropped: usize,
    pub removed: usize,
}

/// Owns the live subscriber set and the single shared tick timer.
///
/// Connect and disconnect only touch the subscriber set. The timer is started
/// at most once and lives until [`BroadcastHub::stop`].
#[derive(Clone)]
pub struct BroadcastHub {
    subscribers: Arc<Mutex<HashMap<String, Subscriber>>>,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    symbols: Arc<Vec<String>>,
    next_symbol: Arc<AtomicUsize>,
    tick_interval: Duration,
    buffer: usize,
}

impl BroadcastHub {
    pub fn new(symbols: Vec<String>, tick_interval: Duration, buffer: usize) -> Self {
        let symbols = if symbols.is_empty() {
            vec![crate::config::DEFAULT_BROADCAST_SYMBOLS.to_string()]
        } else {
            symbols
        };

        if tick_interval < MIN_TICK_INTERVAL {
            warn!("Tick interval {:?} too short, using {:?}", tick_interval, MIN_TICK_INTERVAL);
        }

        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            timer: Arc::new(Mutex::new(None)),
            symbols: Arc::new(symbols),
            next_symbol: Arc::new(AtomicUsize::new(0)),
            tick_interval: tick_interval.max(MIN_TICK_INTERVAL),
            buffer: buffer.max(1),
        }
    }

    /// Registers a subscriber and returns the receiving end of its update
    /// queue. Starts the timer if it is not running yet.
    pub fn connect(&self, subscriber_id: String) -> Result<mpsc::Receiver<PriceUpdate>, HubError> {
        let (tx, rx) = mpsc::channel(self.buffer);

        {
            let mut subscribers = self.subscribers.lock()
                .map_err(|_| HubError::LockPoisoned)?;

            if subscribers.contains_key(&subscriber_id) {
                return Err(HubError::AlreadyConnected(subscriber_id));
            }

            subscribers.insert(subscriber_id.clone(), Subscriber {
                joined_at: Utc::now(),
                sender: tx,
            });
            info!("Subscriber {} connected ({} live)", subscriber_id, subscribers.len());
        }

        self.start();
        Ok(rx)
    }

    /// Deregisters a subscriber. Returns false if it was already gone.
    pub fn disconnect(&self, subscriber_id: &str) -> bool {
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(_) => {
                error!("Subscriber lock poisoned while disconnecting {}", subscriber_id);
                return false;
            }
        };

        match subscribers.remove(subscriber_id) {
            Some(subscriber) => {
                let connected_for = Utc::now() - subscriber.joined_at;
                info!("Subscriber {} disconnected after {}s ({} live)",
                      subscriber_id, connected_for.num_seconds(), subscribers.len());
                true
            }
            None => false,
        }
    }

    /// Starts the shared timer. Returns false if it was already running.
    pub fn start(&self) -> bool {
        let mut timer = match self.timer.lock() {
            Ok(guard) => guard,
            Err(_) => {
                error!("Timer lock poisoned, broadcast not started");
                return false;
            }
        };

        if timer.as_ref().map(|handle| !handle.is_finished()).unwrap_or(false) {
            return false;
        }

        let hub = self.clone();
        let period = self.tick_interval;
        *timer = Some(tokio::spawn(async move {
            let mut interval_timer = interval_at(Instant::now() + period, period);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval_timer.tick().await;
                hub.broadcast_tick();
            }
        }));

        info!("Broadcast hub started (every {} ms)", period.as_millis());
        true
    }

    /// Stops the timer and drops every subscriber, closing their queues.
    pub fn stop(&self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }

        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.clear();
        }

        info!("Broadcast hub stopped");
    }

    pub fn state(&self) -> HubState {
        if self.timer_count() > 0 {
            HubState::Running
        } else {
            HubState::Stopped
        }
    }

    pub fn timer_count(&self) -> usize {
        self.timer.lock()
            .map(|timer| timer.as_ref().filter(|handle| !handle.is_finished()).map_or(0, |_| 1))
            .unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock()
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    fn next_update(&self) -> PriceUpdate {
        let index = self.next_symbol.fetch_add(1, Ordering::Relaxed) % self.symbols.len();
        PriceUpdate::random(&self.symbols[index])
    }

    /// Generates one update and pushes it to every registered subscriber.
    ///
    /// Sends never wait: a full queue drops this update for that subscriber
    /// only, and a closed queue removes the subscriber.
    pub fn broadcast_tick(&self) -> TickReport {
        let update = self.next_update();
        let mut report = TickReport::default();

        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(_) => {
                error!("Subscriber lock poisoned, skipping tick");
                return report;
            }
        };

        let mut closed = Vec::new();
        for (id, subscriber) in subscribers.iter() {
            let failure = match subscriber.sender.try_send(update.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    continue;
                }
                Err(TrySendError::Full(_)) => DeliveryError::Lagging(id.clone()),
                Err(TrySendError::Closed(_)) => {
                    closed.push(id.clone());
                    DeliveryError::Closed(id.clone())
                }
            };
            warn!("{}", failure);
            report.dropped += 1;
        }

        for id in closed {
            subscribers.remove(&id);
            report.removed += 1;
        }

        if report.delivered > 0 {
            debug!("Broadcasted {} @ {} to {} subscribers", update.symbol, update.price, report.delivered);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> BroadcastHub {
        BroadcastHub::new(vec!["AAPL".to_string()], Duration::from_millis(3000), 16)
    }

    fn assert_valid(update: &PriceUpdate) {
        assert_eq!(update.symbol, "AAPL");
        let price: f64 = update.price.parse().unwrap();
        assert!((PRICE_FLOOR..PRICE_CEILING).contains(&price), "price out of range: {}", price);
        assert_eq!(update.price.split('.').nth(1).map(str::len), Some(2));
    }

    #[test]
    fn test_price_update_formatting() {
        assert_eq!(PriceUpdate::new("AAPL", 123.456).price, "123.45");
        assert_eq!(PriceUpdate::new("AAPL", 150.0).price, "150.00");
        assert_eq!(PriceUpdate::new("AAPL", 199.999).price, "199.99");
    }

    #[tokio::test]
    async fn test_tick_reaches_every_subscriber() {
        let hub = hub();
        let mut a = hub.connect("a".to_string()).unwrap();
        let mut b = hub.connect("b".to_string()).unwrap();
        let mut c = hub.connect("c".to_string()).unwrap();

        let report = hub.broadcast_tick();
        assert_eq!(report.delivered, 3);
        for rx in [&mut a, &mut b, &mut c] {
            assert_valid(&rx.try_recv().unwrap());
            assert!(rx.try_recv().is_err());
        }

        assert!(hub.disconnect("b"));
        let report = hub.broadcast_tick();
        assert_eq!(report.delivered, 2);
        assert!(a.try_recv().is_ok());
        assert!(c.try_recv().is_ok());
        assert_eq!(b.try_recv(), Err(mpsc::error::TryRecvError::Disconnected));

        hub.stop();
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let hub = hub();
        let _rx = hub.connect("a".to_string()).unwrap();
        assert!(hub.disconnect("a"));
        assert!(!hub.disconnect("a"));
        assert!(!hub.disconnect("never-connected"));
        assert_eq!(hub.subscriber_count(), 0);
        hub.stop();
    }

    #[tokio::test]
    async fn test_duplicate_connect_is_rejected() {
        let hub = hub();
        let _rx = hub.connect("a".to_string()).unwrap();
        assert_eq!(
            hub.connect("a".to_string()).err(),
            Some(HubError::AlreadyConnected("a".to_string()))
        );
        hub.stop();
    }

    #[tokio::test]
    async fn test_single_timer_across_connect_cycles() {
        let hub = hub();
        assert_eq!(hub.state(), HubState::Stopped);
        assert_eq!(hub.timer_count(), 0);

        for i in 0..20 {
            let id = format!("sub-{}", i);
            let _rx = hub.connect(id.clone()).unwrap();
            assert_eq!(hub.timer_count(), 1);
            hub.disconnect(&id);
        }

        assert_eq!(hub.timer_count(), 1);
        assert_eq!(hub.state(), HubState::Running);
        assert!(!hub.start());

        hub.stop();
        assert_eq!(hub.timer_count(), 0);
        assert_eq!(hub.state(), HubState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_drives_ticks() {
        let hub = hub();
        let mut receivers: Vec<_> = ["a", "b", "c"].iter()
            .map(|id| hub.connect(id.to_string()).unwrap())
            .collect();

        let started = Instant::now();
        for rx in receivers.iter_mut() {
            assert_valid(&rx.recv().await.unwrap());
        }
        assert!(started.elapsed() >= Duration::from_millis(3000));

        hub.disconnect("c");
        let mut removed = receivers.pop().unwrap();
        for rx in receivers.iter_mut() {
            assert_valid(&rx.recv().await.unwrap());
        }
        assert!(removed.recv().await.is_none());

        hub.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let hub = BroadcastHub::new(vec!["AAPL".to_string()], Duration::ZERO, 4);
        assert_eq!(hub.tick_interval, MIN_TICK_INTERVAL);

        let mut rx = hub.connect("a".to_string()).unwrap();
        assert_valid(&rx.recv().await.unwrap());
        assert_eq!(hub.timer_count(), 1);

        let _other = hub.connect("b".to_string()).unwrap();
        assert_valid(&rx.recv().await.unwrap());
        assert_eq!(hub.timer_count(), 1);

        hub.stop();
    }

    #[tokio::test]
    async fn test_lagging_subscriber_does_not_block_others() {
        let hub = BroadcastHub::new(vec!["AAPL".to_string()], Duration::from_secs(3600), 1);
        let _slow = hub.connect("slow".to_string()).unwrap();
        let mut fast = hub.connect("fast".to_string()).unwrap();

        assert_eq!(hub.broadcast_tick().delivered, 2);
        fast.try_recv().unwrap();

        let report = hub.broadcast_tick();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.removed, 0);
        assert!(fast.try_recv().is_ok());
        assert_eq!(hub.subscriber_count(), 2);

        hub.stop();
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_removed() {
        let hub = hub();
        let rx = hub.connect("gone".to_string()).unwrap();
        let _kept = hub.connect("kept".to_string()).unwrap();
        drop(rx);

        let report = hub.broadcast_tick();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(hub.subscriber_count(), 1);

        hub.stop();
    }

    #[tokio::test]
    async fn test_symbols_rotate() {
        let hub = BroadcastHub::new(
            vec!["AAPL".to_string(), "TSLA".to_string()],
            Duration::from_secs(3600),
            4,
        );
        let mut rx = hub.connect("a".to_string()).unwrap();
        hub.broadcast_tick();
        hub.broadcast_tick();
        hub.broadcast_tick();

        let symbols: Vec<_> = (0..3).map(|_| rx.try_recv().unwrap().symbol).collect();
        assert_eq!(symbols, vec!["AAPL", "TSLA", "AAPL"]);
        hub.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_connects_during_ticks() {
        let hub = BroadcastHub::new(vec!["AAPL".to_string()], Duration::from_secs(3600), 64);

        let ticker = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    hub.broadcast_tick();
                    tokio::task::yield_now().await;
                }
            })
        };

        let joins: Vec<_> = (0..50)
            .map(|i| {
                let hub = hub.clone();
                tokio::spawn(async move { hub.connect(format!("sub-{}", i)).unwrap() })
            })
            .collect();

        let mut receivers = Vec::new();
        for join in joins {
            receivers.push(join.await.unwrap());
        }
        ticker.await.unwrap();

        assert_eq!(hub.subscriber_count(), 50);
        assert_eq!(hub.broadcast_tick().delivered, 50);
        hub.stop();
    }
}
