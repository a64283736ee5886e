//! OrderPipeline: the broker-facing side of the engine.
//!
//! Turns strategy signals into order intents, places the intents that clear
//! the risk gate, and translates broker callbacks back into bus events.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};

use chrono::Duration;
use log::{debug, error, info, warn};
use meridian_core::{
    AccountData, Event, EventPayload, EventRef, OrderData, OrderId, OrderStatus, PositionData,
    PositionDirection, StrategySignalData, SystemEventType, Timestamp, TradeData,
};
use meridian_ports::{
    Clock, EventHandler, EventSink, HandlerError, OrderRouter, TradeConnector,
};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::position::PositionBook;
use crate::signal::order_from_signal;

/// Finished orders kept for lookups after they leave the live table
pub const ARCHIVE_CAPACITY: usize = 1024;
/// Broker ids with parked updates; the oldest is dropped past this
pub const MAX_PARKED: usize = 256;
/// Parked updates older than this are dropped
pub const PARKED_TTL_SECS: i64 = 30;

/// Broker callback that arrived before its order's placement returned
enum EarlyUpdate {
    Order(OrderData),
    Trade(TradeData),
}

struct Parked {
    since: Timestamp,
    updates: Vec<EarlyUpdate>,
}

struct Retired {
    order: OrderData,
    broker_id: Option<OrderId>,
}

/// Live orders, broker id mappings, parked callbacks and a bounded archive
/// of finished orders.
#[derive(Default)]
struct OrderTable {
    orders: HashMap<OrderId, OrderData>,
    broker_to_local: HashMap<OrderId, OrderId>,
    local_to_broker: HashMap<OrderId, OrderId>,
    early: HashMap<OrderId, Parked>,
    /// Parked broker ids, oldest first
    parked_ids: VecDeque<OrderId>,
    archive: HashMap<OrderId, Retired>,
    /// Archived local ids, oldest first
    archive_ids: VecDeque<OrderId>,
    retired_brokers: HashMap<OrderId, OrderId>,
}

impl OrderTable {
    /// Local id for a broker id, or park the update until the id is known.
    /// Updates for orders that already finished are dropped.
    fn resolve_or_park(
        &mut self,
        broker_id: &str,
        update: EarlyUpdate,
        now: Timestamp,
    ) -> Option<(OrderId, EarlyUpdate)> {
        if let Some(local) = self.broker_to_local.get(broker_id) {
            return Some((local.clone(), update));
        }
        if let Some(local) = self.retired_brokers.get(broker_id) {
            debug!("[ORDER] late update for finished order {} ({})", local, broker_id);
            return None;
        }
        debug!("[ORDER] parking early update for broker order {}", broker_id);
        self.park(broker_id, update, now);
        None
    }

    fn park(&mut self, broker_id: &str, update: EarlyUpdate, now: Timestamp) {
        self.expire_parked(now);
        if let Some(parked) = self.early.get_mut(broker_id) {
            parked.updates.push(update);
            return;
        }
        while self.early.len() >= MAX_PARKED {
            let Some(oldest) = self.parked_ids.pop_front() else {
                break;
            };
            if self.early.remove(&oldest).is_some() {
                warn!("[ORDER] dropped parked updates for unknown broker order {}", oldest);
            }
        }
        self.parked_ids.push_back(broker_id.to_string());
        self.early.insert(
            broker_id.to_string(),
            Parked {
                since: now,
                updates: vec![update],
            },
        );
    }

    fn expire_parked(&mut self, now: Timestamp) {
        let ttl = Duration::seconds(PARKED_TTL_SECS);
        while let Some(oldest) = self.parked_ids.front() {
            if self.early.get(oldest).is_some_and(|p| now - p.since <= ttl) {
                break;
            }
            if let Some(expired) = self.parked_ids.pop_front() {
                if self.early.remove(&expired).is_some() {
                    warn!("[ORDER] parked updates for broker order {} expired", expired);
                }
            }
        }
    }

    fn take_parked(&mut self, broker_id: &str) -> Vec<EarlyUpdate> {
        match self.early.remove(broker_id) {
            Some(parked) => {
                self.parked_ids.retain(|id| id != broker_id);
                parked.updates
            }
            None => Vec::new(),
        }
    }

    /// Live or recently finished order
    fn lookup(&self, local_id: &str) -> Option<&OrderData> {
        self.orders
            .get(local_id)
            .or_else(|| self.archive.get(local_id).map(|r| &r.order))
    }

    /// Move a finished order out of the live table and its id maps.
    fn retire_if_terminal(&mut self, local_id: &str) {
        if !self.orders.get(local_id).is_some_and(|o| o.status.is_terminal()) {
            return;
        }
        let Some(order) = self.orders.remove(local_id) else {
            return;
        };
        let broker_id = self.local_to_broker.remove(local_id);
        if let Some(broker_id) = &broker_id {
            self.broker_to_local.remove(broker_id);
            self.retired_brokers.insert(broker_id.clone(), local_id.to_string());
        }
        self.archive_ids.push_back(local_id.to_string());
        self.archive.insert(local_id.to_string(), Retired { order, broker_id });

        while self.archive_ids.len() > ARCHIVE_CAPACITY {
            let Some(oldest) = self.archive_ids.pop_front() else {
                break;
            };
            if let Some(Retired { broker_id: Some(broker_id), .. }) = self.archive.remove(&oldest) {
                self.retired_brokers.remove(&broker_id);
            }
        }
    }
}

/// Order lifecycle owner
///
/// Registered on the bus for StrategySignal, MarketData and Order events,
/// and installed as the risk gate's router. All mutable state sits behind
/// short-lived locks; no lock is held while publishing or calling the
/// connector.
pub struct OrderPipeline {
    connector: Arc<dyn TradeConnector>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    table: Mutex<OrderTable>,
    book: Mutex<PositionBook>,
    position_cache: Mutex<HashMap<(String, PositionDirection), PositionData>>,
    account_cache: Mutex<AccountData>,
}

impl OrderPipeline {
    /// Build the pipeline and install its callbacks on `connector`.
    pub fn new(
        connector: Arc<dyn TradeConnector>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            Self::install_callbacks(connector.as_ref(), weak);
            Self {
                connector,
                sink,
                clock,
                table: Mutex::new(OrderTable::default()),
                book: Mutex::new(PositionBook::new()),
                position_cache: Mutex::new(HashMap::new()),
                account_cache: Mutex::new(AccountData::default()),
            }
        })
    }

    fn install_callbacks(connector: &dyn TradeConnector, weak: &Weak<Self>) {
        let w = weak.clone();
        connector.set_order_callback(Arc::new(move |order| {
            if let Some(pipeline) = w.upgrade() {
                pipeline.on_broker_order(order);
            }
        }));
        let w = weak.clone();
        connector.set_trade_callback(Arc::new(move |trade| {
            if let Some(pipeline) = w.upgrade() {
                pipeline.on_broker_trade(trade);
            }
        }));
        let w = weak.clone();
        connector.set_position_callback(Arc::new(move |position| {
            if let Some(pipeline) = w.upgrade() {
                pipeline.on_broker_position(position);
            }
        }));
        let w = weak.clone();
        connector.set_account_callback(Arc::new(move |account| {
            if let Some(pipeline) = w.upgrade() {
                pipeline.on_broker_account(account);
            }
        }));
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Connect the trade connector
    pub fn start(&self) -> Result<()> {
        if let Err(e) = self.connector.connect() {
            self.report_error(format!("trade connect failed: {e}"));
            return Err(e.into());
        }
        info!("[ORDER] trade connector connected");
        self.publish(Event::system(SystemEventType::Connect, "trade connector connected"));
        Ok(())
    }

    pub fn stop(&self) {
        if self.connector.is_connected() {
            self.connector.disconnect();
            info!("[ORDER] trade connector disconnected");
            self.publish(Event::system(
                SystemEventType::Disconnect,
                "trade connector disconnected",
            ));
        }
    }

    pub fn login(&self, user_id: &str, password: &str) -> Result<()> {
        if !self.connector.is_connected() {
            self.report_error(format!("login as {user_id} without connection"));
            return Err(Error::NotConnected);
        }
        if let Err(e) = self.connector.login(user_id, password) {
            self.report_error(format!("login as {user_id} failed: {e}"));
            return Err(e.into());
        }
        info!("[ORDER] logged in as {}", user_id);
        self.publish(Event::system(SystemEventType::Login, format!("logged in as {user_id}")));
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        if !self.connector.is_connected() {
            return Err(Error::NotConnected);
        }
        self.connector.logout()?;
        self.publish(Event::system(SystemEventType::Logout, "logged out"));
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connector.is_connected()
    }

    pub fn is_logged_in(&self) -> bool {
        self.connector.is_logged_in()
    }

    fn ensure_online(&self) -> Result<()> {
        if !self.connector.is_connected() {
            return Err(Error::NotConnected);
        }
        if !self.connector.is_logged_in() {
            return Err(Error::NotLoggedIn);
        }
        Ok(())
    }

    // ========================================================================
    // Order entry
    // ========================================================================

    /// Translate a strategy signal into an order intent.
    ///
    /// Fails fast (System/Error event, `false`) when the broker session is
    /// not up. Otherwise the intent is recorded and published for the risk
    /// gate; placement happens when the gate routes it back.
    pub fn process_signal(&self, signal: &StrategySignalData) -> bool {
        if let Err(e) = self.ensure_online() {
            self.report_error(format!(
                "signal {:?} {} from {} dropped: {e}",
                signal.signal_type, signal.symbol, signal.strategy_id
            ));
            return false;
        }
        self.submit_order(order_from_signal(signal, self.clock.now()))
    }

    /// Record an order intent and publish it for admission.
    pub fn submit_order(&self, order: OrderData) -> bool {
        if order.status != OrderStatus::Submitting {
            warn!("[ORDER] {} is not an intent ({:?})", order.order_id, order.status);
            return false;
        }
        info!(
            "[ORDER] intent {} {:?} {:?} {} x{} @ {} for {}",
            order.order_id,
            order.direction,
            order.offset,
            order.symbol,
            order.volume,
            order.price,
            order.strategy_id
        );
        let order_id = order.order_id.clone();
        self.table.lock().orders.insert(order_id.clone(), order.clone());

        if let Err(e) = self.sink.publish(Event::order(order)) {
            warn!("[ORDER] intent {} not published: {}", order_id, e);
            self.force_reject(&order_id, &format!("intent not published: {e}"));
            return false;
        }
        true
    }

    /// Place an admitted order with the broker.
    pub fn place_order(&self, order: &OrderData) -> Result<OrderId> {
        self.ensure_online()?;
        self.table
            .lock()
            .orders
            .entry(order.order_id.clone())
            .or_insert_with(|| order.clone());

        let broker_id = self.connector.place_order(order)?;
        if broker_id.is_empty() {
            return Err(Error::PlacementFailed(order.order_id.clone()));
        }

        let early = {
            let mut table = self.table.lock();
            table
                .broker_to_local
                .insert(broker_id.clone(), order.order_id.clone());
            table
                .local_to_broker
                .insert(order.order_id.clone(), broker_id.clone());
            table.take_parked(&broker_id)
        };
        info!("[ORDER] placed {} as broker order {}", order.order_id, broker_id);

        for update in early {
            match update {
                EarlyUpdate::Order(update) => self.apply_order_update(&order.order_id, update),
                EarlyUpdate::Trade(trade) => self.apply_trade(&order.order_id, trade),
            }
        }
        Ok(broker_id)
    }

    /// Ask the broker to cancel a local order. The Canceled status arrives
    /// through the order callback.
    pub fn cancel_order(&self, order_id: &str) -> bool {
        match self.request_cancel(order_id) {
            Ok(()) => {
                info!("[ORDER] cancel requested for {}", order_id);
                true
            }
            Err(e @ (Error::NotConnected | Error::NotLoggedIn)) => {
                self.report_error(format!("cancel {order_id} refused: {e}"));
                false
            }
            Err(e) => {
                warn!("[ORDER] cancel {} failed: {}", order_id, e);
                false
            }
        }
    }

    /// Cancel with the reason for a refusal. Orders that were never placed
    /// or have already finished are `UnknownOrder`.
    pub fn request_cancel(&self, order_id: &str) -> Result<()> {
        self.ensure_online()?;
        let broker_id = self.table.lock().local_to_broker.get(order_id).cloned();
        let broker_id = broker_id.ok_or_else(|| Error::UnknownOrder(order_id.to_string()))?;
        self.connector.cancel_order(&broker_id)?;
        Ok(())
    }

    /// Move a live order to Rejected and tell everyone why.
    fn force_reject(&self, order_id: &str, reason: &str) {
        let now = self.clock.now();
        let rejected = {
            let mut table = self.table.lock();
            let rejected = match table.orders.get_mut(order_id) {
                Some(order) => order.transition(OrderStatus::Rejected, now).is_ok().then(|| {
                    order.status_msg = reason.to_string();
                    order.clone()
                }),
                None => None,
            };
            table.retire_if_terminal(order_id);
            rejected
        };
        self.report_error(format!("order {order_id} rejected: {reason}"));
        if let Some(order) = rejected {
            self.publish(Event::order(order));
        }
    }

    // ========================================================================
    // Broker callbacks
    // ========================================================================

    fn on_broker_order(&self, update: OrderData) {
        let broker_id = update.order_id.clone();
        let now = self.clock.now();
        let resolved = self
            .table
            .lock()
            .resolve_or_park(&broker_id, EarlyUpdate::Order(update), now);
        if let Some((local, EarlyUpdate::Order(update))) = resolved {
            self.apply_order_update(&local, update);
        }
    }

    fn on_broker_trade(&self, trade: TradeData) {
        let broker_id = trade.order_id.clone();
        let now = self.clock.now();
        let resolved = self
            .table
            .lock()
            .resolve_or_park(&broker_id, EarlyUpdate::Trade(trade), now);
        if let Some((local, EarlyUpdate::Trade(trade))) = resolved {
            self.apply_trade(&local, trade);
        }
    }

    fn on_broker_position(&self, position: PositionData) {
        self.position_cache
            .lock()
            .insert((position.symbol.clone(), position.direction), position.clone());
        self.publish(Event::position(position));
    }

    fn on_broker_account(&self, account: AccountData) {
        *self.account_cache.lock() = account.clone();
        self.publish(Event::account(account));
    }

    /// Status change reported by the broker. Fill statuses are driven by
    /// trade callbacks, so only acknowledgement and terminal updates apply.
    fn apply_order_update(&self, local_id: &str, update: OrderData) {
        if matches!(update.status, OrderStatus::PartialFilled | OrderStatus::Filled) {
            debug!("[ORDER] {} fill status left to trade callbacks", local_id);
            return;
        }

        let now = self.clock.now();
        let changed = {
            let mut table = self.table.lock();
            if table.archive.contains_key(local_id) {
                debug!("[ORDER] {} already finished, update ignored", local_id);
                return;
            }
            let Some(order) = table.orders.get_mut(local_id) else {
                warn!("[ORDER] update for unknown order {}", local_id);
                return;
            };
            let changed = if order.status == update.status {
                None
            } else {
                match order.transition(update.status, now) {
                    Ok(()) => {
                        if !update.status_msg.is_empty() {
                            order.status_msg = update.status_msg;
                        }
                        Some(order.clone())
                    }
                    Err(e) => {
                        warn!("[ORDER] ignoring broker update: {}", e);
                        None
                    }
                }
            };
            table.retire_if_terminal(local_id);
            changed
        };

        if let Some(order) = changed {
            info!("[ORDER] {} -> {:?}", order.order_id, order.status);
            self.publish(Event::order(order));
        }
    }

    fn apply_trade(&self, local_id: &str, mut trade: TradeData) {
        let now = self.clock.now();
        let order = {
            let mut table = self.table.lock();
            let Some(order) = table.orders.get_mut(local_id) else {
                warn!("[ORDER] trade {} for unknown order {}", trade.trade_id, local_id);
                return;
            };
            if let Err(e) = order.apply_fill(trade.volume, now) {
                error!("[ORDER] trade {} not applied: {}", trade.trade_id, e);
                return;
            }
            let order = order.clone();
            table.retire_if_terminal(local_id);
            order
        };

        trade.order_id = order.order_id.clone();
        if trade.strategy_id.is_empty() {
            trade.strategy_id = order.strategy_id.clone();
        }
        let outcome = self.book.lock().apply_trade(&trade);
        trade.realized_pnl = outcome.realized_pnl;

        info!(
            "[ORDER] fill {} x{} @ {} on {} ({:?}, pnl {})",
            trade.symbol, trade.volume, trade.price, order.order_id, order.status, outcome.realized_pnl
        );
        self.publish(Event::trade(trade));
        self.publish(Event::order(order));
        self.publish(Event::position(outcome.position));
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Re-query positions and account into the local cache.
    pub fn refresh_data(&self) -> bool {
        if self.ensure_online().is_err() {
            return false;
        }
        let positions = match self.connector.query_positions() {
            Ok(positions) => positions,
            Err(e) => {
                warn!("[ORDER] position query failed: {}", e);
                return false;
            }
        };
        let account = match self.connector.query_account() {
            Ok(account) => account,
            Err(e) => {
                warn!("[ORDER] account query failed: {}", e);
                return false;
            }
        };

        {
            let mut cache = self.position_cache.lock();
            cache.clear();
            for position in positions {
                cache.insert((position.symbol.clone(), position.direction), position);
            }
        }
        *self.account_cache.lock() = account;
        true
    }

    /// Live local orders (the broker's view when online, mapped to local ids)
    pub fn query_pending_orders(&self) -> Vec<OrderData> {
        if self.ensure_online().is_ok() {
            if let Ok(orders) = self.connector.query_pending_orders() {
                let table = self.table.lock();
                return orders
                    .into_iter()
                    .map(|mut order| {
                        if let Some(local) = table.broker_to_local.get(&order.order_id) {
                            order.order_id = local.clone();
                        }
                        order
                    })
                    .collect();
            }
        }
        self.table
            .lock()
            .orders
            .values()
            .filter(|o| o.status.is_active())
            .cloned()
            .collect()
    }

    /// Local order record by local id. Finished orders stay visible until
    /// they age out of the archive.
    pub fn query_order(&self, order_id: &str) -> Option<OrderData> {
        self.table.lock().lookup(order_id).cloned()
    }

    /// Orders not yet in a terminal status
    pub fn live_order_count(&self) -> usize {
        self.table.lock().orders.len()
    }

    pub fn archived_order_count(&self) -> usize {
        self.table.lock().archive.len()
    }

    /// Broker ids holding callbacks that no placement has claimed yet
    pub fn parked_order_count(&self) -> usize {
        self.table.lock().early.len()
    }

    pub fn query_positions(&self) -> Vec<PositionData> {
        if self.ensure_online().is_ok() {
            match self.connector.query_positions() {
                Ok(positions) => return positions,
                Err(e) => warn!("[ORDER] position query failed, using cache: {}", e),
            }
        }
        self.position_cache.lock().values().cloned().collect()
    }

    pub fn query_account(&self) -> AccountData {
        if self.ensure_online().is_ok() {
            match self.connector.query_account() {
                Ok(account) => return account,
                Err(e) => warn!("[ORDER] account query failed, using cache: {}", e),
            }
        }
        self.account_cache.lock().clone()
    }

    /// Locally tracked position for one book
    pub fn position(&self, symbol: &str, direction: PositionDirection) -> Option<PositionData> {
        self.book.lock().get(symbol, direction).cloned()
    }

    pub fn net_position(&self, symbol: &str) -> i64 {
        self.book.lock().net_position(symbol)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn publish(&self, event: EventRef) {
        if let Err(e) = self.sink.publish(event) {
            warn!("[ORDER] publish failed: {}", e);
        }
    }

    fn report_error(&self, message: String) {
        error!("[ORDER] {}", message);
        self.publish(Event::system(SystemEventType::Error, message));
    }

    /// Keep the table in step with rejections raised elsewhere (risk gate).
    fn observe_order(&self, order: &OrderData) {
        if order.status != OrderStatus::Rejected {
            return;
        }
        let now = self.clock.now();
        let mut table = self.table.lock();
        if let Some(local) = table.orders.get_mut(&order.order_id) {
            if local.status != OrderStatus::Rejected
                && local.transition(OrderStatus::Rejected, now).is_ok()
            {
                local.status_msg = order.status_msg.clone();
                debug!("[ORDER] {} rejected upstream: {}", local.order_id, local.status_msg);
            }
        }
        table.retire_if_terminal(&order.order_id);
    }
}

impl OrderRouter for OrderPipeline {
    fn route(&self, order: &OrderData) -> bool {
        match self.place_order(order) {
            Ok(_) => true,
            Err(e) => {
                self.force_reject(&order.order_id, &e.to_string());
                false
            }
        }
    }
}

impl EventHandler for OrderPipeline {
    fn name(&self) -> &str {
        "OrderPipeline"
    }

    fn handle(&self, event: &EventRef) -> std::result::Result<(), HandlerError> {
        match event.payload() {
            EventPayload::StrategySignal(signal) => {
                self.process_signal(signal);
            }
            EventPayload::MarketData(tick) => {
                self.book.lock().mark(&tick.symbol, tick.last_price);
            }
            EventPayload::Order(order) => self.observe_order(order),
            _ => {}
        }
        Ok(())
    }
}
