//! Paper broker: an in-process TradeConnector that never leaves the host.
//!
//! Orders are acknowledged through the order callback from inside
//! `place_order`, the way a low-latency broker API does. Fills are either
//! immediate (`auto_fill`) or driven by the caller through [`PaperTradeConnector::fill`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use log::{debug, info, warn};
use meridian_core::{
    AccountData, Offset, OrderData, OrderId, OrderStatus, PositionData,
    PositionDirection, TradeData, Volume,
};
use meridian_ports::{
    AccountCallback, ConnectorError, ConnectorResult, OrderCallback, PositionCallback,
    TradeCallback, TradeConnector,
};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Paper broker behaviour, parsed from the connector's `init` string (JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperBrokerConfig {
    /// Acknowledge orders as soon as they are placed
    pub auto_accept: bool,
    /// Fill the full volume at the limit price right after the ack
    pub auto_fill: bool,
    pub account_id: String,
    pub initial_balance: Decimal,
}

impl Default for PaperBrokerConfig {
    fn default() -> Self {
        Self {
            auto_accept: true,
            auto_fill: false,
            account_id: "paper".to_string(),
            initial_balance: dec!(1_000_000),
        }
    }
}

impl PaperBrokerConfig {
    pub fn with_auto_fill(mut self, auto_fill: bool) -> Self {
        self.auto_fill = auto_fill;
        self
    }
}

#[derive(Default)]
struct Callbacks {
    order: Option<OrderCallback>,
    trade: Option<TradeCallback>,
    position: Option<PositionCallback>,
    account: Option<AccountCallback>,
}

/// Notifications collected under the state lock, delivered after it is released
enum Notice {
    Order(OrderData),
    Trade(TradeData),
}

struct PaperState {
    config: PaperBrokerConfig,
    /// Keyed by broker order id
    orders: BTreeMap<OrderId, OrderData>,
    positions: HashMap<(String, PositionDirection), PositionData>,
    account: AccountData,
}

impl PaperState {
    fn new(config: PaperBrokerConfig) -> Self {
        let account = AccountData::new(config.account_id.clone(), config.initial_balance);
        Self {
            config,
            orders: BTreeMap::new(),
            positions: HashMap::new(),
            account,
        }
    }

    /// Book a fill against the broker-side order and position.
    fn book_fill(
        &mut self,
        broker_id: &str,
        volume: Volume,
        price: Decimal,
        trade_id: String,
    ) -> ConnectorResult<Vec<Notice>> {
        let now = Utc::now();
        let order = self
            .orders
            .get_mut(broker_id)
            .ok_or_else(|| ConnectorError::UnknownOrder(broker_id.to_string()))?;
        order
            .apply_fill(volume, now)
            .map_err(|e| ConnectorError::Refused(e.to_string()))?;

        let mut trade = TradeData::new(
            trade_id,
            broker_id,
            order.symbol.clone(),
            order.direction,
            order.offset,
            price,
            volume,
            now,
        );
        trade.strategy_id = order.strategy_id.clone();
        let update = order.clone();

        let side = PositionDirection::affected_by(trade.direction, trade.offset);
        let position = self
            .positions
            .entry((trade.symbol.clone(), side))
            .or_insert_with(|| PositionData::flat(trade.symbol.clone(), side));
        match trade.offset {
            Offset::Open => {
                let cost = position.position_cost + price * Decimal::from(volume);
                position.total_position += volume;
                position.today_position += volume;
                position.position_cost = cost;
                position.avg_price = cost / Decimal::from(position.total_position);
            }
            _ => {
                let closed = volume.min(position.total_position);
                let pnl = match side {
                    PositionDirection::Long => (price - position.avg_price) * Decimal::from(closed),
                    PositionDirection::Short => (position.avg_price - price) * Decimal::from(closed),
                };
                position.total_position -= closed;
                position.today_position = position.today_position.saturating_sub(closed);
                position.position_cost = position.avg_price * Decimal::from(position.total_position);
                position.realized_pnl += pnl;
                self.account.close_profit += pnl;
                self.account.balance += pnl;
                self.account.available += pnl;
            }
        }
        position.update_time = now;

        Ok(vec![Notice::Trade(trade), Notice::Order(update)])
    }
}

/// In-process paper broker
pub struct PaperTradeConnector {
    connected: AtomicBool,
    logged_in: AtomicBool,
    next_order: AtomicU64,
    next_trade: AtomicU64,
    state: Mutex<PaperState>,
    callbacks: RwLock<Callbacks>,
}

impl PaperTradeConnector {
    pub fn new(config: PaperBrokerConfig) -> Self {
        Self {
            connected: AtomicBool::new(false),
            logged_in: AtomicBool::new(false),
            next_order: AtomicU64::new(1),
            next_trade: AtomicU64::new(1),
            state: Mutex::new(PaperState::new(config)),
            callbacks: RwLock::new(Callbacks::default()),
        }
    }

    pub fn config(&self) -> PaperBrokerConfig {
        self.state.lock().config.clone()
    }

    /// Fill `volume` of a working order at its limit price.
    ///
    /// Delivers the trade callback, then the order update.
    pub fn fill(&self, broker_id: &str, volume: Volume) -> ConnectorResult<()> {
        let notices = {
            let mut state = self.state.lock();
            let price = state
                .orders
                .get(broker_id)
                .map(|o| o.price)
                .ok_or_else(|| ConnectorError::UnknownOrder(broker_id.to_string()))?;
            let trade_id = self.next_trade_id();
            state.book_fill(broker_id, volume, price, trade_id)?
        };
        self.deliver(notices);
        Ok(())
    }

    /// Push the current positions and account through their callbacks.
    pub fn publish_snapshot(&self) {
        let (positions, account) = {
            let state = self.state.lock();
            let mut positions: Vec<_> = state.positions.values().cloned().collect();
            positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
            (positions, state.account.clone())
        };
        let callbacks = self.callbacks.read();
        if let Some(cb) = &callbacks.position {
            for position in positions {
                cb(position);
            }
        }
        if let Some(cb) = &callbacks.account {
            cb(account);
        }
    }

    /// Number of orders still working at the paper broker
    pub fn working_orders(&self) -> usize {
        self.state
            .lock()
            .orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .count()
    }

    fn next_trade_id(&self) -> String {
        format!("PT-{:06}", self.next_trade.fetch_add(1, Ordering::SeqCst))
    }

    fn ensure_session(&self) -> ConnectorResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ConnectorError::NotConnected);
        }
        if !self.logged_in.load(Ordering::SeqCst) {
            return Err(ConnectorError::NotLoggedIn);
        }
        Ok(())
    }

    fn deliver(&self, notices: Vec<Notice>) {
        let callbacks = self.callbacks.read();
        for notice in notices {
            match notice {
                Notice::Order(order) => {
                    if let Some(cb) = &callbacks.order {
                        cb(order);
                    }
                }
                Notice::Trade(trade) => {
                    if let Some(cb) = &callbacks.trade {
                        cb(trade);
                    }
                }
            }
        }
    }
}

impl Default for PaperTradeConnector {
    fn default() -> Self {
        Self::new(PaperBrokerConfig::default())
    }
}

impl TradeConnector for PaperTradeConnector {
    fn init(&self, config: &str) -> ConnectorResult<()> {
        if !config.trim().is_empty() {
            let parsed: PaperBrokerConfig =
                serde_json::from_str(config).map_err(|e| ConnectorError::Config(e.to_string()))?;
            info!(
                "[PAPER] configured: auto_accept={} auto_fill={}",
                parsed.auto_accept, parsed.auto_fill
            );
            *self.state.lock() = PaperState::new(parsed);
        }
        Ok(())
    }

    fn connect(&self) -> ConnectorResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        info!("[PAPER] connected");
        Ok(())
    }

    fn disconnect(&self) {
        self.logged_in.store(false, Ordering::SeqCst);
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("[PAPER] disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn login(&self, user_id: &str, _password: &str) -> ConnectorResult<()> {
        if !self.is_connected() {
            return Err(ConnectorError::NotConnected);
        }
        if user_id.is_empty() {
            return Err(ConnectorError::LoginFailed("empty user id".to_string()));
        }
        self.logged_in.store(true, Ordering::SeqCst);
        info!("[PAPER] {} logged in", user_id);
        Ok(())
    }

    fn logout(&self) -> ConnectorResult<()> {
        self.logged_in.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    fn place_order(&self, order: &OrderData) -> ConnectorResult<OrderId> {
        self.ensure_session()?;
        if order.volume == 0 {
            return Err(ConnectorError::Refused("zero volume".to_string()));
        }

        let broker_id = format!("PAPER-{}", self.next_order.fetch_add(1, Ordering::SeqCst));
        let notices = {
            let mut state = self.state.lock();
            let now = Utc::now();
            let mut booked = order.clone();
            booked.order_id = broker_id.clone();
            booked.status = OrderStatus::Submitting;
            booked.traded_volume = 0;
            booked.insert_time = now;
            booked.update_time = now;

            let mut notices = Vec::new();
            if state.config.auto_accept {
                booked.status = OrderStatus::Accepted;
                notices.push(Notice::Order(booked.clone()));
            }
            let auto_fill = state.config.auto_fill;
            let (volume, price) = (booked.volume, booked.price);
            state.orders.insert(broker_id.clone(), booked);

            if auto_fill {
                let trade_id = self.next_trade_id();
                notices.extend(state.book_fill(&broker_id, volume, price, trade_id)?);
            }
            notices
        };
        debug!(
            "[PAPER] {} {:?} {:?} {} @ {} as {}",
            order.symbol, order.direction, order.offset, order.volume, order.price, broker_id
        );

        self.deliver(notices);
        Ok(broker_id)
    }

    fn cancel_order(&self, order_id: &str) -> ConnectorResult<()> {
        self.ensure_session()?;
        let update = {
            let mut state = self.state.lock();
            let order = state
                .orders
                .get_mut(order_id)
                .ok_or_else(|| ConnectorError::UnknownOrder(order_id.to_string()))?;
            order
                .transition(OrderStatus::Canceled, Utc::now())
                .map_err(|e| {
                    warn!("[PAPER] cancel refused: {}", e);
                    ConnectorError::Refused(e.to_string())
                })?;
            order.clone()
        };
        self.deliver(vec![Notice::Order(update)]);
        Ok(())
    }

    fn query_pending_orders(&self) -> ConnectorResult<Vec<OrderData>> {
        self.ensure_session()?;
        Ok(self
            .state
            .lock()
            .orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .cloned()
            .collect())
    }

    fn query_order(&self, order_id: &str) -> ConnectorResult<Option<OrderData>> {
        self.ensure_session()?;
        Ok(self.state.lock().orders.get(order_id).cloned())
    }

    fn query_positions(&self) -> ConnectorResult<Vec<PositionData>> {
        self.ensure_session()?;
        Ok(self
            .state
            .lock()
            .positions
            .values()
            .filter(|p| !p.is_flat())
            .cloned()
            .collect())
    }

    fn query_account(&self) -> ConnectorResult<AccountData> {
        self.ensure_session()?;
        Ok(self.state.lock().account.clone())
    }

    fn set_order_callback(&self, callback: OrderCallback) {
        self.callbacks.write().order = Some(callback);
    }

    fn set_trade_callback(&self, callback: TradeCallback) {
        self.callbacks.write().trade = Some(callback);
    }

    fn set_position_callback(&self, callback: PositionCallback) {
        self.callbacks.write().position = Some(callback);
    }

    fn set_account_callback(&self, callback: AccountCallback) {
        self.callbacks.write().account = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::Direction;
    use std::sync::Arc;

    fn online(config: PaperBrokerConfig) -> PaperTradeConnector {
        let broker = PaperTradeConnector::new(config);
        broker.connect().unwrap();
        broker.login("tester", "pw").unwrap();
        broker
    }

    fn buy_open(volume: Volume) -> OrderData {
        OrderData::new("rb2405", Direction::Buy, Offset::Open, dec!(3500), volume)
            .with_strategy("MA_01")
    }

    fn capture_orders(broker: &PaperTradeConnector) -> Arc<Mutex<Vec<OrderData>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        broker.set_order_callback(Arc::new(move |o| sink.lock().push(o)));
        seen
    }

    #[test]
    fn test_place_requires_session() {
        let broker = PaperTradeConnector::default();
        assert_eq!(broker.place_order(&buy_open(1)), Err(ConnectorError::NotConnected));
        broker.connect().unwrap();
        assert_eq!(broker.place_order(&buy_open(1)), Err(ConnectorError::NotLoggedIn));
    }

    #[test]
    fn test_ack_delivered_before_place_returns() {
        let broker = online(PaperBrokerConfig::default());
        let seen = capture_orders(&broker);

        let id = broker.place_order(&buy_open(2)).unwrap();
        assert_eq!(id, "PAPER-1");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].order_id, "PAPER-1");
        assert_eq!(seen[0].status, OrderStatus::Accepted);
        assert_eq!(seen[0].strategy_id, "MA_01");
    }

    #[test]
    fn test_auto_fill_books_position() {
        let broker = online(PaperBrokerConfig::default().with_auto_fill(true));
        let trades = Arc::new(Mutex::new(Vec::new()));
        let t = Arc::clone(&trades);
        broker.set_trade_callback(Arc::new(move |trade| t.lock().push(trade)));

        broker.place_order(&buy_open(3)).unwrap();

        let trades = trades.lock();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].volume, 3);
        assert_eq!(trades[0].price, dec!(3500));

        let positions = broker.query_positions().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].direction, PositionDirection::Long);
        assert_eq!(positions[0].total_position, 3);
        assert_eq!(broker.working_orders(), 0);
    }

    #[test]
    fn test_manual_fill_and_close_realizes_pnl() {
        let broker = online(PaperBrokerConfig::default());
        let id = broker.place_order(&buy_open(2)).unwrap();
        broker.fill(&id, 2).unwrap();

        let close = OrderData::new("rb2405", Direction::Sell, Offset::Close, dec!(3510), 2);
        let close_id = broker.place_order(&close).unwrap();
        broker.fill(&close_id, 2).unwrap();

        let account = broker.query_account().unwrap();
        assert_eq!(account.close_profit, dec!(20));
        assert!(broker.query_positions().unwrap().is_empty());
    }

    #[test]
    fn test_overfill_refused() {
        let broker = online(PaperBrokerConfig::default());
        let id = broker.place_order(&buy_open(1)).unwrap();
        assert!(matches!(broker.fill(&id, 2), Err(ConnectorError::Refused(_))));
        assert_eq!(
            broker.fill("PAPER-99", 1),
            Err(ConnectorError::UnknownOrder("PAPER-99".to_string()))
        );
    }

    #[test]
    fn test_cancel_emits_canceled_once() {
        let broker = online(PaperBrokerConfig::default());
        let seen = capture_orders(&broker);
        let id = broker.place_order(&buy_open(1)).unwrap();

        broker.cancel_order(&id).unwrap();
        assert!(broker.cancel_order(&id).is_err());
        assert_eq!(seen.lock().last().map(|o| o.status), Some(OrderStatus::Canceled));
        assert!(broker.query_pending_orders().unwrap().is_empty());
    }

    #[test]
    fn test_init_parses_json_config() {
        let broker = PaperTradeConnector::default();
        broker
            .init(r#"{"auto_fill": true, "account_id": "sim-7"}"#)
            .unwrap();
        let config = broker.config();
        assert!(config.auto_fill);
        assert!(config.auto_accept);
        assert_eq!(config.account_id, "sim-7");

        assert!(matches!(broker.init("{not json"), Err(ConnectorError::Config(_))));
    }
}
