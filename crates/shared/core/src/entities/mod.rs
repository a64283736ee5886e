mod account;
mod direction;
mod order;
mod order_status;
mod position;
mod trade;

pub use account::AccountData;
pub use direction::{Direction, Offset, PriceType};
pub use order::{OrderData, OrderId};
pub use order_status::{OrderStatus, OrderTransitionError};
pub use position::{PositionData, PositionDirection};
pub use trade::{TradeData, TradeId};
