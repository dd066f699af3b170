//! The wire payload `P` of §6, serialized as JSON. One variant per action
//! kind the venue accepts; `serde`'s tagged-enum representation keeps this
//! exhaustive by construction.

use serde::Serialize;

#[derive(Serialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateSession {
        public_key: String,
    },
    /// `price` is an integer in 10⁻⁸ units; `size` is signed (buy positive,
    /// sell negative), also in 10⁻⁸ units. `post_only` is always `true` for
    /// orders issued by the grid controller.
    PlaceOrder {
        market_id: u32,
        client_order_id: u32,
        price: i64,
        size: i64,
        post_only: bool,
    },
    CancelOrder {
        market_id: u32,
        client_order_id: u32,
    },
    CancelAllOrders {
        market_id: u32,
    },
    /// Not independently verified against the venue's schema — see the
    /// open question in the design notes.
    GetOrderBookHead {
        market_id: u32,
    },
}
