//! Crossover position state machine.
//!
//! The machine is either flat or holding one fixed-notional position. Each
//! tick it is asked for a [`Decision`] given the current relationship, the
//! caller tries to execute that decision, and the outcome is fed back through
//! [`PositionMachine::settle`]. State only moves in `settle`, so an aborted
//! tick leaves it untouched.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use common::{OrderRequest, OrderSide};

use crate::indicators::{MovingAverageSample, Relationship};

/// Fixed trade parameters, taken from the strategy file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeParams {
    pub product_id: String,
    /// Quote-currency notional for every order, buy or sell.
    pub quote_amount: Decimal,
    /// Minimum gain over the buy reference before a sell is allowed
    /// (e.g. 0.013 = 1.3%, enough to cover round-trip fees).
    pub fee_buffer_ratio: Decimal,
    /// Buy limit = short MA * this (below 1 to rest on the book).
    pub buy_price_factor: Decimal,
    /// Sell limit = short MA * this (above 1 to rest on the book).
    pub sell_price_factor: Decimal,
    pub client_order_prefix: String,
}

/// The single in-memory position record. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionState {
    pub in_position: bool,
    /// Short MA at the time of the confirmed buy. Zero while flat.
    pub last_buy_price: Decimal,
    /// Last *known* relationship; never set back to `Unknown`.
    pub previous_relationship: Relationship,
}

/// What the current tick asks the caller to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Relationship unknown, averages missing, or prices outside the
    /// representable range; nothing evaluated.
    NoSignal,
    /// Neither trigger fired.
    Hold,
    Buy {
        order: OrderRequest,
        /// Short MA that will be recorded as the buy price on confirmation.
        reference_price: Decimal,
    },
    Sell { order: OrderRequest },
    /// Sell condition met but the short MA has not cleared the profit floor.
    HoldForProfit {
        short_ma: Decimal,
        min_sell_price: Decimal,
    },
}

impl Decision {
    /// The order to submit, if any.
    pub fn order(&self) -> Option<&OrderRequest> {
        match self {
            Decision::Buy { order, .. } | Decision::Sell { order } => Some(order),
            _ => None,
        }
    }
}

/// Pure transition: what to do given the state and this tick's averages.
pub fn evaluate(
    state: &PositionState,
    params: &TradeParams,
    current: Relationship,
    short: &MovingAverageSample,
) -> Decision {
    let Some(short_ma) = short.value() else {
        return Decision::NoSignal;
    };

    match current {
        Relationship::Unknown => Decision::NoSignal,

        Relationship::Above
            if !state.in_position && state.previous_relationship == Relationship::Below =>
        {
            let Some(limit_price) = short_ma.checked_mul(params.buy_price_factor) else {
                return Decision::NoSignal;
            };
            Decision::Buy {
                order: OrderRequest::limit(
                    &params.client_order_prefix,
                    params.product_id.clone(),
                    OrderSide::Buy,
                    limit_price,
                    params.quote_amount,
                ),
                reference_price: short_ma,
            }
        }

        Relationship::Below if state.in_position => {
            let Some(min_sell_price) = Decimal::ONE
                .checked_add(params.fee_buffer_ratio)
                .and_then(|m| state.last_buy_price.checked_mul(m))
            else {
                return Decision::NoSignal;
            };
            if short_ma >= min_sell_price {
                let Some(limit_price) = short_ma.checked_mul(params.sell_price_factor) else {
                    return Decision::NoSignal;
                };
                Decision::Sell {
                    order: OrderRequest::limit(
                        &params.client_order_prefix,
                        params.product_id.clone(),
                        OrderSide::Sell,
                        limit_price,
                        params.quote_amount,
                    ),
                }
            } else {
                Decision::HoldForProfit {
                    short_ma,
                    min_sell_price,
                }
            }
        }

        _ => Decision::Hold,
    }
}

/// Pure transition: the state after `decision` was attempted.
///
/// `confirmed` is whether the venue confirmed the decision's order; it is
/// ignored for decisions without an order. An `Unknown` tick leaves the state
/// exactly as it was, including `previous_relationship`.
pub fn transition(
    state: PositionState,
    current: Relationship,
    decision: &Decision,
    confirmed: bool,
) -> PositionState {
    if current == Relationship::Unknown {
        return state;
    }

    let mut next = state;
    match decision {
        Decision::Buy { reference_price, .. } if confirmed => {
            next.in_position = true;
            next.last_buy_price = *reference_price;
        }
        Decision::Sell { .. } if confirmed => {
            next.in_position = false;
            next.last_buy_price = Decimal::ZERO;
        }
        _ => {}
    }
    next.previous_relationship = current;
    next
}

/// Owns the position state and the parameters that drive it.
#[derive(Debug, Clone)]
pub struct PositionMachine {
    params: TradeParams,
    state: PositionState,
}

impl PositionMachine {
    pub fn new(params: TradeParams) -> Self {
        Self::with_state(params, PositionState::default())
    }

    pub fn with_state(params: TradeParams, state: PositionState) -> Self {
        Self { params, state }
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn decide(&self, current: Relationship, short: &MovingAverageSample) -> Decision {
        evaluate(&self.state, &self.params, current, short)
    }

    /// Commit the outcome of this tick.
    pub fn settle(&mut self, current: Relationship, decision: &Decision, confirmed: bool) {
        self.state = transition(self.state, current, decision, confirmed);
    }
}
