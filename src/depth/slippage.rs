//! Book-walk slippage estimation
//!
//! Walks one side of the book in rank order, consuming `price * size` per
//! level until the requested quote amount is filled, and reports the average
//! fill price against the touch.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::warn;

use crate::depth::types::{DepthSnapshot, OrderSide, SlippageEstimate};
use crate::error::{AnalyzerError, Result};

/// Estimate the average fill of a market order worth `notional` quote currency
///
/// Buys walk asks from best (lowest) up; sells walk bids from best (highest) down.
/// If the side cannot absorb the whole notional, the estimate covers what was
/// consumed and `partial_fill` is set. The walk also stops, with a partial
/// fill, at a level whose quantity would exceed the `Decimal` range.
///
/// # Errors
/// * `InvalidNotional` - notional is zero or negative
/// * `InsufficientDepth` - the consumed side holds no size at all
/// * `InvalidLevel` - not even the first level can be filled within range
pub fn estimate_slippage(
    snapshot: &DepthSnapshot,
    side: OrderSide,
    notional: Decimal,
) -> Result<SlippageEstimate> {
    if notional <= Decimal::ZERO {
        return Err(AnalyzerError::InvalidNotional(notional));
    }

    let book_side = side.consumes();
    let reference_price = snapshot
        .touch(book_side)
        .ok_or(AnalyzerError::InsufficientDepth { side: book_side })?
        .price;

    let mut filled_notional = Decimal::ZERO;
    let mut filled_quantity = Decimal::ZERO;
    let mut levels_consumed = 0;
    let mut overflowed = false;

    for level in snapshot.side(book_side) {
        if level.price <= Decimal::ZERO || level.size <= Decimal::ZERO {
            continue;
        }

        let remaining = notional - filled_notional;

        // An unrepresentable level value is larger than any remaining amount
        let fills_rest = level.notional().map_or(true, |value| value >= remaining);
        let (quantity, value) = if fills_rest {
            match remaining.checked_div(level.price) {
                Some(quantity) => (quantity, remaining),
                None => {
                    overflowed = true;
                    break;
                }
            }
        } else {
            (level.size, level.notional().unwrap_or(remaining))
        };

        let Some(total_quantity) = filled_quantity.checked_add(quantity) else {
            overflowed = true;
            break;
        };

        filled_quantity = total_quantity;
        filled_notional += value;
        levels_consumed += 1;

        if fills_rest {
            break;
        }
    }

    if overflowed {
        warn!(
            ?side,
            %notional,
            levels_consumed,
            "Book walk stopped at a level outside the decimal range"
        );
    }

    // Zero quantity (nothing filled) also lands here
    let Some(avg_fill_price) = filled_notional.checked_div(filled_quantity) else {
        return Err(if overflowed {
            AnalyzerError::InvalidLevel(format!(
                "{} side cannot be walked within decimal range",
                book_side
            ))
        } else {
            AnalyzerError::InsufficientDepth { side: book_side }
        });
    };
    let partial_fill = filled_notional < notional;

    if partial_fill {
        warn!(
            ?side,
            %notional,
            %filled_notional,
            "Slippage estimate exceeds available depth, reporting partial fill"
        );
    }

    let adverse_move = match side {
        OrderSide::Buy => avg_fill_price - reference_price,
        OrderSide::Sell => reference_price - avg_fill_price,
    };

    Ok(SlippageEstimate {
        side,
        notional,
        filled_notional,
        filled_quantity,
        avg_fill_price,
        reference_price,
        slippage_percent: percent_of(adverse_move, reference_price),
        levels_consumed,
        partial_fill,
    })
}

/// `part / whole * 100`, falling back to f64 when the decimal result is out of range
fn percent_of(part: Decimal, whole: Decimal) -> f64 {
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|percent| percent.to_f64())
        .unwrap_or_else(|| {
            let whole = whole.to_f64().unwrap_or(0.0);
            if whole > 0.0 {
                part.to_f64().unwrap_or(0.0) / whole * 100.0
            } else {
                0.0
            }
        })
}

/// Buy and sell estimates for each notional, buys first
pub fn estimate_slippage_ladder(
    snapshot: &DepthSnapshot,
    notionals: &[Decimal],
) -> Result<Vec<SlippageEstimate>> {
    let mut estimates = Vec::with_capacity(notionals.len() * 2);

    for side in [OrderSide::Buy, OrderSide::Sell] {
        for notional in notionals {
            estimates.push(estimate_slippage(snapshot, side, *notional)?);
        }
    }

    Ok(estimates)
}
