//! Property tests over arbitrary sequences of admissions and
//! cancellations against a single book (spec.md §8's universal
//! invariants).

use std::sync::Arc;

use proptest::prelude::*;

use exchange_engine::book::{AdmissionRequest, Book};
use exchange_engine::{EventBus, OrderType, Side};

const ACCOUNTS: [&str; 3] = ["A", "B", "C"];
const MAX_PRICE: u64 = 20;
const MAX_QTY: u64 = 10;

#[derive(Debug, Clone)]
enum Op {
    Admit {
        account: usize,
        side: Side,
        order_type: OrderType,
        qty: u64,
        price: u64,
    },
    Cancel {
        pick: usize,
    },
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn order_type_strategy() -> impl Strategy<Value = OrderType> {
    prop_oneof![
        Just(OrderType::Limit),
        Just(OrderType::Market),
        Just(OrderType::ImmediateOrCancel),
        Just(OrderType::FillOrKill),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..ACCOUNTS.len(), side_strategy(), order_type_strategy(), 1..=MAX_QTY, 1..=MAX_PRICE).prop_map(
            |(account, side, order_type, qty, price)| Op::Admit {
                account,
                side,
                order_type,
                qty,
                price,
            }
        ),
        1 => (0..usize::MAX).prop_map(|pick| Op::Cancel { pick }),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 0..40)
}

/// For every order visible through `get_all_orders`, `original = remaining
/// + sum(fills.qty)` must hold, and every fill price must respect that
/// order's own limit price, if it has one (covers both the resting side,
/// whose limit price always equals the trade price by construction, and
/// the limit-aggressor side, which can only ever improve on its limit).
fn assert_remaining_identity_and_price_bounds(book: &Book) {
    for account in ACCOUNTS {
        for status in book.get_all_orders(account) {
            let filled: u64 = status.fills.iter().map(|f| f.qty).sum();
            assert_eq!(
                status.original_qty,
                status.qty + filled,
                "remaining identity violated for order {}",
                status.id
            );
            if let Some(limit) = status.price {
                for fill in &status.fills {
                    match status.side {
                        Side::Buy => assert!(
                            fill.price <= limit,
                            "buy fill {} worse than limit {}",
                            fill.price,
                            limit
                        ),
                        Side::Sell => assert!(
                            fill.price >= limit,
                            "sell fill {} worse than limit {}",
                            fill.price,
                            limit
                        ),
                    }
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn universal_invariants_hold_over_random_sequences(ops in ops_strategy()) {
        let mut book = Book::new("TESTEX", "FOOBAR", Arc::new(EventBus::new()));
        let mut admitted_ids: Vec<u64> = Vec::new();
        let mut next_id: u64 = 0;

        for op in ops {
            match op {
                Op::Admit { account, side, order_type, qty, price } => {
                    let price = match order_type {
                        OrderType::Market => None,
                        _ => Some(price),
                    };
                    let before_tape_len = book.trade_tape().len();
                    let before_quote = book.get_quote();

                    let status = book
                        .admit(AdmissionRequest {
                            account: ACCOUNTS[account].to_string(),
                            side,
                            order_type,
                            qty,
                            price,
                        })
                        .expect("well-formed admission never errors");
                    admitted_ids.push(next_id);
                    next_id += 1;

                    // Immediate-or-cancel disposition: never rests.
                    if order_type == OrderType::ImmediateOrCancel {
                        prop_assert!(!status.open);
                    }

                    // Fill-or-kill atomicity: either fully filled, or
                    // zero fills and the book is untouched.
                    if order_type == OrderType::FillOrKill {
                        if status.fills.is_empty() {
                            prop_assert!(!status.open);
                            prop_assert_eq!(status.qty, status.original_qty);
                            prop_assert_eq!(book.trade_tape().len(), before_tape_len);
                            prop_assert_eq!(book.get_quote(), before_quote);
                        } else {
                            prop_assert_eq!(status.total_filled, status.original_qty);
                        }
                    }
                }
                Op::Cancel { pick } => {
                    if admitted_ids.is_empty() {
                        continue;
                    }
                    let id = admitted_ids[pick % admitted_ids.len()];
                    let first = book.cancel(id).expect("previously admitted id always exists");
                    let tape_len_before_second = book.trade_tape().len();
                    let second = book.cancel(id).expect("cancel is idempotent");
                    prop_assert_eq!(first.qty, second.qty);
                    prop_assert_eq!(first.open, second.open);
                    prop_assert_eq!(book.trade_tape().len(), tape_len_before_second);
                }
            }

            assert_remaining_identity_and_price_bounds(&book);
            #[cfg(debug_assertions)]
            book.assert_invariants();
        }
    }
}
