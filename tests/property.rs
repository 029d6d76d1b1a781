use std::io::Write;

use feedbook::book::{LevelPxQty, OrderBook, Side};
use feedbook::decoder::Decoder;
use feedbook::wire;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum BookOp {
    Add {
        order_id: u64,
        side: Side,
        price: i64,
        qty: u32,
    },
    Modify {
        order_id: u64,
        new_price: i64,
        new_qty: u32,
    },
    Execute {
        order_id: u64,
        exec_qty: u32,
    },
    Delete {
        order_id: u64,
    },
}

fn apply(book: &mut OrderBook, op: &BookOp) -> bool {
    match *op {
        BookOp::Add {
            order_id,
            side,
            price,
            qty,
        } => book.on_add(order_id, side, price, qty),
        BookOp::Modify {
            order_id,
            new_price,
            new_qty,
        } => book.on_modify(order_id, new_price, new_qty),
        BookOp::Execute { order_id, exec_qty } => book.on_execute(order_id, exec_qty),
        BookOp::Delete { order_id } => book.on_delete(order_id),
    }
}

fn any_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Bid), Just(Side::Ask)]
}

// A small id space and a tight price band so that operations frequently hit
// live orders and the crossing check.
fn any_op() -> impl Strategy<Value = BookOp> {
    let px = 95_000_000_000i64..105_000_000_000i64;
    prop_oneof![
        (1u64..200, any_side(), px.clone(), 0u32..500).prop_map(|(order_id, side, price, qty)| {
            BookOp::Add {
                order_id,
                side,
                price,
                qty,
            }
        }),
        (1u64..200, px, 0u32..500).prop_map(|(order_id, new_price, new_qty)| BookOp::Modify {
            order_id,
            new_price,
            new_qty,
        }),
        (1u64..200, 0u32..500)
            .prop_map(|(order_id, exec_qty)| BookOp::Execute { order_id, exec_qty }),
        (1u64..200).prop_map(|order_id| BookOp::Delete { order_id }),
    ]
}

type Observed = (Vec<LevelPxQty>, Vec<LevelPxQty>, usize);

fn observe(book: &OrderBook) -> Observed {
    (
        book.levels_depth(Side::Bid, 0),
        book.levels_depth(Side::Ask, 0),
        book.order_count(),
    )
}

proptest! {
    // Structural invariants hold after every accepted or rejected step.
    #[test]
    fn book_invariants_hold(ops in prop::collection::vec(any_op(), 1..300)) {
        let mut book = OrderBook::new();
        for op in &ops {
            apply(&mut book, op);
            book.assert_invariants();
        }
    }

    // A rejected operation leaves all observable state unchanged.
    #[test]
    fn rejections_do_not_mutate(ops in prop::collection::vec(any_op(), 1..300)) {
        let mut book = OrderBook::new();
        for op in &ops {
            let before = observe(&book);
            if !apply(&mut book, op) {
                prop_assert_eq!(&before, &observe(&book));
            }
        }
    }

    // Adding then deleting the same fresh order restores the book.
    #[test]
    fn add_delete_is_identity(
        ops in prop::collection::vec(any_op(), 0..100),
        side in any_side(),
        price in 95_000_000_000i64..105_000_000_000i64,
        qty in 1u32..500,
    ) {
        let mut book = OrderBook::new();
        for op in &ops {
            apply(&mut book, op);
        }

        let fresh_id = 1_000_000; // outside the generated id space
        let before = observe(&book);
        if book.on_add(fresh_id, side, price, qty) {
            prop_assert!(book.on_delete(fresh_id));
        }
        prop_assert_eq!(&before, &observe(&book));
    }

    // top_of_book agrees with a full scan of the ladders.
    #[test]
    fn top_of_book_matches_ladders(ops in prop::collection::vec(any_op(), 1..300)) {
        let mut book = OrderBook::new();
        for op in &ops {
            apply(&mut book, op);
        }

        let tob = book.top_of_book();
        let bids = book.levels_depth(Side::Bid, 0);
        let asks = book.levels_depth(Side::Ask, 0);

        match bids.first() {
            Some(best) => {
                prop_assert_eq!(tob.bid_px, Some(best.px));
                prop_assert_eq!(tob.bid_qty, best.qty);
                prop_assert!(bids.iter().all(|l| l.px <= best.px && l.qty > 0));
            }
            None => prop_assert!(!tob.has_bid()),
        }
        match asks.first() {
            Some(best) => {
                prop_assert_eq!(tob.ask_px, Some(best.px));
                prop_assert_eq!(tob.ask_qty, best.qty);
                prop_assert!(asks.iter().all(|l| l.px >= best.px && l.qty > 0));
            }
            None => prop_assert!(!tob.has_ask()),
        }
    }

    // The decoder replays the identical event sequence after reset(), for
    // arbitrary byte soup.
    #[test]
    fn decoder_reset_is_referentially_transparent(bytes in prop::collection::vec(any::<u8>(), 1..2048)) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();
        let mut dec = Decoder::open(file.path()).unwrap();

        let first = drain(&mut dec);
        dec.reset();
        prop_assert_eq!(dec.position(), 0);
        let second = drain(&mut dec);
        prop_assert_eq!(first, second);
    }
}

fn drain(dec: &mut Decoder) -> Vec<(usize, wire::EventBody)> {
    let mut out = Vec::new();
    while dec.has_next() {
        let before = dec.position();
        match dec.next() {
            Some(ev) => out.push((before, ev.body)),
            None => {
                if dec.position() == before {
                    break; // truncated tail
                }
            }
        }
    }
    out
}
