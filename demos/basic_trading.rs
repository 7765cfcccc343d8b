//! Minimal end-to-end demo: register a symbol, cross a couple of orders,
//! and print the resulting book snapshot and balances.
//!
//! Run with `cargo run --example basic_trading`.

use std::sync::Arc;

use matching_core::prelude::*;

fn main() {
    tracing_subscriber::fmt::init();

    let registry = Arc::new(ParticipantRegistry::new(RegistryConfig::default()));
    let dispatcher = Arc::new(SymbolDispatcher::new(registry.clone(), BookConfig::default()));
    let symbol = Symbol::new("X");
    dispatcher.register_symbol(symbol.clone());

    let alice = ParticipantId::new("alice");
    let bob = ParticipantId::new("bob");

    dispatcher
        .submit_limit(&symbol, alice.clone(), Side::Buy, Price::from_decimal(10.00), 100)
        .expect("alice's bid should be accepted");
    dispatcher.flush(&symbol);

    let snapshot = dispatcher.snapshot(&symbol, 10);
    println!("after alice's bid: bids={:?} asks={:?}", snapshot.bids, snapshot.asks);

    dispatcher
        .submit_limit(&symbol, bob.clone(), Side::Sell, Price::from_decimal(9.50), 60)
        .expect("bob's offer should be accepted");
    dispatcher.flush(&symbol);

    let snapshot = dispatcher.snapshot(&symbol, 10);
    println!("after bob's offer: bids={:?} asks={:?}", snapshot.bids, snapshot.asks);
    println!("alice balance={} portfolio[X]={}", registry.balance(&alice), registry.position(&alice, &symbol));
    println!("bob balance={} portfolio[X]={}", registry.balance(&bob), registry.position(&bob, &symbol));
}
