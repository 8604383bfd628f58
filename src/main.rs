//! Virtual-Pool AMM Simulation.
//!
//! Demonstrates the full swap lifecycle including quoting, fee-stage
//! progression, volume-triggered burns, and payment settlement.

use rust_decimal_macros::dec;
use swap_core::*;

fn main() {
    println!("Virtual-Pool AMM Swap Engine Simulation");
    println!("Constant Product, Staged Fees, Volume Burns\n");

    scenario_1_quote_and_swap();
    scenario_2_stage_progression();
    scenario_3_failed_swap_rolls_back();
    scenario_4_parallel_pools();
    scenario_5_payment_settlement();

    println!("\nAll simulations completed successfully.");
}

fn demo_pool_config(stage1: rust_decimal::Decimal) -> PoolConfig {
    PoolConfig {
        token_a: TokenId(1),
        token_b: TokenId(2),
        reserve_a: dec!(1000),
        reserve_b: dec!(65000000),
        fee_bps_base: 30,
        stage1_threshold: stage1,
        stage2_threshold: stage1 * dec!(5),
        stage3_threshold: stage1 * dec!(25),
        burn_token_id: TokenId(2),
        burn_stage_amounts: [dec!(0), dec!(1000), dec!(2000), dec!(4000)],
    }
}

/// Quote, then swap, and show the executed trade.
fn scenario_1_quote_and_swap() {
    println!("Scenario 1: Quote and Swap\n");

    let engine = SwapEngine::new(EngineConfig::default());
    let pool = engine.create_pool(demo_pool_config(dec!(10000))).unwrap();
    let alice = UserId(1);
    engine.ledger().credit(alice, TokenId(1), dec!(100)).unwrap();

    let quote = engine.quote(pool.id, Side::AtoB, dec!(1)).unwrap();
    println!("  Quote for 1 token_a: {} token_b", quote.amount_out);
    println!("  Fee: {} bps ({} token_a)", quote.fee_bps, quote.fee_amount);
    println!("  Price impact: {} bps", quote.price_impact_bps);

    let trade = engine.swap(pool.id, alice, Side::AtoB, dec!(1)).unwrap();
    println!("  Executed: {} in -> {} out\n", trade.amount_in, trade.amount_out);

    let after = engine.get_pool(pool.id).unwrap();
    println!("  Reserves now: a={} b={}", after.reserve_a, after.reserve_b);
    println!("  Alice balances: {:?}\n", engine.list_balances(alice));
}

/// Volume pushes the pool through its stages; each crossing burns supply.
fn scenario_2_stage_progression() {
    println!("Scenario 2: Stage Progression and Burns\n");

    let engine = SwapEngine::new(EngineConfig::default());
    let pool = engine.create_pool(demo_pool_config(dec!(50))).unwrap();
    let bob = UserId(2);
    engine.ledger().credit(bob, TokenId(1), dec!(10000)).unwrap();

    for round in 1..=4 {
        let trade = engine.swap(pool.id, bob, Side::AtoB, dec!(400)).unwrap();
        let snap = engine.get_pool(pool.id).unwrap();
        println!(
            "  Round {}: stage {} (fee {} bps), volume {}, trade fee {}",
            round,
            snap.stage,
            snap.fee_bps,
            snap.cumulative_volume,
            trade.fee_amount
        );
    }

    let burns = engine.audit().burns_for_pool(pool.id);
    println!("  Burn events recorded: {}", burns.len());
    for burn in burns {
        println!("    stage {} burned {} of token {:?}", burn.stage, burn.amount, burn.token_id);
    }
    println!();
}

/// A swap without funds fails cleanly; nothing moves.
fn scenario_3_failed_swap_rolls_back() {
    println!("Scenario 3: Failed Swap Leaves No Trace\n");

    let engine = SwapEngine::new(EngineConfig::default());
    let pool = engine.create_pool(demo_pool_config(dec!(10000))).unwrap();
    let before = engine.get_pool(pool.id).unwrap();

    let broke = UserId(3);
    let err = engine.swap(pool.id, broke, Side::AtoB, dec!(5)).unwrap_err();
    println!("  Swap rejected: {} (kind: {})", err, err.kind());

    let after = engine.get_pool(pool.id).unwrap();
    assert_eq!(before, after);
    println!("  Pool unchanged: reserves a={} b={}\n", after.reserve_a, after.reserve_b);
}

/// Swaps against different pools proceed independently on worker threads.
fn scenario_4_parallel_pools() {
    println!("Scenario 4: Parallel Pools\n");

    let engine = std::sync::Arc::new(SwapEngine::new(EngineConfig::default()));
    let pool_1 = engine.create_pool(demo_pool_config(dec!(10000))).unwrap();
    let pool_2 = engine.create_pool(demo_pool_config(dec!(10000))).unwrap();

    let mut handles = Vec::new();
    for (worker, pool_id) in [(1u64, pool_1.id), (2, pool_2.id)] {
        let engine = std::sync::Arc::clone(&engine);
        handles.push(std::thread::spawn(move || {
            let user = UserId(worker);
            engine.ledger().credit(user, TokenId(1), dec!(100)).unwrap();
            for _ in 0..10 {
                engine.swap(pool_id, user, Side::AtoB, dec!(1)).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    println!("  20 swaps executed across 2 pools on 2 threads");
    println!("  Trades recorded: {}\n", engine.audit().trade_count());
}

/// Deposits settle through the payment collaborator, then fund a swap.
fn scenario_5_payment_settlement() {
    println!("Scenario 5: Payment Settlement\n");

    let engine = SwapEngine::new(EngineConfig::default());
    let pool = engine.create_pool(demo_pool_config(dec!(10000))).unwrap();
    let processor = PaymentProcessor::new(std::sync::Arc::clone(engine.ledger()))
        .with_events(std::sync::Arc::clone(engine.event_buffer()));
    let carol = UserId(4);

    processor
        .submit_deposit("inv-carol-1".into(), carol, TokenId(1), dec!(50), engine.time())
        .unwrap();
    println!("  Deposit pending: {} pending tickets", processor.pending_deposits());

    processor.confirm_deposit("inv-carol-1", engine.time()).unwrap();
    println!(
        "  Deposit confirmed, balance: {}",
        engine.ledger().balance(carol, TokenId(1))
    );

    let trade = engine.swap(pool.id, carol, Side::AtoB, dec!(10)).unwrap();
    println!("  Swapped {} token_a for {} token_b", trade.amount_in, trade.amount_out);
}
