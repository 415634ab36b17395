use chrono::{DateTime, Duration, TimeZone, Utc};
use emabot::indicators::calculate_adjusted_ema;
use emabot::strategy::{EmaCrossoverStrategy, Strategy, StrategyConfig};
use emabot::{PositionSide, PricePoint, Signal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

fn history(prices: &[f64]) -> Vec<PricePoint> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| PricePoint::new(start_time() + Duration::minutes(i as i64), p))
        .collect()
}

fn feed(strategy: &mut EmaCrossoverStrategy, prices: &[f64]) -> Vec<Signal> {
    let offset = strategy.current_state().observed_points as i64;
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| strategy.on_price(p, start_time() + Duration::minutes(offset + i as i64)))
        .collect()
}

fn scenario_config() -> StrategyConfig {
    StrategyConfig {
        stop_loss: 0.1,
        profit_target: 0.1,
        fast_window: 2,
        slow_window: 3,
        enable_longing: true,
        enable_shorting: false,
    }
}

/// Long entered at exactly 100 after a gentle climb
fn long_at_100() -> EmaCrossoverStrategy {
    let mut strategy = EmaCrossoverStrategy::new(scenario_config());
    strategy.prefill(&history(&[96.0, 97.0, 98.0, 99.0]));
    assert_eq!(feed(&mut strategy, &[100.0]), vec![Signal::EnterLong]);
    assert_eq!(strategy.current_state().entry_price, Some(100.0));
    strategy
}

fn random_walk(seed: u64, len: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 100.0;
    (0..len)
        .map(|_| {
            price *= 1.0 + rng.gen_range(-0.03..0.03);
            price
        })
        .collect()
}

#[test]
fn scenario_a_single_entry_on_rising_prices() {
    let mut strategy = EmaCrossoverStrategy::new(scenario_config());
    strategy.prefill(&history(&[10.0, 10.0, 10.0]));

    // Rises gently enough to stay below the 10% profit target from 11
    let signals = feed(&mut strategy, &[11.0, 11.2, 11.4, 11.6, 11.8, 12.0]);

    assert_eq!(signals[0], Signal::EnterLong);
    assert!(signals[1..].iter().all(|s| *s == Signal::Hold), "{:?}", signals);
    assert_eq!(strategy.current_state().position, Some(PositionSide::Long));
}

#[test]
fn scenario_b_stop_loss_long() {
    let mut strategy = long_at_100();

    assert_eq!(feed(&mut strategy, &[89.0]), vec![Signal::StopLossLong]);
    let state = strategy.current_state();
    assert_eq!(state.position, None);
    assert_eq!(state.entry_price, None);
}

#[test]
fn scenario_c_profit_target_long() {
    let mut strategy = long_at_100();

    assert_eq!(feed(&mut strategy, &[111.0]), vec![Signal::ExitLong]);
    assert_eq!(strategy.current_state().position, None);
}

#[test]
fn scenario_d_insufficient_history_always_holds() {
    let mut strategy = EmaCrossoverStrategy::new(StrategyConfig {
        slow_window: 10,
        fast_window: 3,
        ..scenario_config()
    });
    strategy.prefill(&history(&[1.0, 2.0, 3.0]));

    // 3 + 6 = 9 points, one short of the slow window
    let signals = feed(&mut strategy, &[10.0, 50.0, 0.5, 100.0, 200.0, 400.0]);
    assert!(signals.iter().all(|s| *s == Signal::Hold), "{:?}", signals);
    assert_eq!(strategy.current_state().position, None);
}

#[test]
fn hysteresis_no_repeat_entry_while_trend_persists() {
    let mut strategy = EmaCrossoverStrategy::new(StrategyConfig {
        profit_target: 0.9,
        stop_loss: 0.9,
        ..scenario_config()
    });
    strategy.prefill(&history(&[10.0, 10.0, 10.0]));

    let rising: Vec<f64> = (1..=50).map(|i| 10.0 + i as f64 * 0.05).collect();
    let signals = feed(&mut strategy, &rising);

    let entries = signals.iter().filter(|s| **s == Signal::EnterLong).count();
    assert_eq!(entries, 1);
}

#[test]
fn stop_loss_outranks_profit_target() {
    // A negative profit target makes any price satisfy the profit rule too
    let mut strategy = EmaCrossoverStrategy::new(StrategyConfig {
        profit_target: -0.5,
        ..scenario_config()
    });
    strategy.prefill(&history(&[96.0, 97.0, 98.0, 99.0]));
    assert_eq!(feed(&mut strategy, &[100.0]), vec![Signal::EnterLong]);

    assert_eq!(feed(&mut strategy, &[80.0]), vec![Signal::StopLossLong]);
}

#[test]
fn position_invariants_hold_on_random_walks() {
    for seed in 0..20 {
        let mut strategy = EmaCrossoverStrategy::new(StrategyConfig {
            stop_loss: 0.02,
            profit_target: 0.03,
            fast_window: 3,
            slow_window: 8,
            enable_longing: true,
            enable_shorting: true,
        });
        let prices = random_walk(seed, 400);
        strategy.prefill(&history(&prices[..20]));

        let mut open: Option<PositionSide> = None;
        for (i, &price) in prices[20..].iter().enumerate() {
            let signal = strategy.on_price(price, start_time() + Duration::minutes(20 + i as i64));
            let state = strategy.current_state();

            assert_eq!(
                state.entry_price.is_some(),
                state.position.is_some(),
                "seed {} step {}",
                seed,
                i
            );

            // Entries only from flat, exits only from the matching side
            if signal.is_entry() {
                assert_eq!(open, None, "seed {} step {}: entry while open", seed, i);
                open = signal.position_side();
            } else if signal.is_exit() {
                assert_eq!(open, signal.position_side(), "seed {} step {}", seed, i);
                open = None;
            }
            assert_eq!(state.position, open);
        }
    }
}

#[test]
fn prefill_matches_direct_adjusted_ema() {
    let prices = random_walk(7, 300);
    let mut strategy = EmaCrossoverStrategy::new(StrategyConfig {
        fast_window: 12,
        slow_window: 48,
        ..StrategyConfig::default()
    });
    strategy.prefill(&history(&prices));

    let state = strategy.current_state();
    let fast = *calculate_adjusted_ema(&prices, 12).last().unwrap();
    let slow = *calculate_adjusted_ema(&prices, 48).last().unwrap();

    assert!((state.fast.unwrap() - fast).abs() < 1e-9 * fast.abs());
    assert!((state.slow.unwrap() - slow).abs() < 1e-9 * slow.abs());
    assert_eq!(state.observed_points, prices.len());
}

#[test]
fn shorts_follow_downtrends() {
    let mut strategy = EmaCrossoverStrategy::new(StrategyConfig {
        enable_longing: false,
        enable_shorting: true,
        ..scenario_config()
    });
    strategy.prefill(&history(&[104.0, 103.0, 102.0, 101.0]));

    assert_eq!(feed(&mut strategy, &[100.0]), vec![Signal::EnterShort]);
    assert_eq!(strategy.current_state().position, Some(PositionSide::Short));

    // Short stop-loss at 100 * 1.1
    assert_eq!(feed(&mut strategy, &[111.0]), vec![Signal::StopLossShort]);
    assert_eq!(strategy.current_state().position, None);
}
