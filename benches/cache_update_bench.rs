use alloy_primitives::{Address, U256};
use criterion::{Criterion, criterion_group, criterion_main};
use lazy_static::lazy_static;
use trade_stats::{PairKey, Trade, TradeCache, TradeClassifier, TradeSide};

lazy_static! {
    static ref RELAYERS: Vec<Address> = (0..4u8).map(|i| Address::repeat_byte(0xa0 + i)).collect();
    static ref PAIRS: Vec<PairKey> =
        (0..8u8).map(|i| PairKey::new(Address::repeat_byte(0x10 + i), Address::repeat_byte(0x20))).collect();
}

fn synthetic_trade(i: u64) -> Trade {
    let pair = PAIRS[(i % PAIRS.len() as u64) as usize];
    Trade {
        maker: Address::repeat_byte((i % 50) as u8 + 1),
        taker: Address::repeat_byte((i % 71) as u8 + 1),
        maker_exchange: RELAYERS[(i % RELAYERS.len() as u64) as usize],
        taker_exchange: RELAYERS[((i + 1) % RELAYERS.len() as u64) as usize],
        base_token: pair.base,
        quote_token: pair.quote,
        amount: U256::from(i % 1000 + 1),
        price_point: U256::from(2u64),
        taker_side: if i % 2 == 0 { TradeSide::Buy } else { TradeSide::Sell },
        created_at: 1_700_000_000 + (i as i64) * 7,
    }
}

fn populated_cache(trades: usize) -> TradeCache {
    let mut cache = TradeCache::new(TradeClassifier::default());
    for i in 0..trades as u64 {
        let trade = synthetic_trade(i);
        let quote = trade.amount * trade.price_point;
        cache.apply_trade(&trade, quote);
    }
    cache
}

fn apply_trades() {
    let _cache = populated_cache(10_000);
}

fn benchmark_cache_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    group.sample_size(10);

    group.bench_function("apply_10k_trades", |b| b.iter(apply_trades));

    let cache = populated_cache(10_000);
    let quote = Address::repeat_byte(0x20);
    group.bench_function("query_volume_full_scan", |b| {
        b.iter(|| cache.query_volume(Address::ZERO, Address::ZERO, &[], quote, 0, 0, 10))
    });
    group.bench_function("query_total_full_scan", |b| {
        b.iter(|| cache.query_total(Address::ZERO, &[], quote, 0, 0))
    });
    group.finish();
}

criterion_group!(benches, benchmark_cache_update);
criterion_main!(benches);
