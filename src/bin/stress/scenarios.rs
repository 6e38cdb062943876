// Stress scenarios -- reserve layouts and trade mixes replayed by the runner

// ─── Scenario Configuration ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReserveLayout {
    pub weight: u32,
    pub virtual_balance: bool,
    /// Starting balance in whole tokens (18 decimals).
    pub balance: u128,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub label: &'static str,
    pub reserves: Vec<ReserveLayout>,
    /// Starting governed supply in whole tokens (18 decimals).
    pub supply: u128,
    pub fee_ppm: u32,
    pub trades: usize,
    /// Largest single trade as basis points of the relevant pool.
    pub max_trade_bps: u32,
    /// Share of trades that buy and immediately sell back, in percent.
    pub round_trip_pct: u32,
    /// Disable purchases on the last reserve halfway through.
    pub freeze_last_reserve: bool,
}

pub const DECIMALS: u128 = 1_000_000_000_000_000_000;

fn reserve(weight: u32, balance: u128) -> ReserveLayout {
    ReserveLayout {
        weight,
        virtual_balance: false,
        balance,
    }
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "BALANCED_PAIR",
            label: "Two 50% reserves, 0.3% fee",
            reserves: vec![reserve(500_000, 1_000_000), reserve(500_000, 1_000_000)],
            supply: 2_000_000,
            fee_ppm: 3_000,
            trades: 500,
            max_trade_bps: 500,
            round_trip_pct: 20,
            freeze_last_reserve: false,
        },
        Scenario {
            name: "THIN_RESERVE",
            label: "Single 10% reserve, 0.1% fee",
            reserves: vec![reserve(100_000, 50_000)],
            supply: 10_000_000,
            fee_ppm: 1_000,
            trades: 500,
            max_trade_bps: 1_000,
            round_trip_pct: 30,
            freeze_last_reserve: false,
        },
        Scenario {
            name: "FULL_WEIGHT",
            label: "Single 100% reserve, no fee",
            reserves: vec![reserve(1_000_000, 1_000_000)],
            supply: 1_000_000,
            fee_ppm: 0,
            trades: 300,
            max_trade_bps: 2_000,
            round_trip_pct: 50,
            freeze_last_reserve: false,
        },
        Scenario {
            name: "VIRTUAL_MIX",
            label: "Virtual 30% reserve beside real 20% reserve",
            reserves: vec![
                ReserveLayout {
                    weight: 300_000,
                    virtual_balance: true,
                    balance: 3_000_000,
                },
                reserve(200_000, 400_000),
            ],
            supply: 5_000_000,
            fee_ppm: 2_500,
            trades: 500,
            max_trade_bps: 300,
            round_trip_pct: 10,
            freeze_last_reserve: false,
        },
        Scenario {
            name: "PURCHASE_FREEZE",
            label: "Three reserves, last one frozen mid-run",
            reserves: vec![
                reserve(400_000, 400_000),
                reserve(300_000, 300_000),
                reserve(300_000, 300_000),
            ],
            supply: 1_000_000,
            fee_ppm: 5_000,
            trades: 400,
            max_trade_bps: 400,
            round_trip_pct: 10,
            freeze_last_reserve: true,
        },
    ]
}
