//! src/calculator.rs
//!
//! 包含程序最核心的计算逻辑。
//! 使用确定性的逐回合模型计算狩猎地带中三种策略的捕获概率。

use crate::models::{
    CatchResult, LookupDocument, RegionOutput, RoundState, SafariData, SpeciesRates, Strategy,
    Tier,
};
use crate::utils::{self, OrderedMap};
use rayon::prelude::*;
use tracing::debug;

/// 每种策略模拟的回合数，剩余的概率质量视为失败。
pub const SAFARI_ROUNDS: usize = 30;

/// 未经修正的基准等级。
pub const BASELINE_TIER: Tier = 6;

/// 扔饵或扔泥之前，宝可梦在第一回合逃跑的判定等级。
pub const OPENING_FLEE_TIER: Tier = BASELINE_TIER;

/// 等级 0-12 对应的 (分子, 分母)。
const TIER_RATIOS: [(u32, u32); 13] = [
    (10, 40),
    (10, 35),
    (10, 30),
    (10, 25),
    (10, 20),
    (10, 15),
    (10, 10),
    (15, 10),
    (20, 10),
    (25, 10),
    (30, 10),
    (35, 10),
    (40, 10),
];

/// 扔饵/扔泥后分出的一个子群体。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch {
    pub share: f64,
    pub catch_tier: Tier,
    pub flee_tier: Tier,
}

/// 扔饵：两支共用等级 7 的捕获率，逃跑等级分别为 6 和 7。
pub const BAIT_BRANCHES: [Branch; 2] = [
    Branch { share: 0.1, catch_tier: 7, flee_tier: 6 },
    Branch { share: 0.9, catch_tier: 7, flee_tier: 7 },
];

/// 扔泥：两支共用等级 5 的逃跑率，捕获等级分别为 5 和 6。
pub const MUD_BRANCHES: [Branch; 2] = [
    Branch { share: 0.1, catch_tier: 5, flee_tier: 5 },
    Branch { share: 0.9, catch_tier: 6, flee_tier: 5 },
];

/// 按等级修正原始数值，每一步均为整数截断。等级越界时原样返回。
pub fn modified_rate(rate: u32, tier: Tier) -> u32 {
    match TIER_RATIOS.get(tier as usize) {
        Some(&(numerator, denominator)) => rate * numerator / denominator,
        None => rate,
    }
}

/// 单次投球的捕获概率。
///
/// 复现游戏内的定点数公式：狩猎球倍率 1.5、满血系数 1/3，
/// 之后是两层整数平方根。每一层的截断都必须保留，
/// 结果与实数域的直接计算并不相等。
pub fn catch_probability(rate: u32, tier: Tier) -> f64 {
    let a = modified_rate(rate, tier) * 15 / 10 / 3;
    if a >= 255 {
        return 1.0;
    }
    // 0xFF0000 / 0 在原公式中趋于无穷，b 随之为 0
    if a == 0 {
        return 0.0;
    }
    let b = 0xFFFF0 / (0xFF0000 / a).isqrt().isqrt();
    (b as f64 / 65536.0).powi(4)
}

/// 单回合的逃跑概率。
pub fn flee_probability(rate: u32, tier: Tier) -> f64 {
    ((modified_rate(rate, tier) + 1) as f64 / 255.0).min(1.0)
}

/// 推进一个回合：先判定捕获，未捕获的部分再判定逃跑。
pub fn apply_round(p_turn: f64, p_catch: f64, p_flee: f64) -> RoundState {
    let caught = p_catch * p_turn;
    let fled = (1.0 - p_catch) * p_turn * p_flee;
    RoundState {
        p_continue: p_turn - caught - fled,
        p_catch: caught,
        p_flee: fled,
    }
}

/// 从 `p_turn` 的质量出发连续扔球，返回累计捕获概率。
fn throw_balls(mut p_turn: f64, p_catch: f64, p_flee: f64) -> f64 {
    let mut total = 0.0;
    for _ in 0..SAFARI_ROUNDS {
        let round = apply_round(p_turn, p_catch, p_flee);
        total += round.p_catch;
        p_turn = round.p_continue;
    }
    total
}

/// 先扔一次饵或泥：扣除首回合逃跑的质量，再按分支分别扔球。
fn throw_assist_then_balls(catch_rate: u32, flee_rate: u32, branches: &[Branch]) -> f64 {
    let p_after_opening = 1.0 - flee_probability(flee_rate, OPENING_FLEE_TIER);
    branches
        .iter()
        .map(|branch| {
            throw_balls(
                p_after_opening * branch.share,
                catch_probability(catch_rate, branch.catch_tier),
                flee_probability(flee_rate, branch.flee_tier),
            )
        })
        .sum()
}

pub fn balls_only(catch_rate: u32, flee_rate: u32) -> f64 {
    throw_balls(
        1.0,
        catch_probability(catch_rate, BASELINE_TIER),
        flee_probability(flee_rate, BASELINE_TIER),
    )
}

pub fn one_bait(catch_rate: u32, flee_rate: u32) -> f64 {
    throw_assist_then_balls(catch_rate, flee_rate, &BAIT_BRANCHES)
}

pub fn one_mud(catch_rate: u32, flee_rate: u32) -> f64 {
    throw_assist_then_balls(catch_rate, flee_rate, &MUD_BRANCHES)
}

/// 计算三种策略的百分比概率，并选出最优策略。
/// 平局时按 只扔球 > 先扔饵 > 先扔泥 的顺序取第一个。
pub fn compute_catch_data(catch_rate: u32, flee_rate: u32) -> CatchResult {
    let balls_only_odds = utils::round_percent(balls_only(catch_rate, flee_rate));
    let bait_odds = utils::round_percent(one_bait(catch_rate, flee_rate));
    let mud_odds = utils::round_percent(one_mud(catch_rate, flee_rate));

    let best_odds = balls_only_odds.max(bait_odds).max(mud_odds);
    let best_strategy = if balls_only_odds == best_odds {
        Strategy::BallsOnly
    } else if bait_odds == best_odds {
        Strategy::OneBait
    } else {
        Strategy::OneMud
    };

    CatchResult {
        catch_rate,
        flee_rate,
        balls_only_odds,
        bait_odds,
        mud_odds,
        best_strategy,
        best_odds,
    }
}

/// 为一个地区的所有物种计算结果，保持原表顺序。
pub fn build_catch_table(species: &[SpeciesRates]) -> OrderedMap<CatchResult> {
    let rows = species
        .par_iter()
        .map(|entry| {
            let result = compute_catch_data(entry.catch_rate, entry.flee_rate);
            debug!(
                species = %entry.name,
                dex = ?entry.dex_number,
                best = %result.best_strategy,
                odds = result.best_odds,
                "computed catch data"
            );
            (entry.name.clone(), result)
        })
        .collect();
    OrderedMap(rows)
}

/// 组装最终输出的查找表，未收录的地区输出 null。
pub fn build_lookup(data: &SafariData) -> LookupDocument<'_> {
    let regions = data
        .regions
        .iter()
        .map(|(key, region)| {
            let output = region.as_ref().map(|loaded| RegionOutput {
                name: &loaded.meta.name,
                game: &loaded.meta.game,
                description: &loaded.meta.description,
                areas: &loaded.meta.areas,
                rotation_schedule: loaded.meta.rotation_schedule.as_ref(),
                catch_data: build_catch_table(&loaded.species),
            });
            (key.clone(), output)
        })
        .collect();
    OrderedMap(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoadedRegion, RegionMeta};

    #[test]
    fn baseline_tier_is_identity() {
        for rate in 0..=255 {
            assert_eq!(modified_rate(rate, BASELINE_TIER), rate);
        }
    }

    #[test]
    fn tier_table_truncates() {
        assert_eq!(modified_rate(100, 0), 25);
        assert_eq!(modified_rate(45, 5), 30);
        assert_eq!(modified_rate(45, 7), 67);
        assert_eq!(modified_rate(100, 12), 400);
        assert_eq!(modified_rate(3, 1), 0);
    }

    #[test]
    fn out_of_range_tier_returns_rate_unchanged() {
        assert_eq!(modified_rate(120, 13), 120);
        assert_eq!(modified_rate(120, 255), 120);
    }

    #[test]
    fn catch_probability_is_monotonic_in_tier() {
        for rate in 0..=255 {
            let mut previous = 0.0;
            for tier in 0..=12 {
                let p = catch_probability(rate, tier);
                assert!(p >= previous, "rate {rate}: tier {tier} gave {p} < {previous}");
                assert!((0.0..=1.0).contains(&p));
                previous = p;
            }
        }
    }

    #[test]
    fn catch_probability_is_guaranteed_from_a_of_255() {
        // 255 * 20 / 10 = 510, 510 * 15 / 10 / 3 = 255
        assert_eq!(catch_probability(255, 8), 1.0);
        assert_eq!(catch_probability(255, 12), 1.0);
        // 255 * 15 / 10 = 382, 382 * 15 / 10 / 3 = 191
        assert!(catch_probability(255, 7) < 1.0);
    }

    #[test]
    fn catch_probability_follows_nested_integer_roots() {
        // a = 127, 0xFF0000 / 127 = 131588, isqrt = 362, isqrt = 19, b = 55187
        let expected = (55187.0_f64 / 65536.0).powi(4);
        assert_eq!(catch_probability(255, BASELINE_TIER), expected);
        assert!((catch_probability(255, BASELINE_TIER) - 0.5028372264576114).abs() < 1e-12);
        assert!((catch_probability(3, BASELINE_TIER) - 0.0041591705588126015).abs() < 1e-12);
    }

    #[test]
    fn catch_probability_is_zero_when_a_truncates_to_zero() {
        assert_eq!(catch_probability(0, BASELINE_TIER), 0.0);
        assert_eq!(catch_probability(1, BASELINE_TIER), 0.0);
    }

    #[test]
    fn flee_probability_matches_closed_form() {
        assert_eq!(flee_probability(255, BASELINE_TIER), 1.0);
        assert_eq!(flee_probability(0, BASELINE_TIER), 1.0 / 255.0);
        assert!((flee_probability(0, BASELINE_TIER) - 0.0039).abs() < 1e-4);
        for rate in 0..=255 {
            let expected = ((rate + 1) as f64 / 255.0).min(1.0);
            assert_eq!(flee_probability(rate, BASELINE_TIER), expected);
        }
        // 等级 12 下 90 * 4 + 1 > 255
        assert_eq!(flee_probability(90, 12), 1.0);
    }

    #[test]
    fn apply_round_conserves_mass() {
        let round = apply_round(0.8, 0.25, 0.4);
        assert!((round.p_catch - 0.2).abs() < 1e-12);
        assert!((round.p_flee - 0.24).abs() < 1e-12);
        assert!((round.p_continue + round.p_catch + round.p_flee - 0.8).abs() < 1e-12);
    }

    #[test]
    fn branches_keep_their_tiers() {
        assert_eq!(BAIT_BRANCHES.iter().map(|b| b.share).sum::<f64>(), 1.0);
        assert_eq!(MUD_BRANCHES.iter().map(|b| b.share).sum::<f64>(), 1.0);
        assert!(BAIT_BRANCHES.iter().all(|b| b.catch_tier == 7));
        assert!(MUD_BRANCHES.iter().all(|b| b.flee_tier == 5));
    }

    #[test]
    fn common_species_odds_are_stable() {
        let result = compute_catch_data(255, 90);
        assert_eq!(result.balls_only_odds, 73.92);
        assert_eq!(result.bait_odds, 56.35);
        assert_eq!(result.mud_odds, 51.18);
        assert_eq!(result.best_strategy, Strategy::BallsOnly);
        assert_eq!(result.best_odds, 73.92);
        assert_eq!(compute_catch_data(255, 90), result);
    }

    #[test]
    fn legendary_tier_species_prefers_mud() {
        let result = compute_catch_data(3, 60);
        assert_eq!(result.balls_only_odds, 1.72);
        assert_eq!(result.bait_odds, 1.83);
        assert_eq!(result.mud_odds, 1.92);
        assert_eq!(result.best_strategy, Strategy::OneMud);
        assert!(result.best_odds < 5.0);
    }

    #[test]
    fn guaranteed_flee_leaves_only_first_throw() {
        // 首回合必逃：扔饵/扔泥没有任何机会
        let result = compute_catch_data(255, 255);
        assert_eq!(result.balls_only_odds, 50.28);
        assert_eq!(result.bait_odds, 0.0);
        assert_eq!(result.mud_odds, 0.0);
        assert_eq!(result.best_strategy, Strategy::BallsOnly);
    }

    #[test]
    fn ties_prefer_balls_only() {
        let result = compute_catch_data(0, 0);
        assert_eq!(result.best_odds, 0.0);
        assert_eq!(result.best_strategy, Strategy::BallsOnly);
    }

    #[test]
    fn best_odds_is_max_of_strategies() {
        for catch_rate in (0..=255).step_by(15) {
            for flee_rate in (0..=255).step_by(25) {
                let r = compute_catch_data(catch_rate, flee_rate);
                let max = r.balls_only_odds.max(r.bait_odds).max(r.mud_odds);
                assert_eq!(r.best_odds, max);
                assert!((0.0..=100.0).contains(&r.balls_only_odds));
                let expected = if r.balls_only_odds == max {
                    Strategy::BallsOnly
                } else if r.bait_odds == max {
                    Strategy::OneBait
                } else {
                    Strategy::OneMud
                };
                assert_eq!(r.best_strategy, expected);
            }
        }
    }

    #[test]
    fn catch_table_preserves_species_order() {
        let species = vec![
            SpeciesRates { dex_number: Some(129), name: "Magikarp".into(), catch_rate: 255, flee_rate: 25 },
            SpeciesRates { dex_number: Some(29), name: "Nidoran F".into(), catch_rate: 235, flee_rate: 50 },
            SpeciesRates { dex_number: Some(113), name: "Chansey".into(), catch_rate: 30, flee_rate: 125 },
        ];
        let table = build_catch_table(&species);
        let names: Vec<&str> = table.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["Magikarp", "Nidoran F", "Chansey"]);
        assert_eq!(table.get("Chansey"), Some(&compute_catch_data(30, 125)));
    }

    #[test]
    fn lookup_emits_null_placeholders() {
        let data = SafariData {
            regions: vec![
                (
                    "kanto".to_string(),
                    Some(LoadedRegion {
                        meta: RegionMeta {
                            name: "Kanto Safari Zone".into(),
                            game: "FireRed / LeafGreen".into(),
                            description: String::new(),
                            species_table: "kanto_species.json".into(),
                            areas: vec![],
                            rotation_schedule: None,
                        },
                        species: vec![SpeciesRates {
                            dex_number: Some(128),
                            name: "Tauros".into(),
                            catch_rate: 45,
                            flee_rate: 125,
                        }],
                    }),
                ),
                ("johto".to_string(), None),
            ],
        };
        let json = serde_json::to_value(build_lookup(&data)).unwrap();
        assert!(json["johto"].is_null());
        assert_eq!(json["kanto"]["catchData"]["Tauros"]["catchRate"], 45);
        assert_eq!(json["kanto"]["catchData"]["Tauros"]["bestStrategy"], "ballsOnly");
        assert!(json["kanto"].get("rotationSchedule").is_none());
    }
}
