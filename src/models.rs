//! src/models.rs
//!
//! 定义了程序中所有核心的数据结构。

use crate::utils::OrderedMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 能力等级（0-12），6 为未修正的基准值。
pub type Tier = u8;

/// 单回合结束后的概率质量分布。
/// 三者之和恒等于进入该回合时的 `p_continue`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundState {
    pub p_continue: f64,
    pub p_catch: f64,
    pub p_flee: f64,
}

/// 三种投掷策略，声明顺序即平局时的优先顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    BallsOnly,
    OneBait,
    OneMud,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::BallsOnly => write!(f, "只扔球"),
            Strategy::OneBait => write!(f, "先扔饵"),
            Strategy::OneMud => write!(f, "先扔泥"),
        }
    }
}

/// 单个宝可梦的最终捕获结果，概率均为保留两位小数的百分比。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchResult {
    pub catch_rate: u32,
    pub flee_rate: u32,
    pub balls_only_odds: f64,
    pub bait_odds: f64,
    pub mud_odds: f64,
    pub best_strategy: Strategy,
    pub best_odds: f64,
}

/// 解析后的一条物种数据。
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesRates {
    pub dex_number: Option<u16>,
    pub name: String,
    pub catch_rate: u32,
    pub flee_rate: u32,
}

/// 物种表在磁盘上的两种格式，按结构自动识别。
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SpeciesTableRaw {
    /// `[图鉴编号, 名称, 捕获率, 逃跑率]`
    DexTuples(Vec<(u16, String, u32, u32)>),
    /// 名称列表 + `[逃跑率, 捕获率]` 的平行列表
    PairedRates {
        names: Vec<String>,
        rates: Vec<(u32, u32)>,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EncounterType {
    Standard,
    Day,
    Night,
    Rotation,
    Water,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AreaEncounter {
    pub name: String,
    #[serde(rename = "type")]
    pub encounter_type: EncounterType,
}

/// 地区中的一个区域及其出现的宝可梦。
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Area {
    pub name: String,
    pub pokemon: Vec<AreaEncounter>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ZonePlacement {
    pub species: String,
    pub zone: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RotationDay {
    pub day: String,
    pub placements: Vec<ZonePlacement>,
}

/// 轮换宝可梦的一周日程，仅作展示用。
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RotationSchedule {
    pub description: String,
    pub species: Vec<String>,
    pub days: Vec<RotationDay>,
}

/// 代表 regions.json 中的一个地区条目。
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegionMeta {
    pub name: String,
    pub game: String,
    pub description: String,
    pub species_table: String,
    #[serde(default)]
    pub areas: Vec<Area>,
    #[serde(default)]
    pub rotation_schedule: Option<RotationSchedule>,
}

/// regions.json 的一行；`region` 为 null 表示尚未收录的地区。
#[derive(Debug, Deserialize)]
pub struct RegionEntryRaw {
    pub key: String,
    pub region: Option<RegionMeta>,
}

#[derive(Debug, Clone)]
pub struct LoadedRegion {
    pub meta: RegionMeta,
    pub species: Vec<SpeciesRates>,
}

/// 一个聚合所有静态数据的容器，按 regions.json 的顺序保存。
#[derive(Debug, Clone)]
pub struct SafariData {
    pub regions: Vec<(String, Option<LoadedRegion>)>,
}

fn default_pretty() -> bool { true }

/// 代表从 config.json 加载的原始用户输入。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UserConfigRaw {
    pub output_path: PathBuf,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
    #[serde(default)]
    pub catch_rate_overrides: HashMap<String, HashMap<String, u32>>,
}

/// 解析后，供程序内部使用的最终配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub output_path: PathBuf,
    pub pretty: bool,
    pub catch_rate_overrides: HashMap<String, HashMap<String, u32>>,
}

/// 输出 JSON 中的单个地区。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionOutput<'a> {
    pub name: &'a str,
    pub game: &'a str,
    pub description: &'a str,
    pub areas: &'a [Area],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_schedule: Option<&'a RotationSchedule>,
    pub catch_data: OrderedMap<CatchResult>,
}

/// 最终写入磁盘的查找表。
pub type LookupDocument<'a> = OrderedMap<Option<RegionOutput<'a>>>;
