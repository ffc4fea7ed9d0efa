//! src/config.rs
//!
//! 负责加载和解析配置文件与静态数据表。
//! 它将用户配置 (UserConfigRaw) 与命令行参数合并为 AppConfig，
//! 并把 data/ 下的地区与物种表整理为 SafariData，
//! 捕获率覆盖也在这里完成。

use crate::models::{
    AppConfig, LoadedRegion, RegionEntryRaw, SafariData, SpeciesRates, SpeciesTableRaw,
    UserConfigRaw,
};
use crate::utils;
use itertools::{EitherOrBoth, Itertools};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("无法读取 {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("无法解析 {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{table}: names 与 rates 长度不一致 (names {names}, rates {rates})")]
    LengthMismatch {
        table: String,
        names: usize,
        rates: usize,
    },
    #[error("{table}: 重复的宝可梦 {species}")]
    DuplicateSpecies { table: String, species: String },
    #[error("捕获率覆盖指向了未收录的地区: {0}")]
    UnknownOverrideRegion(String),
    #[error("地区 {region} 中不存在需要覆盖捕获率的宝可梦: {species}")]
    UnknownOverrideSpecies { region: String, species: String },
}

/// 命令行可覆盖的路径，None 表示使用默认值。
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
}

pub fn load_and_build_config(options: &LoadOptions) -> Result<(AppConfig, SafariData), DataError> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(|| manifest_dir.join("config.json"));
    let data_dir = options
        .data_dir
        .clone()
        .unwrap_or_else(|| manifest_dir.join("data"));

    let raw_config: UserConfigRaw = read_json(&config_path)?;
    let app_config = build_app_config(raw_config, data_dir, options.output_path.clone());

    let mut safari_data = load_safari_data(&app_config.data_dir)?;
    apply_catch_rate_overrides(&mut safari_data, &app_config.catch_rate_overrides)?;
    report_unknown_area_species(&safari_data);

    Ok((app_config, safari_data))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let text = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn build_app_config(
    raw_config: UserConfigRaw,
    data_dir: PathBuf,
    output_override: Option<PathBuf>,
) -> AppConfig {
    AppConfig {
        data_dir,
        output_path: output_override.unwrap_or(raw_config.output_path),
        pretty: raw_config.pretty,
        catch_rate_overrides: raw_config.catch_rate_overrides,
    }
}

/// 按 regions.json 的顺序加载所有地区及其物种表。
pub fn load_safari_data(data_dir: &Path) -> Result<SafariData, DataError> {
    let entries: Vec<RegionEntryRaw> = read_json(&data_dir.join("regions.json"))?;

    let mut regions = Vec::with_capacity(entries.len());
    for entry in entries {
        let loaded = match entry.region {
            Some(meta) => {
                let raw: SpeciesTableRaw = read_json(&data_dir.join(&meta.species_table))?;
                let species = parse_species_table(&meta.species_table, raw)?;
                info!(region = %entry.key, species = species.len(), "loaded species table");
                Some(LoadedRegion { meta, species })
            }
            None => {
                info!(region = %entry.key, "region has no data yet, emitting null");
                None
            }
        };
        regions.push((entry.key, loaded));
    }

    Ok(SafariData { regions })
}

/// 将两种磁盘格式统一为 SpeciesRates 列表。
pub fn parse_species_table(
    table: &str,
    raw: SpeciesTableRaw,
) -> Result<Vec<SpeciesRates>, DataError> {
    let species: Vec<SpeciesRates> = match raw {
        SpeciesTableRaw::DexTuples(rows) => rows
            .into_iter()
            .map(|(dex_number, name, catch_rate, flee_rate)| SpeciesRates {
                dex_number: Some(dex_number),
                name,
                catch_rate,
                flee_rate,
            })
            .collect(),
        SpeciesTableRaw::PairedRates { names, rates } => {
            let (name_count, rate_count) = (names.len(), rates.len());
            names
                .into_iter()
                .zip_longest(rates)
                .map(|pair| match pair {
                    // 注意顺序：rates 中是 [逃跑率, 捕获率]
                    EitherOrBoth::Both(name, (flee_rate, catch_rate)) => Ok(SpeciesRates {
                        dex_number: None,
                        name,
                        catch_rate,
                        flee_rate,
                    }),
                    _ => Err(DataError::LengthMismatch {
                        table: table.to_string(),
                        names: name_count,
                        rates: rate_count,
                    }),
                })
                .collect::<Result<_, _>>()?
        }
    };

    if let Some(duplicate) = species.iter().map(|s| s.name.as_str()).duplicates().next() {
        return Err(DataError::DuplicateSpecies {
            table: table.to_string(),
            species: duplicate.to_string(),
        });
    }

    Ok(species)
}

/// 用外部游戏中的实际数值替换参考数据里的捕获率。
pub fn apply_catch_rate_overrides(
    data: &mut SafariData,
    overrides: &HashMap<String, HashMap<String, u32>>,
) -> Result<(), DataError> {
    // 按键排序，保证报错和日志顺序稳定
    for (region_key, species_overrides) in overrides.iter().sorted_by_key(|(key, _)| *key) {
        let region = data
            .regions
            .iter_mut()
            .find(|(key, _)| key == region_key)
            .and_then(|(_, region)| region.as_mut())
            .ok_or_else(|| DataError::UnknownOverrideRegion(region_key.clone()))?;

        for (name, &catch_rate) in species_overrides.iter().sorted_by_key(|(name, _)| *name) {
            let entry = region
                .species
                .iter_mut()
                .find(|s| &s.name == name)
                .ok_or_else(|| DataError::UnknownOverrideSpecies {
                    region: region_key.clone(),
                    species: name.clone(),
                })?;
            info!(
                region = %region_key,
                species = %name,
                from = entry.catch_rate,
                to = catch_rate,
                "overriding catch rate"
            );
            entry.catch_rate = catch_rate;
        }
    }
    Ok(())
}

fn report_unknown_area_species(data: &SafariData) {
    for (key, region) in &data.regions {
        let Some(region) = region else { continue };
        let known: HashSet<&str> = region.species.iter().map(|s| s.name.as_str()).collect();
        for (area, species) in utils::find_unknown_area_species(&region.meta, &known) {
            warn!(region = %key, area, species, "area lists a species without catch data");
        }
    }
}
