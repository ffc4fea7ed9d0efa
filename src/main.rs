//! src/main.rs
//!
//! 程序的主入口。
//! 负责加载数据、计算各地区狩猎地带的捕获概率、写出查找表，
//! 并按需打印概率报告和耗时。

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::LoadOptions;
use crate::models::{CatchResult, LookupDocument};

mod calculator;
mod config;
mod models;
mod utils;

#[derive(Debug, Parser)]
#[command(author, version, about = "生成狩猎地带捕获概率查找表")]
struct Cli {
    /// config.json 路径（默认为 crate 根目录下的 config.json）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 地区与物种表所在目录（默认为 data/）
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 输出文件路径，覆盖 config.json 中的 output_path
    #[arg(long)]
    out: Option<PathBuf>,

    /// 输出紧凑 JSON
    #[arg(long)]
    compact: bool,

    /// 打印每个地区的概率报告
    #[arg(long)]
    summary: bool,

    /// 打印指定宝可梦在各地区的详细结果
    #[arg(long)]
    species: Option<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // 1. 启动计时器
    let start_time = Instant::now();

    // 2. 加载配置和静态数据表
    let options = LoadOptions {
        config_path: cli.config,
        data_dir: cli.data_dir,
        output_path: cli.out,
    };
    let (app_config, safari_data) =
        config::load_and_build_config(&options).context("加载配置失败")?;

    // 3. 计算所有地区的捕获概率
    let lookup = calculator::build_lookup(&safari_data);

    if cli.summary {
        print_summary(&lookup);
    }
    if let Some(name) = &cli.species {
        print_species(&lookup, name);
    }

    // 4. 写出查找表
    let pretty = app_config.pretty && !cli.compact;
    write_lookup(&app_config.output_path, &lookup, pretty)?;

    // 5. 停止计时器并打印性能报告
    let duration = start_time.elapsed();
    println!("总计算耗时: {:.2?}", duration);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_lookup(path: &Path, lookup: &LookupDocument<'_>, pretty: bool) -> Result<()> {
    let serialized = if pretty {
        serde_json::to_string_pretty(lookup)
    } else {
        serde_json::to_string(lookup)
    };
    let mut json = serialized.context("序列化查找表失败")?;
    json.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("无法创建输出目录: {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("无法写入: {}", path.display()))?;

    info!(path = %path.display(), "wrote safari lookup");
    Ok(())
}

fn print_summary(lookup: &LookupDocument<'_>) {
    for (key, region) in lookup.iter() {
        let Some(region) = region else {
            println!("\n地区：{}（暂无数据）", key);
            continue;
        };
        println!("\n地区：{}（{}）", region.name, region.game);

        // 最难抓的排在前面
        let mut rows: Vec<&(String, CatchResult)> = region.catch_data.iter().collect();
        rows.sort_by(|a, b| a.1.best_odds.partial_cmp(&b.1.best_odds).unwrap_or(std::cmp::Ordering::Equal));

        println!("{:<20} | {:<5} | {:<5} | {:<10} | {:<10} | {:<10} | {}", "名称", "捕获", "逃跑", "只扔球", "先扔饵", "先扔泥", "最佳");
        println!("{:-<20}-+-{:-<7}-+-{:-<7}-+-{:-<12}-+-{:-<12}-+-{:-<12}-+-{:-<12}", "", "", "", "", "", "", "");

        for (name, result) in rows {
            println!(
                "{:<20} | {:>5} | {:>5} | {:>9.2}% | {:>9.2}% | {:>9.2}% | {}",
                utils::truncate_string(name, 18),
                result.catch_rate,
                result.flee_rate,
                result.balls_only_odds,
                result.bait_odds,
                result.mud_odds,
                result.best_strategy
            );
        }
    }
}

fn print_species(lookup: &LookupDocument<'_>, name: &str) {
    let mut found = false;
    for (key, region) in lookup.iter() {
        let Some(result) = region.as_ref().and_then(|r| r.catch_data.get(name)) else {
            continue;
        };
        found = true;
        println!("\n{} @ {}", name, key);
        println!("  捕获率 / 逃跑率: {} / {}", result.catch_rate, result.flee_rate);
        println!("  只扔球: {:.2}%", result.balls_only_odds);
        println!("  先扔饵: {:.2}%", result.bait_odds);
        println!("  先扔泥: {:.2}%", result.mud_odds);
        println!("  最佳策略: {}（{:.2}%）", result.best_strategy, result.best_odds);
    }
    if !found {
        println!("\n没有找到宝可梦: {}", name);
    }
}
