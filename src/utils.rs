//! src/utils.rs
//!
//! 存放可复用的、无状态的工具函数。

use crate::models::RegionMeta;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;

/// 按插入顺序序列化为 JSON 对象的键值列表。
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, V)> {
        self.0.iter()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// 将概率转换为百分比并保留两位小数。
pub fn round_percent(probability: f64) -> f64 {
    (probability * 10000.0).round() / 100.0
}

/// 找出区域表中引用了、但捕获表里不存在的宝可梦，返回 (区域, 名称)。
pub fn find_unknown_area_species<'a>(
    meta: &'a RegionMeta,
    known: &HashSet<&str>,
) -> Vec<(&'a str, &'a str)> {
    let from_areas = meta.areas.iter().flat_map(|area| {
        area.pokemon
            .iter()
            .map(move |encounter| (area.name.as_str(), encounter.name.as_str()))
    });
    let from_rotation = meta
        .rotation_schedule
        .iter()
        .flat_map(|schedule| schedule.species.iter().map(|s| ("rotationSchedule", s.as_str())));

    from_areas
        .chain(from_rotation)
        .filter(|(_, species)| !known.contains(species))
        .collect()
}

/// 将字符串截断到指定的最大宽度，如果发生截断则添加"..."
pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        return s.to_string();
    }

    if max_width < 3 {
        return s.chars().take(max_width).collect();
    }

    format!("{}...", s.chars().take(max_width - 3).collect::<String>())
}
