//! Blueprint - 模拟器 actor 模板
//!
//! 蓝图在 spawn 前按需修改属性 (颜色、速度、图像尺寸等)。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 蓝图属性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintAttribute {
    /// 当前值
    pub value: String,

    /// 推荐值列表 (可为空)
    #[serde(default)]
    pub recommended_values: Vec<String>,

    /// 是否允许修改
    #[serde(default = "default_modifiable")]
    pub modifiable: bool,
}

fn default_modifiable() -> bool {
    true
}

impl BlueprintAttribute {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            recommended_values: Vec::new(),
            modifiable: true,
        }
    }

    /// 带推荐值的属性，当前值取第一个推荐值
    pub fn with_recommended<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let recommended_values: Vec<String> = values.into_iter().map(Into::into).collect();
        Self {
            value: recommended_values.first().cloned().unwrap_or_default(),
            recommended_values,
            modifiable: true,
        }
    }

    /// 不可修改的属性
    pub fn fixed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            recommended_values: Vec::new(),
            modifiable: false,
        }
    }
}

/// 蓝图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// 蓝图 ID (e.g., "vehicle.tesla.model3")
    pub id: String,

    /// 属性表
    #[serde(default)]
    pub attributes: BTreeMap<String, BlueprintAttribute>,
}

impl Blueprint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder 风格添加属性
    pub fn with_attribute(mut self, key: impl Into<String>, attribute: BlueprintAttribute) -> Self {
        self.attributes.insert(key.into(), attribute);
        self
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|a| a.value.as_str())
    }

    /// 推荐值列表，属性不存在时为空
    pub fn recommended_values(&self, key: &str) -> &[String] {
        self.attributes
            .get(key)
            .map(|a| a.recommended_values.as_slice())
            .unwrap_or(&[])
    }

    /// 设置属性值
    ///
    /// 不存在的属性会被新增；不可修改的属性返回 false。
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.attributes.get_mut(key) {
            Some(attribute) if !attribute.modifiable => false,
            Some(attribute) => {
                attribute.value = value.into();
                true
            }
            None => {
                self.attributes
                    .insert(key.to_string(), BlueprintAttribute::new(value));
                true
            }
        }
    }

    /// 通配符匹配 (仅支持 `*`)，与模拟器 `filter` 语义一致
    pub fn matches(&self, pattern: &str) -> bool {
        wildcard_match(pattern, &self.id)
    }

    /// 当前属性值快照
    pub fn attribute_values(&self) -> BTreeMap<String, String> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }
}

/// `*` 通配符匹配；不含 `*` 的模式按子串匹配
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return text.contains(pattern);
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = text;

    for (idx, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if idx == 0 {
            match rest.strip_prefix(part) {
                Some(stripped) => rest = stripped,
                None => return false,
            }
        } else if idx == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_semantics() {
        assert!(wildcard_match("vehicle.*", "vehicle.audi.a2"));
        assert!(wildcard_match("walker.pedestrian.*", "walker.pedestrian.0001"));
        assert!(!wildcard_match("walker.pedestrian.*", "vehicle.audi.a2"));
        assert!(wildcard_match("vehicle", "vehicle.audi.a2"));
        assert!(wildcard_match("*.a2", "vehicle.audi.a2"));
        assert!(!wildcard_match("*.tt", "vehicle.audi.a2"));
    }

    #[test]
    fn set_attribute_respects_modifiable() {
        let mut bp = Blueprint::new("vehicle.audi.a2")
            .with_attribute("number_of_wheels", BlueprintAttribute::fixed("4"))
            .with_attribute("color", BlueprintAttribute::with_recommended(["1,2,3", "4,5,6"]));

        assert_eq!(bp.attribute("color"), Some("1,2,3"));
        assert!(bp.set_attribute("color", "4,5,6"));
        assert_eq!(bp.attribute("color"), Some("4,5,6"));
        assert!(!bp.set_attribute("number_of_wheels", "2"));
        assert!(bp.set_attribute("role_name", "autopilot"));
        assert_eq!(bp.attribute("role_name"), Some("autopilot"));
    }

    #[test]
    fn recommended_values_missing_attribute() {
        let bp = Blueprint::new("walker.pedestrian.0001");
        assert!(bp.recommended_values("speed").is_empty());
    }
}
