use crate::error::{EntryKind, ValidationError};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 去除首尾空白, 空名称报错
pub fn normalize_name(raw: &str, kind: EntryKind) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName(kind));
    }
    Ok(name.to_string())
}

/// 改名前的通用校验: 非空 / 与旧名不同
fn normalize_rename(old: &str, new: &str, kind: EntryKind) -> Result<String, ValidationError> {
    let new = normalize_name(new, kind)?;
    if new == old {
        return Err(ValidationError::Unchanged { kind, name: new });
    }
    Ok(new)
}

fn not_found(kind: EntryKind, name: &str) -> ValidationError {
    ValidationError::NotFound {
        kind,
        name: name.to_string(),
    }
}

fn duplicate(kind: EntryKind, name: &str) -> ValidationError {
    ValidationError::DuplicateName {
        kind,
        name: name.to_string(),
    }
}

/// 保持位置不变地替换 key
fn rename_key<V>(map: &mut IndexMap<String, V>, old: &str, new: String) {
    let entries = std::mem::take(map);
    *map = entries
        .into_iter()
        .map(|(k, v)| if k == old { (new.clone(), v) } else { (k, v) })
        .collect();
}

/// 代理人列表; 非字符串的项丢弃
fn agents_from_value(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => {
            let total = items.len();
            let agents: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    _ => None,
                })
                .collect();
            if agents.len() != total {
                tracing::warn!("Dropped {} malformed agent entries", total - agents.len());
            }
            agents
        }
        Value::Null => Vec::new(),
        other => {
            tracing::warn!("Agent list is not an array, using empty list: {}", other);
            Vec::new()
        }
    }
}

/// 区域表; 非对象时视为空
fn zones_from_value(value: Value) -> IndexMap<String, Vec<String>> {
    match value {
        Value::Object(zones) => zones
            .into_iter()
            .map(|(zone, agents)| (zone, agents_from_value(agents)))
            .collect(),
        Value::Null => IndexMap::new(),
        other => {
            tracing::warn!("Zone table is not an object, using empty table: {}", other);
            IndexMap::new()
        }
    }
}

/// 文件夹: 区域 -> 代理人列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Folder {
    pub zones: IndexMap<String, Vec<String>>,
}

impl Folder {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut fields) => Self {
                zones: fields.remove("zones").map(zones_from_value).unwrap_or_default(),
            },
            other => {
                tracing::warn!("Folder entry is malformed, using empty folder: {}", other);
                Self::default()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Folder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(Value::deserialize(deserializer)?))
    }
}

/// 文件夹 -> 区域 -> 代理人 三级目录 (持久化键 `invoiceFolders`)
///
/// 读取时逐项宽松解析: 单个文件夹/区域格式错误不影响其余条目,
/// 只有顶层不是对象时整个文档才算无法解析。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FolderTree {
    folders: IndexMap<String, Folder>,
}

impl<'de> Deserialize<'de> for FolderTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = IndexMap::<String, Value>::deserialize(deserializer)?;
        Ok(Self {
            folders: entries
                .into_iter()
                .map(|(name, folder)| (name, Folder::from_value(folder)))
                .collect(),
        })
    }
}

impl FolderTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folder_names(&self) -> Vec<String> {
        self.folders.keys().cloned().collect()
    }

    pub fn folder(&self, name: &str) -> Option<&Folder> {
        self.folders.get(name)
    }

    pub fn zone_names(&self, folder: &str) -> Vec<String> {
        self.folders
            .get(folder)
            .map(|f| f.zones.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn agents(&self, folder: &str, zone: &str) -> Vec<String> {
        self.folders
            .get(folder)
            .and_then(|f| f.zones.get(zone))
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains_folder(&self, folder: &str) -> bool {
        self.folders.contains_key(folder)
    }

    pub fn contains_zone(&self, folder: &str, zone: &str) -> bool {
        self.folders
            .get(folder)
            .map(|f| f.zones.contains_key(zone))
            .unwrap_or(false)
    }

    pub fn contains_agent(&self, folder: &str, zone: &str, agent: &str) -> bool {
        self.folders
            .get(folder)
            .and_then(|f| f.zones.get(zone))
            .map(|agents| agents.iter().any(|a| a == agent))
            .unwrap_or(false)
    }

    fn zones_mut(&mut self, folder: &str) -> Result<&mut IndexMap<String, Vec<String>>, ValidationError> {
        self.folders
            .get_mut(folder)
            .map(|f| &mut f.zones)
            .ok_or_else(|| not_found(EntryKind::Folder, folder))
    }

    fn agents_mut(&mut self, folder: &str, zone: &str) -> Result<&mut Vec<String>, ValidationError> {
        self.zones_mut(folder)?
            .get_mut(zone)
            .ok_or_else(|| not_found(EntryKind::Zone, zone))
    }

    /// 新建文件夹, 返回规范化后的名称
    pub fn add_folder(&mut self, name: &str) -> Result<String, ValidationError> {
        let name = normalize_name(name, EntryKind::Folder)?;
        if self.folders.contains_key(&name) {
            return Err(duplicate(EntryKind::Folder, &name));
        }
        self.folders.insert(name.clone(), Folder::default());
        Ok(name)
    }

    pub fn add_zone(&mut self, folder: &str, name: &str) -> Result<String, ValidationError> {
        let name = normalize_name(name, EntryKind::Zone)?;
        let zones = self.zones_mut(folder)?;
        if zones.contains_key(&name) {
            return Err(duplicate(EntryKind::Zone, &name));
        }
        zones.insert(name.clone(), Vec::new());
        Ok(name)
    }

    pub fn add_agent(&mut self, folder: &str, zone: &str, name: &str) -> Result<String, ValidationError> {
        let name = normalize_name(name, EntryKind::Agent)?;
        let agents = self.agents_mut(folder, zone)?;
        if agents.contains(&name) {
            return Err(duplicate(EntryKind::Agent, &name));
        }
        agents.push(name.clone());
        Ok(name)
    }

    pub fn rename_folder(&mut self, old: &str, new: &str) -> Result<String, ValidationError> {
        let new = normalize_rename(old, new, EntryKind::Folder)?;
        if !self.folders.contains_key(old) {
            return Err(not_found(EntryKind::Folder, old));
        }
        if self.folders.contains_key(&new) {
            return Err(duplicate(EntryKind::Folder, &new));
        }
        rename_key(&mut self.folders, old, new.clone());
        Ok(new)
    }

    pub fn rename_zone(&mut self, folder: &str, old: &str, new: &str) -> Result<String, ValidationError> {
        let new = normalize_rename(old, new, EntryKind::Zone)?;
        let zones = self.zones_mut(folder)?;
        if !zones.contains_key(old) {
            return Err(not_found(EntryKind::Zone, old));
        }
        if zones.contains_key(&new) {
            return Err(duplicate(EntryKind::Zone, &new));
        }
        rename_key(zones, old, new.clone());
        Ok(new)
    }

    pub fn rename_agent(
        &mut self,
        folder: &str,
        zone: &str,
        old: &str,
        new: &str,
    ) -> Result<String, ValidationError> {
        let new = normalize_rename(old, new, EntryKind::Agent)?;
        let agents = self.agents_mut(folder, zone)?;
        if agents.contains(&new) {
            return Err(duplicate(EntryKind::Agent, &new));
        }
        let slot = agents
            .iter_mut()
            .find(|a| a.as_str() == old)
            .ok_or_else(|| not_found(EntryKind::Agent, old))?;
        *slot = new.clone();
        Ok(new)
    }

    /// 删除文件夹 (连同其下所有区域和代理人)
    pub fn delete_folder(&mut self, name: &str) -> Result<Folder, ValidationError> {
        self.folders
            .shift_remove(name)
            .ok_or_else(|| not_found(EntryKind::Folder, name))
    }

    /// 删除区域 (连同其下代理人)
    pub fn delete_zone(&mut self, folder: &str, name: &str) -> Result<Vec<String>, ValidationError> {
        self.zones_mut(folder)?
            .shift_remove(name)
            .ok_or_else(|| not_found(EntryKind::Zone, name))
    }

    pub fn delete_agent(&mut self, folder: &str, zone: &str, name: &str) -> Result<(), ValidationError> {
        let agents = self.agents_mut(folder, zone)?;
        let index = agents
            .iter()
            .position(|a| a == name)
            .ok_or_else(|| not_found(EntryKind::Agent, name))?;
        agents.remove(index);
        Ok(())
    }

    /// 确保 folder/zone/agent 路径存在, 返回是否有新增
    pub fn ensure_path(&mut self, folder: &str, zone: &str, agent: &str) -> Result<bool, ValidationError> {
        let folder = normalize_name(folder, EntryKind::Folder)?;
        let zone = normalize_name(zone, EntryKind::Zone)?;
        let agent = normalize_name(agent, EntryKind::Agent)?;

        let mut changed = false;
        let entry = self.folders.entry(folder).or_insert_with(|| {
            changed = true;
            Folder::default()
        });
        let agents = entry.zones.entry(zone).or_insert_with(|| {
            changed = true;
            Vec::new()
        });
        if !agents.contains(&agent) {
            agents.push(agent);
            changed = true;
        }
        Ok(changed)
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

/// 客户类型列表 (持久化键 `customerTypes`), 区分大小写去重
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CustomerTypes(Vec<String>);

impl<'de> Deserialize<'de> for CustomerTypes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<Value>::deserialize(deserializer)?;
        Ok(Self(agents_from_value(Value::Array(items))))
    }
}

impl CustomerTypes {
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn add(&mut self, name: &str) -> Result<String, ValidationError> {
        let name = normalize_name(name, EntryKind::CustomerType)?;
        if self.contains(&name) {
            return Err(duplicate(EntryKind::CustomerType, &name));
        }
        self.0.push(name.clone());
        Ok(name)
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<String, ValidationError> {
        let new = normalize_rename(old, new, EntryKind::CustomerType)?;
        if self.contains(&new) {
            return Err(duplicate(EntryKind::CustomerType, &new));
        }
        let slot = self
            .0
            .iter_mut()
            .find(|n| n.as_str() == old)
            .ok_or_else(|| not_found(EntryKind::CustomerType, old))?;
        *slot = new.clone();
        Ok(new)
    }

    pub fn delete(&mut self, name: &str) -> Result<(), ValidationError> {
        let before = self.0.len();
        self.0.retain(|n| n != name);
        if self.0.len() == before {
            return Err(not_found(EntryKind::CustomerType, name));
        }
        Ok(())
    }
}

impl From<Vec<String>> for CustomerTypes {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

/// 旧版保存流程使用的平铺区域表 (持久化键 `zoneData`): 区域 -> 代理人
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ZoneData(IndexMap<String, Vec<String>>);

impl<'de> Deserialize<'de> for ZoneData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let zones = IndexMap::<String, Value>::deserialize(deserializer)?;
        Ok(Self(zones_from_value(Value::Object(zones.into_iter().collect()))))
    }
}

impl ZoneData {
    /// 内置默认区域 (未持久化时使用)
    pub fn builtin() -> Self {
        let defaults: [(&str, [&str; 2]); 5] = [
            ("المنطقة الأولى", ["أحمد محمود", "فاطمة حسن"]),
            ("المنطقة الثانية", ["محمد علي", "سارة أحمد"]),
            ("المنطقة الثالثة", ["علي خالد", "نور محمد"]),
            ("المنطقة الرابعة", ["هند أحمد", "ياسمين علي"]),
            ("المنطقة الخامسة", ["خالد محمود", "ليلى حسن"]),
        ];
        Self(
            defaults
                .iter()
                .map(|(zone, agents)| {
                    (zone.to_string(), agents.iter().map(|a| a.to_string()).collect())
                })
                .collect(),
        )
    }

    pub fn zone_names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn agents(&self, zone: &str) -> Vec<String> {
        self.0.get(zone).cloned().unwrap_or_default()
    }

    pub fn contains_zone(&self, zone: &str) -> bool {
        self.0.contains_key(zone)
    }

    /// 新区域, 以首个代理人初始化
    pub fn insert_zone(&mut self, zone: String, first_agent: String) {
        self.0.insert(zone, vec![first_agent]);
    }

    /// 代理人不存在时追加, 返回是否有修改
    pub fn push_agent(&mut self, zone: &str, agent: &str) -> bool {
        let agents = self.0.entry(zone.to_string()).or_default();
        if agents.iter().any(|a| a == agent) {
            return false;
        }
        agents.push(agent.to_string());
        true
    }
}
