use crate::db::{documents, SharedStore};
use crate::error::{EntryKind, Result, ValidationError};
use crate::models::ZoneData;
use serde::{Deserialize, Serialize};

/// 选择已有项或输入新名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Existing(String),
    Custom(String),
}

impl Choice {
    fn name(&self) -> &str {
        match self {
            Choice::Existing(name) | Choice::Custom(name) => name.trim(),
        }
    }

    fn is_custom(&self) -> bool {
        matches!(self, Choice::Custom(_))
    }
}

/// 旧版保存流程的结果, 交给调用方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAssignment {
    pub zone: String,
    pub agent: String,
    pub customer_type: String,
}

/// 旧版 (无文件夹) 区域/代理人目录, 持久化键 `zoneData`
#[derive(Clone)]
pub struct LegacyZoneDirectory {
    store: SharedStore,
}

impl LegacyZoneDirectory {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 未保存过时返回内置默认区域
    pub fn zone_data(&self) -> Result<ZoneData> {
        Ok(documents::load_zone_data(self.store.as_ref())?.unwrap_or_else(ZoneData::builtin))
    }

    pub fn zones(&self) -> Result<Vec<String>> {
        Ok(self.zone_data()?.zone_names())
    }

    pub fn agents(&self, zone: &str) -> Result<Vec<String>> {
        if zone.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.zone_data()?.agents(zone))
    }

    /// 确定区域和代理人; 自定义名称会登记到目录中
    pub fn resolve(&self, zone: &Choice, agent: &Choice, customer_type: &str) -> Result<LegacyAssignment> {
        let zone_name = zone.name();
        if zone_name.is_empty() {
            tracing::warn!("Legacy save rejected: empty zone");
            return Err(ValidationError::EmptyName(EntryKind::Zone).into());
        }
        let agent_name = agent.name();
        if agent_name.is_empty() {
            tracing::warn!("Legacy save rejected: empty agent");
            return Err(ValidationError::EmptyName(EntryKind::Agent).into());
        }

        let mut data = documents::load_zone_data_for_update(self.store.as_ref())?
            .unwrap_or_else(ZoneData::builtin);
        let mut changed = false;
        if zone.is_custom() && !data.contains_zone(zone_name) {
            data.insert_zone(zone_name.to_string(), agent_name.to_string());
            changed = true;
        }
        if agent.is_custom() {
            changed |= data.push_agent(zone_name, agent_name);
        }
        if changed {
            documents::save_zone_data(self.store.as_ref(), &data)?;
            tracing::info!("Legacy zone data updated: {}/{}", zone_name, agent_name);
        }

        Ok(LegacyAssignment {
            zone: zone_name.to_string(),
            agent: agent_name.to_string(),
            customer_type: customer_type.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{KeyValueStore, MemoryStore};
    use crate::error::InvoiceError;

    fn directory() -> LegacyZoneDirectory {
        LegacyZoneDirectory::new(MemoryStore::shared())
    }

    #[test]
    fn defaults_used_until_first_write() {
        let dir = directory();
        assert_eq!(dir.zones().unwrap().len(), 5);
        assert!(dir.agents("").unwrap().is_empty());
    }

    #[test]
    fn custom_zone_and_agent_are_persisted() {
        let dir = directory();
        let result = dir
            .resolve(&Choice::Custom("Giza".into()), &Choice::Custom("Omar".into()), "new")
            .unwrap();
        assert_eq!(result.zone, "Giza");
        assert_eq!(result.customer_type, "new");
        assert_eq!(dir.agents("Giza").unwrap(), vec!["Omar"]);
        assert_eq!(dir.zones().unwrap().len(), 6);

        dir.resolve(&Choice::Existing("Giza".into()), &Choice::Custom("Hana".into()), "regular")
            .unwrap();
        assert_eq!(dir.agents("Giza").unwrap(), vec!["Omar", "Hana"]);
    }

    #[test]
    fn existing_choices_do_not_write() {
        let store = MemoryStore::shared();
        let dir = LegacyZoneDirectory::new(store.clone());
        dir.resolve(
            &Choice::Existing("المنطقة الأولى".into()),
            &Choice::Existing("أحمد محمود".into()),
            "regular",
        )
        .unwrap();
        assert_eq!(store.get(documents::ZONE_DATA_KEY).unwrap(), None);
    }

    #[test]
    fn empty_zone_or_agent_rejected() {
        let dir = directory();
        let err = dir
            .resolve(&Choice::Custom(" ".into()), &Choice::Custom("Omar".into()), "regular")
            .unwrap_err();
        assert!(matches!(err, InvoiceError::Validation(ValidationError::EmptyName(EntryKind::Zone))));
        let err = dir
            .resolve(&Choice::Existing("Giza".into()), &Choice::Existing(String::new()), "regular")
            .unwrap_err();
        assert!(matches!(err, InvoiceError::Validation(ValidationError::EmptyName(EntryKind::Agent))));
    }
}
