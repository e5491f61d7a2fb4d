use crate::db::{documents, SharedStore};
use crate::error::{Result, ValidationError};
use crate::models::{CustomerTypes, Folder, FolderTree};

/// 文件夹/区域/代理人 以及客户类型的管理
///
/// 每次修改都是完整的 读取 -> 修改 -> 写回, 校验失败时不写入。
#[derive(Clone)]
pub struct TaxonomyStore {
    store: SharedStore,
}

impl TaxonomyStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn update_folders<T>(
        &self,
        action: &str,
        op: impl FnOnce(&mut FolderTree) -> Result<T, ValidationError>,
    ) -> Result<T> {
        let mut folders = documents::load_folders_for_update(self.store.as_ref())?;
        match op(&mut folders) {
            Ok(value) => {
                documents::save_folders(self.store.as_ref(), &folders)?;
                Ok(value)
            }
            Err(e) => {
                tracing::warn!("{} rejected: {}", action, e);
                Err(e.into())
            }
        }
    }

    fn update_customer_types<T>(
        &self,
        action: &str,
        op: impl FnOnce(&mut CustomerTypes) -> Result<T, ValidationError>,
    ) -> Result<T> {
        let mut types = documents::load_customer_types_for_update(self.store.as_ref())?;
        match op(&mut types) {
            Ok(value) => {
                documents::save_customer_types(self.store.as_ref(), &types)?;
                Ok(value)
            }
            Err(e) => {
                tracing::warn!("{} rejected: {}", action, e);
                Err(e.into())
            }
        }
    }

    // ---------- 查询 ----------

    pub fn folder_tree(&self) -> Result<FolderTree> {
        Ok(documents::load_folders(self.store.as_ref())?)
    }

    pub fn list_folders(&self) -> Result<Vec<String>> {
        Ok(self.folder_tree()?.folder_names())
    }

    pub fn list_zones(&self, folder: &str) -> Result<Vec<String>> {
        Ok(self.folder_tree()?.zone_names(folder))
    }

    pub fn list_agents(&self, folder: &str, zone: &str) -> Result<Vec<String>> {
        Ok(self.folder_tree()?.agents(folder, zone))
    }

    pub fn list_customer_types(&self) -> Result<Vec<String>> {
        Ok(documents::load_customer_types(self.store.as_ref())?.names().to_vec())
    }

    // ---------- 文件夹 ----------

    pub fn add_folder(&self, name: &str) -> Result<String> {
        let name = self.update_folders("add folder", |tree| tree.add_folder(name))?;
        tracing::info!("Folder created: {}", name);
        Ok(name)
    }

    pub fn rename_folder(&self, old: &str, new: &str) -> Result<String> {
        let name = self.update_folders("rename folder", |tree| tree.rename_folder(old, new))?;
        tracing::info!("Folder renamed: {} -> {}", old, name);
        Ok(name)
    }

    /// 删除文件夹, 级联删除其下区域和代理人
    pub fn delete_folder(&self, name: &str) -> Result<Folder> {
        let removed = self.update_folders("delete folder", |tree| tree.delete_folder(name))?;
        tracing::info!("Folder deleted: {} ({} zones)", name, removed.zones.len());
        Ok(removed)
    }

    // ---------- 区域 ----------

    pub fn add_zone(&self, folder: &str, name: &str) -> Result<String> {
        let name = self.update_folders("add zone", |tree| tree.add_zone(folder, name))?;
        tracing::info!("Zone created: {}/{}", folder, name);
        Ok(name)
    }

    pub fn rename_zone(&self, folder: &str, old: &str, new: &str) -> Result<String> {
        let name = self.update_folders("rename zone", |tree| tree.rename_zone(folder, old, new))?;
        tracing::info!("Zone renamed: {}/{} -> {}", folder, old, name);
        Ok(name)
    }

    pub fn delete_zone(&self, folder: &str, name: &str) -> Result<Vec<String>> {
        let agents = self.update_folders("delete zone", |tree| tree.delete_zone(folder, name))?;
        tracing::info!("Zone deleted: {}/{} ({} agents)", folder, name, agents.len());
        Ok(agents)
    }

    // ---------- 代理人 ----------

    pub fn add_agent(&self, folder: &str, zone: &str, name: &str) -> Result<String> {
        let name = self.update_folders("add agent", |tree| tree.add_agent(folder, zone, name))?;
        tracing::info!("Agent created: {}/{}/{}", folder, zone, name);
        Ok(name)
    }

    pub fn rename_agent(&self, folder: &str, zone: &str, old: &str, new: &str) -> Result<String> {
        let name = self.update_folders("rename agent", |tree| tree.rename_agent(folder, zone, old, new))?;
        tracing::info!("Agent renamed: {}/{}/{} -> {}", folder, zone, old, name);
        Ok(name)
    }

    pub fn delete_agent(&self, folder: &str, zone: &str, name: &str) -> Result<()> {
        self.update_folders("delete agent", |tree| tree.delete_agent(folder, zone, name))?;
        tracing::info!("Agent deleted: {}/{}/{}", folder, zone, name);
        Ok(())
    }

    // ---------- 客户类型 ----------

    pub fn add_customer_type(&self, name: &str) -> Result<String> {
        let name = self.update_customer_types("add customer type", |types| types.add(name))?;
        tracing::info!("Customer type created: {}", name);
        Ok(name)
    }

    pub fn rename_customer_type(&self, old: &str, new: &str) -> Result<String> {
        let name = self.update_customer_types("rename customer type", |types| types.rename(old, new))?;
        tracing::info!("Customer type renamed: {} -> {}", old, name);
        Ok(name)
    }

    pub fn delete_customer_type(&self, name: &str) -> Result<()> {
        self.update_customer_types("delete customer type", |types| types.delete(name))?;
        tracing::info!("Customer type deleted: {}", name);
        Ok(())
    }

    /// 保存时登记新出现的名称 (已存在则不写入)
    pub fn register_assignment(&self, folder: &str, zone: &str, agent: &str, customer_type: &str) -> Result<()> {
        let mut folders = documents::load_folders_for_update(self.store.as_ref())?;
        if folders.ensure_path(folder, zone, agent)? {
            documents::save_folders(self.store.as_ref(), &folders)?;
            tracing::info!("Registered {}/{}/{}", folder, zone, agent);
        }

        let mut types = documents::load_customer_types_for_update(self.store.as_ref())?;
        let customer_type = customer_type.trim();
        if !customer_type.is_empty() && !types.contains(customer_type) {
            types.add(customer_type)?;
            documents::save_customer_types(self.store.as_ref(), &types)?;
            tracing::info!("Registered customer type {}", customer_type);
        }
        Ok(())
    }
}
