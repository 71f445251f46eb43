//! Tweak 配置提供者实现

use infrastructure_common::{TweaksError, TweaksResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tweaks_abstractions::{
    MutableTweaksProvider, Tweak, TweakPriority, TweakValue, TweaksEventPublisher,
    TweaksProvider, TWEAKS_CONFIGURATION_DID_CHANGE,
};

/// 特性对象中表示启用状态的保留键
pub const FEATURE_ENABLED_KEY: &str = "Enabled";

/// JSON 文档中的单个 Tweak 定义
#[derive(Debug, Deserialize)]
struct TweakDefinition {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Group")]
    group: Option<String>,
    #[serde(rename = "Value")]
    value: TweakValue,
}

/// 已解析的特性
#[derive(Debug, Default)]
struct FeatureDefaults {
    enabled: bool,
    tweaks: HashMap<String, Tweak>,
}

/// JSON 默认值提供者
///
/// 只读，从打包的 JSON 文档加载默认值。文档格式：
///
/// ```json
/// {
///     "ui_customization": {
///         "Enabled": true,
///         "display_red_view": { "Title": "Display Red View", "Group": "UI", "Value": true }
///     }
/// }
/// ```
#[derive(Debug)]
pub struct JsonTweaksProvider {
    name: String,
    source: Option<PathBuf>,
    features: HashMap<String, FeatureDefaults>,
    priority: TweakPriority,
}

impl JsonTweaksProvider {
    /// 从 JSON 文件创建
    pub fn from_path<P: AsRef<Path>>(path: P) -> TweaksResult<Self> {
        let path = path.as_ref();
        debug!("加载 JSON 默认值文件: {}", path.display());

        if !path.exists() {
            return Err(TweaksError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let mut provider = Self::from_json_str(&content)?;
        provider.source = Some(path.to_path_buf());
        Ok(provider)
    }

    /// 从 JSON 文本创建
    pub fn from_json_str(content: &str) -> TweaksResult<Self> {
        let document: Value = serde_json::from_str(content)?;
        let features = Self::parse_document(document)?;

        info!("JSON 默认值加载完成: {} 个特性", features.len());
        Ok(Self {
            name: "JsonTweaksProvider".to_string(),
            source: None,
            features,
            priority: TweakPriority::DEFAULTS,
        })
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: TweakPriority) -> Self {
        self.priority = priority;
        self
    }

    /// 获取来源文件路径
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn parse_document(document: Value) -> TweaksResult<HashMap<String, FeatureDefaults>> {
        let Value::Object(root) = document else {
            return Err(TweaksError::invalid_document("顶层必须是对象"));
        };

        let mut features = HashMap::with_capacity(root.len());
        for (feature, body) in root {
            let Value::Object(entries) = body else {
                return Err(TweaksError::invalid_document(format!(
                    "特性 {feature} 必须是对象"
                )));
            };

            let mut defaults = FeatureDefaults::default();
            for (variable, definition) in entries {
                if variable == FEATURE_ENABLED_KEY {
                    defaults.enabled = definition.as_bool().ok_or_else(|| {
                        TweaksError::invalid_definition(&feature, &variable, "必须是布尔值")
                    })?;
                    continue;
                }

                let definition: TweakDefinition = serde_json::from_value(definition)
                    .map_err(|e| TweaksError::invalid_definition(&feature, &variable, e.to_string()))?;

                let tweak = Tweak {
                    identifier: variable.clone(),
                    title: definition.title,
                    group: definition.group,
                    value: definition.value,
                };
                defaults.tweaks.insert(variable, tweak);
            }
            features.insert(feature, defaults);
        }

        Ok(features)
    }
}

impl TweaksProvider for JsonTweaksProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> TweakPriority {
        self.priority
    }

    fn is_feature_enabled(&self, feature: &str) -> bool {
        self.features.get(feature).map_or(false, |f| f.enabled)
    }

    fn tweak(&self, feature: &str, variable: &str) -> Option<Tweak> {
        self.features.get(feature)?.tweaks.get(variable).cloned()
    }

    fn active_variation(&self, _experiment: &str) -> Option<String> {
        None
    }

    fn features(&self) -> BTreeMap<String, Vec<String>> {
        self.features
            .iter()
            .map(|(feature, defaults)| {
                let mut variables: Vec<String> = defaults.tweaks.keys().cloned().collect();
                variables.sort();
                (feature.clone(), variables)
            })
            .collect()
    }
}

/// 远程实验配置快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    /// 启用的特性
    #[serde(default)]
    pub enabled_features: BTreeSet<String>,
    /// 特性 -> 变量 -> 取值
    #[serde(default)]
    pub values: BTreeMap<String, BTreeMap<String, TweakValue>>,
    /// 实验 -> 分组
    #[serde(default)]
    pub variations: BTreeMap<String, String>,
}

impl RemoteSnapshot {
    /// 创建空快照
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加取值
    pub fn with_value(
        mut self,
        feature: impl Into<String>,
        variable: impl Into<String>,
        value: impl Into<TweakValue>,
    ) -> Self {
        self.values
            .entry(feature.into())
            .or_default()
            .insert(variable.into(), value.into());
        self
    }

    /// 启用特性
    pub fn with_enabled_feature(mut self, feature: impl Into<String>) -> Self {
        self.enabled_features.insert(feature.into());
        self
    }

    /// 设置实验分组
    pub fn with_variation(
        mut self,
        experiment: impl Into<String>,
        variation: impl Into<String>,
    ) -> Self {
        self.variations.insert(experiment.into(), variation.into());
        self
    }
}

/// 远程实验配置提供者
///
/// 只读，持有最近一次拉取到的远程快照。拉取过程不在此处实现，
/// 拉取方通过 [`RemoteTweaksProvider::apply_snapshot`] 整体替换快照。
pub struct RemoteTweaksProvider {
    name: String,
    snapshot: RwLock<RemoteSnapshot>,
    priority: TweakPriority,
    publisher: Arc<dyn TweaksEventPublisher>,
}

impl std::fmt::Debug for RemoteTweaksProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTweaksProvider")
            .field("name", &self.name)
            .field("snapshot", &*self.snapshot.read())
            .field("priority", &self.priority)
            .finish()
    }
}

impl RemoteTweaksProvider {
    /// 创建空快照的远程配置提供者
    pub fn new(publisher: Arc<dyn TweaksEventPublisher>) -> Self {
        Self {
            name: "RemoteTweaksProvider".to_string(),
            snapshot: RwLock::new(RemoteSnapshot::default()),
            priority: TweakPriority::REMOTE,
            publisher,
        }
    }

    /// 设置初始快照
    pub fn with_snapshot(self, snapshot: RemoteSnapshot) -> Self {
        *self.snapshot.write() = snapshot;
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: TweakPriority) -> Self {
        self.priority = priority;
        self
    }

    /// 替换远程快照并发布变更事件
    pub fn apply_snapshot(&self, snapshot: RemoteSnapshot) {
        {
            let mut current = self.snapshot.write();
            if *current == snapshot {
                debug!("远程快照未变化，跳过发布");
                return;
            }
            *current = snapshot;
        }

        info!("远程快照已更新");
        self.publisher.publish(TWEAKS_CONFIGURATION_DID_CHANGE);
    }

    /// 获取当前快照副本
    pub fn snapshot(&self) -> RemoteSnapshot {
        self.snapshot.read().clone()
    }
}

impl TweaksProvider for RemoteTweaksProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> TweakPriority {
        self.priority
    }

    fn is_feature_enabled(&self, feature: &str) -> bool {
        self.snapshot.read().enabled_features.contains(feature)
    }

    fn tweak(&self, feature: &str, variable: &str) -> Option<Tweak> {
        let snapshot = self.snapshot.read();
        let value = snapshot.values.get(feature)?.get(variable)?;
        Some(Tweak::new(variable, value.clone()))
    }

    fn active_variation(&self, experiment: &str) -> Option<String> {
        self.snapshot.read().variations.get(experiment).cloned()
    }

    fn features(&self) -> BTreeMap<String, Vec<String>> {
        variable_names(&self.snapshot.read().values)
    }
}

/// 特性 -> 变量 -> 取值 映射中的变量名称
fn variable_names(
    values: &BTreeMap<String, BTreeMap<String, TweakValue>>,
) -> BTreeMap<String, Vec<String>> {
    values
        .iter()
        .map(|(feature, variables)| (feature.clone(), variables.keys().cloned().collect()))
        .collect()
}

/// 本地覆盖存储内容
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LocalStore {
    /// 特性 -> 变量 -> 取值
    #[serde(default)]
    values: BTreeMap<String, BTreeMap<String, TweakValue>>,
    #[serde(default)]
    features: BTreeMap<String, bool>,
}

/// 本地用户覆盖提供者
///
/// 可写的两级存储，按特性、变量分别索引，任意字符串都可以作为标识。
/// 配置了持久化文件时，构造时加载已有内容，每次写入后整体重写文件；
/// 写文件失败时内存状态保持不变且不发布事件。
pub struct LocalTweaksProvider {
    name: String,
    store: RwLock<LocalStore>,
    persistence_path: Option<PathBuf>,
    priority: TweakPriority,
    publisher: Arc<dyn TweaksEventPublisher>,
}

impl std::fmt::Debug for LocalTweaksProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTweaksProvider")
            .field("name", &self.name)
            .field("values_count", &self.len())
            .field("persistence_path", &self.persistence_path)
            .field("priority", &self.priority)
            .finish()
    }
}

impl LocalTweaksProvider {
    /// 创建仅内存的本地覆盖提供者
    pub fn new(publisher: Arc<dyn TweaksEventPublisher>) -> Self {
        Self {
            name: "LocalTweaksProvider".to_string(),
            store: RwLock::new(LocalStore::default()),
            persistence_path: None,
            priority: TweakPriority::LOCAL,
            publisher,
        }
    }

    /// 创建带文件持久化的本地覆盖提供者
    pub fn with_persistence<P: AsRef<Path>>(
        publisher: Arc<dyn TweaksEventPublisher>,
        path: P,
    ) -> TweaksResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = if path.exists() {
            debug!("加载本地覆盖文件: {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            debug!("本地覆盖文件不存在，使用空存储: {}", path.display());
            LocalStore::default()
        };

        let mut provider = Self::new(publisher);
        provider.store = RwLock::new(store);
        provider.persistence_path = Some(path);
        Ok(provider)
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: TweakPriority) -> Self {
        self.priority = priority;
        self
    }

    /// 覆盖特性启用状态并发布变更事件
    pub fn set_feature_enabled(&self, feature: &str, enabled: bool) -> TweaksResult<()> {
        self.mutate(|store| store.features.insert(feature.to_string(), enabled) != Some(enabled))?;
        info!("本地覆盖特性状态: {} -> {}", feature, enabled);
        Ok(())
    }

    /// 获取已覆盖的取值数量
    pub fn len(&self) -> usize {
        self.store.read().values.values().map(BTreeMap::len).sum()
    }

    /// 是否没有任何覆盖取值
    pub fn is_empty(&self) -> bool {
        self.store.read().values.is_empty()
    }

    /// 修改存储，持久化成功后提交并在释放锁后发布事件
    ///
    /// `change` 返回 `false` 表示没有实际变化，此时不持久化也不发布
    fn mutate<F>(&self, change: F) -> TweaksResult<bool>
    where
        F: FnOnce(&mut LocalStore) -> bool,
    {
        {
            let mut store = self.store.write();
            let mut updated = store.clone();
            if !change(&mut updated) {
                return Ok(false);
            }
            self.persist(&updated)?;
            *store = updated;
        }

        self.publisher.publish(TWEAKS_CONFIGURATION_DID_CHANGE);
        Ok(true)
    }

    fn persist(&self, store: &LocalStore) -> TweaksResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(store)?;
        std::fs::write(path, content).map_err(|e| {
            error!("本地覆盖持久化失败: {}: {}", path.display(), e);
            TweaksError::persistence(path.display().to_string(), e)
        })
    }
}

impl TweaksProvider for LocalTweaksProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> TweakPriority {
        self.priority
    }

    fn is_feature_enabled(&self, feature: &str) -> bool {
        self.store.read().features.get(feature).copied().unwrap_or(false)
    }

    fn tweak(&self, feature: &str, variable: &str) -> Option<Tweak> {
        let value = self.store.read().values.get(feature)?.get(variable).cloned()?;
        Some(Tweak::new(variable, value))
    }

    fn active_variation(&self, _experiment: &str) -> Option<String> {
        None
    }

    fn features(&self) -> BTreeMap<String, Vec<String>> {
        variable_names(&self.store.read().values)
    }

    fn as_mutable(&self) -> Option<&dyn MutableTweaksProvider> {
        Some(self)
    }
}

impl MutableTweaksProvider for LocalTweaksProvider {
    fn set_value(&self, value: TweakValue, feature: &str, variable: &str) -> TweaksResult<()> {
        if !value.is_finite() {
            warn!("拒绝写入非有限浮点数: {}.{} = {}", feature, variable, value);
            return Err(TweaksError::invalid_definition(
                feature,
                variable,
                format!("浮点数必须是有限值: {value}"),
            ));
        }

        info!("本地覆盖 Tweak: {}.{} = {}", feature, variable, value);
        // 取值相同也发布，写入即视为一次变更
        self.mutate(|store| {
            store
                .values
                .entry(feature.to_string())
                .or_default()
                .insert(variable.to_string(), value);
            true
        })?;
        Ok(())
    }

    fn delete_value(&self, feature: &str, variable: &str) -> TweaksResult<()> {
        let removed = self.mutate(|store| {
            let Some(variables) = store.values.get_mut(feature) else {
                return false;
            };
            let removed = variables.remove(variable).is_some();
            if variables.is_empty() {
                store.values.remove(feature);
            }
            removed
        })?;

        if removed {
            info!("删除本地覆盖 Tweak: {}.{}", feature, variable);
        } else {
            warn!("本地覆盖 Tweak 不存在: {}.{}", feature, variable);
        }
        Ok(())
    }
}
