//! Tweak 配置提供者抽象接口

use crate::tweak::{Tweak, TweakPriority, TweakValue};
use infrastructure_common::TweaksResult;
use std::collections::BTreeMap;

/// Tweak 配置提供者 trait
///
/// 定义从不同数据源（打包默认值、远程实验、本地覆盖）读取 Tweak 的统一接口。
/// 所有查询方法只读取已驻留内存的数据，不阻塞、不返回错误；
/// 没有意见时返回 `false` / `None`。
pub trait TweaksProvider: Send + Sync {
    /// 获取提供者名称
    fn name(&self) -> &str;

    /// 获取提供者优先级，构造后不变
    fn priority(&self) -> TweakPriority;

    /// 特性是否被此提供者显式启用
    ///
    /// 没有意见与显式禁用都返回 `false`
    fn is_feature_enabled(&self, feature: &str) -> bool;

    /// 获取 (feature, variable) 对应的 Tweak
    fn tweak(&self, feature: &str, variable: &str) -> Option<Tweak>;

    /// 获取实验当前生效的分组名称
    fn active_variation(&self, experiment: &str) -> Option<String>;

    /// 列出此提供者定义的特性及其变量名称，变量名已排序
    fn features(&self) -> BTreeMap<String, Vec<String>> {
        BTreeMap::new()
    }

    /// 可写能力查询，只读提供者返回 `None`
    fn as_mutable(&self) -> Option<&dyn MutableTweaksProvider> {
        None
    }
}

/// 可写 Tweak 配置提供者 trait
///
/// 写入成功后实现者必须在写入完成后发布
/// [`TWEAKS_CONFIGURATION_DID_CHANGE`](crate::events::TWEAKS_CONFIGURATION_DID_CHANGE) 事件。
pub trait MutableTweaksProvider: TweaksProvider {
    /// 写入取值
    fn set_value(&self, value: TweakValue, feature: &str, variable: &str) -> TweaksResult<()>;

    /// 删除取值，不存在时为空操作
    fn delete_value(&self, feature: &str, variable: &str) -> TweaksResult<()>;
}
