//! # 示例应用程序
//!
//! 演示如何使用 Lorn Tweaks 按优先级解析特性开关与 Tweak 取值

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tweaks_abstractions::{ObserverId, TweakValue};
use tweaks_impl::{TweaksBootstrapper, TweaksSettings, TweaksStack};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Lorn Tweaks 示例应用")]
struct Args {
    /// 启动配置文件路径
    #[arg(short, long, default_value = "config/tweaks.toml")]
    config: PathBuf,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

/// 子命令
#[derive(Subcommand, Debug)]
enum Command {
    /// 查询 Tweak 取值
    Get { feature: String, variable: String },
    /// 写入本地覆盖
    Set {
        feature: String,
        variable: String,
        value: String,
    },
    /// 删除本地覆盖
    Delete { feature: String, variable: String },
    /// 查询特性是否启用
    Enabled { feature: String },
    /// 查询实验分组
    Variation { experiment: String },
    /// 列出所有提供者定义的特性
    List,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    info!("启动 Lorn Tweaks 示例应用");

    let settings = TweaksSettings::load(Some(args.config.as_path())).context("加载启动配置失败")?;
    let stack = TweaksBootstrapper::new(settings)
        .bootstrap()
        .context("组装 Tweak 配置栈失败")?;

    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notifications);
    let observer = ObserverId::of(&notifications);
    stack.coordinator.register_for_updates(observer, move || {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        info!("收到配置变更通知 (第 {} 次)", count);
    });

    let result = run(&stack, args.command);

    stack.coordinator.deregister(observer);
    info!(
        "应用已退出，共收到 {} 次变更通知",
        notifications.load(Ordering::SeqCst)
    );
    result
}

/// 执行子命令
fn run(stack: &TweaksStack, command: Command) -> anyhow::Result<()> {
    let coordinator = &stack.coordinator;

    match command {
        Command::Get { feature, variable } => match coordinator.tweak_with(&feature, &variable) {
            Some(tweak) => {
                let title = tweak.title.as_deref().unwrap_or(&tweak.identifier);
                println!("{feature}.{variable} = {} ({title})", tweak.value);
            }
            None => println!("{feature}.{variable} 未定义"),
        },
        Command::Set {
            feature,
            variable,
            value,
        } => {
            let Some(mutable) = coordinator.top_customizable_configuration() else {
                bail!("没有可写的配置提供者");
            };
            mutable.set_value(TweakValue::parse_lossy(&value), &feature, &variable)?;
            let resolved = coordinator
                .value_for_tweak(&feature, &variable)
                .map_or_else(|| "未定义".to_string(), |v| v.to_string());
            println!("{feature}.{variable} = {resolved}");
        }
        Command::Delete { feature, variable } => {
            let Some(mutable) = coordinator.top_customizable_configuration() else {
                bail!("没有可写的配置提供者");
            };
            mutable.delete_value(&feature, &variable)?;
            println!("已删除本地覆盖: {feature}.{variable}");
        }
        Command::Enabled { feature } => {
            println!("{feature}: {}", coordinator.is_feature_enabled(&feature));
        }
        Command::Variation { experiment } => match coordinator.active_variation(&experiment) {
            Some(variation) => println!("{experiment}: {variation}"),
            None => println!("{experiment}: 未分组"),
        },
        Command::List => {
            let features = coordinator.features();
            if features.is_empty() {
                println!("没有任何提供者定义 Tweak");
            }
            for (feature, variables) in features {
                println!("{feature}");
                for variable in variables {
                    let value = coordinator
                        .value_for_tweak(&feature, &variable)
                        .map_or_else(|| "未定义".to_string(), |v| v.to_string());
                    println!("  {variable} = {value}");
                }
            }
        }
    }

    Ok(())
}
