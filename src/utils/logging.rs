/// 日志工具模块
///
/// 提供日志初始化以及批量导入过程的输出辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则按 `verbose` 选择 debug / info 级别。
/// 重复调用是安全的（测试中会多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(api_base_url: &str, import_file: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题目批量导入模式");
    info!("🌐 API 地址: {}", api_base_url);
    info!("📁 导入文件: {}", import_file);
    info!("{}", "=".repeat(60));
}

/// 记录导入开始信息
///
/// # 参数
/// - `pending`: 待导入数量
pub fn log_import_start(pending: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始导入，待提交题目 {} 个（全部并发提交）", pending);
    info!("{}", "=".repeat(60));
}

/// 记录导入完成信息
///
/// # 参数
/// - `success`: 成功数量
/// - `total`: 本次提交总数
pub fn log_import_complete(success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 本次导入完成: 成功 {}/{}", success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `pending`: 仍待导入数量
/// - `total`: 总数
pub fn print_final_stats(success: usize, pending: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 导入统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("⏳ 待重试: {}", pending);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
