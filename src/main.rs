use anyhow::{Context, Result};
use question_authoring::utils::logging;
use question_authoring::{AuthoringSession, Config, ImportHost};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 命令行下没有列表页，刷新只记一条日志
struct LogHost;

impl ImportHost for LogHost {
    fn reload_list(&self) {
        info!("🔄 待导入列表已清空，题目列表需要刷新");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = match std::env::var("QUESTION_CONFIG") {
        Ok(path) => Config::from_toml_file(Path::new(&path))
            .with_context(|| format!("无法加载配置文件: {}", path))?,
        Err(_) => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    let import_file = std::env::args()
        .nth(1)
        .or_else(|| config.import_file.clone())
        .map(PathBuf::from)
        .context("请在命令行或 IMPORT_FILE 中指定要导入的 JSON 文件")?;

    logging::log_startup(&config.api_base_url, &import_file.display().to_string());

    // 初始化会话
    let mut session = AuthoringSession::from_config(&config)?;
    session.init().await?;

    let mut importer = session.importer(Arc::new(LogHost));
    let total = importer.load_file(&import_file).await?;
    if total == 0 {
        warn!("⚠️ 导入文件中没有题目，程序结束");
        session.teardown();
        return Ok(());
    }

    match importer.import_all().await {
        Ok(report) => {
            if let Some(message) = &report.error {
                error!("❌ {}", message);
            }
            logging::print_final_stats(report.succeeded.len(), importer.pending_len(), total);
        }
        Err(e) => error!("❌ 导入失败: {}", e),
    }

    session.teardown();
    Ok(())
}
