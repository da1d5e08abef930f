//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `THIRDLAYER__*` 覆盖
//! （双下划线表示嵌套，如 `THIRDLAYER__AGENT__CONFIDENCE_THRESHOLD=0.7`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub browser: BrowserSection,
    #[serde(default)]
    pub web: WebSection,
}

/// [app] 段：SQLite 数据库路径
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    /// 转移计数与操作日志的落盘位置，未设置时用 ./thirdlayer.db
    pub db_path: Option<PathBuf>,
}

impl AppSection {
    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| PathBuf::from("thirdlayer.db"))
    }
}

/// [agent] 段：决策阈值与自主执行参数
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// 执行门槛：置信度 >= 阈值才执行（边界取等号时执行）
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// 每次预测返回的候选数上限
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// 是否优先用二阶上下文（最近两步）预测
    #[serde(default = "default_use_second_order")]
    pub use_second_order: bool,
    /// 演练模式：决策照常，只是不真正执行、不写任何状态
    #[serde(default)]
    pub dry_run: bool,
    /// 两步之间的停顿（毫秒），给页面留出稳定时间
    #[serde(default = "default_step_pause_ms")]
    pub step_pause_ms: u64,
}

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_top_k() -> usize {
    5
}

fn default_use_second_order() -> bool {
    true
}

fn default_step_pause_ms() -> u64 {
    1000
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            top_k: default_top_k(),
            use_second_order: default_use_second_order(),
            dry_run: false,
            step_pause_ms: default_step_pause_ms(),
        }
    }
}

/// [browser] 段：Chrome 会话参数
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSection {
    /// 无头模式，调试时可关
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// 单个操作（导航、等待元素）的超时（毫秒）
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
    /// 校验探测选择器存在性的超时（毫秒），比操作超时短得多
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_headless() -> bool {
    true
}

fn default_action_timeout_ms() -> u64 {
    10_000
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            action_timeout_ms: default_action_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

/// [web] 段：只读指标端点
#[derive(Debug, Clone, Deserialize)]
pub struct WebSection {
    #[serde(default = "default_web_port")]
    pub port: u16,
}

fn default_web_port() -> u16 {
    8000
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            port: default_web_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            agent: AgentSection::default(),
            browser: BrowserSection::default(),
            web: WebSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 THIRDLAYER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 THIRDLAYER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(
                config::File::with_name(name).required(false),
            );
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("THIRDLAYER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
