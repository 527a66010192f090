use serde::{Deserialize, Serialize};
use std::env;
use std::net::IpAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub check_in: CheckInConfig,
    #[serde(default)]
    pub referral: ReferralConfig,
    #[serde(default)]
    pub lucky_draw: LuckyDrawConfig,
    #[serde(default = "default_global_milestones")]
    pub global_milestones: Vec<GlobalMilestone>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许的前端来源；为空时不限制
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// 反向代理地址；只有来自这些地址的连接才信任 X-Forwarded-For
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,
}

/// 身份令牌由 Discord OAuth 前端签发，这里只做校验
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GameConfig {
    /// 游戏服务器通过 X-Game-Secret 头携带；为空时领取接口全部拒绝
    #[serde(default)]
    pub claim_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub discord_ids: Vec<String>,
}

impl AdminConfig {
    pub fn is_admin(&self, identity: &str) -> bool {
        self.discord_ids.iter().any(|id| id == identity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    pub prune_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
            prune_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckInConfig {
    /// 服务器参考时区（相对 UTC 的分钟偏移），签到按该时区的日历日计算
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralConfig {
    pub code_prefix: String,
    pub max_referrals_per_ip: u64,
    #[serde(default)]
    pub milestones: Vec<ReferralMilestone>,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            code_prefix: "PR-".to_string(),
            max_referrals_per_ip: 3,
            milestones: default_referral_milestones(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferralMilestone {
    pub invite_threshold: i64,
    pub reward_id: String,
    pub reward_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalMilestone {
    pub registration_threshold: i64,
    pub reward_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl std::fmt::Display for RarityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RarityTier::Common => write!(f, "common"),
            RarityTier::Rare => write!(f, "rare"),
            RarityTier::Epic => write!(f, "epic"),
            RarityTier::Legendary => write!(f, "legendary"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardConfig {
    pub id: String,
    pub name: String,
    pub weight: f64,
    pub rarity: RarityTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuckyDrawConfig {
    pub rewards: Vec<RewardConfig>,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u64,
}

impl Default for LuckyDrawConfig {
    fn default() -> Self {
        Self {
            rewards: default_rewards(),
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_statement_timeout_secs() -> u64 {
    10
}

fn default_recent_limit() -> u64 {
    20
}

fn default_rewards() -> Vec<RewardConfig> {
    let reward = |id: &str, name: &str, weight: f64, rarity| RewardConfig {
        id: id.to_string(),
        name: name.to_string(),
        weight,
        rarity,
    };
    vec![
        reward("cash_5000", "$5,000 Cash", 60.0, RarityTier::Common),
        reward("repair_kit", "Repair Kit x3", 30.0, RarityTier::Rare),
        reward("vip_7d", "VIP 7 Days", 9.0, RarityTier::Epic),
        reward("supercar", "Supercar", 1.0, RarityTier::Legendary),
    ]
}

fn default_referral_milestones() -> Vec<ReferralMilestone> {
    let milestone = |count: i64, id: &str, name: &str| ReferralMilestone {
        invite_threshold: count,
        reward_id: id.to_string(),
        reward_name: name.to_string(),
    };
    vec![
        milestone(3, "referral_starter_pack", "Starter Pack"),
        milestone(10, "referral_bike", "Sport Bike"),
        milestone(25, "referral_vip_30d", "VIP 30 Days"),
    ]
}

fn default_global_milestones() -> Vec<GlobalMilestone> {
    let milestone = |count: i64, name: &str| GlobalMilestone {
        registration_threshold: count,
        reward_name: name.to_string(),
    };
    vec![
        milestone(1_000, "$10,000 Cash for everyone"),
        milestone(5_000, "Exclusive Outfit"),
        milestone(10_000, "Limited Vehicle"),
    ]
}

/// 占位密钥，必须通过配置文件或 JWT_SECRET 替换
const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str)
                    .map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 数据库 URL 在无配置文件时必须提供
                let database_url = env::var("DATABASE_URL")
                    .map_err(|_| "DATABASE_URL is not set and config.toml was not found")?;
                Config::with_database_url(database_url)
            }
            Err(e) => {
                return Err(format!("Cannot read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 仅指定数据库地址，其余使用默认值
    pub fn with_database_url(url: String) -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cors_origins: Vec::new(),
                trusted_proxies: Vec::new(),
            },
            database: DatabaseConfig {
                url,
                max_connections: 10,
                acquire_timeout_secs: default_acquire_timeout_secs(),
                statement_timeout_secs: default_statement_timeout_secs(),
            },
            jwt: JwtConfig {
                secret: DEFAULT_JWT_SECRET.to_string(),
            },
            game: GameConfig::default(),
            admin: AdminConfig::default(),
            rate_limit: RateLimitConfig::default(),
            check_in: CheckInConfig::default(),
            referral: ReferralConfig::default(),
            lucky_draw: LuckyDrawConfig::default(),
            global_milestones: default_global_milestones(),
        }
    }

    // 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.server.cors_origins = split_list(&v);
        }
        if let Ok(v) = env::var("TRUSTED_PROXIES") {
            self.server.trusted_proxies = split_list(&v)
                .iter()
                .filter_map(|ip| ip.parse().ok())
                .collect();
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("DB_STATEMENT_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            self.database.statement_timeout_secs = n;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("GAME_CLAIM_SECRET") {
            self.game.claim_secret = v;
        }
        if let Ok(v) = env::var("ADMIN_DISCORD_IDS") {
            self.admin.discord_ids = split_list(&v);
        }
        if let Ok(v) = env::var("RATE_LIMIT_MAX_REQUESTS")
            && let Ok(n) = v.parse()
        {
            self.rate_limit.max_requests = n;
        }
        if let Ok(v) = env::var("RATE_LIMIT_WINDOW_SECS")
            && let Ok(n) = v.parse()
        {
            self.rate_limit.window_secs = n;
        }
        if let Ok(v) = env::var("CHECK_IN_UTC_OFFSET_MINUTES")
            && let Ok(n) = v.parse()
        {
            self.check_in.utc_offset_minutes = n;
        }
        if let Ok(v) = env::var("REFERRAL_CODE_PREFIX") {
            self.referral.code_prefix = v;
        }
    }

    /// 校验密钥与奖品/里程碑配置，并把里程碑按阈值升序排列
    pub fn validate(&mut self) -> Result<(), String> {
        let secret = self.jwt.secret.trim();
        if secret.is_empty() || secret == DEFAULT_JWT_SECRET {
            return Err("jwt.secret must be set (config file or JWT_SECRET)".to_string());
        }
        if self.lucky_draw.rewards.is_empty() {
            return Err("lucky_draw.rewards must not be empty".to_string());
        }
        for r in &self.lucky_draw.rewards {
            if !r.weight.is_finite() || r.weight < 0.0 {
                return Err(format!("reward {} has an invalid weight {}", r.id, r.weight));
            }
        }
        let total: f64 = self.lucky_draw.rewards.iter().map(|r| r.weight).sum();
        if total <= 0.0 {
            return Err("total reward weight must be positive".to_string());
        }
        if self.referral.max_referrals_per_ip == 0 {
            return Err("referral.max_referrals_per_ip must be at least 1".to_string());
        }
        if self.rate_limit.max_requests == 0
            || self.rate_limit.window_secs == 0
            || self.rate_limit.prune_interval_secs == 0
        {
            return Err("rate_limit values must be positive".to_string());
        }
        // UTC-14:00 ~ UTC+14:00
        if self.check_in.utc_offset_minutes.abs() > 14 * 60 {
            return Err("check_in.utc_offset_minutes is out of range".to_string());
        }
        self.referral
            .milestones
            .sort_by_key(|m| m.invite_threshold);
        self.global_milestones
            .sort_by_key(|m| m.registration_threshold);
        Ok(())
    }
}
