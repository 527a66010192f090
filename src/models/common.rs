use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 失败响应中的 `error` 字段
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    /// 可原样重试（存储层暂时性故障 / 限流）
    pub retryable: bool,
}
