use crate::entities::account_entity as accounts;
use crate::error::{AppError, AppResult};
use rand::Rng;
use regex::Regex;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_SUFFIX_LEN: usize = 6;
const MAX_INPUT_LEN: usize = 32;

/// 生成候选推荐码：固定前缀 + 6 位字母数字
pub fn generate_referral_code(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect();
    format!("{prefix}{suffix}")
}

/// 生成在当前库中不存在的推荐码
///
/// 查重只是建议性的：并发注册可能在查重和插入之间拿到同一个码，
/// 最终由 accounts.referral_code 的唯一索引兜底。
pub async fn generate_unique_referral_code<C>(db: &C, prefix: &str) -> AppResult<String>
where
    C: ConnectionTrait,
{
    loop {
        let code = generate_referral_code(prefix);

        let exists = accounts::Entity::find()
            .filter(accounts::Column::ReferralCode.eq(code.as_str()))
            .count(db)
            .await?;

        if exists == 0 {
            return Ok(code);
        }
    }
}

/// 规范化用户输入的推荐码；空串视为未填写
pub fn normalize_referral_input(input: Option<&str>) -> AppResult<Option<String>> {
    let Some(raw) = input else {
        return Ok(None);
    };
    let code = raw.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Ok(None);
    }

    let code_regex = Regex::new(r"^[A-Z0-9-]+$").unwrap();
    if code.len() > MAX_INPUT_LEN || !code_regex.is_match(&code) {
        return Err(AppError::ValidationError(
            "Referral code format is invalid".to_string(),
        ));
    }
    Ok(Some(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_referral_code_format() {
        let code = generate_referral_code("PR-");
        assert_eq!(code.len(), 3 + CODE_SUFFIX_LEN);
        assert!(code.starts_with("PR-"));
        assert!(
            code[3..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_normalize_referral_input() {
        assert_eq!(normalize_referral_input(None).unwrap(), None);
        assert_eq!(normalize_referral_input(Some("   ")).unwrap(), None);
        assert_eq!(
            normalize_referral_input(Some(" pr-ab12cd ")).unwrap(),
            Some("PR-AB12CD".to_string())
        );
        assert!(normalize_referral_input(Some("PR-AB 12")).is_err());
        assert!(normalize_referral_input(Some(&"A".repeat(40))).is_err());
    }
}
