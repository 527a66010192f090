/// 常数时间比较共享密钥，避免逐字节提前返回泄露长度以外的信息
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// 校验游戏服务器携带的密钥；未配置密钥时一律拒绝
pub fn verify_shared_secret(configured: &str, provided: Option<&str>) -> bool {
    match provided {
        Some(p) if !configured.is_empty() => constant_time_eq(configured, p),
        _ => false,
    }
}
