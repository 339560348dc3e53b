/// 短 ID 字符集
pub const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";

pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    iter::repeat_with(|| ID_ALPHABET[rand::random_range(0..ID_ALPHABET.len())] as char)
        .take(length)
        .collect()
}

/// 拼接对外的短链接
pub fn short_url(base_url: &str, short_id: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), short_id)
}
