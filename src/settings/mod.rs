use std::str::FromStr;

use crate::utils::PaperLensError;

/// 添加研究兴趣；空白或重复（不区分大小写）时不添加
pub fn add_interest(interests: &mut Vec<String>, candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() || interests.iter().any(|i| i.eq_ignore_ascii_case(candidate)) {
        return false;
    }
    interests.push(candidate.to_string());
    true
}

pub fn remove_interest(interests: &mut Vec<String>, name: &str) -> bool {
    let before = interests.len();
    interests.retain(|i| !i.eq_ignore_ascii_case(name.trim()));
    interests.len() != before
}

/// 推送频率
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Instant,
    Daily,
    Weekly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Instant => "instant",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        }
    }
}

impl FromStr for Frequency {
    type Err = PaperLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instant" => Ok(Frequency::Instant),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            other => Err(PaperLensError::InvalidInput(format!("未知的推送频率: {}", other))),
        }
    }
}

/// `HH:MM`，24小时制
pub fn parse_digest_time(value: &str) -> Result<String, PaperLensError> {
    chrono::NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| PaperLensError::InvalidInput(format!("时间格式应为 HH:MM: {}", value)))
}
