//! 论文流的本地筛选与状态维护

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::str::FromStr;

use crate::models::Paper;
use crate::utils::PaperLensError;

pub const DEFAULT_RECENT_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedTab {
    #[default]
    All,
    Recent,
    Liked,
}

impl FromStr for FeedTab {
    type Err = PaperLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FeedTab::All),
            "recent" => Ok(FeedTab::Recent),
            "liked" => Ok(FeedTab::Liked),
            other => Err(PaperLensError::InvalidInput(format!("未知的筛选标签: {}", other))),
        }
    }
}

/// 搜索栏的时间范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    All,
    Week,
    Month,
    Year,
}

impl DateRange {
    fn window(self) -> Option<Duration> {
        match self {
            DateRange::All => None,
            DateRange::Week => Some(Duration::days(7)),
            DateRange::Month => Some(Duration::days(30)),
            DateRange::Year => Some(Duration::days(365)),
        }
    }
}

impl FromStr for DateRange {
    type Err = PaperLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(DateRange::All),
            "week" => Ok(DateRange::Week),
            "month" => Ok(DateRange::Month),
            "year" => Ok(DateRange::Year),
            other => Err(PaperLensError::InvalidInput(format!("未知的时间范围: {}", other))),
        }
    }
}

/// 各条件之间是“与”的关系
#[derive(Debug, Clone)]
pub struct FeedFilter {
    pub tab: FeedTab,
    pub query: Option<String>,
    pub categories: Vec<String>,
    pub date_range: DateRange,
    pub recent_days: i64,
}

impl Default for FeedFilter {
    fn default() -> Self {
        Self {
            tab: FeedTab::All,
            query: None,
            categories: Vec::new(),
            date_range: DateRange::All,
            recent_days: DEFAULT_RECENT_DAYS,
        }
    }
}

impl FeedFilter {
    pub fn tab(tab: FeedTab) -> Self {
        Self {
            tab,
            ..Self::default()
        }
    }

    /// 保持输入顺序
    pub fn apply<'a>(&self, papers: &'a [Paper], now: DateTime<Utc>) -> Vec<&'a Paper> {
        papers.iter().filter(|p| self.matches(p, now)).collect()
    }

    pub fn matches(&self, paper: &Paper, now: DateTime<Utc>) -> bool {
        let tab_ok = match self.tab {
            FeedTab::All => true,
            FeedTab::Liked => paper.liked,
            FeedTab::Recent => published_within(paper, now, Duration::days(self.recent_days)),
        };

        tab_ok
            && self.matches_query(paper)
            && self.matches_categories(paper)
            && self
                .date_range
                .window()
                .map_or(true, |window| published_within(paper, now, window))
    }

    fn matches_query(&self, paper: &Paper) -> bool {
        let query = match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.to_lowercase(),
            _ => return true,
        };

        paper.title.to_lowercase().contains(&query)
            || paper.authors.iter().any(|a| a.to_lowercase().contains(&query))
            || paper.abstract_text.to_lowercase().contains(&query)
    }

    /// 选中的分类与论文分类互为子串即算匹配
    fn matches_categories(&self, paper: &Paper) -> bool {
        if self.categories.is_empty() {
            return true;
        }

        self.categories.iter().any(|selected| {
            let selected = selected.to_lowercase();
            paper.categories.iter().any(|category| {
                let category = category.to_lowercase();
                category.contains(&selected) || selected.contains(&category)
            })
        })
    }
}

/// 严格晚于 `now - window`；日期无法解析的论文不算在内
fn published_within(paper: &Paper, now: DateTime<Utc>, window: Duration) -> bool {
    paper
        .published_at()
        .map_or(false, |published| published > now - window)
}

/// 已发出的点赞请求凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    paper_id: String,
    seq: u64,
}

impl Ticket {
    pub fn paper_id(&self) -> &str {
        &self.paper_id
    }
}

/// 当前拉取到的论文，以及按ID对账的本地状态
///
/// 同一篇论文的多次点赞按最后发出者为准：只有最新的 [`Ticket`]
/// 确认时才更新状态，较早请求的迟到响应会被丢弃。
#[derive(Debug, Default)]
pub struct Feed {
    papers: Vec<Paper>,
    next_seq: u64,
    latest: HashMap<String, u64>,
}

impl Feed {
    pub fn new(papers: Vec<Paper>) -> Self {
        Self {
            papers,
            ..Self::default()
        }
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn get(&self, paper_id: &str) -> Option<&Paper> {
        self.papers.iter().find(|p| p.id == paper_id)
    }

    pub fn replace(&mut self, papers: Vec<Paper>) {
        self.papers = papers;
        self.latest.clear();
    }

    pub fn visible(&self, filter: &FeedFilter, now: DateTime<Utc>) -> Vec<&Paper> {
        filter.apply(&self.papers, now)
    }

    pub fn set_liked(&mut self, paper_id: &str, liked: bool) -> bool {
        match self.papers.iter_mut().find(|p| p.id == paper_id) {
            Some(paper) => {
                paper.liked = liked;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, paper_id: &str) -> bool {
        let before = self.papers.len();
        self.papers.retain(|p| p.id != paper_id);
        self.latest.remove(paper_id);
        self.papers.len() != before
    }

    /// 发请求前领取凭据
    pub fn begin(&mut self, paper_id: &str) -> Ticket {
        self.next_seq += 1;
        self.latest.insert(paper_id.to_string(), self.next_seq);
        Ticket {
            paper_id: paper_id.to_string(),
            seq: self.next_seq,
        }
    }

    /// 请求成功后确认；凭据已过期时返回 false 且不修改状态
    pub fn confirm_like(&mut self, ticket: &Ticket, liked: bool) -> bool {
        if self.latest.get(&ticket.paper_id) != Some(&ticket.seq) {
            return false;
        }
        self.set_liked(&ticket.paper_id, liked)
    }
}
