use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use paperlens::config::{AppConfig, DEFAULT_CONFIG_PATH};
use paperlens::feed::{DateRange, Feed, FeedFilter, FeedTab};
use paperlens::models::{Interaction, Paper, ProfileUpdate, User};
use paperlens::settings::{self, Frequency};
use paperlens::source::{self, fixture, DataSource};
use paperlens::utils::{logger, PaperLensError};
use paperlens::{ChatTranscript, Role, Session, SessionStore};

#[derive(Parser)]
#[command(name = "paperlens")]
#[command(about = "个性化论文推荐仪表盘", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// 生成默认配置文件
    Init,
    /// 登录并保存会话
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// 注册新账号
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        password: String,
    },
    /// 退出登录并清除本地会话
    Logout,
    /// 显示当前用户
    Whoami,
    /// 检查后端是否可用
    Health,
    /// 查看论文流
    Feed {
        /// all / recent / liked
        #[arg(short, long, default_value = "all")]
        tab: FeedTab,
        /// 在标题、作者、摘要中搜索
        #[arg(short, long)]
        query: Option<String>,
        /// 分类筛选，可重复
        #[arg(short, long)]
        category: Vec<String>,
        /// all / week / month / year
        #[arg(long, default_value = "all")]
        range: DateRange,
    },
    /// 喜欢一篇论文
    Like { id: String },
    /// 不喜欢一篇论文
    Dislike { id: String },
    /// 删除一篇论文
    Delete { id: String },
    /// 让后端重新爬取论文
    Refresh,
    /// 针对一篇论文提问
    Ask { paper_id: String, question: String },
    /// 针对一篇论文连续对话
    Chat { paper_id: String },
    /// 查看历史问答
    History {
        #[arg(long)]
        paper: Option<String>,
    },
    /// 查看或修改个人资料
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        institution: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
    /// 修改研究兴趣
    Interests {
        #[arg(long)]
        add: Vec<String>,
        #[arg(long)]
        remove: Vec<String>,
    },
    /// 修改 AI 回答偏好
    Preferences {
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        detail: Option<String>,
        #[arg(long)]
        citation: Option<String>,
    },
    /// 修改推送设置
    Notifications {
        #[arg(long, value_enum)]
        email: Option<Toggle>,
        #[arg(long, value_enum)]
        telegram: Option<Toggle>,
        /// instant / daily / weekly
        #[arg(long)]
        frequency: Option<Frequency>,
        #[arg(long)]
        telegram_chat_id: Option<String>,
        /// HH:MM
        #[arg(long)]
        digest_time: Option<String>,
    },
}

/// 启动时组装一次：配置、会话、数据源
struct Context {
    config: AppConfig,
    store: SessionStore,
    session: Session,
    source: Box<dyn DataSource>,
}

impl Context {
    fn load() -> Result<Self> {
        let config = AppConfig::load()?;
        let store = SessionStore::new(&config.session.path);
        let session = store.load()?;
        let source = source::connect(&config)?;
        Ok(Self {
            config,
            store,
            session,
            source,
        })
    }

    fn recent_days(&self) -> i64 {
        self.config.feed.recent_days
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();

    let cli = Cli::parse();

    let mut ctx = Context::load()?;
    info!("paperlens 启动，数据源: {}", ctx.source.name());

    match cli.command {
        Commands::Init => init_command().await?,
        Commands::Login { email, password } => login_command(&mut ctx, &email, &password).await?,
        Commands::Register { email, name, password } => {
            let user = ctx.source.register(&email, name.as_deref(), &password).await?;
            println!("已注册: {} (ID {})", user.email, user.id);
            println!("下一步: paperlens login --email {} --password ...", user.email);
        }
        Commands::Logout => logout_command(&mut ctx).await?,
        Commands::Whoami => {
            let user = ctx.source.current_user(&ctx.session).await?;
            print_user(&user);
        }
        Commands::Health => {
            let health = ctx.source.health().await?;
            println!("{}: {}", health.status, health.message);
        }
        Commands::Feed { tab, query, category, range } => {
            let filter = FeedFilter {
                tab,
                query,
                categories: category,
                date_range: range,
                recent_days: ctx.recent_days(),
            };
            feed_command(&ctx, &filter).await?;
        }
        Commands::Like { id } => interaction_command(&ctx, &id, Interaction::Like).await?,
        Commands::Dislike { id } => interaction_command(&ctx, &id, Interaction::Dislike).await?,
        Commands::Delete { id } => {
            ctx.source.delete_paper(&ctx.session, &id).await?;
            println!("已删除论文 {}", id);
        }
        Commands::Refresh => refresh_command(&ctx).await?,
        Commands::Ask { paper_id, question } => ask_command(&ctx, &paper_id, &question).await?,
        Commands::Chat { paper_id } => chat_command(&ctx, &paper_id).await?,
        Commands::History { paper } => {
            let history = ctx.source.chat_history(&ctx.session, paper.as_deref()).await?;
            if history.is_empty() {
                println!("没有历史问答");
            }
            for entry in history {
                println!(
                    "[{}] 论文 {}: {}",
                    entry.id,
                    entry.paper_id.as_deref().unwrap_or("-"),
                    entry.content
                );
            }
        }
        Commands::Profile { name, email, institution, bio } => {
            let update = ProfileUpdate { name, email, institution, bio };
            let user = if update.is_empty() {
                ctx.source.profile(&ctx.session).await?
            } else {
                ctx.source.update_profile(&ctx.session, &update).await?
            };
            print_user(&user);
        }
        Commands::Interests { add, remove } => interests_command(&ctx, &add, &remove).await?,
        Commands::Preferences { style, detail, citation } => {
            let mut preferences = ctx.source.profile(&ctx.session).await?.ai_preferences;
            if let Some(style) = style {
                preferences.response_style = style;
            }
            if let Some(detail) = detail {
                preferences.detail_level = detail;
            }
            if let Some(citation) = citation {
                preferences.citation_format = citation;
            }
            ctx.source.update_preferences(&ctx.session, &preferences).await?;
            println!(
                "AI 偏好已更新: 风格={} 详细程度={} 引用格式={}",
                preferences.response_style, preferences.detail_level, preferences.citation_format
            );
        }
        Commands::Notifications {
            email,
            telegram,
            frequency,
            telegram_chat_id,
            digest_time,
        } => {
            let mut preferences = ctx.source.profile(&ctx.session).await?.notification_preferences;
            if let Some(email) = email {
                preferences.email_enabled = email.enabled();
            }
            if let Some(telegram) = telegram {
                preferences.telegram_enabled = telegram.enabled();
            }
            if let Some(frequency) = frequency {
                preferences.frequency = frequency.as_str().to_string();
            }
            if let Some(chat_id) = telegram_chat_id {
                preferences.telegram_chat_id = Some(chat_id);
            }
            if let Some(time) = digest_time {
                preferences.digest_time = Some(settings::parse_digest_time(&time)?);
            }
            if preferences.telegram_enabled && preferences.telegram_chat_id.is_none() {
                warn!("已启用 Telegram 推送但未设置 chat id");
            }
            ctx.source.update_notifications(&ctx.session, &preferences).await?;
            println!(
                "推送设置已更新: 邮件={} Telegram={} 频率={}",
                preferences.email_enabled, preferences.telegram_enabled, preferences.frequency
            );
        }
    }

    Ok(())
}

async fn init_command() -> Result<()> {
    info!("初始化配置...");

    tokio::fs::create_dir_all("config").await?;

    let app_config = AppConfig::default();
    app_config.save(DEFAULT_CONFIG_PATH)?;
    info!("已生成配置文件: {}", DEFAULT_CONFIG_PATH);

    println!("✅ 初始化完成");
    println!("下一步:");
    println!("  1. 在 {} 中设置 [api] base_url，或设置环境变量 PAPERLENS_API_URL", DEFAULT_CONFIG_PATH);
    println!("  2. 运行 'paperlens login --email ... --password ...'");
    println!("  3. 运行 'paperlens feed' 查看推荐论文");
    Ok(())
}

async fn login_command(ctx: &mut Context, email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        bail!("邮箱和密码不能为空");
    }

    let login = ctx.source.login(email.trim(), password).await?;
    ctx.session = Session::new(login.token, login.id);
    ctx.store.save(&ctx.session)?;
    println!("✅ 已登录，用户ID: {}", ctx.session.require_user_id()?);
    Ok(())
}

async fn logout_command(ctx: &mut Context) -> Result<()> {
    if let Err(e) = ctx.source.logout(&ctx.session).await {
        warn!("后端退出登录失败，仍清除本地会话: {}", e);
    }
    ctx.session.logout();
    ctx.store.clear()?;
    println!("已退出登录");
    Ok(())
}

/// 加载失败时退回样例数据，未登录错误除外
async fn load_feed(ctx: &Context) -> Result<Feed> {
    match ctx.source.load_papers(&ctx.session).await {
        Ok(papers) => Ok(Feed::new(papers)),
        Err(PaperLensError::Unauthenticated) => Err(anyhow!(
            "未登录，请先运行 'paperlens login --email ... --password ...'"
        )),
        Err(e) => {
            warn!("加载论文失败，显示样例数据: {}", e);
            println!("⚠️ 无法从后端加载论文 ({})，以下为样例数据", e);
            println!();
            Ok(Feed::new(fixture::default_papers()))
        }
    }
}

async fn feed_command(ctx: &Context, filter: &FeedFilter) -> Result<()> {
    let feed = load_feed(ctx).await?;
    let visible = feed.visible(filter, chrono::Utc::now());

    println!("Today's Papers ({}/{})", visible.len(), feed.papers().len());
    println!();

    if visible.is_empty() {
        println!("No papers found matching your criteria.");
        return Ok(());
    }

    for paper in visible {
        print_paper_card(paper);
    }
    Ok(())
}

async fn interaction_command(ctx: &Context, paper_id: &str, interaction: Interaction) -> Result<()> {
    let mut feed = Feed::new(ctx.source.load_papers(&ctx.session).await?);
    let paper = feed
        .get(paper_id)
        .cloned()
        .ok_or_else(|| anyhow!("论文不存在: {}", paper_id))?;

    let ticket = feed.begin(paper_id);
    ctx.source
        .record_interaction(&ctx.session, &paper, interaction)
        .await?;
    if !feed.confirm_like(&ticket, interaction.is_like()) {
        warn!("点赞结果已过期，未更新本地状态: {}", paper_id);
    }

    let verb = if interaction.is_like() { "喜欢" } else { "不喜欢" };
    println!("已标记为{}: {}", verb, paper.title);
    println!();
    if let Some(updated) = feed.get(paper_id) {
        print_paper_card(updated);
    }
    Ok(())
}

async fn refresh_command(ctx: &Context) -> Result<()> {
    info!("请求后端重新爬取...");
    let report = match ctx.source.refresh_papers(&ctx.session).await {
        Ok(report) => report,
        Err(PaperLensError::Unauthenticated) => return Err(PaperLensError::Unauthenticated.into()),
        Err(e) => {
            warn!("刷新失败，重新加载当前论文: {}", e);
            let feed = load_feed(ctx).await?;
            println!("当前共 {} 篇论文", feed.papers().len());
            return Ok(());
        }
    };

    println!("{}", report.message);
    let feed = load_feed(ctx).await?;
    println!("当前共 {} 篇论文", feed.papers().len());
    Ok(())
}

async fn find_paper(ctx: &Context, paper_id: &str) -> Result<Paper> {
    let feed = load_feed(ctx).await?;
    feed.get(paper_id)
        .cloned()
        .ok_or_else(|| anyhow!("论文不存在: {}", paper_id))
}

async fn ask_command(ctx: &Context, paper_id: &str, question: &str) -> Result<()> {
    let paper = find_paper(ctx, paper_id).await?;
    let mut transcript = ChatTranscript::new(paper);
    let answer = transcript
        .ask(ctx.source.as_ref(), &ctx.session, question)
        .await?;
    print_answer(&answer.text, &answer.references);
    Ok(())
}

async fn chat_command(ctx: &Context, paper_id: &str) -> Result<()> {
    let paper = find_paper(ctx, paper_id).await?;
    let mut transcript = ChatTranscript::new(paper);

    if let Some(welcome) = transcript.messages().first() {
        println!("{}", welcome.text);
    }
    println!("(输入 exit 结束对话)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let answer = transcript
            .ask(ctx.source.as_ref(), &ctx.session, line)
            .await?;
        print_answer(&answer.text, &answer.references);
    }

    let asked = transcript
        .messages()
        .iter()
        .filter(|m| m.role == Role::User)
        .count();
    info!("对话结束，共 {} 个问题", asked);
    Ok(())
}

async fn interests_command(ctx: &Context, add: &[String], remove: &[String]) -> Result<()> {
    let mut interests = ctx.source.profile(&ctx.session).await?.research_interests;

    let mut changed = false;
    for name in add {
        changed |= settings::add_interest(&mut interests, name);
    }
    for name in remove {
        changed |= settings::remove_interest(&mut interests, name);
    }

    if changed {
        ctx.source.update_interests(&ctx.session, &interests).await?;
        println!("研究兴趣已更新");
    }
    println!("研究兴趣: {}", interests.join(", "));
    Ok(())
}

fn print_paper_card(paper: &Paper) {
    let marker = if paper.liked { "♥" } else { " " };
    println!("{} [{}] {}", marker, paper.id, paper.title);
    println!("    作者: {}", paper.authors.join(", "));
    if let Some(ref published) = paper.published {
        println!("    发布: {}", published);
    }
    if !paper.categories.is_empty() {
        println!("    分类: {}", paper.categories.join(", "));
    }
    if let Some(ref url) = paper.url {
        println!("    链接: {}", url);
    }
    if !paper.abstract_text.is_empty() {
        let preview: String = paper.abstract_text.chars().take(200).collect();
        let ellipsis = if paper.abstract_text.chars().count() > 200 { "..." } else { "" };
        println!("    {}{}", preview, ellipsis);
    }
    println!();
}

fn print_answer(text: &str, references: &[String]) {
    println!("{}", text);
    if !references.is_empty() {
        println!("  引用: {}", references.join(" · "));
    }
    println!();
}

fn print_user(user: &User) {
    println!("{} <{}> (ID {})", user.name, user.email, user.id);
    if let Some(ref institution) = user.institution {
        println!("  机构: {}", institution);
    }
    if let Some(ref bio) = user.bio {
        println!("  简介: {}", bio);
    }
    if !user.research_interests.is_empty() {
        println!("  研究兴趣: {}", user.research_interests.join(", "));
    }
}
