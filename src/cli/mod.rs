use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::application::LedgerService;
use crate::domain::{
    EntryKind, GoalChanges, IncentiveKind, NewReminder, NewTransaction, ProfileChanges,
    Recurrence, TransactionChanges, TransactionFilter, UserId, format_cents, parse_cents,
};
use crate::settings::Settings;

/// Controla - personal finance ledger
#[derive(Parser)]
#[command(name = "controla")]
#[command(about = "Accounts, goals, incentives and balance-consistent money movements")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides the configured path)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Configuration file (TOML, defaults to controla.toml when present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// User the command acts for
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Student profile commands
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Transaction commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Move money between two of your accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Source account name
        #[arg(long)]
        from: String,

        /// Destination account name
        #[arg(long)]
        to: String,
    },

    /// Savings goal commands
    #[command(subcommand)]
    Goal(GoalCommands),

    /// Monthly stipend installments
    #[command(subcommand)]
    Stipend(StipendCommands),

    /// Completion and exam incentives
    #[command(subcommand)]
    Incentive(IncentiveCommands),

    /// Reminder commands
    #[command(subcommand)]
    Reminder(ReminderCommands),

    /// Notification commands
    #[command(subcommand)]
    Notification(NotificationCommands),

    /// Print the dashboard summary as JSON
    Dashboard {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Verify that account balances match the ledger
    Check,

    /// Recompute account balances from the ledger
    Rebuild,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a new user
    Create {
        /// Username (must be unique)
        username: String,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show your student profile
    Show,

    /// Update your student profile
    Update {
        /// Contact email (pass "" to clear)
        #[arg(long)]
        email: Option<String>,

        /// High-school grade (1-3)
        #[arg(long)]
        grade: Option<u8>,

        /// Whether high school is finished
        #[arg(long)]
        completed: Option<bool>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Account name (must be unique)
        name: String,

        /// Opening balance (e.g., "1000.00")
        #[arg(short, long, default_value = "0")]
        opening: String,
    },

    /// List accounts with their balances
    List,

    /// Rename an account or change its opening balance
    Update {
        /// Account name
        name: String,

        /// New name
        #[arg(long)]
        rename: Option<String>,

        /// New opening balance
        #[arg(short, long)]
        opening: Option<String>,
    },

    /// Delete an unused account
    Delete {
        /// Account name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a new category
    Create {
        /// Category name (must be unique)
        name: String,

        /// Kind: income, expense
        #[arg(short, long)]
        kind: String,
    },

    /// List categories
    List,

    /// Rename a category or change its kind
    Update {
        /// Category name
        name: String,

        /// New name
        #[arg(long)]
        rename: Option<String>,

        /// New kind: income, expense
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Delete an unused category
    Delete {
        /// Category name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction
    Add {
        /// Amount (e.g., "45.90")
        amount: String,

        /// Account name
        #[arg(short, long)]
        account: String,

        /// Category name
        #[arg(short, long)]
        category: String,

        /// Kind: income, expense (defaults to the category's kind)
        #[arg(short, long)]
        kind: Option<String>,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due_date: Option<String>,

        /// Mark as paid
        #[arg(long)]
        paid: bool,

        /// Number of installments
        #[arg(long, default_value = "1")]
        installments: i64,
    },

    /// Edit a transaction
    Edit {
        /// Transaction ID
        id: i64,

        /// New amount
        #[arg(long)]
        amount: Option<String>,

        /// New account name
        #[arg(short, long)]
        account: Option<String>,

        /// New category name
        #[arg(short, long)]
        category: Option<String>,

        /// New kind: income, expense
        #[arg(short, long)]
        kind: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due_date")]
        due_date: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due_date: bool,

        /// Paid flag (true/false)
        #[arg(long)]
        paid: Option<bool>,

        /// New number of installments
        #[arg(long)]
        installments: Option<i64>,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: i64,
    },

    /// List transactions, newest first
    List {
        /// Filter by account name
        #[arg(short, long)]
        account: Option<String>,

        /// Filter by category name
        #[arg(short, long)]
        category: Option<String>,

        /// Filter by kind: income, expense
        #[arg(short, long)]
        kind: Option<String>,

        /// Filter by paid flag (true/false)
        #[arg(long)]
        paid: Option<bool>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Show one transaction
    Show {
        /// Transaction ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Create a goal and its savings account
    Create {
        /// Goal name
        name: String,

        /// Target amount
        #[arg(short, long)]
        target: String,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<String>,
    },

    /// List goals with progress
    List,

    /// Update a goal
    Update {
        /// Goal ID
        id: i64,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New target amount
        #[arg(short, long)]
        target: Option<String>,

        /// New target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<String>,

        /// Active flag (true/false)
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a goal (its savings account is kept)
    Delete {
        /// Goal ID
        id: i64,
    },

    /// Deposit from the principal account into a goal
    Deposit {
        /// Goal ID
        id: i64,

        /// Amount to deposit
        amount: String,
    },

    /// Show progress towards a goal
    Progress {
        /// Goal ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum StipendCommands {
    /// Record the installment of a month as pending income
    Install {
        /// Month (1-12)
        #[arg(short, long)]
        month: u32,

        /// Year
        #[arg(short, long)]
        year: i32,

        /// Account name (defaults to the principal account)
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Confirm receipt of the pending installment of a month
    Confirm {
        /// Month (1-12)
        #[arg(short, long)]
        month: u32,

        /// Year
        #[arg(short, long)]
        year: i32,
    },
}

#[derive(Subcommand)]
pub enum IncentiveCommands {
    /// Grant the completion incentive of a year (pending until released)
    Completion {
        /// Year
        #[arg(short, long)]
        year: i32,

        /// Account name (defaults to the principal account)
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Release a pending completion incentive
    Release {
        /// Incentive ID
        id: i64,
    },

    /// Grant and pay the exam incentive
    Exam {
        /// Year
        #[arg(short, long)]
        year: Option<i32>,

        /// Account name (defaults to the principal account)
        #[arg(short, long)]
        account: Option<String>,
    },

    /// List incentives
    List {
        /// Filter by kind: completion, exam, stipend
        #[arg(short, long)]
        kind: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReminderCommands {
    /// Create a reminder
    Create {
        /// Title
        title: String,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Date to remind on (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Days before the linked transaction's due date
        #[arg(long, default_value = "0")]
        days_before: i64,

        /// Recurrence: none, daily, weekly, monthly, yearly
        #[arg(short, long, default_value = "none")]
        recurrence: String,

        /// Linked transaction ID
        #[arg(short, long)]
        transaction: Option<i64>,
    },

    /// List reminders
    List,

    /// Show reminders due today and unread notifications
    Today,

    /// Switch a reminder on or off
    Toggle {
        /// Reminder ID
        id: i64,
    },

    /// Delete a reminder
    Delete {
        /// Reminder ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// Create a notification
    Create {
        /// Message
        message: String,

        /// Linked transaction ID
        #[arg(short, long)]
        transaction: Option<i64>,

        /// Link
        #[arg(short, long)]
        link: Option<String>,
    },

    /// List notifications
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },

    /// Mark a notification as read
    Read {
        /// Notification ID
        id: i64,
    },

    /// Delete a notification
    Delete {
        /// Notification ID
        id: i64,
    },
}

impl Cli {
    pub async fn run(self, settings: Settings) -> Result<()> {
        let database = self
            .database
            .clone()
            .unwrap_or_else(|| settings.database.path.clone());

        if matches!(self.command, Commands::Init) {
            LedgerService::init(&database).await?;
            println!("Database initialized: {}", database);
            return Ok(());
        }

        let service = LedgerService::connect(&database)
            .await?
            .with_incentive_settings(settings.incentives);

        if let Commands::User(UserCommands::Create { username }) = &self.command {
            let user = service.create_user(username).await?;
            println!("Created user: {} ({})", user.username, user.id);
            return Ok(());
        }

        let owner = self.owner(&service).await?;

        match self.command {
            Commands::Init | Commands::User(_) => {}

            Commands::Profile(cmd) => run_profile_command(&service, owner, cmd).await?,

            Commands::Account(cmd) => run_account_command(&service, owner, cmd).await?,

            Commands::Category(cmd) => run_category_command(&service, owner, cmd).await?,

            Commands::Tx(cmd) => run_tx_command(&service, owner, cmd).await?,

            Commands::Transfer { amount, from, to } => {
                let amount_cents = parse_amount(&amount)?;
                let source = service.find_account(owner, &from).await?;
                let destination = service.find_account(owner, &to).await?;

                let result = service
                    .transfer(owner, source.id, destination.id, amount_cents)
                    .await?;

                println!(
                    "Transferred {} {} -> {}",
                    format_cents(amount_cents),
                    result.source.name,
                    result.destination.name
                );
                println!(
                    "  {:<20} {:>12}",
                    result.source.name,
                    format_cents(result.source.balance)
                );
                println!(
                    "  {:<20} {:>12}",
                    result.destination.name,
                    format_cents(result.destination.balance)
                );
            }

            Commands::Goal(cmd) => run_goal_command(&service, owner, cmd).await?,

            Commands::Stipend(cmd) => run_stipend_command(&service, owner, cmd).await?,

            Commands::Incentive(cmd) => run_incentive_command(&service, owner, cmd).await?,

            Commands::Reminder(cmd) => run_reminder_command(&service, owner, cmd).await?,

            Commands::Notification(cmd) => {
                run_notification_command(&service, owner, cmd).await?
            }

            Commands::Dashboard { from, to } => {
                let from = parse_optional_date(from.as_deref())?;
                let to = parse_optional_date(to.as_deref())?;
                let dashboard = service.dashboard(owner, from, to).await?;
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            }

            Commands::Check => run_check_command(&service, owner).await?,

            Commands::Rebuild => {
                let report = service.rebuild_balances(owner).await?;
                if report.is_healthy() {
                    println!("All {} balances already match the ledger.", report.account_count);
                } else {
                    for drift in &report.drifts {
                        println!(
                            "  {:<20} {:>12} -> {:>12}",
                            drift.account_name,
                            format_cents(drift.stored),
                            format_cents(drift.expected)
                        );
                    }
                    println!("Rebuilt {} balance(s).", report.drifts.len());
                }
            }
        }

        Ok(())
    }

    async fn owner(&self, service: &LedgerService) -> Result<UserId> {
        let username = self
            .user
            .as_deref()
            .ok_or_else(|| anyhow!("This command needs --user <name>"))?;
        Ok(service.find_user(username).await?.id)
    }
}

async fn run_profile_command(
    service: &LedgerService,
    owner: UserId,
    cmd: ProfileCommands,
) -> Result<()> {
    let profile = match cmd {
        ProfileCommands::Show => service.get_profile(owner).await?,
        ProfileCommands::Update {
            email,
            grade,
            completed,
        } => {
            let changes = ProfileChanges {
                email,
                grade,
                completed,
            };
            if changes.is_empty() {
                bail!("Nothing to update: pass --email, --grade or --completed");
            }
            let profile = service.update_profile(owner, changes).await?;
            println!("Updated student profile");
            profile
        }
    };

    println!(
        "{:<18} {}",
        "Email:",
        if profile.email.is_empty() {
            "-"
        } else {
            profile.email.as_str()
        }
    );
    println!("{:<18} {}", "Grade:", profile.grade);
    println!("{:<18} {}", "Registered:", profile.registration_year);
    println!(
        "{:<18} {}",
        "Completed:",
        if profile.completed { "yes" } else { "no" }
    );
    Ok(())
}

async fn run_account_command(
    service: &LedgerService,
    owner: UserId,
    cmd: AccountCommands,
) -> Result<()> {
    match cmd {
        AccountCommands::Create { name, opening } => {
            let opening = parse_amount(&opening)?;
            let account = service.create_account(owner, &name, opening).await?;
            println!(
                "Created account: {} (opening {})",
                account.name,
                format_cents(account.opening_balance)
            );
        }

        AccountCommands::List => {
            let accounts = service.list_accounts(owner).await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<6} {:<24} {:>12} {:>12}", "ID", "NAME", "OPENING", "BALANCE");
                println!("{}", "-".repeat(57));
                for account in accounts {
                    println!(
                        "{:<6} {:<24} {:>12} {:>12}",
                        account.id,
                        truncate(&account.name, 24),
                        format_cents(account.opening_balance),
                        format_cents(account.balance)
                    );
                }
            }
        }

        AccountCommands::Update {
            name,
            rename,
            opening,
        } => {
            let account = service.find_account(owner, &name).await?;
            let opening = opening.as_deref().map(parse_amount).transpose()?;
            let updated = service
                .update_account(owner, account.id, rename.as_deref(), opening)
                .await?;
            println!(
                "Updated account: {} (balance {})",
                updated.name,
                format_cents(updated.balance)
            );
        }

        AccountCommands::Delete { name } => {
            let account = service.find_account(owner, &name).await?;
            service.delete_account(owner, account.id).await?;
            println!("Deleted account: {}", name);
        }
    }
    Ok(())
}

async fn run_category_command(
    service: &LedgerService,
    owner: UserId,
    cmd: CategoryCommands,
) -> Result<()> {
    match cmd {
        CategoryCommands::Create { name, kind } => {
            let kind = parse_kind(&kind)?;
            let category = service.create_category(owner, &name, kind).await?;
            println!("Created category: {} ({})", category.name, category.kind);
        }

        CategoryCommands::List => {
            let categories = service.list_categories(owner).await?;
            if categories.is_empty() {
                println!("No categories found.");
            } else {
                println!("{:<6} {:<32} {:<8}", "ID", "NAME", "KIND");
                println!("{}", "-".repeat(48));
                for category in categories {
                    println!(
                        "{:<6} {:<32} {:<8}",
                        category.id,
                        truncate(&category.name, 32),
                        category.kind
                    );
                }
            }
        }

        CategoryCommands::Update { name, rename, kind } => {
            let category = service.find_category(owner, &name).await?;
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let updated = service
                .update_category(owner, category.id, rename.as_deref(), kind)
                .await?;
            println!("Updated category: {} ({})", updated.name, updated.kind);
        }

        CategoryCommands::Delete { name } => {
            let category = service.find_category(owner, &name).await?;
            service.delete_category(owner, category.id).await?;
            println!("Deleted category: {}", name);
        }
    }
    Ok(())
}

async fn run_tx_command(service: &LedgerService, owner: UserId, cmd: TxCommands) -> Result<()> {
    match cmd {
        TxCommands::Add {
            amount,
            account,
            category,
            kind,
            description,
            date,
            due_date,
            paid,
            installments,
        } => {
            let amount_cents = parse_amount(&amount)?;
            let account = service.find_account(owner, &account).await?;
            let category = service.find_category(owner, &category).await?;
            let kind = match kind {
                Some(kind) => parse_kind(&kind)?,
                None => category.kind,
            };
            let date = match date {
                Some(date) => parse_date(&date)?,
                None => service.today(),
            };

            let mut new = NewTransaction::new(category.id, account.id, kind, amount_cents, date)
                .with_description(description)
                .with_installments(installments);
            if let Some(due_date) = due_date {
                new = new.with_due_date(parse_date(&due_date)?);
            }
            if paid {
                new = new.settled();
            }

            let transaction = service.create_transaction(owner, new).await?;
            println!(
                "Recorded {} {} on {} ({})",
                transaction.kind,
                format_cents(transaction.amount_cents),
                account.name,
                transaction.id
            );
        }

        TxCommands::Edit {
            id,
            amount,
            account,
            category,
            kind,
            description,
            date,
            due_date,
            clear_due_date,
            paid,
            installments,
        } => {
            let account_id = match account {
                Some(name) => Some(service.find_account(owner, &name).await?.id),
                None => None,
            };
            let category_id = match category {
                Some(name) => Some(service.find_category(owner, &name).await?.id),
                None => None,
            };
            let due_date = if clear_due_date {
                Some(None)
            } else {
                parse_optional_date(due_date.as_deref())?.map(Some)
            };

            let changes = TransactionChanges {
                category_id,
                account_id,
                kind: kind.as_deref().map(parse_kind).transpose()?,
                description,
                amount_cents: amount.as_deref().map(parse_amount).transpose()?,
                date: parse_optional_date(date.as_deref())?,
                due_date,
                paid,
                installments,
            };
            if changes.is_empty() {
                bail!("Nothing to change");
            }

            let transaction = service.update_transaction(owner, id, changes).await?;
            println!(
                "Updated transaction {}: {} {}",
                transaction.id,
                transaction.kind,
                format_cents(transaction.amount_cents)
            );
        }

        TxCommands::Delete { id } => {
            let transaction = service.delete_transaction(owner, id).await?;
            println!(
                "Deleted transaction {} ({} {})",
                transaction.id,
                transaction.kind,
                format_cents(transaction.amount_cents)
            );
        }

        TxCommands::List {
            account,
            category,
            kind,
            paid,
            from,
            to,
            limit,
        } => {
            let account_id = match account {
                Some(name) => Some(service.find_account(owner, &name).await?.id),
                None => None,
            };
            let category_id = match category {
                Some(name) => Some(service.find_category(owner, &name).await?.id),
                None => None,
            };
            let filter = TransactionFilter {
                account_id,
                category_id,
                kind: kind.as_deref().map(parse_kind).transpose()?,
                paid,
                from: parse_optional_date(from.as_deref())?,
                to: parse_optional_date(to.as_deref())?,
                limit,
            };

            let transactions = service.list_transactions(owner, &filter).await?;
            if transactions.is_empty() {
                println!("No transactions found.");
            } else {
                println!(
                    "{:<6} {:<12} {:<8} {:>12} {:<5} DESCRIPTION",
                    "ID", "DATE", "KIND", "AMOUNT", "PAID"
                );
                println!("{}", "-".repeat(70));
                for transaction in transactions {
                    println!(
                        "{:<6} {:<12} {:<8} {:>12} {:<5} {}",
                        transaction.id,
                        transaction.date,
                        transaction.kind,
                        format_cents(transaction.amount_cents),
                        if transaction.paid { "yes" } else { "no" },
                        truncate(&transaction.description, 30)
                    );
                }
            }
        }

        TxCommands::Show { id } => {
            let transaction = service.get_transaction(owner, id).await?;
            let account = service.get_account(owner, transaction.account_id).await?;
            let category = service.get_category(owner, transaction.category_id).await?;

            println!("Transaction: {}", transaction.id);
            println!("  Date:         {}", transaction.date);
            println!("  Kind:         {}", transaction.kind);
            println!("  Amount:       {}", format_cents(transaction.amount_cents));
            println!("  Account:      {}", account.name);
            println!("  Category:     {}", category.name);
            if !transaction.description.is_empty() {
                println!("  Description:  {}", transaction.description);
            }
            if let Some(due_date) = transaction.due_date {
                println!("  Due date:     {}", due_date);
            }
            println!(
                "  Paid:         {}",
                if transaction.paid { "yes" } else { "no" }
            );
            println!("  Installments: {}", transaction.installments);
        }
    }
    Ok(())
}

async fn run_goal_command(service: &LedgerService, owner: UserId, cmd: GoalCommands) -> Result<()> {
    match cmd {
        GoalCommands::Create {
            name,
            target,
            target_date,
        } => {
            let target_cents = parse_amount(&target)?;
            let target_date = parse_optional_date(target_date.as_deref())?;
            let goal = service
                .create_goal(owner, &name, target_cents, target_date)
                .await?;
            println!(
                "Created goal {}: {} (target {})",
                goal.id,
                goal.name,
                format_cents(goal.target_cents)
            );
        }

        GoalCommands::List => {
            let goals = service.list_goals(owner).await?;
            if goals.is_empty() {
                println!("No goals found.");
            } else {
                println!(
                    "{:<6} {:<24} {:>12} {:>12} {:>8} {:<12} {:<6}",
                    "ID", "NAME", "TARGET", "SAVED", "%", "BY", "ACTIVE"
                );
                println!("{}", "-".repeat(86));
                for goal in goals {
                    let progress = service.goal_progress(owner, goal.id).await?;
                    println!(
                        "{:<6} {:<24} {:>12} {:>12} {:>8.2} {:<12} {:<6}",
                        goal.id,
                        truncate(&goal.name, 24),
                        format_cents(goal.target_cents),
                        format_cents(progress.current_cents),
                        progress.percent,
                        goal.target_date.map(|d| d.to_string()).unwrap_or_default(),
                        if goal.active { "yes" } else { "no" }
                    );
                }
            }
        }

        GoalCommands::Update {
            id,
            name,
            target,
            target_date,
            active,
        } => {
            let changes = GoalChanges {
                name,
                target_cents: target.as_deref().map(parse_amount).transpose()?,
                target_date: parse_optional_date(target_date.as_deref())?.map(Some),
                active,
            };
            let goal = service.update_goal(owner, id, changes).await?;
            println!("Updated goal {}: {}", goal.id, goal.name);
        }

        GoalCommands::Delete { id } => {
            let goal = service.delete_goal(owner, id).await?;
            println!("Deleted goal {}: {}", goal.id, goal.name);
        }

        GoalCommands::Deposit { id, amount } => {
            let amount_cents = parse_amount(&amount)?;
            let result = service.deposit_to_goal(owner, id, amount_cents).await?;
            println!(
                "Deposited {} from {} into {}",
                format_cents(amount_cents),
                result.principal.name,
                result.goal_account.name
            );
            let progress = service.goal_progress(owner, id).await?;
            println!(
                "  Saved {} of {} ({:.2}%)",
                format_cents(progress.current_cents),
                format_cents(progress.target_cents),
                progress.percent
            );
        }

        GoalCommands::Progress { id } => {
            let progress = service.goal_progress(owner, id).await?;
            println!("Goal: {}", progress.name);
            println!("  Target:    {}", format_cents(progress.target_cents));
            println!("  Saved:     {}", format_cents(progress.current_cents));
            println!("  Remaining: {}", format_cents(progress.remaining_cents));
            println!("  Progress:  {:.2}%", progress.percent);
        }
    }
    Ok(())
}

async fn run_stipend_command(
    service: &LedgerService,
    owner: UserId,
    cmd: StipendCommands,
) -> Result<()> {
    match cmd {
        StipendCommands::Install {
            month,
            year,
            account,
        } => {
            let account_id = match account {
                Some(name) => Some(service.find_account(owner, &name).await?.id),
                None => None,
            };
            let posting = service
                .create_monthly_stipend_installment(owner, month, year, account_id)
                .await?;
            println!(
                "Recorded pending installment {:02}/{}: {} ({})",
                month,
                year,
                format_cents(posting.transaction.amount_cents),
                posting.transaction.id
            );
        }

        StipendCommands::Confirm { month, year } => {
            let transaction = service
                .confirm_pending_receivable(owner, month, year)
                .await?;
            println!(
                "Confirmed installment {}: {} on {}",
                transaction.id,
                format_cents(transaction.amount_cents),
                transaction.date
            );
        }
    }
    Ok(())
}

async fn run_incentive_command(
    service: &LedgerService,
    owner: UserId,
    cmd: IncentiveCommands,
) -> Result<()> {
    match cmd {
        IncentiveCommands::Completion { year, account } => {
            let account_id = match account {
                Some(name) => Some(service.find_account(owner, &name).await?.id),
                None => None,
            };
            let incentive = service
                .grant_completion_incentive(owner, year, account_id)
                .await?;
            println!(
                "Granted completion incentive {} for {}: {} (pending release)",
                incentive.id,
                year,
                format_cents(incentive.amount_cents)
            );
        }

        IncentiveCommands::Release { id } => {
            let posting = service.release_completion_incentive(owner, id).await?;
            println!(
                "Released incentive {}: {} (transaction {})",
                posting.incentive.id,
                format_cents(posting.transaction.amount_cents),
                posting.transaction.id
            );
        }

        IncentiveCommands::Exam { year, account } => {
            let account_id = match account {
                Some(name) => Some(service.find_account(owner, &name).await?.id),
                None => None,
            };
            let posting = service.grant_exam_incentive(owner, account_id, year).await?;
            println!(
                "Granted exam incentive {}: {} (transaction {})",
                posting.incentive.id,
                format_cents(posting.transaction.amount_cents),
                posting.transaction.id
            );
        }

        IncentiveCommands::List { kind } => {
            let kind = kind
                .as_deref()
                .map(|k| {
                    IncentiveKind::from_str(k).ok_or_else(|| {
                        anyhow!(
                            "Invalid incentive kind '{}'. Valid kinds: completion, exam, stipend",
                            k
                        )
                    })
                })
                .transpose()?;

            let incentives = service.list_incentives(owner, kind).await?;
            if incentives.is_empty() {
                println!("No incentives found.");
            } else {
                println!(
                    "{:<6} {:<12} {:<6} {:>12} {:<9} {:<6}",
                    "ID", "KIND", "YEAR", "AMOUNT", "RELEASED", "TX"
                );
                println!("{}", "-".repeat(56));
                for incentive in incentives {
                    println!(
                        "{:<6} {:<12} {:<6} {:>12} {:<9} {:<6}",
                        incentive.id,
                        incentive.kind,
                        incentive.year.map(|y| y.to_string()).unwrap_or_default(),
                        format_cents(incentive.amount_cents),
                        if incentive.released { "yes" } else { "no" },
                        incentive
                            .transaction_id
                            .map(|t| t.to_string())
                            .unwrap_or_default()
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_reminder_command(
    service: &LedgerService,
    owner: UserId,
    cmd: ReminderCommands,
) -> Result<()> {
    match cmd {
        ReminderCommands::Create {
            title,
            description,
            date,
            days_before,
            recurrence,
            transaction,
        } => {
            let recurrence = Recurrence::from_str(&recurrence).ok_or_else(|| {
                anyhow!(
                    "Invalid recurrence '{}'. Valid values: none, daily, weekly, monthly, yearly",
                    recurrence
                )
            })?;
            let reminder = service
                .create_reminder(
                    owner,
                    NewReminder {
                        title,
                        description,
                        remind_on: parse_optional_date(date.as_deref())?,
                        days_before,
                        recurrence,
                        transaction_id: transaction,
                    },
                )
                .await?;
            println!("Created reminder {}: {}", reminder.id, reminder.title);
        }

        ReminderCommands::List => {
            let reminders = service.list_reminders(owner).await?;
            print_reminders(&reminders);
        }

        ReminderCommands::Today => {
            let overview = service.today_overview(owner).await?;
            println!("Today: {}", overview.date);
            println!();
            if overview.reminders.is_empty() {
                println!("Nothing due today.");
            } else {
                print_reminders(&overview.reminders);
            }
            if !overview.notifications.is_empty() {
                println!();
                println!("Unread notifications:");
                print_notifications(&overview.notifications);
            }
        }

        ReminderCommands::Toggle { id } => {
            let reminder = service.get_reminder(owner, id).await?;
            let reminder = service
                .set_reminder_active(owner, id, !reminder.active)
                .await?;
            println!(
                "Reminder {} is now {}",
                reminder.id,
                if reminder.active { "active" } else { "inactive" }
            );
        }

        ReminderCommands::Delete { id } => {
            service.delete_reminder(owner, id).await?;
            println!("Deleted reminder {}", id);
        }
    }
    Ok(())
}

fn print_reminders(reminders: &[crate::domain::Reminder]) {
    if reminders.is_empty() {
        println!("No reminders found.");
        return;
    }
    println!(
        "{:<6} {:<24} {:<12} {:<8} {:<6} {:<6}",
        "ID", "TITLE", "DATE", "REPEAT", "TX", "ACTIVE"
    );
    println!("{}", "-".repeat(68));
    for reminder in reminders {
        println!(
            "{:<6} {:<24} {:<12} {:<8} {:<6} {:<6}",
            reminder.id,
            truncate(&reminder.title, 24),
            reminder.remind_on.map(|d| d.to_string()).unwrap_or_default(),
            reminder.recurrence,
            reminder
                .transaction_id
                .map(|t| t.to_string())
                .unwrap_or_default(),
            if reminder.active { "yes" } else { "no" }
        );
    }
}

fn print_notifications(notifications: &[crate::domain::Notification]) {
    for notification in notifications {
        println!(
            "{} [{}] {} {}",
            if notification.read { " " } else { "*" },
            notification.id,
            notification.created_at.format("%Y-%m-%d %H:%M"),
            notification.message
        );
        if let Some(link) = &notification.link {
            println!("      {}", link);
        }
    }
}

async fn run_notification_command(
    service: &LedgerService,
    owner: UserId,
    cmd: NotificationCommands,
) -> Result<()> {
    match cmd {
        NotificationCommands::Create {
            message,
            transaction,
            link,
        } => {
            let notification = service
                .create_notification(owner, &message, transaction, link.as_deref())
                .await?;
            println!("Created notification {}", notification.id);
        }

        NotificationCommands::List { unread } => {
            let notifications = service.list_notifications(owner, unread).await?;
            if notifications.is_empty() {
                println!("No notifications.");
            } else {
                print_notifications(&notifications);
            }
        }

        NotificationCommands::Read { id } => {
            service.mark_notification_read(owner, id).await?;
            println!("Marked notification {} as read", id);
        }

        NotificationCommands::Delete { id } => {
            service.delete_notification(owner, id).await?;
            println!("Deleted notification {}", id);
        }
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService, owner: UserId) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity(owner).await?;

    println!("Accounts:     {}", report.account_count);
    println!("Transactions: {}", report.transaction_count);
    println!();

    if report.is_healthy() {
        println!("All balances match the ledger.");
    } else {
        println!("Balance drift found:");
        for drift in &report.drifts {
            println!(
                "  - {}: stored {}, expected {} (off by {})",
                drift.account_name,
                format_cents(drift.stored),
                format_cents(drift.expected),
                format_cents(drift.difference())
            );
        }
        bail!("Ledger integrity check failed (run `controla rebuild` to repair)");
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_amount(input: &str) -> Result<i64> {
    parse_cents(input)
        .with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", input))
}

fn parse_kind(input: &str) -> Result<EntryKind> {
    EntryKind::from_str(input)
        .ok_or_else(|| anyhow!("Invalid kind '{}'. Valid kinds: income, expense", input))
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", input))
}

fn parse_optional_date(input: Option<&str>) -> Result<Option<NaiveDate>> {
    input.map(parse_date).transpose()
}
