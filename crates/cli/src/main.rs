//! Questlog CLI - personal goal tracking with a gamified core.

use anyhow::Result;
use clap::{Parser, Subcommand};
use questlog_core::{Difficulty, GamificationEvent, GamificationResult, Goal, GoalStatus, ModuleId, UserProfile};
use questlog_gamify::{default_catalog, xp_for_level, Gamification, GamificationFacade};
use questlog_storage::{GamificationStore, SqliteStore};
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "questlog")]
#[command(about = "Personal goal tracking with XP, streaks and achievements", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and seed the achievement catalog
    Init,
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Record progress on a goal
    Progress {
        /// User name or ID
        user: String,
        /// Goal ID
        goal: String,
    },
    /// Complete a goal
    Complete {
        /// User name or ID
        user: String,
        /// Goal ID
        goal: String,
    },
    /// Show a user's level, XP and streak
    Status {
        /// User name or ID
        user: String,
    },
    /// Show a user's achievement progress
    Achievements {
        /// User name or ID
        user: String,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add a user
    Add {
        /// Display name
        name: String,
    },
    /// List users
    List,
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Add a goal
    Add {
        /// User name or ID
        user: String,
        /// Goal title
        title: String,
        /// Domain module (fitness, learning, scripture, home, work, ...)
        #[arg(long, default_value = "fitness")]
        module: String,
        /// Difficulty (easy, medium, hard, expert)
        #[arg(long, default_value = "medium")]
        difficulty: String,
    },
    /// List a user's goals
    List {
        /// User name or ID
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .init();

    let cli = Cli::parse();

    // Open storage
    let data_dir = std::path::PathBuf::from(".questlog");
    std::fs::create_dir_all(&data_dir)?;
    let store = SqliteStore::open(&data_dir.join("questlog.db")).await?;

    match cli.command {
        Commands::Init => {
            let catalog = default_catalog();
            store.seed_achievement_definitions(&catalog).await?;
            println!("Seeded {} achievements", catalog.len());
        }
        Commands::User { command } => match command {
            UserCommands::Add { name } => {
                let user = store.create_user(&name).await?;
                println!("Added user: {} - {}", user.id, user.name);
            }
            UserCommands::List => {
                let users = store.list_users().await?;
                println!("Users ({})", users.len());
                for user in users {
                    println!(
                        "  {} | {} | level {} | {} XP | {}-day streak",
                        user.id, user.name, user.current_level, user.total_xp, user.streak_count,
                    );
                }
            }
        },
        Commands::Goal { command } => match command {
            GoalCommands::Add {
                user,
                title,
                module,
                difficulty,
            } => {
                let user = resolve_user(&store, &user).await?;
                let difficulty: Difficulty = difficulty
                    .parse()
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                let goal = Goal::new(user.id, ModuleId::new(module), title, difficulty);
                store.save_goal(&goal).await?;
                println!("Added goal: {} - {}", goal.id, goal.title);
            }
            GoalCommands::List { user } => {
                let user = resolve_user(&store, &user).await?;
                let goals = store.list_goals(user.id).await?;
                println!("Goals ({})", goals.len());
                for goal in goals {
                    println!(
                        "  {} | {} | {} | {} - {}",
                        goal.id,
                        format_status(goal.status),
                        goal.module,
                        goal.difficulty,
                        goal.title,
                    );
                }
            }
        },
        Commands::Progress { user, goal } => {
            let user = resolve_user(&store, &user).await?;
            let goal = load_goal(&store, &goal).await?;

            let facade = GamificationFacade::load(Arc::new(store.clone())).await?;
            let result = facade
                .handle_event(
                    user.id,
                    GamificationEvent::ProgressRecorded {
                        difficulty: goal.difficulty,
                    },
                )
                .await?;
            print_result(&result);
        }
        Commands::Complete { user, goal } => {
            let user = resolve_user(&store, &user).await?;
            let mut goal = load_goal(&store, &goal).await?;

            if goal.status == GoalStatus::Completed {
                println!("Goal already completed");
                return Ok(());
            }
            goal.status = GoalStatus::Completed;
            goal.completed_at = Some(chrono::Utc::now());
            store.save_goal(&goal).await?;

            let facade = GamificationFacade::load(Arc::new(store.clone())).await?;
            let result = facade
                .handle_event(
                    user.id,
                    GamificationEvent::GoalCompleted {
                        difficulty: goal.difficulty,
                    },
                )
                .await?;
            println!("Completed: {}", goal.title);
            print_result(&result);
        }
        Commands::Status { user } => {
            let user = resolve_user(&store, &user).await?;
            let next = xp_for_level(user.current_level + 1);
            println!("{}", user.name);
            println!("  Level: {}", user.current_level);
            println!(
                "  XP: {} ({} to level {})",
                user.total_xp,
                next.saturating_sub(user.total_xp),
                user.current_level + 1,
            );
            println!("  Streak: {} days", user.streak_count);
            if let Some(last) = user.last_activity_at {
                println!("  Last activity: {last}");
            }
        }
        Commands::Achievements { user } => {
            let user = resolve_user(&store, &user).await?;
            let defs = store.list_achievement_definitions().await?;
            for def in defs {
                let row = store
                    .get_or_create_achievement_progress(user.id, &def.id)
                    .await?;
                let marker = if row.is_completed { "x" } else { " " };
                println!(
                    "  [{marker}] {} - {} ({:>3.0}%, {} XP)",
                    def.name,
                    def.description,
                    row.progress * 100.0,
                    def.xp_reward,
                );
            }
        }
    }

    Ok(())
}

/// Look a user up by ID, falling back to an exact name match.
async fn resolve_user(store: &SqliteStore, key: &str) -> Result<UserProfile> {
    if let Ok(id) = key.parse::<questlog_core::UserId>() {
        if let Some(user) = store.load_user(id).await? {
            return Ok(user);
        }
    }
    store
        .list_users()
        .await?
        .into_iter()
        .find(|u| u.name == key)
        .ok_or_else(|| anyhow::anyhow!("no such user: {key}"))
}

async fn load_goal(store: &SqliteStore, key: &str) -> Result<Goal> {
    let id = key
        .parse::<questlog_core::GoalId>()
        .map_err(|_| anyhow::anyhow!("invalid goal ID"))?;
    store
        .load_goal(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no such goal: {key}"))
}

fn print_result(result: &GamificationResult) {
    println!("+{} XP | streak {} days", result.xp_awarded, result.current_streak);
    if result.leveled_up {
        println!("Level up! Now level {}", result.new_level);
    }
    for achievement in &result.newly_unlocked {
        println!(
            "Achievement unlocked: {} (+{} XP)",
            achievement.name, achievement.xp_reward,
        );
    }
}

fn format_status(status: GoalStatus) -> &'static str {
    match status {
        GoalStatus::Active => "active",
        GoalStatus::Completed => "completed",
        GoalStatus::Abandoned => "abandoned",
    }
}
