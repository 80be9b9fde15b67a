use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use uuid::Uuid;

use crate::application::criteria::{SortDirection, SortField, TipQuery};

/// Command-line arguments for the tipcat binary.
#[derive(Debug, Parser)]
#[command(name = "tipcat", version, about = "Tip catalog queries and maintenance")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "TIPCAT_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Query the catalog and print one page of tips.
    Search(QueryArgs),
    /// Query one user's favorites.
    Favorites(FavoritesArgs),
    /// List live categories with their tip counts.
    Categories,
    /// Show one category and its tips.
    Category(CategoryArgs),
    /// Print catalog totals and the most recent tips.
    Dashboard,
    /// Apply pending database migrations.
    Migrate,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Serve data from a TOML catalog snapshot instead of the database.
    #[arg(long = "catalog", value_name = "PATH", value_hint = ValueHint::FilePath, global = true)]
    pub catalog: Option<PathBuf>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the log level filter.
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Disable the read-through cache for this run.
    #[arg(long = "no-cache", action = clap::ArgAction::SetTrue, global = true)]
    pub no_cache: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct QueryArgs {
    /// Case-insensitive substring matched against title, description, steps and tags.
    #[arg(long = "search", value_name = "TEXT")]
    pub search: Option<String>,

    /// Restrict results to one category.
    #[arg(long = "category", value_name = "ID")]
    pub category_id: Option<Uuid>,

    /// Require a tag; repeat to require several.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Sort field: title, created_at, updated_at or added_at.
    #[arg(long = "sort", value_name = "FIELD")]
    pub sort: Option<SortField>,

    /// Sort direction: asc or desc.
    #[arg(long = "direction", value_name = "DIR")]
    pub direction: Option<SortDirection>,

    /// 1-based page number.
    #[arg(long = "page", value_name = "N", allow_negative_numbers = true)]
    pub page: Option<i64>,

    /// Items per page.
    #[arg(long = "page-size", value_name = "N", allow_negative_numbers = true)]
    pub page_size: Option<i64>,
}

impl QueryArgs {
    pub fn to_query(&self) -> TipQuery {
        TipQuery {
            search: self.search.clone(),
            category_id: self.category_id,
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
            sort: self.sort,
            direction: self.direction,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct FavoritesArgs {
    /// Owner of the favorites.
    #[arg(long = "user", value_name = "ID")]
    pub user_id: Uuid,

    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Debug, Args, Clone)]
pub struct CategoryArgs {
    /// Category identifier.
    #[arg(value_name = "ID")]
    pub id: Uuid,
}
