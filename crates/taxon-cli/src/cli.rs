use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use taxon_types::{CategoryKey, PostId};

#[derive(Parser)]
#[command(
    name = "taxon",
    about = "Two-level category tree with post counts",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Snapshot file holding categories and posts
    #[arg(long, global = true, default_value = "taxon.json")]
    pub data: PathBuf,

    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create, inspect, move, or remove categories
    Category(CategoryArgs),
    /// Create, read, edit, or remove posts
    Post(PostArgs),
    /// Show post counts rolled up into the category tree
    Tree(CountArgs),
    /// Show flat post counts per category
    Counts(CountArgs),
}

#[derive(Args)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub action: CategoryAction,
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Create a category (`name` or `parent/name`)
    Add {
        #[arg(value_parser = CategoryKey::parse)]
        key: CategoryKey,
    },
    /// List categories
    List {
        /// Only sub-categories of this top-level category
        #[arg(short, long, conflicts_with = "top")]
        parent: Option<String>,
        /// Only top-level categories
        #[arg(long)]
        top: bool,
    },
    /// Show one category
    Show {
        #[arg(value_parser = CategoryKey::parse)]
        key: CategoryKey,
    },
    /// Rename or move a category
    Update {
        #[arg(value_parser = CategoryKey::parse)]
        key: CategoryKey,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// Move under this top-level category
        #[arg(short, long, conflicts_with = "top")]
        parent: Option<String>,
        /// Make the category top-level
        #[arg(long)]
        top: bool,
    },
    /// Remove a category and its sub-categories
    Rm {
        #[arg(value_parser = CategoryKey::parse)]
        key: CategoryKey,
    },
}

#[derive(Args)]
pub struct PostArgs {
    #[command(subcommand)]
    pub action: PostAction,
}

#[derive(Subcommand)]
pub enum PostAction {
    /// Create a post
    Add {
        title: String,
        /// Category (`parent/name`)
        #[arg(short, long, value_parser = CategoryKey::parse)]
        category: Option<CategoryKey>,
        #[arg(long, default_value = "")]
        content: String,
        /// Create the post hidden
        #[arg(long)]
        hidden: bool,
    },
    /// Show a post and count the read
    Show { id: PostId },
    /// List posts, newest first
    List {
        #[arg(short, long, value_parser = CategoryKey::parse)]
        category: Option<CategoryKey>,
        /// Only visible (`true`) or hidden (`false`) posts
        #[arg(long)]
        visible: Option<bool>,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        size: Option<usize>,
    },
    /// Change a post's fields
    Edit {
        id: PostId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        visible: Option<bool>,
        #[arg(short, long, value_parser = CategoryKey::parse)]
        category: Option<CategoryKey>,
    },
    /// Remove a post
    Rm { id: PostId },
}

#[derive(Args)]
pub struct CountArgs {
    /// Count only visible (`true`) or hidden (`false`) posts
    #[arg(long)]
    pub visible: Option<bool>,
}
