use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use taxon_engine::{
    CategoryUpdate, EngineConfig, PostDraft, PostQuery, PostUpdate, PostsCountModel, Taxon,
};
use taxon_store::{InMemoryStore, Snapshot};
use taxon_types::{Category, Post};

use crate::cli::*;

/// Loaded state for one invocation.
struct Session {
    taxon: Taxon,
    store: Arc<InMemoryStore>,
    data: PathBuf,
    format: OutputFormat,
}

impl Session {
    fn open(data: &Path, config: Option<&Path>, format: OutputFormat) -> anyhow::Result<Self> {
        let config = match config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        let store = Snapshot::load(data)
            .and_then(Snapshot::restore)
            .with_context(|| format!("loading {}", data.display()))?;
        let store = Arc::new(store);
        let taxon = Taxon::new(store.clone(), config);
        Ok(Self {
            taxon,
            store,
            data: data.to_path_buf(),
            format,
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        Snapshot::capture(&self.store)?
            .save(&self.data)
            .with_context(|| format!("saving {}", self.data.display()))?;
        debug!(path = %self.data.display(), "state saved");
        Ok(())
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let session = Session::open(&cli.data, cli.config.as_deref(), cli.format)?;
    let changed = match cli.command {
        Command::Category(args) => cmd_category(&session, args.action)?,
        Command::Post(args) => cmd_post(&session, args.action)?,
        Command::Tree(args) => cmd_tree(&session, args)?,
        Command::Counts(args) => cmd_counts(&session, args)?,
    };
    if changed {
        session.save()?;
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn category_line(session: &Session, category: &Category) -> anyhow::Result<String> {
    let key = session.taxon.categories().key_of(category.id)?;
    Ok(format!("{} {}", category.id.to_string().dimmed(), key.to_string().bold()))
}

fn print_categories(session: &Session, categories: &[Category]) -> anyhow::Result<()> {
    if session.json() {
        return print_json(categories);
    }
    if categories.is_empty() {
        println!("No categories.");
    }
    for category in categories {
        println!("{}", category_line(session, category)?);
    }
    Ok(())
}

fn print_post(session: &Session, post: &Post) -> anyhow::Result<()> {
    if session.json() {
        return print_json(post);
    }
    let category = match post.category {
        Some(id) => session.taxon.categories().key_of(id)?.to_string(),
        None => "-".into(),
    };
    let visibility = if post.visible { "visible".green() } else { "hidden".yellow() };
    println!("{} {}", post.id.to_string().dimmed(), post.title.bold());
    println!("  Category: {}", category.cyan());
    println!("  Status: {visibility}, {} hits", post.hits);
    println!("  Created: {}", post.created_at.to_rfc3339());
    if !post.content.is_empty() {
        println!("\n{}", post.content);
    }
    Ok(())
}

fn cmd_category(session: &Session, action: CategoryAction) -> anyhow::Result<bool> {
    let categories = session.taxon.categories();
    match action {
        CategoryAction::Add { key } => {
            let created = categories.create(&key)?;
            if session.json() {
                print_json(&created)?;
            } else {
                let line = category_line(session, &created)?;
                println!("{} Created category {line}", "✓".green().bold());
            }
            Ok(true)
        }
        CategoryAction::List { parent, top } => {
            let list = match (parent, top) {
                (Some(parent), _) => categories.sub_categories_of(&parent)?,
                (None, true) => categories.top_level()?,
                (None, false) => categories.all()?,
            };
            print_categories(session, &list)?;
            Ok(false)
        }
        CategoryAction::Show { key } => {
            let category = categories.get(&key)?;
            if session.json() {
                print_json(&category)?;
            } else {
                println!("{}", category_line(session, &category)?);
                println!("  Created: {}", category.created_at.to_rfc3339());
                if let Some(updated) = category.updated_at {
                    println!("  Updated: {}", updated.to_rfc3339());
                }
                if category.is_top_level() {
                    for child in categories.sub_categories_of(&category.name)? {
                        println!("  └─ {}", child.name);
                    }
                }
            }
            Ok(false)
        }
        CategoryAction::Update { key, name, parent, top } => {
            // Without --parent or --top the category keeps its current parent.
            let parent = if top { None } else { parent.or_else(|| key.parent.clone()) };
            let updated = categories.update(&key, &CategoryUpdate::new(name, parent))?;
            if session.json() {
                print_json(&updated)?;
            } else {
                let line = category_line(session, &updated)?;
                println!(
                    "{} Updated {} → {line}",
                    "✓".green().bold(),
                    key.to_string().yellow()
                );
            }
            Ok(true)
        }
        CategoryAction::Rm { key } => {
            categories.delete(&key)?;
            if !session.json() {
                println!("Removed category {}", key.to_string().yellow());
            }
            Ok(true)
        }
    }
}

fn cmd_post(session: &Session, action: PostAction) -> anyhow::Result<bool> {
    let posts = session.taxon.posts();
    match action {
        PostAction::Add { title, category, content, hidden } => {
            let post = posts.create(&PostDraft {
                category,
                title,
                content,
                visible: !hidden,
            })?;
            if session.json() {
                print_json(&post)?;
            } else {
                println!(
                    "{} Created post {} {}",
                    "✓".green().bold(),
                    post.id.to_string().yellow(),
                    post.title
                );
            }
            Ok(true)
        }
        PostAction::Show { id } => {
            let post = posts.get(id)?;
            print_post(session, &post)?;
            // The read bumped the hit counter.
            Ok(true)
        }
        PostAction::List { category, visible, page, size } => {
            let list = posts.list(&PostQuery { visible, category, page, size })?;
            if session.json() {
                print_json(&list)?;
            } else if list.is_empty() {
                println!("No posts.");
            } else {
                for post in &list {
                    let marker = if post.visible { " ".normal() } else { "*".yellow() };
                    println!(
                        "{marker}{} {}  ({} hits)",
                        post.id.to_string().dimmed(),
                        post.title,
                        post.hits
                    );
                }
            }
            Ok(false)
        }
        PostAction::Edit { id, title, content, visible, category } => {
            let post = posts.update(id, &PostUpdate { title, content, visible, category })?;
            if session.json() {
                print_json(&post)?;
            } else {
                println!("{} Updated post {}", "✓".green().bold(), post.id.to_string().yellow());
            }
            Ok(true)
        }
        PostAction::Rm { id } => {
            posts.delete(id)?;
            if !session.json() {
                println!("Removed post {}", id.to_string().yellow());
            }
            Ok(true)
        }
    }
}

fn print_node(node: &PostsCountModel, indent: &str) {
    println!(
        "{indent}{}  {} visible, {} hidden",
        node.name.bold(),
        node.visible.to_string().green(),
        node.invisible.to_string().yellow()
    );
}

fn cmd_tree(session: &Session, args: CountArgs) -> anyhow::Result<bool> {
    let tree = session.taxon.categories().post_count_tree(args.visible)?;
    if session.json() {
        print_json(&tree)?;
        return Ok(false);
    }
    if tree.is_empty() {
        println!("No categories.");
        return Ok(false);
    }
    for root in &tree.roots {
        print_node(root, "");
        for child in &root.children {
            print_node(child, "  └─ ");
        }
    }
    println!("Total: {} posts", tree.total().to_string().bold());
    Ok(false)
}

fn cmd_counts(session: &Session, args: CountArgs) -> anyhow::Result<bool> {
    let counts = session.taxon.categories().post_counts(args.visible)?;
    if session.json() {
        print_json(&counts)?;
        return Ok(false);
    }
    if counts.is_empty() {
        println!("No posts.");
    }
    for row in &counts {
        println!("{}  {}", category_line(session, &row.category)?, row.count);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(data: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["taxon", "--data"];
        let data = data.to_string_lossy().into_owned();
        argv.push(&data);
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    fn reload(data: &Path) -> Session {
        Session::open(data, None, OutputFormat::Text).unwrap()
    }

    #[test]
    fn mutations_persist_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("taxon.json");

        run(&data, &["category", "add", "lang"]).unwrap();
        run(&data, &["category", "add", "lang/rust"]).unwrap();
        run(&data, &["post", "add", "hello", "-c", "lang/rust"]).unwrap();

        let session = reload(&data);
        assert_eq!(session.store.category_count().unwrap(), 2);
        assert_eq!(session.store.post_count().unwrap(), 1);
    }

    #[test]
    fn rejected_mutation_does_not_touch_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("taxon.json");

        run(&data, &["category", "add", "lang"]).unwrap();
        let before = std::fs::read(&data).unwrap();
        assert!(run(&data, &["post", "add", "hello", "-c", "lang"]).is_err());
        assert!(run(&data, &["category", "add", "lang"]).is_err());
        assert_eq!(std::fs::read(&data).unwrap(), before);
    }

    #[test]
    fn post_show_persists_hits() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("taxon.json");

        run(&data, &["category", "add", "lang"]).unwrap();
        run(&data, &["category", "add", "lang/rust"]).unwrap();
        run(&data, &["post", "add", "hello", "-c", "lang/rust"]).unwrap();
        run(&data, &["post", "show", "1"]).unwrap();
        run(&data, &["post", "show", "#1"]).unwrap();

        let session = reload(&data);
        let post = session.taxon.posts().peek(taxon_types::PostId::new(1)).unwrap();
        assert_eq!(post.hits, 2);
    }

    #[test]
    fn update_keeps_parent_unless_asked() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("taxon.json");

        run(&data, &["category", "add", "lang"]).unwrap();
        run(&data, &["category", "add", "lang/rust"]).unwrap();
        run(&data, &["category", "update", "lang/rust", "-n", "rs"]).unwrap();

        let session = reload(&data);
        let key = taxon_types::CategoryKey::sub("lang", "rs");
        assert!(session.taxon.categories().get(&key).is_ok());

        run(&data, &["category", "update", "lang/rs", "--top"]).unwrap();
        let session = reload(&data);
        assert!(session.taxon.categories().get(&taxon_types::CategoryKey::top("rs")).is_ok());
    }

    #[test]
    fn read_only_commands_on_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("taxon.json");

        run(&data, &["tree"]).unwrap();
        run(&data, &["counts", "--visible", "true"]).unwrap();
        run(&data, &["--format", "json", "category", "list"]).unwrap();
        assert!(!data.exists());
    }

    #[test]
    fn config_file_relaxes_rules() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("taxon.json");
        let config = dir.path().join("taxon.toml");
        std::fs::write(&config, "forbid_top_level_posts = false\n").unwrap();
        let config = config.to_string_lossy().into_owned();

        run(&data, &["category", "add", "lang"]).unwrap();
        run(&data, &["--config", config.as_str(), "post", "add", "hello", "-c", "lang"]).unwrap();
        assert_eq!(reload(&data).store.post_count().unwrap(), 1);
    }
}
