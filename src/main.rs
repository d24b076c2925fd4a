// Command line front end for browsing, downloading and reading translations

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lectio::config::DEFAULT_CONFIG_FILE;
use lectio::downloads::DownloadState;
use lectio::settings::Settings;
use lectio::storage::VerseIndex;
use lectio::translations::SortOrder;
use lectio::{App, Config};

#[derive(Parser)]
#[command(name = "lectio")]
#[command(about = "Manage and read locally installed Bible translations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List downloaded and available translations
    List {
        /// Fetch the catalog even if the local copy is recent
        #[arg(short, long)]
        refresh: bool,

        /// Order translations by `name` or `languageThenName` from now on
        #[arg(long)]
        sort: Option<SortOrder>,
    },

    /// Download and install a translation
    Download {
        /// Translation short name (e.g. KJV)
        short_name: String,
    },

    /// Remove a downloaded translation
    Remove {
        short_name: String,
    },

    /// Make a downloaded translation the current one
    #[command(alias = "select")]
    Use {
        short_name: String,
    },

    /// Print a chapter of the current translation
    Read {
        /// Book number, starting at 1
        #[arg(value_parser = clap::value_parser!(u32).range(1..=66))]
        book: u32,

        /// Chapter number, starting at 1
        #[arg(value_parser = clap::value_parser!(u32).range(1..=150))]
        chapter: u32,

        /// Print only this verse, starting at 1
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=176))]
        verse: Option<u32>,

        /// Downloaded translations to show alongside, comma separated
        #[arg(short, long, value_delimiter = ',')]
        parallel: Vec<String>,
    },

    /// Search the current translation
    Search {
        /// Space separated keywords, all must match
        query: Vec<String>,
    },

    /// Show or change reader settings
    Settings {
        #[arg(long)]
        night_mode: Option<bool>,

        #[arg(long)]
        keep_screen_on: Option<bool>,

        /// Font size step, 0 to 5
        #[arg(long, value_parser = clap::value_parser!(i32).range(0..=5))]
        font_size: Option<i32>,

        #[arg(long)]
        simple_reading_mode: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "lectio=debug" } else { "lectio=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(&cli.config).context("Failed to load configuration")?;
    let app = App::init(&config).await.context("Failed to initialize")?;

    match cli.command {
        Commands::List { refresh, sort } => {
            if let Some(order) = sort {
                app.repository.save_sort_order(order).await?;
            }
            list(&app, refresh).await
        }
        Commands::Download { short_name } => download(&app, &short_name).await,
        Commands::Remove { short_name } => {
            let translation = find_translation(&app, &short_name).await?;
            app.repository.remove_translation(&translation).await?;
            println!("Removed {}", short_name);
            Ok(())
        }
        Commands::Use { short_name } => {
            app.repository.select_translation(&short_name).await?;
            println!("Now reading {}", short_name);
            Ok(())
        }
        Commands::Read {
            book,
            chapter,
            verse,
            parallel,
        } => {
            // clap bounds every value well inside i32
            let position = VerseIndex::new(
                book as i32 - 1,
                chapter as i32 - 1,
                verse.map_or(0, |v| v as i32 - 1),
            );
            read(&app, position, verse.is_some(), &parallel).await
        }
        Commands::Search { query } => search(&app, &query.join(" ")).await,
        Commands::Settings {
            night_mode,
            keep_screen_on,
            font_size,
            simple_reading_mode,
        } => {
            let current = app.settings.settings();
            let updated = Settings {
                night_mode_on: night_mode.unwrap_or(current.night_mode_on),
                keep_screen_on: keep_screen_on.unwrap_or(current.keep_screen_on),
                font_size_scale: font_size.unwrap_or(current.font_size_scale),
                simple_reading_mode_on: simple_reading_mode.unwrap_or(current.simple_reading_mode_on),
            };
            app.settings.save_settings(updated).await?;
            println!("{:#?}", app.settings.settings());
            Ok(())
        }
    }
}

async fn list(app: &App, refresh: bool) -> anyhow::Result<()> {
    if let Err(e) = app.repository.reload(refresh).await {
        if app.repository.translations().is_empty() {
            return Err(e).context("Failed to load the translation list");
        }
        eprintln!("Could not refresh the catalog ({}), showing the stored list", e);
    }

    let list = app.repository.translation_list();
    println!("Downloaded (by {}):", app.repository.sort_order());
    for t in &list.downloaded_translations {
        let marker = if t.short_name == list.current_translation { "*" } else { " " };
        println!(" {} {:<8} {} [{}]", marker, t.short_name, t.name, t.language);
    }
    println!("Available:");
    for t in &list.available_translations {
        println!("   {:<8} {} [{}] {} KB", t.short_name, t.name, t.language, t.size / 1024);
    }
    Ok(())
}

async fn find_translation(app: &App, short_name: &str) -> anyhow::Result<lectio::storage::TranslationInfo> {
    if app.repository.find(short_name).is_none() {
        app.repository.reload(false).await?;
    }
    app.repository
        .find(short_name)
        .with_context(|| format!("Unknown translation {}", short_name))
}

async fn download(app: &App, short_name: &str) -> anyhow::Result<()> {
    let translation = find_translation(app, short_name).await?;
    if app.repository.translation_list().is_downloaded(short_name) {
        println!("{} is already downloaded", short_name);
        return Ok(());
    }

    let Some(handle) = app.downloads.download(translation) else {
        bail!("Another download is in progress");
    };

    let mut states = handle.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Cancelling...");
                handle.cancel();
            }
            state = states.next() => match state {
                Some(DownloadState::Downloading { progress }) => eprint!("\rDownloading {}%", progress),
                Some(DownloadState::Installing) => eprintln!("\rInstalling...      "),
                Some(state) if state.is_terminal() => break,
                Some(_) => {}
                None => break,
            },
        }
    }

    let installed = handle.wait().await?;
    println!("Installed {} ({})", installed.short_name, installed.name);
    Ok(())
}

async fn read(app: &App, position: VerseIndex, single_verse: bool, parallel: &[String]) -> anyhow::Result<()> {
    let position = position.validate()?;
    let book_names = app.reading.read_book_names().await?;
    let book_name = book_names
        .get(position.book_index as usize)
        .map(String::as_str)
        .unwrap_or("?");

    let verses = if single_verse {
        app.reading.save_current_verse_index(position).await?;
        let verse = app
            .reading
            .read_current_verse(parallel)
            .await?
            .with_context(|| {
                format!(
                    "{} {} has no verse {}",
                    book_name,
                    position.chapter_index + 1,
                    position.verse_index + 1
                )
            })?;
        vec![verse]
    } else {
        let verses = app
            .reading
            .read_chapter_with_parallel(position.book_index, position.chapter_index, parallel)
            .await?;
        app.reading.save_current_verse_index(position).await?;
        verses
    };

    println!("{} {}", book_name, position.chapter_index + 1);
    for verse in verses {
        println!("{:>3} {}", verse.verse_index.verse_index + 1, verse.text);
        for text in &verse.parallel {
            println!("    [{}] {}", text.translation_short_name, text.text);
        }
    }
    Ok(())
}

async fn search(app: &App, query: &str) -> anyhow::Result<()> {
    let book_names = app.reading.read_book_names().await?;
    let results = app.reading.search(query).await?;
    for verse in &results {
        let index = verse.verse_index;
        let book_name = book_names
            .get(index.book_index as usize)
            .map(String::as_str)
            .unwrap_or("?");
        println!(
            "{} {}:{}  {}",
            book_name,
            index.chapter_index + 1,
            index.verse_index + 1,
            verse.text
        );
    }
    println!("{} verses found", results.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_arguments_are_range_checked() {
        for args in [
            ["lectio", "read", "0", "1"],
            ["lectio", "read", "67", "1"],
            ["lectio", "read", "1", "151"],
            ["lectio", "read", "1", "-2147483648"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{:?}", args);
        }

        let cli = Cli::try_parse_from([
            "lectio", "read", "43", "3", "--verse", "16", "--parallel", "BBE,CUV",
        ])
        .unwrap();
        match cli.command {
            Commands::Read {
                book,
                chapter,
                verse,
                parallel,
            } => {
                assert_eq!((book, chapter, verse), (43, 3, Some(16)));
                assert_eq!(parallel, vec!["BBE", "CUV"]);
            }
            _ => panic!("expected read"),
        }
    }

    #[test]
    fn test_list_sort_order_argument() {
        let cli = Cli::try_parse_from(["lectio", "list", "--sort", "name"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List {
                sort: Some(SortOrder::Name),
                ..
            }
        ));
        assert!(Cli::try_parse_from(["lectio", "list", "--sort", "size"]).is_err());
    }
}
