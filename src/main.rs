//! `readlist` - import a Goodreads export, find covers and browse the
//! resulting library from the command line.

use anyhow::{bail, Context, Result};
use bridge_traits::LogLevel;
use clap::{Args, Parser, Subcommand, ValueEnum};
use core_library::filter::{filter_books, search_books, unique_years, LibraryFilter};
use core_library::models::Book;
use core_runtime::config::{CoreConfig, EnrichmentSettings};
use core_runtime::events::{CoreEvent, EventStream, ImportEvent};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{LibraryService, NewBook, Session};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "readlist", version)]
#[command(about = "Reading library with cover lookup and shelf comparison")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "READLIST_DATABASE", default_value = "readlist.db", global = true)]
    database: PathBuf,

    /// Google Books API key, sent only to Google Books
    #[arg(long, env = "GOOGLE_BOOKS_API_KEY", hide_env_values = true, global = true)]
    google_books_api_key: Option<String>,

    /// Records looked up concurrently per enrichment batch
    #[arg(long, env = "READLIST_BATCH_SIZE", default_value_t = 5, global = true)]
    batch_size: usize,

    /// Pause between enrichment batches, in milliseconds
    #[arg(long, env = "READLIST_BATCH_DELAY_MS", default_value_t = 1000, global = true)]
    batch_delay_ms: u64,

    #[arg(long, value_enum, default_value_t = Level::Warn, global = true)]
    log_level: Level,

    /// pretty, json or compact
    #[arg(long, default_value = "compact", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage users
    #[command(subcommand)]
    User(UserCommand),
    /// Import a Goodreads library export
    Import {
        #[command(flatten)]
        user: UserArg,
        csv: PathBuf,
    },
    /// List books, newest read first
    List(ListArgs),
    /// List shelves, then read years, with book counts
    Shelves {
        #[command(flatten)]
        user: UserArg,
    },
    /// Add a book to the to-read shelf
    Add {
        #[command(flatten)]
        user: UserArg,
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        isbn: Option<String>,
        #[arg(long)]
        pages: Option<i32>,
    },
    /// Replace a book's cover with the one found for an ISBN
    Cover {
        #[command(flatten)]
        user: UserArg,
        book_id: String,
        isbn: String,
    },
    /// Look up a cover for an ISBN without storing anything
    Preview { isbn: String },
    /// Delete a book
    Delete {
        #[command(flatten)]
        user: UserArg,
        book_id: String,
    },
    /// Show books shared with another user and shelve them
    Compare {
        #[command(flatten)]
        user: UserArg,
        other: String,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create { username: String },
}

#[derive(Args, Debug)]
struct UserArg {
    /// Acting user
    #[arg(short, long, env = "READLIST_USER")]
    user: String,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[command(flatten)]
    user: UserArg,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    shelf: Option<String>,
    /// Case-insensitive title or author match
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    five_star: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format: LogFormat = cli.log_format.parse()?;
    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(cli.log_level.into()),
    )?;

    let mut builder = CoreConfig::builder()
        .database_path(&cli.database)
        .enrichment(
            EnrichmentSettings::default()
                .with_batch_size(cli.batch_size)
                .with_batch_delay_ms(cli.batch_delay_ms),
        );
    if let Some(key) = cli.google_books_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        builder = builder.google_books_api_key(key);
    }
    let config = builder.build().context("invalid configuration")?;

    let service = core_service::bootstrap(&config)
        .await
        .with_context(|| format!("cannot open {}", cli.database.display()))?;

    run(&service, cli.command).await
}

async fn run(service: &LibraryService, command: Command) -> Result<()> {
    match command {
        Command::User(UserCommand::Create { username }) => {
            let session = service.create_user(&username).await?;
            println!("Created user {} ({})", session.username, session.user_id);
        }

        Command::Import { user, csv } => {
            let session = service.session_for(&user.user).await?;
            let progress = report_progress(service);
            let summary = service.import_export_path(&session, &csv).await?;
            progress.abort();

            println!(
                "Imported {} of {} finished books, {} with covers",
                summary.imported, summary.parsed, summary.covers_found
            );
            println!("Shelves: {}", summary.shelves.join(", "));
        }

        Command::List(args) => list(service, args).await?,

        Command::Shelves { user } => {
            let session = service.session_for(&user.user).await?;
            for shelf in service.shelves(&session).await? {
                let count = service.books_on_shelf(&session, &shelf.name).await?.len();
                println!("{:<30} {:>4}", shelf.name, count);
            }

            let library = service.library(&session).await?;
            for year in unique_years(&library) {
                let count = filter_books(&library, &LibraryFilter::all().with_year(year)).len();
                println!("{:<30} {:>4}", year, count);
            }
        }

        Command::Add {
            user,
            title,
            author,
            isbn,
            pages,
        } => {
            let session = service.session_for(&user.user).await?;
            let book = service
                .add_book(
                    &session,
                    NewBook {
                        title,
                        author,
                        isbn,
                        pages,
                    },
                )
                .await?;
            println!("Added {} ({})", book.title, book.id);
            match &book.cover_image_url {
                Some(url) => println!("Cover: {}", url),
                None => println!("No cover found"),
            }
        }

        Command::Cover {
            user,
            book_id,
            isbn,
        } => {
            let session = service.session_for(&user.user).await?;
            let url = service.change_cover(&session, &book_id, &isbn).await?;
            println!("Cover: {}", url);
        }

        Command::Preview { isbn } => match service.preview_cover(&isbn).await {
            Some(url) => println!("{}", url),
            None => bail!("no cover found for ISBN {}", isbn),
        },

        Command::Delete { user, book_id } => {
            let session = service.session_for(&user.user).await?;
            service.delete_book(&session, &book_id).await?;
            println!("Deleted {}", book_id);
        }

        Command::Compare { user, other } => {
            let session = service.session_for(&user.user).await?;
            let comparison = service.compare_with(&session, &other).await?;
            println!(
                "{} shared books, shelved on \"{}\"",
                comparison.books.len(),
                comparison.shelf_name
            );
            for shared in &comparison.books {
                println!(
                    "  {} - {}  me {}  {} {}",
                    shared.book.title,
                    shared.book.author,
                    stars(shared.my_rating),
                    other,
                    stars(shared.their_rating)
                );
                if !shared.their_review.is_empty() {
                    println!("    \"{}\"", shared.their_review);
                }
            }
        }
    }

    Ok(())
}

/// Print enrichment batches to stderr while an import runs.
fn report_progress(service: &LibraryService) -> tokio::task::JoinHandle<()> {
    let mut batches = EventStream::new(service.events().subscribe())
        .filter(|event| matches!(event, CoreEvent::Import(ImportEvent::BatchEnriched { .. })));
    tokio::spawn(async move {
        while let Ok(CoreEvent::Import(ImportEvent::BatchEnriched {
            completed, total, ..
        })) = batches.recv().await
        {
            eprintln!("Looked up covers for {}/{}", completed, total);
        }
    })
}

async fn list(service: &LibraryService, args: ListArgs) -> Result<()> {
    let session: Session = service.session_for(&args.user.user).await?;

    // Narrowest stored view first, the remaining criteria in memory.
    let books: Vec<Book> = if let Some(shelf) = &args.shelf {
        service.books_on_shelf(&session, shelf).await?
    } else if let Some(year) = args.year {
        service.books_read_in(&session, year).await?
    } else if args.five_star {
        service.five_star_books(&session).await?
    } else {
        service.books(&session).await?
    };
    debug!(candidates = books.len(), "Loaded books to list");

    let query = args.search.unwrap_or_default();
    let mut shown = 0;
    for book in search_books(&books, &query) {
        if args.year.is_some_and(|year| book.year_read != Some(year)) {
            continue;
        }
        if args.five_star && book.my_rating != 5 {
            continue;
        }

        println!(
            "{}  {:>4}  {:<5}  {} - {}{}",
            book.id,
            book.year_read
                .map(|y| y.to_string())
                .unwrap_or_else(|| "-".to_string()),
            stars(book.my_rating),
            book.title,
            book.author,
            if book.cover_image_url.is_some() { "" } else { "  [no cover]" }
        );
        shown += 1;
    }

    println!("{} books", shown);
    Ok(())
}

fn stars(rating: i32) -> String {
    "★".repeat(rating.clamp(0, 5) as usize)
}
