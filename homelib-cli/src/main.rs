//! HomeLib CLI - Command-line interface for the home library catalog

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{BookEdit, Catalog, NewBook};
use homelib_core::types::MAX_RATING;
use homelib_core::BookFilter;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse and validate a star rating (0 to 5)
fn parse_rating(s: &str) -> Result<u8, String> {
    let n: u8 = s.parse().map_err(|_| format!("'{}' is not a valid rating", s))?;
    if n > MAX_RATING {
        Err(format!("rating must be between 0 and {}", MAX_RATING))
    } else {
        Ok(n)
    }
}

#[derive(Parser)]
#[command(name = "homelib")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory (defaults to $HOMELIB_DATA_DIR, then the platform data directory)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a book to the catalog
    Add(AddArgs),

    /// Change fields of a book, lend it out or take it back
    Edit(EditArgs),

    /// List books in the catalog
    List {
        /// Only books in this category
        #[arg(long)]
        category: Option<String>,

        /// Only books already read
        #[arg(long, conflicts_with = "unread")]
        read: bool,

        /// Only books not yet read
        #[arg(long)]
        unread: bool,

        /// Only books currently lent out
        #[arg(long, conflicts_with = "available")]
        borrowed: bool,

        /// Only books on the shelf
        #[arg(long)]
        available: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search books by title, author, ISBN, tags and more
    Search {
        /// Text to look for
        query: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display every field of a book
    Show {
        /// Book id
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a book and its cover image
    Delete {
        /// Book id
        id: i64,
    },

    /// Attach a cover image to a book
    Cover {
        /// Book id
        id: i64,

        /// Image file to copy into the catalog
        image: PathBuf,
    },

    /// Display catalog statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the catalog to a single-file archive
    Export {
        /// Archive path (a .json name is written as .zip)
        dest: PathBuf,
    },

    /// Import books from an archive, skipping ones already catalogued
    Import {
        /// Archive or plain manifest file
        src: PathBuf,

        /// Output the import report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct AddArgs {
    /// Book title
    title: String,

    /// Subtitle
    #[arg(long)]
    subtitle: Option<String>,

    /// Author name (repeat for several authors)
    #[arg(short, long = "author")]
    authors: Vec<String>,

    /// Category name
    #[arg(short, long)]
    category: Option<String>,

    /// ISBN-10
    #[arg(long)]
    isbn10: Option<String>,

    /// ISBN-13
    #[arg(long)]
    isbn13: Option<String>,

    /// Publisher
    #[arg(long)]
    publisher: Option<String>,

    /// Year of publication
    #[arg(long)]
    year: Option<i32>,

    /// Shelf label
    #[arg(long)]
    shelf: Option<String>,

    /// Room or building
    #[arg(long)]
    location: Option<String>,

    /// Comma-separated tags
    #[arg(long)]
    tags: Option<String>,

    /// Format (hardcover, paperback, ...)
    #[arg(long)]
    format: Option<String>,

    /// Language
    #[arg(long)]
    language: Option<String>,

    /// Free-text notes
    #[arg(long)]
    notes: Option<String>,

    /// Star rating (0 to 5)
    #[arg(long, value_parser = parse_rating)]
    rating: Option<u8>,

    /// Mark as already read
    #[arg(long)]
    read: bool,
}

impl From<AddArgs> for NewBook {
    fn from(args: AddArgs) -> Self {
        Self {
            title: args.title,
            subtitle: args.subtitle,
            authors: args.authors,
            category: args.category,
            isbn10: args.isbn10,
            isbn13: args.isbn13,
            publisher: args.publisher,
            year: args.year,
            shelf: args.shelf,
            location: args.location,
            tags: args.tags,
            format: args.format,
            language: args.language,
            notes: args.notes,
            rating: args.rating,
            read: args.read,
        }
    }
}

#[derive(Args)]
struct EditArgs {
    /// Book id
    id: i64,

    /// New title
    #[arg(long)]
    title: Option<String>,

    /// Subtitle
    #[arg(long)]
    subtitle: Option<String>,

    /// Author name; replaces the current authors (repeat for several)
    #[arg(short, long = "author")]
    authors: Vec<String>,

    /// Category name (an empty name removes the category)
    #[arg(short, long)]
    category: Option<String>,

    /// ISBN-10
    #[arg(long)]
    isbn10: Option<String>,

    /// ISBN-13
    #[arg(long)]
    isbn13: Option<String>,

    /// Publisher
    #[arg(long)]
    publisher: Option<String>,

    /// Year of publication
    #[arg(long)]
    year: Option<i32>,

    /// Shelf label
    #[arg(long)]
    shelf: Option<String>,

    /// Room or building
    #[arg(long)]
    location: Option<String>,

    /// Comma-separated tags
    #[arg(long)]
    tags: Option<String>,

    /// Format (hardcover, paperback, ...)
    #[arg(long)]
    format: Option<String>,

    /// Language
    #[arg(long)]
    language: Option<String>,

    /// Free-text notes
    #[arg(long)]
    notes: Option<String>,

    /// Star rating (0 to 5)
    #[arg(long, value_parser = parse_rating)]
    rating: Option<u8>,

    /// Mark as read
    #[arg(long, conflicts_with = "unread")]
    read: bool,

    /// Mark as not yet read
    #[arg(long)]
    unread: bool,

    /// Lend the book to someone
    #[arg(long, value_name = "NAME", conflicts_with = "returned")]
    lend: Option<String>,

    /// Mark a lent book as returned
    #[arg(long = "return")]
    returned: bool,
}

impl From<EditArgs> for BookEdit {
    fn from(args: EditArgs) -> Self {
        Self {
            title: args.title,
            subtitle: args.subtitle,
            authors: args.authors,
            category: args.category,
            isbn10: args.isbn10,
            isbn13: args.isbn13,
            publisher: args.publisher,
            year: args.year,
            shelf: args.shelf,
            location: args.location,
            tags: args.tags,
            format: args.format,
            language: args.language,
            notes: args.notes,
            rating: args.rating,
            read: read_flag(args.read, args.unread),
            lend_to: args.lend,
            returned: args.returned,
        }
    }
}

/// Collapse a `--read`/`--unread` pair into an optional setting
fn read_flag(read: bool, unread: bool) -> Option<bool> {
    match (read, unread) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "homelib_cli=debug,homelib_core=debug"
    } else {
        "homelib_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let catalog = Catalog::open(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Add(args) => commands::add(&catalog, args.into()),

        Commands::Edit(args) => {
            let id = args.id;
            commands::edit(&catalog, id, args.into())
        }

        Commands::List {
            category,
            read,
            unread,
            borrowed,
            available,
            json,
        } => {
            let filter = BookFilter {
                category,
                is_read: read_flag(read, unread),
                is_borrowed: match (borrowed, available) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            commands::list(&catalog, filter, json)
        }

        Commands::Search { query, json } => commands::search(&catalog, &query, json),

        Commands::Show { id, json } => commands::show(&catalog, id, json),

        Commands::Delete { id } => commands::delete(&catalog, id),

        Commands::Cover { id, image } => commands::cover(&catalog, id, &image),

        Commands::Stats { json } => commands::stats(&catalog, json),

        Commands::Export { dest } => commands::export(&catalog, &dest),

        Commands::Import { src, json } => commands::import(&catalog, &src, json),
    }
}
