//! SQLite-backed record store

use super::{dedupe_authors, BookFilter, LibraryStats, RecordStore, StoreResult};
use crate::archive::parse_timestamp;
use crate::error::StoreError;
use crate::types::{Author, Book, Category};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOK_SELECT: &str = "
    SELECT b.id, b.title, b.subtitle, b.isbn10, b.isbn13, b.publisher, b.year_published,
           b.shelf_location, b.tags, b.format, b.language, b.notes, b.date_added, b.is_read,
           b.rating, b.cover_image_path, b.physical_location, b.is_borrowed, b.borrowed_to,
           b.borrowed_date, c.id AS category_id, c.name AS category_name
    FROM book b
    LEFT JOIN category c ON c.id = b.category_id";

/// Columns added after the first release; applied to older databases
const MIGRATIONS: &[&str] = &[
    "ALTER TABLE book ADD COLUMN physical_location TEXT",
    "ALTER TABLE book ADD COLUMN is_borrowed INTEGER NOT NULL DEFAULT 0",
    "ALTER TABLE book ADD COLUMN borrowed_to TEXT",
    "ALTER TABLE book ADD COLUMN borrowed_date TEXT",
];

/// Record store kept in a SQLite database file
pub struct SqliteStore {
    /// Database connection (mutex for interior mutability)
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::info!("Connected to database: {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    /// An in-memory database (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn initialize_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS author (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS book (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                subtitle TEXT,
                isbn10 TEXT,
                isbn13 TEXT,
                publisher TEXT,
                year_published INTEGER,
                category_id INTEGER REFERENCES category(id),
                shelf_location TEXT,
                tags TEXT,
                format TEXT,
                language TEXT,
                notes TEXT,
                date_added TEXT DEFAULT CURRENT_TIMESTAMP,
                is_read INTEGER NOT NULL DEFAULT 0,
                rating INTEGER,
                cover_image_path TEXT,
                physical_location TEXT,
                is_borrowed INTEGER NOT NULL DEFAULT 0,
                borrowed_to TEXT,
                borrowed_date TEXT
            );

            CREATE TABLE IF NOT EXISTS book_author (
                book_id INTEGER NOT NULL REFERENCES book(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL REFERENCES author(id) ON DELETE CASCADE,
                position INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (book_id, author_id)
            );

            CREATE INDEX IF NOT EXISTS idx_book_title ON book(title);
            CREATE INDEX IF NOT EXISTS idx_book_isbn10 ON book(isbn10);
            CREATE INDEX IF NOT EXISTS idx_book_isbn13 ON book(isbn13);
            CREATE INDEX IF NOT EXISTS idx_author_name ON author(name);
            CREATE INDEX IF NOT EXISTS idx_book_author_book ON book_author(book_id);
            CREATE INDEX IF NOT EXISTS idx_book_author_author ON book_author(author_id);
            ",
        )?;

        for migration in MIGRATIONS {
            match conn.execute(migration, []) {
                Ok(_) => tracing::info!("Migration executed: {}", migration),
                Err(e) if e.to_string().contains("duplicate column name") => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}

impl RecordStore for SqliteStore {
    fn list_all(&self) -> StoreResult<Vec<Book>> {
        let conn = self.lock()?;
        let books = query_books(&conn, "", &[])?;
        tracing::debug!("Found {} books", books.len());
        Ok(books)
    }

    fn find_by_id(&self, id: i64) -> StoreResult<Option<Book>> {
        let conn = self.lock()?;
        Ok(query_books(&conn, "WHERE b.id = ?1", &[&id])?.pop())
    }

    fn find_by_isbn(&self, isbn: &str) -> StoreResult<Option<Book>> {
        if isbn.is_empty() {
            return Ok(None);
        }
        let conn = self.lock()?;
        let books = query_books(&conn, "WHERE b.isbn10 = ?1 OR b.isbn13 = ?1", &[&isbn])?;
        Ok(books.into_iter().next())
    }

    fn save(&self, mut book: Book) -> StoreResult<Book> {
        book.validate().map_err(StoreError::Invalid)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if let Some(category) = book.category.as_mut() {
            if category.id.is_none() {
                category.id = Some(category_id_for(&tx, &category.name)?);
            }
        }
        for author in &mut book.authors {
            if author.id.is_none() {
                author.id = Some(author_id_for(&tx, &author.name)?);
            }
        }
        dedupe_authors(&mut book);

        let category_id = book.category.as_ref().and_then(|c| c.id);
        let date_added = book.date_added.as_ref().map(to_db_timestamp);
        let borrowed_date = book.borrowed_date.as_ref().map(to_db_timestamp);
        let values: [&dyn ToSql; 20] = [
            &book.title,
            &book.subtitle,
            &book.isbn10,
            &book.isbn13,
            &book.publisher,
            &book.year_published,
            &category_id,
            &book.shelf_location,
            &book.tags,
            &book.format,
            &book.language,
            &book.notes,
            &date_added,
            &book.is_read,
            &book.rating,
            &book.cover_image_path,
            &book.physical_location,
            &book.is_borrowed,
            &book.borrowed_to,
            &borrowed_date,
        ];

        let book_id = match book.id {
            None => {
                tx.execute(
                    "INSERT INTO book (title, subtitle, isbn10, isbn13, publisher, year_published,
                                       category_id, shelf_location, tags, format, language, notes,
                                       date_added, is_read, rating, cover_image_path,
                                       physical_location, is_borrowed, borrowed_to, borrowed_date)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                             ?16, ?17, ?18, ?19, ?20)",
                    &values[..],
                )?;
                tx.last_insert_rowid()
            }
            Some(id) => {
                let mut with_id: Vec<&dyn ToSql> = values.to_vec();
                with_id.push(&id);
                let updated = tx.execute(
                    "UPDATE book SET title = ?1, subtitle = ?2, isbn10 = ?3, isbn13 = ?4,
                                     publisher = ?5, year_published = ?6, category_id = ?7,
                                     shelf_location = ?8, tags = ?9, format = ?10, language = ?11,
                                     notes = ?12, date_added = ?13, is_read = ?14, rating = ?15,
                                     cover_image_path = ?16, physical_location = ?17,
                                     is_borrowed = ?18, borrowed_to = ?19, borrowed_date = ?20
                     WHERE id = ?21",
                    &with_id[..],
                )?;
                if updated == 0 {
                    return Err(StoreError::NotFound(id));
                }
                id
            }
        };

        tx.execute("DELETE FROM book_author WHERE book_id = ?1", [book_id])?;
        for (position, author) in book.authors.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO book_author (book_id, author_id, position)
                 VALUES (?1, ?2, ?3)",
                params![book_id, author.id, position as i64],
            )?;
        }

        tx.commit()?;
        book.id = Some(book_id);
        tracing::debug!("Saved book {}: {}", book_id, book.title);
        Ok(book)
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM book_author WHERE book_id = ?1", [id])?;
        let affected = tx.execute("DELETE FROM book WHERE id = ?1", [id])?;
        tx.commit()?;
        tracing::debug!("Deleted book with id: {}", id);
        Ok(affected > 0)
    }

    fn search(&self, query: &str) -> StoreResult<Vec<Book>> {
        let pattern = format!("%{}%", escape_like(query));
        let condition = [
            "b.title",
            "b.subtitle",
            "b.isbn10",
            "b.isbn13",
            "c.name",
            "b.tags",
            "b.publisher",
            "b.physical_location",
            "b.borrowed_to",
            "a.name",
        ]
        .iter()
        .map(|column| format!("{} LIKE ?1 ESCAPE '\\'", column))
        .collect::<Vec<_>>()
        .join(" OR ");

        let where_clause = format!(
            "WHERE b.id IN (
                SELECT b.id FROM book b
                LEFT JOIN category c ON c.id = b.category_id
                LEFT JOIN book_author ba ON ba.book_id = b.id
                LEFT JOIN author a ON a.id = ba.author_id
                WHERE {}
            )",
            condition
        );

        let conn = self.lock()?;
        query_books(&conn, &where_clause, &[&pattern])
    }

    fn filter(&self, filter: &BookFilter) -> StoreResult<Vec<Book>> {
        let mut clauses = Vec::new();
        let mut values: Vec<&dyn ToSql> = Vec::new();

        if let Some(category) = &filter.category {
            values.push(category);
            clauses.push(format!("c.name = ?{} COLLATE NOCASE", values.len()));
        }
        if let Some(is_read) = &filter.is_read {
            values.push(is_read);
            clauses.push(format!("b.is_read = ?{}", values.len()));
        }
        if let Some(is_borrowed) = &filter.is_borrowed {
            values.push(is_borrowed);
            clauses.push(format!("b.is_borrowed = ?{}", values.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = self.lock()?;
        query_books(&conn, &where_clause, &values)
    }

    fn categories(&self) -> StoreResult<Vec<Category>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name FROM category ORDER BY name COLLATE NOCASE")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    fn authors(&self) -> StoreResult<Vec<Author>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name FROM author ORDER BY name COLLATE NOCASE")?;
        let authors = stmt
            .query_map([], |row| {
                Ok(Author {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(authors)
    }

    fn stats(&self) -> StoreResult<LibraryStats> {
        let conn = self.lock()?;
        let count = |sql: &str| -> StoreResult<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        };

        Ok(LibraryStats {
            total_books: count("SELECT COUNT(*) FROM book")?,
            read_books: count("SELECT COUNT(*) FROM book WHERE is_read = 1")?,
            unread_books: count("SELECT COUNT(*) FROM book WHERE is_read = 0")?,
            borrowed_books: count("SELECT COUNT(*) FROM book WHERE is_borrowed = 1")?,
            total_authors: count("SELECT COUNT(*) FROM author")?,
            total_categories: count("SELECT COUNT(*) FROM category")?,
        })
    }
}

fn query_books(
    conn: &Connection,
    where_clause: &str,
    values: &[&dyn ToSql],
) -> StoreResult<Vec<Book>> {
    let sql = format!(
        "{} {} ORDER BY b.title COLLATE NOCASE, b.id",
        BOOK_SELECT, where_clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut books = stmt
        .query_map(values, book_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if !books.is_empty() {
        let mut authors = authors_by_book(conn)?;
        for book in &mut books {
            if let Some(list) = book.id.and_then(|id| authors.remove(&id)) {
                book.authors = list;
            }
        }
    }
    Ok(books)
}

fn authors_by_book(conn: &Connection) -> StoreResult<HashMap<i64, Vec<Author>>> {
    let mut stmt = conn.prepare(
        "SELECT ba.book_id, a.id, a.name
         FROM book_author ba
         JOIN author a ON a.id = ba.author_id
         ORDER BY ba.book_id, ba.position",
    )?;
    let mut rows = stmt.query([])?;

    let mut by_book: HashMap<i64, Vec<Author>> = HashMap::new();
    while let Some(row) = rows.next()? {
        by_book.entry(row.get(0)?).or_default().push(Author {
            id: Some(row.get(1)?),
            name: row.get(2)?,
        });
    }
    Ok(by_book)
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let category = match row.get::<_, Option<i64>>("category_id")? {
        Some(id) => Some(Category {
            id: Some(id),
            name: row.get("category_name")?,
        }),
        None => None,
    };
    let rating: Option<i64> = row.get("rating")?;

    Ok(Book {
        id: Some(row.get("id")?),
        title: row.get("title")?,
        subtitle: row.get("subtitle")?,
        isbn10: row.get("isbn10")?,
        isbn13: row.get("isbn13")?,
        publisher: row.get("publisher")?,
        year_published: row.get("year_published")?,
        category,
        shelf_location: row.get("shelf_location")?,
        tags: row.get("tags")?,
        format: row.get("format")?,
        language: row.get("language")?,
        notes: row.get("notes")?,
        date_added: from_db_timestamp(row.get("date_added")?),
        is_read: row.get("is_read")?,
        rating: rating.and_then(|r| u8::try_from(r).ok()),
        cover_image_path: row.get("cover_image_path")?,
        physical_location: row.get("physical_location")?,
        is_borrowed: row.get("is_borrowed")?,
        borrowed_to: row.get("borrowed_to")?,
        borrowed_date: from_db_timestamp(row.get("borrowed_date")?),
        authors: Vec::new(),
    })
}

fn category_id_for(tx: &Transaction<'_>, name: &str) -> rusqlite::Result<i64> {
    let existing = tx
        .query_row("SELECT id FROM category WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?;
    match existing {
        Some(id) => Ok(id),
        None => {
            tx.execute("INSERT INTO category (name) VALUES (?1)", [name])?;
            Ok(tx.last_insert_rowid())
        }
    }
}

fn author_id_for(tx: &Transaction<'_>, name: &str) -> rusqlite::Result<i64> {
    let existing = tx
        .query_row("SELECT id FROM author WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?;
    match existing {
        Some(id) => Ok(id),
        None => {
            tx.execute("INSERT INTO author (name) VALUES (?1)", [name])?;
            Ok(tx.last_insert_rowid())
        }
    }
}

fn to_db_timestamp(value: &NaiveDateTime) -> String {
    value.format(DB_TIMESTAMP_FORMAT).to_string()
}

fn from_db_timestamp(value: Option<String>) -> Option<NaiveDateTime> {
    value.as_deref().and_then(parse_timestamp)
}

fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> Book {
        let mut book = Book::new("Dune")
            .with_author("Frank Herbert")
            .with_category("Science Fiction")
            .with_isbn13("9780441013593");
        book.rating = Some(5);
        book.year_published = Some(1965);
        book
    }

    #[test]
    fn test_save_assigns_ids() {
        let store = SqliteStore::in_memory().unwrap();
        let saved = store.save(dune()).unwrap();

        assert!(saved.id.is_some());
        assert!(saved.authors[0].id.is_some());
        assert!(saved.category.as_ref().unwrap().id.is_some());

        let loaded = store.find_by_id(saved.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.title, "Dune");
        assert_eq!(loaded.author_names(), vec!["Frank Herbert"]);
        assert_eq!(loaded.category_name(), Some("Science Fiction"));
        assert_eq!(loaded.rating, Some(5));
        assert_eq!(loaded.year_published, Some(1965));
        assert_eq!(loaded.date_added, saved.date_added);
    }

    #[test]
    fn test_author_order_is_kept() {
        let store = SqliteStore::in_memory().unwrap();
        let book = Book::new("Good Omens")
            .with_author("Terry Pratchett")
            .with_author("Neil Gaiman");
        let saved = store.save(book).unwrap();

        let loaded = store.find_by_id(saved.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.author_names(), vec!["Terry Pratchett", "Neil Gaiman"]);
    }

    #[test]
    fn test_repeated_author_is_stored_once() {
        let store = SqliteStore::in_memory().unwrap();
        let book = Book::new("Good Omens")
            .with_author("Terry Pratchett")
            .with_author("Neil Gaiman")
            .with_author("Terry Pratchett");
        let saved = store.save(book).unwrap();
        assert_eq!(saved.author_names(), vec!["Terry Pratchett", "Neil Gaiman"]);

        let loaded = store.find_by_id(saved.id.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.author_names(), vec!["Terry Pratchett", "Neil Gaiman"]);
        assert_eq!(store.authors().unwrap().len(), 2);
    }

    #[test]
    fn test_authors_and_categories_are_shared() {
        let store = SqliteStore::in_memory().unwrap();
        store.save(dune()).unwrap();
        store
            .save(
                Book::new("Children of Dune")
                    .with_author("Frank Herbert")
                    .with_category("Science Fiction"),
            )
            .unwrap();

        assert_eq!(store.authors().unwrap().len(), 1);
        assert_eq!(store.categories().unwrap().len(), 1);
    }

    #[test]
    fn test_update_existing() {
        let store = SqliteStore::in_memory().unwrap();
        let mut saved = store.save(dune()).unwrap();
        saved.is_read = true;
        saved.authors = vec![Author::new("F. Herbert")];
        let id = saved.id.unwrap();
        store.save(saved).unwrap();

        let loaded = store.find_by_id(id).unwrap().unwrap();
        assert!(loaded.is_read);
        assert_eq!(loaded.author_names(), vec!["F. Herbert"]);
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_update_missing_book() {
        let store = SqliteStore::in_memory().unwrap();
        let mut book = dune();
        book.id = Some(99);
        assert!(matches!(store.save(book), Err(StoreError::NotFound(99))));
    }

    #[test]
    fn test_save_rejects_invalid() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            store.save(Book::new("")),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_find_by_isbn() {
        let store = SqliteStore::in_memory().unwrap();
        store.save(dune()).unwrap();

        assert!(store.find_by_isbn("9780441013593").unwrap().is_some());
        assert!(store.find_by_isbn("0000000000").unwrap().is_none());
        assert!(store.find_by_isbn("").unwrap().is_none());
    }

    #[test]
    fn test_search_and_filter() {
        let store = SqliteStore::in_memory().unwrap();
        store.save(dune()).unwrap();
        let mut emma = Book::new("Emma").with_author("Jane Austen");
        emma.is_borrowed = true;
        emma.borrowed_to = Some("Harriet 100%".to_string());
        store.save(emma).unwrap();

        assert_eq!(store.search("herbert").unwrap().len(), 1);
        assert_eq!(store.search("AUSTEN").unwrap()[0].title, "Emma");
        assert_eq!(store.search("100%").unwrap().len(), 1);
        assert_eq!(store.search("%").unwrap().len(), 1);

        let borrowed = store
            .filter(&BookFilter {
                is_borrowed: Some(true),
                ..BookFilter::default()
            })
            .unwrap();
        assert_eq!(borrowed.len(), 1);

        let scifi = store
            .filter(&BookFilter {
                category: Some("science fiction".to_string()),
                ..BookFilter::default()
            })
            .unwrap();
        assert_eq!(scifi[0].title, "Dune");
    }

    #[test]
    fn test_delete_and_stats() {
        let store = SqliteStore::in_memory().unwrap();
        let saved = store.save(dune()).unwrap();
        store.save(Book::new("Emma").with_author("Jane Austen")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_books, 2);
        assert_eq!(stats.unread_books, 2);
        assert_eq!(stats.total_authors, 2);

        assert!(store.delete(saved.id.unwrap()).unwrap());
        assert!(!store.delete(saved.id.unwrap()).unwrap());
        assert_eq!(store.stats().unwrap().total_books, 1);
    }

    #[test]
    fn test_reopen_runs_migrations_quietly() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("library.db");
        SqliteStore::open(&path).unwrap().save(dune()).unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.list_all().unwrap().len(), 1);
    }
}
