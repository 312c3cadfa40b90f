//! Catalog browsing and editing commands

use super::Catalog;
use anyhow::{bail, Context, Result};
use homelib_core::archive::format_timestamp;
use homelib_core::{Author, Book, BookFilter, Category};
use std::path::Path;

/// Fields accepted by `add`
#[derive(Debug, Default)]
pub struct NewBook {
    pub title: String,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub category: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub shelf: Option<String>,
    pub location: Option<String>,
    pub tags: Option<String>,
    pub format: Option<String>,
    pub language: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<u8>,
    pub read: bool,
}

impl NewBook {
    fn into_book(self) -> Book {
        let mut book = Book::new(self.title.trim());
        for author in self.authors.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
            book = book.with_author(author);
        }
        if let Some(category) = self.category.filter(|c| !c.trim().is_empty()) {
            book = book.with_category(category.trim());
        }
        book.subtitle = self.subtitle;
        book.isbn10 = self.isbn10;
        book.isbn13 = self.isbn13;
        book.publisher = self.publisher;
        book.year_published = self.year;
        book.shelf_location = self.shelf;
        book.physical_location = self.location;
        book.tags = self.tags;
        book.format = self.format;
        book.language = self.language;
        book.notes = self.notes;
        book.rating = self.rating;
        book.is_read = self.read;
        book
    }
}

/// Changes accepted by `edit`; unset fields leave the book as it is
#[derive(Debug, Default)]
pub struct BookEdit {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    /// Replaces the whole author list when non-empty
    pub authors: Vec<String>,
    /// An empty name clears the category
    pub category: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub shelf: Option<String>,
    pub location: Option<String>,
    pub tags: Option<String>,
    pub format: Option<String>,
    pub language: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<u8>,
    pub read: Option<bool>,
    pub lend_to: Option<String>,
    pub returned: bool,
}

impl BookEdit {
    fn apply(self, book: &mut Book) -> Result<()> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                bail!("Title must not be empty");
            }
            book.title = title.trim().to_string();
        }
        let authors: Vec<&str> = self
            .authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .collect();
        if !authors.is_empty() {
            book.authors = authors.into_iter().map(Author::new).collect();
        }
        if let Some(category) = self.category {
            let name = category.trim();
            book.category = (!name.is_empty()).then(|| Category::new(name));
        }

        replace(&mut book.subtitle, self.subtitle);
        replace(&mut book.isbn10, self.isbn10);
        replace(&mut book.isbn13, self.isbn13);
        replace(&mut book.publisher, self.publisher);
        replace(&mut book.year_published, self.year);
        replace(&mut book.shelf_location, self.shelf);
        replace(&mut book.physical_location, self.location);
        replace(&mut book.tags, self.tags);
        replace(&mut book.format, self.format);
        replace(&mut book.language, self.language);
        replace(&mut book.notes, self.notes);
        replace(&mut book.rating, self.rating);
        if let Some(read) = self.read {
            book.is_read = read;
        }

        if let Some(borrower) = self.lend_to {
            book.lend_to(borrower.trim());
        } else if self.returned {
            book.mark_returned();
        }
        Ok(())
    }
}

fn replace<T>(field: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *field = value;
    }
}

/// Add a book to the catalog
pub fn add(catalog: &Catalog, new_book: NewBook) -> Result<()> {
    if new_book.title.trim().is_empty() {
        bail!("Title must not be empty");
    }

    let book = catalog
        .service()
        .save_book(new_book.into_book())
        .context("Failed to save book")?;

    println!(
        "Added book {}: {}",
        book.id.unwrap_or_default(),
        book.title
    );
    Ok(())
}

/// Change fields of an existing book
pub fn edit(catalog: &Catalog, id: i64, changes: BookEdit) -> Result<()> {
    let service = catalog.service();
    let mut book = service
        .find_book(id)?
        .with_context(|| format!("No book with id {}", id))?;

    changes.apply(&mut book)?;
    let book = service.save_book(book).context("Failed to save book")?;

    println!("Updated book {}: {}", id, book.title);
    Ok(())
}

/// List books, optionally narrowed by category, read or borrowed status
pub fn list(catalog: &Catalog, filter: BookFilter, json: bool) -> Result<()> {
    let books = catalog.service().filter(&filter)?;
    print_books(&books, json)
}

/// Search books by title, author, ISBN and other descriptive fields
pub fn search(catalog: &Catalog, query: &str, json: bool) -> Result<()> {
    let books = catalog.service().search(query)?;
    print_books(&books, json)
}

/// Show every field of one book
pub fn show(catalog: &Catalog, id: i64, json: bool) -> Result<()> {
    let book = catalog
        .service()
        .find_book(id)?
        .with_context(|| format!("No book with id {}", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&book)?);
        return Ok(());
    }

    println!("Title:       {}", book.title);
    if let Some(subtitle) = &book.subtitle {
        println!("Subtitle:    {}", subtitle);
    }
    if !book.authors.is_empty() {
        println!("Authors:     {}", book.author_names().join(", "));
    }
    if let Some(category) = book.category_name() {
        println!("Category:    {}", category);
    }
    print_field("ISBN-10:", book.isbn10.as_deref());
    print_field("ISBN-13:", book.isbn13.as_deref());
    print_field("Publisher:", book.publisher.as_deref());
    if let Some(year) = book.year_published {
        println!("Published:   {}", year);
    }
    print_field("Shelf:", book.shelf_location.as_deref());
    print_field("Location:", book.physical_location.as_deref());
    print_field("Tags:", book.tags.as_deref());
    print_field("Format:", book.format.as_deref());
    print_field("Language:", book.language.as_deref());
    if let Some(rating) = book.rating {
        println!("Rating:      {}/5", rating);
    }
    println!("Read:        {}", if book.is_read { "yes" } else { "no" });
    if book.is_borrowed {
        println!(
            "Borrowed:    {}",
            book.borrowed_to.as_deref().unwrap_or("yes")
        );
        if let Some(date) = &book.borrowed_date {
            println!("Since:       {}", format_timestamp(date));
        }
    }
    if let Some(added) = &book.date_added {
        println!("Added:       {}", format_timestamp(added));
    }
    print_field("Cover:", book.cover_image_path.as_deref());
    print_field("Notes:", book.notes.as_deref());

    Ok(())
}

/// Delete a book and its cover
pub fn delete(catalog: &Catalog, id: i64) -> Result<()> {
    if !catalog.service().delete_book(id)? {
        bail!("No book with id {}", id);
    }
    println!("Deleted book {}", id);
    Ok(())
}

/// Attach a cover image to a book
pub fn cover(catalog: &Catalog, id: i64, image: &Path) -> Result<()> {
    let book = catalog
        .service()
        .set_cover(id, image)
        .with_context(|| format!("Failed to set cover for book {}", id))?;

    println!(
        "Cover for '{}' saved to {}",
        book.title,
        book.cover_image_path.unwrap_or_default()
    );
    Ok(())
}

/// Show catalog totals
pub fn stats(catalog: &Catalog, json: bool) -> Result<()> {
    let stats = catalog.service().stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Books:       {}", stats.total_books);
        println!("  Read:      {}", stats.read_books);
        println!("  Unread:    {}", stats.unread_books);
        println!("  Borrowed:  {}", stats.borrowed_books);
        println!("Authors:     {}", stats.total_authors);
        println!("Categories:  {}", stats.total_categories);
        println!("Database:    {}", catalog.config.database_path().display());
    }
    Ok(())
}

fn print_books(books: &[Book], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(books)?);
        return Ok(());
    }

    if books.is_empty() {
        println!("No books found");
        return Ok(());
    }

    for book in books {
        let mut line = format!("{:>5}  {}", book.id.unwrap_or_default(), book.title);
        if !book.authors.is_empty() {
            line.push_str(&format!(" by {}", book.author_names().join(", ")));
        }
        if let Some(category) = book.category_name() {
            line.push_str(&format!(" [{}]", category));
        }
        if book.is_read {
            line.push_str(" (read)");
        }
        if book.is_borrowed {
            match &book.borrowed_to {
                Some(to) => line.push_str(&format!(" (borrowed by {})", to)),
                None => line.push_str(" (borrowed)"),
            }
        }
        println!("{}", line);
    }
    println!("\n{} book(s)", books.len());
    Ok(())
}

fn print_field(label: &str, value: Option<&str>) {
    if let Some(value) = value {
        println!("{:<12} {}", label, value);
    }
}
