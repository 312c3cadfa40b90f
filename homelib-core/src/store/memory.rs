//! In-process record store

use super::{dedupe_authors, matches_query, BookFilter, RecordStore, StoreResult};
use crate::error::StoreError;
use crate::types::{Author, Book, Category};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct State {
    books: BTreeMap<i64, Book>,
    authors: BTreeMap<i64, String>,
    categories: BTreeMap<i64, String>,
    next_book_id: i64,
    next_author_id: i64,
    next_category_id: i64,
}

impl State {
    fn author_id(&mut self, name: &str) -> i64 {
        if let Some((id, _)) = self.authors.iter().find(|(_, n)| n.as_str() == name) {
            return *id;
        }
        self.next_author_id += 1;
        self.authors.insert(self.next_author_id, name.to_string());
        self.next_author_id
    }

    fn category_id(&mut self, name: &str) -> i64 {
        if let Some((id, _)) = self.categories.iter().find(|(_, n)| n.as_str() == name) {
            return *id;
        }
        self.next_category_id += 1;
        self.categories
            .insert(self.next_category_id, name.to_string());
        self.next_category_id
    }

    fn sorted_books<'a>(&self, books: impl Iterator<Item = &'a Book>) -> Vec<Book> {
        let mut books: Vec<Book> = books.cloned().collect();
        books.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        books
    }
}

/// Record store held entirely in memory; contents vanish with the value
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl RecordStore for MemoryStore {
    fn list_all(&self) -> StoreResult<Vec<Book>> {
        let state = self.read()?;
        Ok(state.sorted_books(state.books.values()))
    }

    fn find_by_id(&self, id: i64) -> StoreResult<Option<Book>> {
        Ok(self.read()?.books.get(&id).cloned())
    }

    fn find_by_isbn(&self, isbn: &str) -> StoreResult<Option<Book>> {
        if isbn.is_empty() {
            return Ok(None);
        }
        let state = self.read()?;
        Ok(state
            .books
            .values()
            .find(|b| b.isbn10.as_deref() == Some(isbn) || b.isbn13.as_deref() == Some(isbn))
            .cloned())
    }

    fn save(&self, mut book: Book) -> StoreResult<Book> {
        book.validate().map_err(StoreError::Invalid)?;

        let mut state = self.write()?;
        let id = match book.id {
            Some(id) if !state.books.contains_key(&id) => return Err(StoreError::NotFound(id)),
            Some(id) => id,
            None => {
                state.next_book_id += 1;
                state.next_book_id
            }
        };

        if let Some(category) = book.category.as_mut() {
            if category.id.is_none() {
                category.id = Some(state.category_id(&category.name));
            }
        }
        for author in &mut book.authors {
            if author.id.is_none() {
                author.id = Some(state.author_id(&author.name));
            }
        }
        dedupe_authors(&mut book);

        book.id = Some(id);
        state.books.insert(id, book.clone());
        Ok(book)
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.write()?.books.remove(&id).is_some())
    }

    fn search(&self, query: &str) -> StoreResult<Vec<Book>> {
        let state = self.read()?;
        Ok(state.sorted_books(state.books.values().filter(|b| matches_query(b, query))))
    }

    fn filter(&self, filter: &BookFilter) -> StoreResult<Vec<Book>> {
        let state = self.read()?;
        Ok(state.sorted_books(state.books.values().filter(|b| filter.matches(b))))
    }

    fn categories(&self) -> StoreResult<Vec<Category>> {
        let state = self.read()?;
        let mut categories: Vec<Category> = state
            .categories
            .iter()
            .map(|(id, name)| Category {
                id: Some(*id),
                name: name.clone(),
            })
            .collect();
        categories.sort_by_key(|c| c.name.to_lowercase());
        Ok(categories)
    }

    fn authors(&self) -> StoreResult<Vec<Author>> {
        let state = self.read()?;
        let mut authors: Vec<Author> = state
            .authors
            .iter()
            .map(|(id, name)| Author {
                id: Some(*id),
                name: name.clone(),
            })
            .collect();
        authors.sort_by_key(|a| a.name.to_lowercase());
        Ok(authors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_list_sorted() {
        let store = MemoryStore::new();
        store.save(Book::new("emma").with_author("Jane Austen")).unwrap();
        store.save(Book::new("Dune").with_author("Frank Herbert")).unwrap();

        let titles: Vec<String> = store.list_all().unwrap().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Dune", "emma"]);
    }

    #[test]
    fn test_get_or_create_names() {
        let store = MemoryStore::new();
        let a = store
            .save(Book::new("Dune").with_author("Frank Herbert").with_category("SF"))
            .unwrap();
        let b = store
            .save(Book::new("Dune Messiah").with_author("Frank Herbert").with_category("SF"))
            .unwrap();

        assert_eq!(a.authors[0].id, b.authors[0].id);
        assert_eq!(a.category.unwrap().id, b.category.unwrap().id);
        assert_eq!(store.stats().unwrap().total_authors, 1);
    }

    #[test]
    fn test_repeated_author_is_kept_once() {
        let store = MemoryStore::new();
        let saved = store
            .save(Book::new("Dune").with_author("Frank Herbert").with_author("Frank Herbert"))
            .unwrap();
        assert_eq!(saved.author_names(), vec!["Frank Herbert"]);
        assert_eq!(
            store.find_by_id(saved.id.unwrap()).unwrap().unwrap().author_names(),
            vec!["Frank Herbert"]
        );
    }

    #[test]
    fn test_update_unknown_id() {
        let store = MemoryStore::new();
        let mut book = Book::new("Dune");
        book.id = Some(4);
        assert!(matches!(store.save(book), Err(StoreError::NotFound(4))));
    }

    #[test]
    fn test_find_by_isbn_either_variant() {
        let store = MemoryStore::new();
        store
            .save(Book::new("Dune").with_isbn10("0441013597").with_isbn13("9780441013593"))
            .unwrap();

        assert!(store.find_by_isbn("0441013597").unwrap().is_some());
        assert!(store.find_by_isbn("9780441013593").unwrap().is_some());
        assert!(store.find_by_isbn("").unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let store = MemoryStore::new();
        let saved = store.save(Book::new("Dune")).unwrap();
        assert!(store.delete(saved.id.unwrap()).unwrap());
        assert!(store.list_all().unwrap().is_empty());
    }
}
