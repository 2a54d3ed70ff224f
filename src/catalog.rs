//! Demo models the CLI resolves against: a small library.
#![allow(dead_code, reason = "the CLI resolves keys and URLs; instances are only built in tests")]

use std::sync::Arc;

use hrefs::{Declaration, Field, FieldType, Href, Key, PrimaryKey, Referrable, Resolver, Result, Target};
use serde_json::Value;
use url::Url;

/// A book, keyed by its integer `id`.
pub struct Book {
    /// Key field.
    pub id: i64,
    /// Not part of the key.
    pub title: String,
}

impl Referrable for Book {
    const NAME: &'static str = "Book";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("get_book")
            .field(Field::new("id", FieldType::INT))
            .field(Field::new("title", FieldType::STR));
    }

    fn field(&self, name: &str) -> Option<Key> {
        return match name {
            "id" => Some(Key::Int(self.id)),
            "title" => Some(Key::Str(self.title.clone())),
            _ => None,
        };
    }
}

/// A page of a book, keyed by the book and the page number.
pub struct Page {
    /// Book the page belongs to.
    pub book: Href<Book>,
    /// Position within the book.
    pub page_number: i64,
}

impl Referrable for Page {
    const NAME: &'static str = "Page";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("books:get_page")
            .field(Field::new("book", FieldType::href::<Book>()).primary_key())
            .field(Field::new("page_number", FieldType::INT).primary_key());
    }

    fn field(&self, name: &str) -> Option<Key> {
        return match name {
            "book" => Some(self.book.clone().into_key()),
            "page_number" => Some(Key::Int(self.page_number)),
            _ => None,
        };
    }
}

/// The cover of a book, keyed by the book alone.
pub struct Cover {
    /// Book the cover belongs to.
    pub book: Href<Book>,
}

impl Referrable for Cover {
    const NAME: &'static str = "Cover";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("books:get_cover")
            .field(Field::new("book", FieldType::href::<Book>()).primary_key());
    }

    fn field(&self, name: &str) -> Option<Key> {
        return (name == "book").then(|| return self.book.clone().into_key());
    }
}

/// A library whose key is its own hyperlink, exposed as a UUID `id`.
pub struct Library {
    /// Own hyperlink.
    pub this: Href<Library>,
}

impl Referrable for Library {
    const NAME: &'static str = "Library";

    fn declare() -> Declaration {
        return Declaration::new().details_view("get_library").field(
            Field::new("self", FieldType::href::<Self>())
                .marker(PrimaryKey::new().name("id").type_(FieldType::UUID)),
        );
    }

    fn field(&self, name: &str) -> Option<Key> {
        return (name == "self").then(|| return self.this.clone().into_key());
    }
}

/// Resolves a raw value into a hyperlink's key and URL.
type ResolveFn = fn(Value, &dyn Resolver) -> Result<(Key, Url)>;

/// A catalog target the CLI can address by name.
pub struct Entry {
    /// Name on the command line.
    pub name: &'static str,
    /// Builds a hyperlink to the target.
    pub resolve: ResolveFn,
    /// Registers the target.
    pub target: fn() -> Result<Arc<Target>>,
}

/// Build a hyperlink to `T` and split it.
///
/// # Errors
///
/// Returns the validation error of [`Href::validate_with`].
fn resolve<T: Referrable>(value: Value, resolver: &dyn Resolver) -> Result<(Key, Url)> {
    return Href::<T>::validate_with(value, resolver).map(Href::into_parts);
}

/// Every catalog target, in listing order.
pub const ENTRIES: &[Entry] = &[
    Entry {
        name: Book::NAME,
        resolve: resolve::<Book>,
        target: hrefs::register::<Book>,
    },
    Entry {
        name: Page::NAME,
        resolve: resolve::<Page>,
        target: hrefs::register::<Page>,
    },
    Entry {
        name: Cover::NAME,
        resolve: resolve::<Cover>,
        target: hrefs::register::<Cover>,
    },
    Entry {
        name: Library::NAME,
        resolve: resolve::<Library>,
        target: hrefs::register::<Library>,
    },
];

/// Look up a catalog target by name, ignoring case.
pub fn find(name: &str) -> Option<&'static Entry> {
    return ENTRIES.iter().find(|e| return e.name.eq_ignore_ascii_case(name));
}
