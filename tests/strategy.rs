#![allow(clippy::unwrap_used, reason = "tests")]

use std::sync::Arc;

use hrefs::strategy::{href_strategy, key_strategy};
use hrefs::{
    Declaration, Error, Field, FieldType, Href, Key, PrimaryKey, Referrable, Resolver, RouteNode, Router,
    RouterResolver,
};
use proptest::prelude::*;

// ── Models ────────────────────────────────────────────────────────────

struct Book;

impl Referrable for Book {
    const NAME: &'static str = "Book";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("get_book")
            .field(Field::new("id", FieldType::INT));
    }

    fn field(&self, _name: &str) -> Option<Key> {
        return None;
    }
}

/// Keyed by an arbitrary string.
struct Shelf;

impl Referrable for Shelf {
    const NAME: &'static str = "Shelf";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("get_shelf")
            .field(Field::new("id", FieldType::STR));
    }

    fn field(&self, _name: &str) -> Option<Key> {
        return None;
    }
}

struct Page;

impl Referrable for Page {
    const NAME: &'static str = "Page";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("get_page")
            .field(Field::new("book", FieldType::href::<Book>()).primary_key())
            .field(Field::new("number", FieldType::INT).primary_key());
    }

    fn field(&self, _name: &str) -> Option<Key> {
        return None;
    }
}

/// Keyed by its own hyperlink, exposed as a UUID.
struct Member;

impl Referrable for Member {
    const NAME: &'static str = "Member";

    fn declare() -> Declaration {
        return Declaration::new().details_view("get_member").field(
            Field::new("self", FieldType::href::<Self>()).marker(PrimaryKey::new().name("id").type_(FieldType::UUID)),
        );
    }

    fn field(&self, _name: &str) -> Option<Key> {
        return None;
    }
}

/// Default `id` is a hyperlink to itself, so no key can be drawn.
struct Loop;

impl Referrable for Loop {
    const NAME: &'static str = "Loop";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("get_loop")
            .field(Field::new("id", FieldType::href::<Self>()));
    }

    fn field(&self, _name: &str) -> Option<Key> {
        return None;
    }
}

fn resolver() -> Arc<dyn Resolver> {
    let router = Arc::new(Router::new(vec![
        RouteNode::route("get_book", "/books/{id}").unwrap(),
        RouteNode::route("get_shelf", "/shelves/{id}").unwrap(),
        RouteNode::route("get_page", "/books/{book_id}/pages/{number}").unwrap(),
        RouteNode::route("get_member", "/members/{id}").unwrap(),
        RouteNode::route("get_loop", "/loops/{id}").unwrap(),
    ]));
    return Arc::new(RouterResolver::new(router, "http://x").unwrap());
}

// ── Tests ─────────────────────────────────────────────────────────────

#[test]
fn self_linked_default_key_cannot_be_generated() {
    let err = href_strategy::<Loop>(resolver()).unwrap_err();
    assert!(matches!(err, Error::UnboundedKey { ref target } if target == "Loop"), "{err}");
}

#[test]
fn key_strategy_follows_the_key_shape() {
    let page = Page::target().unwrap();
    assert!(key_strategy(&page, &resolver()).is_ok());
}

proptest! {
    #[test]
    fn generated_book_links_roundtrip(href in href_strategy::<Book>(resolver()).unwrap()) {
        let resolver = resolver();
        prop_assert_eq!(Href::<Book>::from_url(href.url().clone(), resolver.as_ref()).unwrap(), href.clone());
        prop_assert_eq!(Href::<Book>::validate_with(href.key().clone(), resolver.as_ref()).unwrap(), href);
    }

    #[test]
    fn generated_shelf_links_roundtrip(href in href_strategy::<Shelf>(resolver()).unwrap()) {
        let resolver = resolver();
        prop_assert_eq!(Href::<Shelf>::from_url(href.url().clone(), resolver.as_ref()).unwrap(), href);
    }

    #[test]
    fn generated_page_links_carry_book_links(href in href_strategy::<Page>(resolver()).unwrap()) {
        let resolver = resolver();
        match href.key() {
            Key::Tuple(parts) => {
                let book = parts.first().unwrap();
                prop_assert!(matches!(book, Key::Href { .. }), "{}", book);
            },
            other => prop_assert!(false, "unexpected key: {}", other),
        }
        prop_assert_eq!(Href::<Page>::from_url(href.url().clone(), resolver.as_ref()).unwrap(), href);
    }

    #[test]
    fn generated_member_links_use_the_override_type(href in href_strategy::<Member>(resolver()).unwrap()) {
        let resolver = resolver();
        prop_assert!(matches!(href.key(), Key::Uuid(_)), "{}", href.key());
        prop_assert_eq!(Href::<Member>::from_url(href.url().clone(), resolver.as_ref()).unwrap(), href);
    }
}
