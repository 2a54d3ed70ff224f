#![allow(clippy::unwrap_used, reason = "tests")]

use std::collections::BTreeMap;
use std::sync::Arc;

use hrefs::{
    Config, Declaration, Error, Field, FieldType, Href, Input, Key, PrimaryKey, Referrable, Resolver, RouterResolver,
    context,
};
use serde_json::json;
use uuid::Uuid;

const APP: &str = r#"
base_url = "http://example.com/api"

[[routes]]
name = "get_hero"
path = "/heroes/{id}"

[[routes]]
name = "heroes"
path = "/heroes/{hero_id}"
routes = [
    { name = "get_journal_entry", path = "/journal/{entry_id}" },
]

[[routes]]
path = "/v1"
routes = [
    { name = "get_quest", path = "/quests/{slug}" },
]
"#;

// ── Models ────────────────────────────────────────────────────────────

/// Keyed by its own hyperlink, exposed as a UUID `id`.
#[derive(serde::Serialize, serde::Deserialize)]
struct Hero {
    #[serde(rename = "self")]
    this: Href<Hero>,
    name: String,
}

impl Referrable for Hero {
    const NAME: &'static str = "Hero";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("get_hero")
            .field(
                Field::new("self", FieldType::href::<Self>())
                    .marker(PrimaryKey::new().name("id").type_(FieldType::UUID)),
            )
            .field(Field::new("name", FieldType::STR));
    }

    fn field(&self, name: &str) -> Option<Key> {
        return match name {
            "self" => Some(self.this.clone().into_key()),
            "name" => Some(Key::Str(self.name.clone())),
            _ => None,
        };
    }
}

/// Served below the `heroes` mount.
struct JournalEntry {
    hero: Href<Hero>,
    number: i64,
}

impl Referrable for JournalEntry {
    const NAME: &'static str = "JournalEntry";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("heroes:get_journal_entry")
            .field(Field::new("hero", FieldType::href::<Hero>()).primary_key())
            .field(Field::new("number", FieldType::INT).marker(PrimaryKey::new().name("entry_id")));
    }

    fn field(&self, name: &str) -> Option<Key> {
        return match name {
            "hero" => Some(self.hero.clone().into_key()),
            "number" => Some(Key::Int(self.number)),
            _ => None,
        };
    }
}

/// The hero part is not in the path and travels in the query string.
struct Quest;

impl Referrable for Quest {
    const NAME: &'static str = "Quest";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("get_quest")
            .field(Field::new("hero", FieldType::href::<Hero>()).primary_key())
            .field(Field::new("slug", FieldType::STR).primary_key());
    }

    fn field(&self, _name: &str) -> Option<Key> {
        return None;
    }
}

/// Points at an endpoint the routing table does not have.
struct Familiar;

impl Referrable for Familiar {
    const NAME: &'static str = "Familiar";

    fn declare() -> Declaration {
        return Declaration::new()
            .details_view("get_familiar")
            .field(Field::new("id", FieldType::INT));
    }

    fn field(&self, _name: &str) -> Option<Key> {
        return None;
    }
}

fn resolver() -> RouterResolver {
    return Config::parse(APP).unwrap().resolver().unwrap();
}

fn hero_id(n: u128) -> Uuid {
    return Uuid::from_u128(n);
}

// ── Tests ─────────────────────────────────────────────────────────────

#[test]
fn self_referencing_key_uses_override_type() {
    let resolver = resolver();
    let id = hero_id(1);
    let href = Href::<Hero>::validate_with(id, &resolver).unwrap();
    assert_eq!(href.key(), &Key::Uuid(id));
    assert_eq!(href.url().as_str(), format!("http://example.com/api/heroes/{id}"));

    let hero = Hero {
        this: href.clone(),
        name: "Ayla".to_string(),
    };
    assert_eq!(hero.get_key().unwrap(), Key::Uuid(id));
    assert_eq!(Href::validate_with(Input::Instance(hero), &resolver).unwrap(), href);
}

#[test]
fn mounted_endpoint_collects_mount_parameters() {
    let resolver = resolver();
    let id = hero_id(2);
    let entry = Href::<JournalEntry>::validate_with(json!([id.to_string(), 3]), &resolver).unwrap();
    let expected = format!("http://example.com/api/heroes/{id}/journal/3");
    assert_eq!(entry.url().as_str(), expected);

    let back = Href::<JournalEntry>::validate_with(expected.as_str(), &resolver).unwrap();
    assert_eq!(back, entry);
    match back.key() {
        Key::Tuple(parts) => assert_eq!(parts.get(1), Some(&Key::Int(3))),
        other => panic!("unexpected key: {other}"),
    }
}

#[test]
fn instance_with_href_part_keeps_the_part() {
    let resolver = resolver();
    let hero = Href::<Hero>::validate_with(hero_id(3), &resolver).unwrap();
    let entry = JournalEntry {
        hero: hero.clone(),
        number: 8,
    };
    let href = Href::validate_with(Input::Instance(entry), &resolver).unwrap();
    assert_eq!(href.key(), &Key::Tuple(vec![hero.into_key(), Key::Int(8)]));
}

#[test]
fn non_path_parameters_go_to_the_query_string() {
    let resolver = resolver();
    let id = hero_id(4);
    let quest = Href::<Quest>::validate_with(json!([id.to_string(), "dragon slaying"]), &resolver).unwrap();
    let expected = format!("http://example.com/api/v1/quests/dragon%20slaying?hero_id={id}");
    assert_eq!(quest.url().as_str(), expected);

    let back = Href::<Quest>::validate_with(expected.as_str(), &resolver).unwrap();
    assert_eq!(back, quest);
}

#[test]
fn decoy_urls_of_other_endpoints_do_not_resolve() {
    let resolver = resolver();
    let id = hero_id(5);
    let hero_url = format!("http://example.com/api/heroes/{id}");
    let entry_url = format!("http://example.com/api/heroes/{id}/journal/1");

    let err = Href::<Hero>::validate_with(entry_url.as_str(), &resolver).unwrap_err();
    assert!(matches!(err, Error::UnresolvableUrl { .. }), "{err}");

    let err = JournalEntry::url_to_key(&hero_url.parse().unwrap(), &resolver).unwrap_err();
    assert!(matches!(err, Error::UnresolvableUrl { .. }), "{err}");

    let outside_base = format!("http://example.com/heroes/{id}");
    let err = Href::<Hero>::validate_with(outside_base.as_str(), &resolver).unwrap_err();
    assert!(matches!(err, Error::UnresolvableUrl { .. }), "{err}");
}

#[test]
fn unknown_endpoint_is_a_configuration_error() {
    let err = Href::<Familiar>::validate_with(1_i64, &resolver()).unwrap_err();
    assert!(matches!(err, Error::UnknownEndpoint { ref endpoint } if endpoint == "get_familiar"), "{err}");
    assert!(!err.is_input());
}

#[test]
fn hero_list_parses_keys_and_urls_alike() {
    let resolver: Arc<dyn Resolver> = Arc::new(resolver());
    let by_url = format!("http://example.com/api/heroes/{}", hero_id(6));
    let body = json!({
        "heroes": [by_url.clone(), hero_id(7).to_string()],
    });

    let parsed: BTreeMap<String, Vec<Href<Hero>>> =
        context::with_resolver(Arc::clone(&resolver), || return serde_json::from_value(body)).unwrap();
    let urls: Vec<String> = parsed
        .get("heroes")
        .unwrap()
        .iter()
        .map(|h| return h.url().to_string())
        .collect();
    assert_eq!(urls, vec![by_url, format!("http://example.com/api/heroes/{}", hero_id(7))]);
}

#[test]
fn nonexistent_keys_of_the_wrong_type_are_rejected() {
    let err = Href::<Hero>::validate_with("not-a-uuid", &resolver()).unwrap_err();
    assert!(matches!(err, Error::CannotConvert { .. }), "{err}");
}

#[test]
fn hero_serializes_self_as_url() {
    let resolver: Arc<dyn Resolver> = Arc::new(resolver());
    let id = hero_id(9);
    let url = format!("http://example.com/api/heroes/{id}");
    let hero: Hero = context::with_resolver(resolver, || {
        return serde_json::from_value(json!({"self": id.to_string(), "name": "Ayla"}));
    })
    .unwrap();
    assert_eq!(serde_json::to_value(&hero).unwrap(), json!({"self": url, "name": "Ayla"}));
}
