// Record Store Tests for CompactMap
// These tests exercise id allocation, queries, updates and persistence of records

use compactmap::query::{fields_map_for, parse_conditions};
use compactmap::{
    Condition, Error, FieldMap, FindCondition, Op, Options, RecordStore, Value,
};
use std::collections::HashSet;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub city: String,
    pub zip: u32,
}

compactmap::fields!(Address { city, zip });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: i32,
    pub score: f64,
    pub address: Address,
    pub nickname: Option<String>,
    pub active: bool,
}

compactmap::record!(Person { id, name, age, score, address, nickname, active });

fn person(name: &str, age: i32, city: &str) -> Person {
    Person {
        name: name.to_string(),
        age,
        address: Address { city: city.to_string(), zip: 10000 + age as u32 },
        ..Default::default()
    }
}

fn new_store(dir: &TempDir) -> RecordStore<Person> {
    RecordStore::new(dir.path().join("people.db"), false).unwrap()
}

fn names(people: &[Person]) -> Vec<&str> {
    let mut names: Vec<_> = people.iter().map(|p| p.name.as_str()).collect();
    names.sort();
    names
}

#[test]
fn test_numeric_predicates() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    store.add(person("a", 42, "Oslo"));
    store.add(person("b", 43, "Rome"));

    let gt = store.find(Condition::And, &[FindCondition::new("age", Op::Greater, 42)]);
    assert_eq!(names(&gt), vec!["b"]);

    let within = store.find(
        Condition::And,
        &[FindCondition::new("age", Op::In, vec![40, 42, 43, 44])],
    );
    assert_eq!(names(&within), vec!["a", "b"]);

    assert_eq!(store.find(Condition::And, &[]).len(), 2);
    assert!(store.find(Condition::Or, &[]).is_empty());

    // Float targets against an integer field.
    let lt = store.find(Condition::And, &[FindCondition::new("age", Op::Less, 42.5)]);
    assert_eq!(names(&lt), vec!["a"]);
}

#[test]
fn test_text_and_nested_predicates() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    store.add(person("alice", 30, "Oslo"));
    store.add(person("bob", 31, "Rome"));
    store.add(person("carol", 32, "Osaka"));

    let dotted = store.find(Condition::And, &[FindCondition::eq("address.city", "Rome")]);
    assert_eq!(names(&dotted), vec!["bob"]);

    // A bare nested member name is found by search.
    let bare = store.find(Condition::And, &[FindCondition::new("City", Op::Like, "Os")]);
    assert_eq!(names(&bare), vec!["alice", "carol"]);

    let either = store.find(
        Condition::Or,
        &[FindCondition::eq("name", "bob"), FindCondition::new("zip", Op::Greater, 10031)],
    );
    assert_eq!(names(&either), vec!["bob", "carol"]);

    let none = store.find(Condition::And, &[FindCondition::eq("address.country", "NO")]);
    assert!(none.is_empty());
}

#[test]
fn test_optional_field_predicates() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    let a = store.add(person("a", 1, "x"));
    store.add(person("b", 2, "x"));
    assert!(store.set_field(a, "nickname", "ace").unwrap());

    let named = store.find(Condition::And, &[FindCondition::eq("nickname", "ace")]);
    assert_eq!(names(&named), vec!["a"]);

    // Only the record without a nickname matches a null target.
    let unnamed = store.find(Condition::And, &[FindCondition::eq("nickname", Value::Null)]);
    assert_eq!(names(&unnamed), vec!["b"]);

    assert!(store.set_field(a, "nickname", Value::Null).unwrap());
    assert_eq!(store.get(a).unwrap().nickname, None);
}

#[test]
fn test_set_fields_nested() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    let id = store.add(person("dave", 50, "Paris"));

    let mut fields = FieldMap::new();
    fields.insert("address.city".to_string(), Value::from("Lyon"));
    fields.insert("Score".to_string(), Value::from(9.5));
    fields.insert("active".to_string(), Value::from(true));
    assert!(store.set_fields(id, &fields).unwrap());

    let updated = store.get(id).unwrap();
    assert_eq!(updated.address.city, "Lyon");
    assert_eq!(updated.score, 9.5);
    assert!(updated.active);

    // The nested record itself is not assignable.
    assert!(!store.set_field(id, "address", "Nice").unwrap());

    let err = store.set_field(id, "age", "old").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn test_fields_map_for() {
    let p = person("erin", 28, "Bergen");

    let plain = fields_map_for(&p, &["name", "city", "missing", "address"], false);
    assert_eq!(plain.len(), 2);
    assert_eq!(plain["name"], Value::from("erin"));
    assert_eq!(plain["city"], Value::from("Bergen"));

    let dotted = fields_map_for(&p, &["zip"], true);
    assert_eq!(dotted["address.zip"], Value::from(10028u32));
}

#[test]
fn test_update_count_limit() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    for i in 0..20 {
        store.add(person(&format!("p{:02}", i), 20 + i, "Oslo"));
    }

    let mut fields = FieldMap::new();
    fields.insert("active".to_string(), Value::from(true));
    let query = [FindCondition::new("age", Op::Greater, 29)];

    let first = store.update_count(Condition::And, &query, &fields, 3, false).unwrap();
    assert_eq!(first.len(), 3);
    for id in &first {
        assert!(store.get(*id).unwrap().active);
    }

    let updated = store.update(Condition::And, &query, &fields).unwrap();
    assert_eq!(updated, 10);
    assert_eq!(store.find(Condition::And, &[FindCondition::eq("active", true)]).len(), 10);
}

#[test]
fn test_update_count_random() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    for i in 0..1000 {
        store.add(person("same", i % 100, "Oslo"));
    }

    let matching: HashSet<i64> = store
        .find(Condition::And, &[FindCondition::eq("name", "same")])
        .iter()
        .map(|p| p.id)
        .collect();
    let fields = FieldMap::new();
    let query = [FindCondition::eq("name", "same")];

    let mut picked = HashSet::new();
    for _ in 0..5 {
        let ids = store.update_count(Condition::And, &query, &fields, 1, true).unwrap();
        assert_eq!(ids.len(), 1);
        assert!(matching.contains(&ids[0]));
        picked.insert(ids[0]);
    }
    assert!(picked.len() > 1);

    // Without a limit every match is selected once.
    let all = store.update_count(Condition::And, &query, &fields, 0, true).unwrap();
    assert_eq!(all.iter().collect::<HashSet<_>>().len(), 1000);
}

#[test]
fn test_json_conditions() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    store.add(person("fay", 42, "Oslo"));
    store.add(person("gus", 43, "Rome"));

    let query = parse_conditions(
        r#"[{"Field": "age", "Op": "in", "Value": [42, 43]},
            {"field": "address.city", "op": "<>", "value": "Oslo"}]"#,
    )
    .unwrap();
    let condition: Condition = "and".parse().unwrap();
    assert_eq!(names(&store.find(condition, &query)), vec!["gus"]);
}

#[test]
fn test_find_fn_stops_early() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    for i in 0..10 {
        store.add(person("x", i, "Oslo"));
    }

    let mut visited = Vec::new();
    store.find_fn(Condition::And, &[FindCondition::new("age", Op::Greater, 2)], |id, p| {
        visited.push((id, p.age));
        visited.len() < 2
    });
    assert_eq!(visited.len(), 2);
    assert!(visited.iter().all(|(_, age)| *age > 2));
}

#[test]
fn test_save_and_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.db");

    let ids: Vec<i64> = {
        let store = RecordStore::<Person>::new(&path, false).unwrap();
        let ids = (0..5).map(|i| store.add(person(&format!("n{}", i), i, "Oslo"))).collect();
        store.set_field(3, "nickname", "three").unwrap();
        store.save().unwrap();
        ids
    };
    assert_eq!(ids, vec![2, 3, 4, 5, 6]);
    assert!(dir.path().join("people.dbi").exists());

    let store = RecordStore::<Person>::new(&path, true).unwrap();
    assert_eq!(store.count(), 5);
    assert_eq!(store.max_id(), 6);
    assert_eq!(store.get(3).unwrap().nickname.as_deref(), Some("three"));
    assert_eq!(store.get(4).unwrap().address.city, "Oslo");

    // Ids continue from the persisted counter.
    assert_eq!(store.add(person("next", 9, "Oslo")), 7);
}

#[test]
fn test_missing_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.db");

    let err = RecordStore::<Person>::new(&path, true).err().unwrap();
    assert!(matches!(err, Error::Io(_)));

    let store = RecordStore::<Person>::new(&path, false).unwrap();
    assert_eq!(store.count(), 0);
    assert_eq!(store.max_id(), 1);
}

#[test]
fn test_custom_counter_suffix() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.db");
    let options = Options::default().counter_suffix(".counter");

    let store = RecordStore::<Person>::open(&path, options.clone()).unwrap();
    store.add(person("a", 1, "x"));
    store.save().unwrap();

    let counter = dir.path().join("people.db.counter");
    assert_eq!(fs::metadata(&counter).unwrap().len(), 8 + 2 * (4 + 8));

    let reopened = RecordStore::<Person>::open(&path, options.fail_if_missing(true)).unwrap();
    assert_eq!(reopened.max_id(), 2);
}

#[test]
fn test_clear_resets_ids() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    store.add(person("a", 1, "x"));
    store.add(person("b", 2, "x"));

    store.clear();
    assert_eq!(store.count(), 0);
    assert!(store.get_all().is_empty());
    assert_eq!(store.add(person("c", 3, "x")), 2);
}
