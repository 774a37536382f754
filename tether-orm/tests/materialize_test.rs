use tether_orm::{CodecError, Entity, Error, Predicate, Registry, SqliteDriver, TetherEnum};

#[derive(TetherEnum, Debug, Default, Clone, Copy, PartialEq)]
enum Mood {
    #[default]
    Calm,
    Angry,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Parent {
    #[orm(primary_key, auto_increment)]
    id: i64,
    name: String,
    #[orm(enumeration)]
    mood: Mood,
    #[orm(reference)]
    children: Vec<Child>,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Child {
    #[orm(primary_key, auto_increment)]
    id: i64,
    name: String,
    #[orm(foreign_key = "Parent::id", parent_reference = "children", child_reference = "parent")]
    parent_id: i64,
    #[orm(reference)]
    parent: Option<Box<Parent>>,
}

/// References its owner, but declares no reference field on either side.
#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Note {
    #[orm(primary_key, auto_increment)]
    id: i64,
    #[orm(foreign_key = "Parent::id")]
    parent_id: i64,
    #[orm(reference)]
    parent: Option<Box<Parent>>,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Toy {
    #[orm(primary_key, auto_increment)]
    id: i64,
    label: String,
    #[orm(foreign_key = "Parent::id", child_reference = "owner")]
    owner_id: Option<i64>,
    #[orm(reference)]
    owner: Option<Box<Parent>>,
}

async fn open() -> Result<Registry, Error> {
    Registry::builder(SqliteDriver::in_memory())
        .register::<Parent>()
        .register::<Child>()
        .register::<Note>()
        .register::<Toy>()
        .open()
        .await
}

fn family(name: &str, children: &[&str]) -> Parent {
    Parent {
        name: name.to_string(),
        mood: Mood::Angry,
        children: children.iter().map(|child| Child { name: child.to_string(), ..Default::default() }).collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_children_are_populated_in_insertion_order() -> Result<(), Box<dyn std::error::Error>> {
    let registry = open().await?;
    let parents = registry.model::<Parent>()?;

    let mut parent = family("Alice", &["Ben", "Cleo"]);
    parents.insert(&mut parent).await?;

    let fetched = parents.get_first(Predicate::eq("name", "Alice")).await?.ok_or("parent not found")?;
    assert_eq!(fetched.id, parent.id);
    assert_eq!(fetched.mood, Mood::Angry);

    let names: Vec<_> = fetched.children.iter().map(|child| child.name.as_str()).collect();
    assert_eq!(names, ["Ben", "Cleo"]);
    assert!(fetched.children.iter().all(|child| child.parent_id == parent.id));
    // Children reached from their parent do not fetch it again.
    assert!(fetched.children.iter().all(|child| child.parent.is_none()));

    println!("Child population test passed!");
    Ok(())
}

#[tokio::test]
async fn test_parent_is_populated_from_child() -> Result<(), Box<dyn std::error::Error>> {
    let registry = open().await?;
    registry.model::<Parent>()?.insert(&mut family("Alice", &["Ben", "Cleo"])).await?;

    let children = registry.model::<Child>()?.get_all(Predicate::all().order_by("\"id\"")).await?;
    assert_eq!(children.len(), 2);

    let parent = children[0].parent.as_deref().ok_or("parent not populated")?;
    assert_eq!(parent.name, "Alice");
    assert_eq!(parent.children.len(), 2);

    // The cycle stops: the starting child is decoded again but not expanded, and its
    // sibling does not refetch the parent.
    assert_eq!(parent.children[0].name, "Ben");
    assert!(parent.children[0].parent.is_none());
    assert!(parent.children[1].parent.is_none());

    println!("Parent population test passed!");
    Ok(())
}

#[tokio::test]
async fn test_undeclared_references_are_not_followed() -> Result<(), Box<dyn std::error::Error>> {
    let registry = open().await?;
    let mut parent = family("Alice", &[]);
    registry.model::<Parent>()?.insert(&mut parent).await?;

    let mut note = Note { parent_id: parent.id, ..Default::default() };
    registry.model::<Note>()?.insert(&mut note).await?;

    let notes = registry.model::<Note>()?.get_all(Predicate::all()).await?;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].parent_id, parent.id);
    assert!(notes[0].parent.is_none());

    println!("Undeclared reference test passed!");
    Ok(())
}

#[tokio::test]
async fn test_null_foreign_key_has_no_parent() -> Result<(), Box<dyn std::error::Error>> {
    let registry = open().await?;
    let mut parent = family("Alice", &[]);
    registry.model::<Parent>()?.insert(&mut parent).await?;

    let toys = registry.model::<Toy>()?;
    toys.insert(&mut Toy { label: "kite".into(), owner_id: Some(parent.id), ..Default::default() }).await?;
    toys.insert(&mut Toy { label: "ball".into(), owner_id: None, ..Default::default() }).await?;

    let kite = toys.get_first(Predicate::eq("label", "kite")).await?.ok_or("kite not found")?;
    assert_eq!(kite.owner.map(|owner| owner.name), Some("Alice".to_string()));

    let ball = toys.get_first(Predicate::eq("label", "ball")).await?.ok_or("ball not found")?;
    assert_eq!(ball.owner_id, None);
    assert!(ball.owner.is_none());

    println!("Null foreign key test passed!");
    Ok(())
}

#[tokio::test]
async fn test_invalid_stored_value_fails_materialization() -> Result<(), Box<dyn std::error::Error>> {
    let registry = open().await?;
    registry.driver().execute("INSERT INTO \"parent\" (\"name\", \"mood\") VALUES ('Mallory', 'Furious')").await?;

    let result = registry.model::<Parent>()?.get_all(Predicate::all()).await;
    match result {
        Err(Error::Materialization { entity, source }) => {
            assert_eq!(entity, "Parent");
            assert!(matches!(*source, Error::Codec(CodecError::InvalidEnumValue { .. })));
        }
        other => panic!("expected a materialization error, got {other:?}"),
    }

    println!("Materialization error test passed!");
    Ok(())
}
