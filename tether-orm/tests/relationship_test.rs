use tether_orm::{Cardinality, Entity, Error, Registry, RelationshipError, SqliteDriver};

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Vehicle {
    #[orm(primary_key)]
    plate: String,
    #[orm(reference)]
    motor: Option<Motor>,
    #[orm(reference)]
    tyres: Vec<Tyre>,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Motor {
    #[orm(primary_key, foreign_key = "VEHICLE::plate", parent_reference = "motor")]
    plate: String,
    power: f32,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Tyre {
    #[orm(primary_key, auto_increment)]
    id: i64,
    #[orm(foreign_key = "vehicle::plate", parent_reference = "tyres", child_reference = "vehicle")]
    plate: String,
    #[orm(reference)]
    vehicle: Option<Box<Vehicle>>,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Sticker {
    #[orm(primary_key, auto_increment)]
    id: i64,
    #[orm(foreign_key = "Vehicle::plate", parent_reference = "stickers")]
    plate: String,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Spoiler {
    #[orm(primary_key, auto_increment)]
    id: i64,
    #[orm(foreign_key = "Vehicle::plate", parent_reference = "motor")]
    plate: String,
}

#[test]
fn test_cardinality_inference() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::builder(SqliteDriver::in_memory())
        .register::<Vehicle>()
        .register::<Motor>()
        .register::<Tyre>()
        .build()?;

    let motor = registry.model_of::<Motor>()?;
    let link = &motor.columns()[0].relationships()[0];
    assert_eq!(link.cardinality(), Cardinality::OneToOne);
    assert_eq!(link.parent_entity(), "Vehicle");
    assert_eq!(link.parent_reference_field(), Some("motor"));
    assert_eq!(link.child_reference_field(), None);

    let tyre = registry.model_of::<Tyre>()?;
    let link = &tyre.column("plate").ok_or("no plate column")?.relationships()[0];
    assert_eq!(link.cardinality(), Cardinality::OneToMany);
    assert_eq!(link.child_table(), "tyre");
    assert_eq!(link.child_reference_field(), Some("vehicle"));

    println!("Cardinality test passed!");
    Ok(())
}

#[test]
fn test_relationship_is_shared_by_both_columns() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::builder(SqliteDriver::in_memory())
        .register::<Vehicle>()
        .register::<Motor>()
        .register::<Tyre>()
        .build()?;

    let vehicle = registry.model_of::<Vehicle>()?;
    let key = vehicle.column("plate").ok_or("no plate column")?;
    assert_eq!(key.relationships().len(), 2);

    let children: Vec<_> = vehicle.parent_relationships().map(|(_, link)| link.child_entity()).collect();
    assert_eq!(children, ["Motor", "Tyre"]);

    let tyre = registry.model_of::<Tyre>()?;
    let from_child = &tyre.column("plate").ok_or("no plate column")?.relationships()[0];
    assert!(key.relationships().iter().any(|link| std::sync::Arc::ptr_eq(link, from_child)));

    // The foreign-key column only sees its own relationship.
    assert_eq!(tyre.relationships().len(), 1);

    println!("Shared relationship test passed!");
    Ok(())
}

#[test]
fn test_undeclared_reference_field() {
    let result = Registry::builder(SqliteDriver::in_memory()).register::<Vehicle>().register::<Sticker>().build();

    assert!(matches!(
        result,
        Err(Error::Relationship(RelationshipError::BrokenReference { ref entity, ref field }))
            if entity == "Vehicle" && field == "stickers"
    ));

    println!("Broken reference test passed!");
}

#[test]
fn test_single_field_on_to_many_side() {
    let result = Registry::builder(SqliteDriver::in_memory()).register::<Vehicle>().register::<Spoiler>().build();

    assert!(matches!(
        result,
        Err(Error::Relationship(RelationshipError::CardinalityMismatch {
            cardinality: Cardinality::OneToMany,
            ..
        }))
    ));

    println!("Cardinality mismatch test passed!");
}
