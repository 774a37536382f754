use tether_orm::{Driver, Error, NativeValue, Predicate, Select, SemanticType, SqliteDriver};

#[tokio::test]
async fn test_sqlite_driver_statements() -> Result<(), Box<dyn std::error::Error>> {
    let mut driver = SqliteDriver::builder().max_connections(1).in_memory();
    assert!(!driver.is_connected());
    assert!(matches!(driver.execute("SELECT 1").await, Err(Error::NotConnected)));

    driver.connect().await?;
    assert!(driver.is_connected());
    assert_eq!(driver.database_file(), None);

    driver.execute("CREATE TABLE \"part\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"kind\" TEXT, \"weight\" DOUBLE, \"blob\" BLOB)").await?;

    let first = driver
        .insert(
            "part",
            &[
                ("kind", NativeValue::Text("bolt".into())),
                ("weight", NativeValue::Real(0.5)),
                ("blob", NativeValue::Blob(vec![1, 2])),
            ],
        )
        .await?;
    let second = driver.insert("part", &[("kind", NativeValue::Text("bolt".into())), ("weight", NativeValue::Real(1.5))]).await?;
    let third = driver.insert("part", &[("kind", NativeValue::Text("nut".into())), ("weight", NativeValue::Null)]).await?;
    assert_eq!((first, second, third), (1, 2, 3));

    let rows = driver.query(&Select::new("part").columns(vec!["id", "kind", "weight", "blob"])).await?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].value(driver.first_column_index()), Some(&NativeValue::Integer(1)));
    assert_eq!(rows[0].by_name("blob"), Some(&NativeValue::Blob(vec![1, 2])));
    assert_eq!(rows[2].by_name("weight"), Some(&NativeValue::Null));

    let heavy = Predicate::new("\"weight\" > ?").bind(1.0).order_by("\"id\" DESC").limit(5);
    let rows = driver.query(&Select::new("part").columns(vec!["id"]).filtered(&heavy)).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value(0), Some(&NativeValue::Integer(2)));

    let grouped = driver
        .query(
            &Select::new("part")
                .columns(vec!["kind"])
                .group_by("\"kind\"")
                .having("COUNT(*) > 1"),
        )
        .await?;
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].value(0), Some(&NativeValue::Text("bolt".into())));

    let args = [NativeValue::Text("nut".into())];
    let updated = driver
        .update("part", &[("weight", NativeValue::Real(0.25))], Some("\"kind\" = ?"), &args)
        .await?;
    assert_eq!(updated, 1);

    let sums = driver.raw_query("SELECT SUM(\"weight\") FROM \"part\" WHERE \"kind\" = ?", &args).await?;
    assert_eq!(sums[0].value(0), Some(&NativeValue::Real(0.25)));

    assert_eq!(driver.delete("part", Some("\"kind\" = ?"), &[NativeValue::Text("bolt".into())]).await?, 2);
    assert_eq!(driver.delete("part", None, &[]).await?, 1);

    driver.disconnect().await?;
    assert!(!driver.is_connected());

    println!("Driver statement test passed!");
    Ok(())
}

#[test]
fn test_numeric_types() {
    let driver = SqliteDriver::in_memory();
    assert!(driver.is_numeric_type(SemanticType::Long));
    assert!(driver.is_numeric_type(SemanticType::Timestamp));
    assert!(driver.is_numeric_type(SemanticType::Double));
    assert!(!driver.is_numeric_type(SemanticType::Text));
    assert!(!driver.is_numeric_type(SemanticType::Enumeration(&["A"])));

    println!("Numeric type test passed!");
}
