use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tether_orm::{
    CodecError, ColumnDescriptor, Entity, EntityCodec, Error, NativeValue, Predicate, Registry, SqliteDriver,
    TetherEnum, codec,
};

#[derive(TetherEnum, Debug, Default, Clone, Copy, PartialEq)]
enum Level {
    #[default]
    Low,
    High,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Sample {
    #[orm(primary_key, auto_increment)]
    id: i64,
    text: String,
    flag: bool,
    byte: i8,
    short: i16,
    int: i32,
    long: i64,
    float: f32,
    double: f64,
    stamp: DateTime<Utc>,
    naive: NaiveDateTime,
    blob: Vec<u8>,
    maybe: Option<String>,
    #[orm(enumeration)]
    level: Level,
    #[orm(enumeration)]
    spare: Option<Level>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Charge {
    Charged,
    Depleted,
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct Battery {
    #[orm(primary_key, auto_increment)]
    id: i64,
    cells: i32,
    #[orm(encoded = "int")]
    charge: Option<Charge>,
}

/// Stores the charge as a single integer discriminant.
struct ChargeCodec;

impl EntityCodec<Battery> for ChargeCodec {
    fn encode(&self, battery: &Battery, column: &ColumnDescriptor) -> Result<NativeValue, Error> {
        match column.name() {
            "charge" => Ok(match battery.charge {
                Some(Charge::Charged) => NativeValue::Integer(2),
                Some(Charge::Depleted) => NativeValue::Integer(1),
                None => NativeValue::Null,
            }),
            _ => codec::encode_field(battery, column),
        }
    }

    fn decode(&self, battery: &mut Battery, column: &ColumnDescriptor, native: NativeValue) -> Result<(), Error> {
        match column.name() {
            "charge" => {
                battery.charge = match native {
                    NativeValue::Integer(2) => Some(Charge::Charged),
                    NativeValue::Integer(1) => Some(Charge::Depleted),
                    NativeValue::Null => None,
                    other => {
                        return Err(CodecError::OutOfRange { target: "charge".into(), value: other.to_string() }.into());
                    }
                };
                Ok(())
            }
            _ => codec::decode_field(battery, column, native),
        }
    }
}

#[tokio::test]
async fn test_every_type_round_trips() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::builder(SqliteDriver::in_memory()).register::<Sample>().open().await?;
    let samples = registry.model::<Sample>()?;

    let stamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).single().ok_or("bad date")? + chrono::Duration::milliseconds(250);
    let naive = NaiveDate::from_ymd_opt(1999, 12, 31).and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999)).ok_or("bad date")?;

    let mut full = Sample {
        id: 0,
        text: "héllo".into(),
        flag: true,
        byte: -7,
        short: 1_234,
        int: -56_789,
        long: 9_007_199_254_740_993,
        float: 1.5,
        double: -0.125,
        stamp,
        naive,
        blob: vec![0, 1, 254, 255],
        maybe: Some("present".into()),
        level: Level::High,
        spare: Some(Level::Low),
    };
    samples.insert(&mut full).await?;

    let mut empty = Sample { blob: vec![7], maybe: None, spare: None, ..Default::default() };
    samples.insert(&mut empty).await?;

    let stored = samples.get_all(Predicate::all().order_by("\"id\"")).await?;
    assert_eq!(stored, vec![full, empty]);

    println!("Round trip test passed!");
    Ok(())
}

#[tokio::test]
async fn test_timestamps_are_stored_as_epoch_millis() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::builder(SqliteDriver::in_memory()).register::<Sample>().open().await?;

    let stamp = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).ok_or("bad timestamp")?;
    registry.model::<Sample>()?.insert(&mut Sample { stamp, ..Default::default() }).await?;

    let rows = registry.driver().raw_query("SELECT \"stamp\", \"flag\", \"level\" FROM \"sample\"", &[]).await?;
    assert_eq!(rows[0].value(0), Some(&NativeValue::Integer(1_700_000_000_123)));
    assert_eq!(rows[0].value(1), Some(&NativeValue::Integer(0)));
    assert_eq!(rows[0].value(2), Some(&NativeValue::Text("Low".into())));

    println!("Timestamp storage test passed!");
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_integer_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::builder(SqliteDriver::in_memory()).register::<Sample>().open().await?;
    registry.model::<Sample>()?.insert(&mut Sample::default()).await?;
    registry.driver().execute("UPDATE \"sample\" SET \"byte\" = 300").await?;

    let result = registry.model::<Sample>()?.get_all(Predicate::all()).await;
    match result {
        Err(Error::Materialization { source, .. }) => {
            assert!(matches!(*source, Error::Codec(CodecError::OutOfRange { .. })));
        }
        other => panic!("expected an out of range error, got {other:?}"),
    }

    println!("Out of range test passed!");
    Ok(())
}

#[tokio::test]
async fn test_model_codec_override() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::builder(SqliteDriver::in_memory())
        .register_with_codec::<Battery, _>(ChargeCodec)
        .open()
        .await?;
    let batteries = registry.model::<Battery>()?;

    let mut full = Battery { cells: 6, charge: Some(Charge::Charged), ..Default::default() };
    let mut flat = Battery { cells: 4, charge: Some(Charge::Depleted), ..Default::default() };
    let mut unknown = Battery { cells: 2, charge: None, ..Default::default() };
    batteries.insert_all(&mut [full.clone(), flat.clone(), unknown.clone()]).await?;
    full.id = 1;
    flat.id = 2;
    unknown.id = 3;

    let rows = registry.driver().raw_query("SELECT \"charge\" FROM \"battery\" ORDER BY \"id\"", &[]).await?;
    let stored: Vec<_> = rows.iter().map(|row| row.value(0).cloned()).collect();
    assert_eq!(stored, [Some(NativeValue::Integer(2)), Some(NativeValue::Integer(1)), Some(NativeValue::Null)]);

    let fetched = batteries.get_all(Predicate::all().order_by("\"id\"")).await?;
    assert_eq!(fetched, vec![full, flat, unknown]);

    println!("Codec override test passed!");
    Ok(())
}

#[tokio::test]
async fn test_encoded_field_needs_a_codec() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::builder(SqliteDriver::in_memory()).register::<Battery>().open().await?;

    let result = registry.model::<Battery>()?.insert(&mut Battery::default()).await;
    assert!(matches!(result, Err(Error::Codec(CodecError::Unmapped { ref field })) if field == "charge"));

    println!("Unmapped field test passed!");
    Ok(())
}
