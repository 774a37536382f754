use std::env;

use chrono::{DateTime, TimeZone, Utc};
use tether_orm::{
    ColumnDescriptor, Entity, EntityCodec, Error, NativeValue, Predicate, Registry, SqliteDriver, TetherEnum, codec,
};

#[derive(TetherEnum, Debug, Default, Clone, Copy, PartialEq)]
enum Fuel {
    #[default]
    Petrol,
    Diesel,
    Electric,
}

#[derive(Entity, Debug, Default, Clone)]
struct Car {
    #[orm(primary_key)]
    registration: String,
    make: String,
    model: String,
    mileage: i32,
    manufactured_date: DateTime<Utc>,
    registered: bool,
    #[orm(reference)]
    wheels: Vec<Wheel>,
    #[orm(reference)]
    engine: Option<Engine>,
}

#[derive(Entity, Debug, Default, Clone)]
struct Engine {
    #[orm(primary_key, foreign_key = "Car::registration", parent_reference = "engine")]
    car_registration: String,
    displacement: f32,
    horsepower: f32,
    #[orm(enumeration)]
    fuel: Fuel,
}

#[derive(Entity, Debug, Default, Clone)]
struct Wheel {
    #[orm(primary_key, auto_increment)]
    wheel_id: i64,
    size: i16,
    #[orm(foreign_key = "Car::registration", parent_reference = "wheels", child_reference = "car")]
    car_registration: String,
    #[orm(reference)]
    car: Option<Box<Car>>,
    #[orm(reference)]
    nuts: Vec<WheelNut>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ThingaMaJigger {
    Charged,
    Depleted,
}

#[derive(Entity, Debug, Default, Clone)]
struct WheelNut {
    #[orm(primary_key, auto_increment)]
    nut_id: i64,
    #[orm(foreign_key = "Wheel::wheel_id", parent_reference = "nuts")]
    wheel_id: i64,
    #[orm(encoded = "int")]
    thinga_ma_jigger: Option<ThingaMaJigger>,
}

/// Stores the jigger as a single integer column.
struct WheelNutCodec;

impl EntityCodec<WheelNut> for WheelNutCodec {
    fn encode(&self, nut: &WheelNut, column: &ColumnDescriptor) -> Result<NativeValue, Error> {
        if column.name() != "thinga_ma_jigger" {
            return codec::encode_field(nut, column);
        }
        Ok(match nut.thinga_ma_jigger {
            Some(ThingaMaJigger::Charged) => NativeValue::Integer(2),
            Some(ThingaMaJigger::Depleted) => NativeValue::Integer(1),
            None => NativeValue::Null,
        })
    }

    fn decode(&self, nut: &mut WheelNut, column: &ColumnDescriptor, native: NativeValue) -> Result<(), Error> {
        if column.name() != "thinga_ma_jigger" {
            return codec::decode_field(nut, column, native);
        }
        nut.thinga_ma_jigger = match native {
            NativeValue::Integer(2) => Some(ThingaMaJigger::Charged),
            NativeValue::Integer(1) => Some(ThingaMaJigger::Depleted),
            _ => None,
        };
        Ok(())
    }
}

fn wheel(size: i16) -> Wheel {
    Wheel {
        size,
        nuts: vec![
            WheelNut { thinga_ma_jigger: Some(ThingaMaJigger::Charged), ..Default::default() },
            WheelNut { thinga_ma_jigger: Some(ThingaMaJigger::Depleted), ..Default::default() },
            WheelNut::default(),
        ],
        ..Default::default()
    }
}

fn demo_car() -> Car {
    Car {
        registration: "GR4 GE1".to_string(),
        make: "Volvo".to_string(),
        model: "240".to_string(),
        mileage: 310_000,
        manufactured_date: Utc.with_ymd_and_hms(1988, 3, 14, 9, 0, 0).single().unwrap_or_default(),
        registered: true,
        wheels: (0..4).map(|_| wheel(15)).collect(),
        engine: Some(Engine { displacement: 2.3, horsepower: 114.0, fuel: Fuel::Petrol, ..Default::default() }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://garage.db".to_string());
    let driver = SqliteDriver::from_url(&database_url)?;

    let mut registry = Registry::builder(driver)
        .version(1)
        .register::<Car>()
        .register::<Engine>()
        .register::<Wheel>()
        .register_with_codec::<WheelNut, _>(WheelNutCodec)
        .on_seed(|registry| {
            Box::pin(async move {
                registry.model::<Car>()?.insert(&mut demo_car()).await?;
                log::info!("seeded the demo car");
                Ok::<(), Error>(())
            })
        })
        .build()?;

    let outcome = registry.initialize().await?;
    println!("Store at {database_url}: {outcome:?}");

    let cars = registry.model::<Car>()?;

    // Fetch with relationships
    let mut car = cars.get_first(Predicate::eq("registration", "GR4 GE1")).await?.ok_or("demo car missing")?;
    println!("{} {} with {} wheels, engine {:?}", car.make, car.model, car.wheels.len(), car.engine);
    for wheel in &car.wheels {
        let jiggers: Vec<_> = wheel.nuts.iter().map(|nut| nut.thinga_ma_jigger).collect();
        println!("  wheel {} size {}: {:?}", wheel.wheel_id, wheel.size, jiggers);
    }

    // A wheel knows its car
    let wheels = registry.model::<Wheel>()?.get_all(Predicate::eq("car_registration", "GR4 GE1")).await?;
    if let Some(parent) = wheels.first().and_then(|wheel| wheel.car.as_deref()) {
        println!("wheel {} belongs to {}", wheels[0].wheel_id, parent.registration);
    }

    // Update cascades to the spare
    car.mileage += 1_200;
    car.wheels.push(wheel(16));
    cars.update(&mut car).await?;

    // Upsert a second car
    let mut second = Car {
        registration: "EL3 CTR".to_string(),
        make: "Nissan".to_string(),
        model: "Leaf".to_string(),
        manufactured_date: Utc::now(),
        engine: Some(Engine { fuel: Fuel::Electric, horsepower: 147.0, ..Default::default() }),
        ..Default::default()
    };
    println!("upsert: {:?}", cars.insert_or_update(&mut second).await?);
    second.registered = true;
    println!("upsert: {:?}", cars.insert_or_update(&mut second).await?);

    // Delete cascades through engine, wheels and nuts
    let removed = cars.delete(&second).await?;
    println!("deleted {removed} rows for {}", second.registration);

    println!("{}", serde_json::to_string_pretty(&registry.describe())?);

    registry.disconnect().await?;
    Ok(())
}
