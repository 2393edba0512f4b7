//! Two objlink sessions talking over an in-process pipe.
//!
//! One side exposes a `Garage` whose cars can be added, inspected through a
//! getter/setter pair, and walked with an async iterator; the other side
//! drives it purely through stubs.
//!
//! ```text
//! RUST_LOG=debug cargo run -p objlink-pipe --example mirror_demo
//! ```

use anyhow::Result;
use futures::StreamExt;
use objlink::{ClassDef, IteratorKind, Record, RpcError, Session, Value};
use tracing_subscriber::EnvFilter;

fn garage_seed() -> Value {
    let car = ClassDef::builder("Car")
        .getter_setter(
            "owner",
            |obj| Ok(obj.field("_owner").unwrap_or(Value::Null)),
            |obj, v| {
                obj.set_field("_owner", v);
                Ok(())
            },
        )
        .property("model")
        .build();

    let garage_iter = ClassDef::builder("GarageIter")
        .method_sync("next", |iter, _args| {
            let index = iter.field("_index").and_then(|v| v.as_f64()).unwrap_or(0.0) as usize;
            let garage = iter
                .field("_garage")
                .ok_or_else(|| RpcError::user("iterator lost its garage"))?;
            let garage = garage
                .as_object()
                .ok_or_else(|| RpcError::user("iterator lost its garage"))?
                .clone();
            let cars = garage.field("_cars").unwrap_or(Value::List(vec![]));
            let cars = cars.as_list().unwrap_or(&[]).to_vec();
            iter.set_field("_index", Value::from((index + 1) as f64));
            match cars.get(index) {
                Some(car) => Ok(Value::record([
                    ("value", car.clone()),
                    ("done", Value::from(false)),
                ])),
                None => Ok(Value::record([("done", Value::from(true))])),
            }
        })
        .build();

    let garage = ClassDef::builder("Garage")
        .method("addCar", {
            let car = car.clone();
            move |garage, args| {
                let car = car.clone();
                async move {
                    let model = args
                        .first()
                        .and_then(Value::as_str)
                        .ok_or_else(|| RpcError::user("addCar needs a model name"))?
                        .to_string();
                    let new_car = car.instance(Record::from([
                        ("model".to_string(), Value::from(model)),
                        ("_owner".to_string(), Value::from("nobody")),
                    ]));
                    let mut cars = garage
                        .field("_cars")
                        .and_then(|v| v.as_list().map(<[Value]>::to_vec))
                        .unwrap_or_default();
                    cars.push(new_car.clone());
                    garage.set_field("_cars", Value::List(cars));
                    Ok(new_car)
                }
            }
        })
        .getter("count", |garage| {
            let count = garage
                .field("_cars")
                .and_then(|v| v.as_list().map(<[Value]>::len))
                .unwrap_or(0);
            Ok(Value::from(count as f64))
        })
        .iterator(IteratorKind::AsyncIterator, {
            let garage_iter = garage_iter.clone();
            move |garage| {
                Ok(garage_iter.instance(Record::from([
                    ("_index".to_string(), Value::from(0.0)),
                    ("_garage".to_string(), Value::Object(garage)),
                ])))
            }
        })
        .build();

    garage.instance(Record::from([("_cars".to_string(), Value::List(vec![]))]))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (side_a, side_b) = objlink_pipe::pair();
    let _server = Session::start(side_a, garage_seed());
    let client = Session::start(side_b, Value::Null);

    let garage = client.remote_start().await?;
    let garage = garage.as_stub().expect("seed is a classed object");

    let flintmobile = garage
        .invoke("addCar", vec![Value::from("Flintmobile")])
        .await?;
    let flintmobile = flintmobile.as_stub().expect("cars arrive as stubs");
    garage.invoke("addCar", vec![Value::from("Cyclemobile")]).await?;

    println!("cars in garage: {:?}", garage.get("count").await?);
    println!("model (local property read): {:?}", flintmobile.property("model"));

    flintmobile.set("owner", Value::from("Fred")).await?;
    println!("owner after set: {:?}", flintmobile.get("owner").await?);

    let mut cars = garage.iterate().await?;
    while let Some(car) = cars.next().await {
        let car = car?;
        let car = car.as_stub().expect("iteration yields stubs");
        println!(
            "garage holds {:?} owned by {:?}",
            car.property("model"),
            car.get("owner").await?
        );
    }

    Ok(())
}
