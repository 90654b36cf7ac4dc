//! GraphQL schema for the feature collection.
//!
//! The schema is assembled with the dynamic API of `async-graphql` and built
//! once per process. Nothing request-specific is captured by the field
//! resolvers: the store handle and the merge policy are schema data, and the
//! locations and days-back offset arrive as a [`QueryContext`] attached to
//! each request.
//!
//! ```graphql
//! {
//!   tempo
//!   type
//!   features {
//!     type
//!     geometry { type coordinates }
//!     properties { idsensore pm10 temp prec vento no2 o3 }
//!   }
//! }
//! ```

use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, Object, ResolverContext, Schema, SchemaError, TypeRef,
};
use async_graphql::{ErrorExtensions, Number, Value};

use crate::models::{Feature, Geometry, SensorReading};
use crate::resolver::{self, MergePolicy, QueryContext};
use crate::store::SensorStore;

// ---

const ROOT_TYPE: &str = "RootQuery";
const FEATURE_TYPE: &str = "Features";
const GEOMETRY_TYPE: &str = "Geometry";
const PROPERTIES_TYPE: &str = "Sensori";

type FloatGetter = fn(&SensorReading) -> Option<f64>;

/// Float fields of `Sensori`, in declaration order.
const PROPERTY_FIELDS: &[(&str, FloatGetter)] = &[
    ("pm10", |p| p.pm10),
    ("pm10p1", |p| p.pm10p1),
    ("pm10p2", |p| p.pm10p2),
    ("pm10p3", |p| p.pm10p3),
    ("pm10p4", |p| p.pm10p4),
    ("temp", |p| p.temp),
    ("umi", |p| p.umi),
    ("prec", |p| p.prec),
    ("vento", |p| p.vento),
    ("no2", |p| p.no2),
    ("no2p1", |p| p.no2p1),
    ("no2p2", |p| p.no2p2),
    ("no2p3", |p| p.no2p3),
    ("no2p4", |p| p.no2p4),
    ("o3", |p| p.o3),
    ("o3p1", |p| p.o3p1),
    ("o3p2", |p| p.o3p2),
    ("o3p3", |p| p.o3p3),
    ("o3p4", |p| p.o3p4),
];

/// JSON-safe float; NaN and infinities become null.
fn float_value(v: f64) -> Option<Value> {
    Number::from_f64(v).map(Value::Number)
}

fn string_field(name: &str, value: &'static str) -> Field {
    Field::new(name, TypeRef::named(TypeRef::STRING), move |_| {
        FieldFuture::new(async move { Ok(Some(Value::from(value.to_string()))) })
    })
}

fn properties_type() -> Object {
    // ---
    let idsensore = Field::new("idsensore", TypeRef::named(TypeRef::STRING), |ctx| {
        FieldFuture::new(async move {
            let props = ctx.parent_value.try_downcast_ref::<SensorReading>()?;
            Ok(props.idsensore.clone().map(Value::from))
        })
    });

    PROPERTY_FIELDS.iter().fold(
        Object::new(PROPERTIES_TYPE).field(idsensore),
        |object, &(name, get)| {
            object.field(Field::new(name, TypeRef::named(TypeRef::FLOAT), move |ctx| {
                FieldFuture::new(async move {
                    let props = ctx.parent_value.try_downcast_ref::<SensorReading>()?;
                    Ok(get(props).and_then(float_value))
                })
            }))
        },
    )
}

fn geometry_type() -> Object {
    // ---
    Object::new(GEOMETRY_TYPE)
        .field(Field::new("type", TypeRef::named(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let geometry = ctx.parent_value.try_downcast_ref::<Geometry>()?;
                Ok(Some(Value::from(geometry.kind.clone())))
            })
        }))
        .field(Field::new(
            "coordinates",
            TypeRef::named_list(TypeRef::FLOAT),
            |ctx| {
                FieldFuture::new(async move {
                    let geometry = ctx.parent_value.try_downcast_ref::<Geometry>()?;
                    let coordinates = geometry.coordinates.iter().map(|c| {
                        c.and_then(float_value)
                            .map(FieldValue::value)
                            .unwrap_or(FieldValue::NULL)
                    });
                    Ok(Some(FieldValue::list(coordinates)))
                })
            },
        ))
}

fn feature_type() -> Object {
    // ---
    Object::new(FEATURE_TYPE)
        .field(Field::new("type", TypeRef::named(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let feature = ctx.parent_value.try_downcast_ref::<Feature>()?;
                Ok(Some(Value::from(feature.kind.clone())))
            })
        }))
        .field(Field::new(
            "geometry",
            TypeRef::named(GEOMETRY_TYPE),
            |ctx| {
                FieldFuture::new(async move {
                    let feature = ctx.parent_value.try_downcast_ref::<Feature>()?;
                    Ok(Some(FieldValue::borrowed_any(&feature.geometry)))
                })
            },
        ))
        .field(Field::new(
            "properties",
            TypeRef::named(PROPERTIES_TYPE),
            |ctx| {
                FieldFuture::new(async move {
                    let feature = ctx.parent_value.try_downcast_ref::<Feature>()?;
                    Ok(Some(FieldValue::borrowed_any(&feature.properties)))
                })
            },
        ))
}

/// Store handle and request context visible to a root resolver.
fn request_data<'a>(
    ctx: &ResolverContext<'a>,
) -> async_graphql::Result<(&'a Arc<dyn SensorStore>, &'a QueryContext)> {
    Ok((
        ctx.ctx.data::<Arc<dyn SensorStore>>()?,
        ctx.ctx.data::<QueryContext>()?,
    ))
}

fn root_type() -> Object {
    // ---
    Object::new(ROOT_TYPE)
        .field(string_field("type", "FeatureCollection"))
        .field(
            Field::new("tempo", TypeRef::named(TypeRef::STRING), |ctx| {
                FieldFuture::new(async move {
                    let (store, query) = request_data(&ctx)?;
                    let tempo = resolver::resolve_tempo(store.as_ref(), query).await;
                    Ok(Some(Value::from(tempo)))
                })
            })
            .description("Timestamp of the selected sample"),
        )
        .field(
            Field::new("features", TypeRef::named_list(FEATURE_TYPE), |ctx| {
                FieldFuture::new(async move {
                    let (store, query) = request_data(&ctx)?;
                    let policy = ctx.ctx.data::<MergePolicy>()?;
                    let features = resolver::resolve_features(store.as_ref(), query, *policy)
                        .await
                        .map_err(|e| e.extend())?;
                    Ok(Some(FieldValue::list(
                        features.into_iter().map(FieldValue::owned_any),
                    )))
                })
            })
            .description("Merged sensor data, one feature per sensor"),
        )
}

/// Build the schema over `store`.
///
/// Every request executed against it must carry a [`QueryContext`] as
/// request data.
pub fn build_schema(
    store: Arc<dyn SensorStore>,
    policy: MergePolicy,
) -> Result<Schema, SchemaError> {
    // ---
    Schema::build(ROOT_TYPE, None, None)
        .register(properties_type())
        .register(geometry_type())
        .register(feature_type())
        .register(root_type())
        .data(store)
        .data(policy)
        .finish()
}
